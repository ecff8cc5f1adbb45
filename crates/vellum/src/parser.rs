use compact_str::CompactString;

use crate::{
    error::{ParseError, ParseErrorKind},
    scanner::{Token, TokenKind},
    template::Node,
};

/// An open block whose closing directive has not been seen yet.
enum Frame {
    Loop {
        collection: CompactString,
        alias: CompactString,
        body: Vec<Node>,
        offset: usize,
        len: usize,
    },
    If {
        path: CompactString,
        negate: bool,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
        in_else: bool,
        offset: usize,
        len: usize,
    },
}

impl Frame {
    fn keyword(&self) -> &'static str {
        match self {
            Frame::Loop { .. } => "loop",
            Frame::If { .. } => "if",
        }
    }
}

/// Build a node tree out of the scanner's token stream, validating nesting
/// with an explicit stack of open blocks.
pub(crate) fn parse(source: &str, tokens: Vec<Token<'_>>) -> Result<Vec<Node>, ParseError> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in tokens {
        let span = (token.offset, token.len);
        match token.kind {
            TokenKind::Literal(text) => {
                push(&mut root, &mut stack, Node::Literal(text.to_owned()));
            }
            TokenKind::Placeholder { path, raw } => {
                push(
                    &mut root,
                    &mut stack,
                    Node::Placeholder {
                        path: path.into(),
                        raw,
                    },
                );
            }
            TokenKind::LoopStart { collection, alias } => {
                stack.push(Frame::Loop {
                    collection: collection.into(),
                    alias: alias.into(),
                    body: Vec::new(),
                    offset: token.offset,
                    len: token.len,
                });
            }
            TokenKind::IfStart { path, negate } => {
                stack.push(Frame::If {
                    path: path.into(),
                    negate,
                    then_body: Vec::new(),
                    else_body: Vec::new(),
                    in_else: false,
                    offset: token.offset,
                    len: token.len,
                });
            }
            TokenKind::Else => match stack.last_mut() {
                Some(Frame::If { in_else, .. }) if !*in_else => *in_else = true,
                Some(Frame::If { .. }) => {
                    return Err(ParseError::new(ParseErrorKind::DuplicateElse, source, span));
                }
                _ => {
                    return Err(ParseError::new(ParseErrorKind::ElseOutsideIf, source, span));
                }
            },
            TokenKind::LoopEnd => match stack.pop() {
                Some(Frame::Loop {
                    collection,
                    alias,
                    body,
                    ..
                }) => {
                    push(
                        &mut root,
                        &mut stack,
                        Node::Loop {
                            collection,
                            alias,
                            body,
                        },
                    );
                }
                Some(open) => {
                    return Err(ParseError::new(
                        ParseErrorKind::MismatchedClose {
                            found: "endloop",
                            open: open.keyword(),
                        },
                        source,
                        span,
                    ));
                }
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedClose("endloop"),
                        source,
                        span,
                    ));
                }
            },
            TokenKind::IfEnd => match stack.pop() {
                Some(Frame::If {
                    path,
                    negate,
                    then_body,
                    else_body,
                    ..
                }) => {
                    push(
                        &mut root,
                        &mut stack,
                        Node::Conditional {
                            path,
                            negate,
                            then_body,
                            else_body,
                        },
                    );
                }
                Some(open) => {
                    return Err(ParseError::new(
                        ParseErrorKind::MismatchedClose {
                            found: "endif",
                            open: open.keyword(),
                        },
                        source,
                        span,
                    ));
                }
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedClose("endif"),
                        source,
                        span,
                    ));
                }
            },
        }
    }

    // A non-empty stack means an opening directive was never closed; point
    // the error at the opener.
    if let Some(open) = stack.first() {
        let (offset, len) = match *open {
            Frame::Loop { offset, len, .. } => (offset, len),
            Frame::If { offset, len, .. } => (offset, len),
        };
        return Err(ParseError::new(
            ParseErrorKind::UnterminatedBlock(open.keyword()),
            source,
            (offset, len),
        ));
    }

    Ok(root)
}

/// Append a completed node to the innermost open block, or to the top level.
fn push(root: &mut Vec<Node>, stack: &mut [Frame], node: Node) {
    match stack.last_mut() {
        Some(Frame::Loop { body, .. }) => body.push(node),
        Some(Frame::If {
            then_body,
            else_body,
            in_else,
            ..
        }) => {
            if *in_else {
                else_body.push(node)
            } else {
                then_body.push(node)
            }
        }
        None => root.push(node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse_str(source: &str) -> Result<Vec<Node>, ParseError> {
        parse(source, scan(source)?)
    }

    #[test]
    fn flat_template() {
        let nodes = parse_str("<p>[data-v-site.name]</p>").unwrap();
        assert_eq!(
            nodes,
            [
                Node::Literal("<p>".into()),
                Node::Placeholder {
                    path: "site.name".into(),
                    raw: false,
                },
                Node::Literal("</p>".into()),
            ],
        );
    }

    #[test]
    fn loop_with_body() {
        let nodes =
            parse_str(r#"<!-- @loop name="categories" as="c" -->[data-v-c.name]<!-- @endloop -->"#)
                .unwrap();
        assert_eq!(
            nodes,
            [Node::Loop {
                collection: "categories".into(),
                alias: "c".into(),
                body: vec![Node::Placeholder {
                    path: "c.name".into(),
                    raw: false,
                }],
            }],
        );
    }

    #[test]
    fn else_switches_bodies() {
        let nodes =
            parse_str("<!-- @if user -->Hi<!-- @else -->Guest<!-- @endif -->").unwrap();
        assert_eq!(
            nodes,
            [Node::Conditional {
                path: "user".into(),
                negate: false,
                then_body: vec![Node::Literal("Hi".into())],
                else_body: vec![Node::Literal("Guest".into())],
            }],
        );
    }

    #[test]
    fn nested_loop_in_conditional() {
        let nodes = parse_str(concat!(
            "<!-- @if menu -->",
            r#"<!-- @loop name="menu.items" as="item" -->[data-v-item.label]<!-- @endloop -->"#,
            "<!-- @endif -->",
        ))
        .unwrap();
        let Node::Conditional { then_body, .. } = &nodes[0] else {
            panic!("expected a conditional, got {nodes:?}");
        };
        assert!(matches!(then_body[0], Node::Loop { .. }));
    }

    #[test]
    fn unterminated_loop_errors() {
        let err = parse_str(r#"<!-- @loop name="xs" as="x" -->[data-v-x]"#).unwrap_err();
        assert_eq!(*err.kind(), ParseErrorKind::UnterminatedBlock("loop"));
    }

    #[test]
    fn unterminated_if_errors() {
        let err = parse_str("<!-- @if a -->body").unwrap_err();
        assert_eq!(*err.kind(), ParseErrorKind::UnterminatedBlock("if"));
    }

    #[test]
    fn stray_endloop_errors() {
        let err = parse_str("<!-- @endloop -->").unwrap_err();
        assert_eq!(*err.kind(), ParseErrorKind::UnexpectedClose("endloop"));
    }

    #[test]
    fn endif_cannot_close_a_loop() {
        let err = parse_str(r#"<!-- @loop name="xs" as="x" --><!-- @endif -->"#).unwrap_err();
        assert_eq!(
            *err.kind(),
            ParseErrorKind::MismatchedClose {
                found: "endif",
                open: "loop",
            },
        );
    }

    #[test]
    fn else_outside_if_errors() {
        let err = parse_str("<!-- @else -->").unwrap_err();
        assert_eq!(*err.kind(), ParseErrorKind::ElseOutsideIf);
    }

    #[test]
    fn duplicate_else_errors() {
        let err = parse_str("<!-- @if a -->x<!-- @else -->y<!-- @else -->z<!-- @endif -->")
            .unwrap_err();
        assert_eq!(*err.kind(), ParseErrorKind::DuplicateElse);
    }

    #[test]
    fn else_binds_to_innermost_if() {
        let nodes = parse_str(concat!(
            "<!-- @if outer -->",
            "<!-- @if inner -->a<!-- @else -->b<!-- @endif -->",
            "<!-- @endif -->",
        ))
        .unwrap();
        let Node::Conditional { then_body, else_body, .. } = &nodes[0] else {
            panic!("expected a conditional");
        };
        assert!(else_body.is_empty());
        let Node::Conditional { else_body: inner_else, .. } = &then_body[0] else {
            panic!("expected an inner conditional");
        };
        assert_eq!(inner_else, &[Node::Literal("b".into())]);
    }

    #[test]
    fn parse_is_deterministic() {
        let source = concat!(
            "<header>[data-v-site.name]</header>",
            r#"<!-- @loop name="posts" as="p" -->[data-v-p.title]<!-- @endloop -->"#,
        );
        assert_eq!(parse_str(source).unwrap(), parse_str(source).unwrap());
    }
}
