use compact_str::CompactString;

use crate::{error::ParseError, parser, scanner};

/// A parsed template node.
///
/// The node tree only encodes *paths*; it never references data. The same
/// tree can be evaluated against arbitrarily many data contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Text appended to the output verbatim.
    Literal(String),
    /// A `[data-v-path]` substitution; `raw` skips HTML escaping.
    Placeholder { path: CompactString, raw: bool },
    /// A `@loop` block iterating `collection`, binding each item as `alias`.
    Loop {
        collection: CompactString,
        alias: CompactString,
        body: Vec<Node>,
    },
    /// An `@if`/`@else` block switching on the truthiness of `path`.
    Conditional {
        path: CompactString,
        negate: bool,
        then_body: Vec<Node>,
        else_body: Vec<Node>,
    },
}

/// A compiled template: an ordered sequence of top-level nodes.
///
/// Immutable after construction and safe to share across concurrent renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    /// Compile template source text (scan + parse).
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = scanner::scan(source)?;
        let nodes = parser::parse(source, tokens)?;
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All placeholder paths referenced by the template, in document order,
    /// including those nested inside loops and conditionals.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        let mut paths = Vec::new();
        collect_paths(&self.nodes, &mut paths);
        paths.into_iter()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths().any(|p| p == path)
    }
}

fn collect_paths<'t>(nodes: &'t [Node], out: &mut Vec<&'t str>) {
    for node in nodes {
        match node {
            Node::Literal(_) => {}
            Node::Placeholder { path, .. } => out.push(path),
            Node::Loop { body, .. } => collect_paths(body, out),
            Node::Conditional {
                then_body,
                else_body,
                ..
            } => {
                collect_paths(then_body, out);
                collect_paths(else_body, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_compiles_to_no_nodes() {
        let template = CompiledTemplate::parse("").unwrap();
        assert_eq!(template, CompiledTemplate::default());
    }

    #[test]
    fn paths_cover_nested_bodies() {
        let template = CompiledTemplate::parse(concat!(
            "[data-v-site.name]",
            r#"<!-- @loop name="posts" as="p" -->[data-v-p.title]<!-- @endloop -->"#,
            "<!-- @if user -->[data-v-user.email]<!-- @else -->[data-v-login_url]<!-- @endif -->",
        ))
        .unwrap();
        assert_eq!(
            template.paths().collect::<Vec<_>>(),
            ["site.name", "p.title", "user.email", "login_url"],
        );
        assert!(template.has_path("p.title"));
        assert!(!template.has_path("posts"));
    }

    #[test]
    fn compile_twice_yields_identical_trees() {
        let source = r#"<!-- @loop name="xs" as="x" -->[data-v-x]<!-- @endloop -->"#;
        assert_eq!(
            CompiledTemplate::parse(source).unwrap(),
            CompiledTemplate::parse(source).unwrap(),
        );
    }
}
