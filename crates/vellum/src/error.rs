use compact_str::CompactString;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error as ThisError;

/// A template failed to compile.
///
/// Carries the full source text and the span of the offending directive so
/// that miette can point at it.
#[derive(Debug, Diagnostic, ThisError)]
#[error("failed to compile template `{}`: {kind}", .name.as_deref().unwrap_or("<inline>"))]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,

    #[source_code]
    pub(crate) src: String,

    #[label = "offending directive"]
    pub(crate) span: SourceSpan,

    pub(crate) name: Option<CompactString>,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, src: &str, span: (usize, usize)) -> Self {
        Self {
            kind,
            src: src.to_owned(),
            span: span.into(),
            name: None,
        }
    }

    /// Attach the name of the template being compiled, for error reporting.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<CompactString>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn template_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ParseErrorKind {
    #[error("unterminated `@{0}` block")]
    UnterminatedBlock(&'static str),

    #[error("`@{0}` with no matching open block")]
    UnexpectedClose(&'static str),

    #[error("`@{found}` cannot close a `@{open}` block")]
    MismatchedClose {
        found: &'static str,
        open: &'static str,
    },

    #[error("`@else` outside of an `@if` block")]
    ElseOutsideIf,

    #[error("second `@else` in the same `@if` block")]
    DuplicateElse,

    #[error("malformed `@loop` directive, expected `@loop name=\"X\" as=\"item\"`")]
    MalformedLoop,

    #[error("malformed `@if` directive, expected `@if path` or `@if !path`")]
    MalformedIf,

    #[error("unknown `@{0}` directive")]
    UnknownDirective(CompactString),

    #[error("directive comment is never closed with `-->`")]
    UnterminatedComment,
}

/// Template source storage failed.
#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("template `{0}` not found")]
    NotFound(CompactString),

    #[error("invalid template name `{0}`")]
    InvalidName(CompactString),

    #[error("failed to access template storage: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure surfaced by [`Engine`](crate::Engine) operations.
#[derive(Debug, Diagnostic, ThisError)]
pub enum EngineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
