use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    context::{DataContext, RenderData, Resolved},
    helpers::{HelperContext, HelperRegistry},
    template::{CompiledTemplate, Node},
};

/// Walks a compiled tree against a data context, producing the output string.
///
/// Rendering is a pure function of `(template, data)` apart from helpers
/// that read the clock; it never mutates shared state and never fails:
/// resolution gaps render as empty output and are logged as warnings.
pub struct Renderer<'h> {
    helpers: &'h HelperRegistry,
}

impl<'h> Renderer<'h> {
    pub fn new(helpers: &'h HelperRegistry) -> Self {
        Self { helpers }
    }

    pub fn render(&self, template: &CompiledTemplate, data: &RenderData) -> String {
        let mut out = String::with_capacity(literal_len(template.nodes()));
        let mut ctx = DataContext::new(data);
        self.render_nodes(template.nodes(), &mut ctx, &mut out);
        out
    }

    fn render_nodes<'a>(&self, nodes: &'a [Node], ctx: &mut DataContext<'a>, out: &mut String) {
        for node in nodes {
            match node {
                Node::Literal(text) => out.push_str(text),
                Node::Placeholder { path, raw } => {
                    self.render_placeholder(path, *raw, ctx, out);
                }
                Node::Loop {
                    collection,
                    alias,
                    body,
                } => match ctx.resolve(collection) {
                    Some(Resolved::Value(Value::Array(items))) => {
                        for (index, item) in items.iter().enumerate() {
                            ctx.push_loop(alias, item, index);
                            self.render_nodes(body, ctx, out);
                            ctx.pop_loop();
                        }
                    }
                    Some(_) => {
                        warn!("loop over `{collection}` skipped: value is not an array");
                    }
                    None => {
                        debug!("loop over `{collection}` skipped: path did not resolve");
                    }
                },
                Node::Conditional {
                    path,
                    negate,
                    then_body,
                    else_body,
                } => {
                    let truthy = is_truthy(ctx.resolve(path)) != *negate;
                    let body = if truthy { then_body } else { else_body };
                    self.render_nodes(body, ctx, out);
                }
            }
        }
    }

    fn render_placeholder(&self, path: &str, raw: bool, ctx: &DataContext<'_>, out: &mut String) {
        // Registered helper names win over data lookup for the exact path.
        if let Some(helper) = self.helpers.get(path) {
            match helper(&HelperContext::new(ctx)) {
                Some(value) => append(&value, raw, out),
                None => debug!("helper `{path}` produced no value"),
            }
            return;
        }

        match ctx.resolve(path) {
            Some(Resolved::Index(index)) => append(itoa(index).as_str(), raw, out),
            Some(Resolved::Value(value)) => match value {
                Value::Null => {}
                Value::String(s) => append(s, raw, out),
                Value::Number(n) => append(&n.to_string(), raw, out),
                Value::Bool(b) => append(if *b { "true" } else { "false" }, raw, out),
                Value::Array(_) | Value::Object(_) => {
                    warn!("placeholder `{path}` resolved to a non-scalar value, emitting nothing");
                }
            },
            None => {
                warn!("placeholder `{path}` did not resolve, emitting empty string");
            }
        }
    }
}

fn append(value: &str, raw: bool, out: &mut String) {
    if raw {
        out.push_str(value);
    } else {
        escape_into(value, out);
    }
}

fn itoa(index: usize) -> compact_str::CompactString {
    compact_str::ToCompactString::to_compact_string(&index)
}

/// Standard falsy rules: `false`, `null`, `0`, `""`, `[]` and a missing path
/// are false; everything else, including `{}`, is true.
fn is_truthy(resolved: Option<Resolved<'_>>) -> bool {
    match resolved {
        None => false,
        Some(Resolved::Index(index)) => index != 0,
        Some(Resolved::Value(value)) => match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(_) => true,
        },
    }
}

/// HTML-escape `& < > " '` into `out`.
fn escape_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// HTML-escape a value the way non-raw placeholders do.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_into(value, &mut out);
    out
}

fn literal_len(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Literal(text) => text.len(),
            Node::Placeholder { .. } => 0,
            Node::Loop { body, .. } => literal_len(body),
            Node::Conditional {
                then_body,
                else_body,
                ..
            } => literal_len(then_body).max(literal_len(else_body)),
        })
        .sum()
}
