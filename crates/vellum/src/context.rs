use serde::Deserialize;
use serde_json::Value;

/// The data payload for one render call.
///
/// `global` holds per-site data supplied once per render (site settings,
/// authenticated user, locale, theme); `request` holds per-request data
/// (SEO overrides, form state, named collections, CSRF token, base URL).
/// The request scope shadows the global scope.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderData {
    pub global: Value,
    pub request: Value,
}

impl RenderData {
    pub fn new(global: Value, request: Value) -> Self {
        Self { global, request }
    }
}

/// A layered scope chain for dotted-path lookup.
///
/// Scopes are read-only views constructed fresh per render call. Loop frames
/// are pushed on loop entry and popped on exit, so iteration cost stays
/// linear in collection size.
pub struct DataContext<'a> {
    scopes: Vec<Scope<'a>>,
}

#[derive(Clone, Copy, Debug)]
enum Scope<'a> {
    Object(&'a Value),
    Loop {
        alias: &'a str,
        item: &'a Value,
        index: usize,
    },
}

/// The result of a successful path lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolved<'a> {
    Value(&'a Value),
    /// The implicit 0-based `index` binding of a loop scope.
    Index(usize),
}

impl<'a> DataContext<'a> {
    pub fn new(data: &'a RenderData) -> Self {
        Self {
            scopes: vec![Scope::Object(&data.global), Scope::Object(&data.request)],
        }
    }

    pub(crate) fn push_loop(&mut self, alias: &'a str, item: &'a Value, index: usize) {
        self.scopes.push(Scope::Loop { alias, item, index });
    }

    pub(crate) fn pop_loop(&mut self) {
        debug_assert!(matches!(self.scopes.last(), Some(Scope::Loop { .. })));
        self.scopes.pop();
    }

    /// Resolve a dotted path against the scope chain, innermost first.
    ///
    /// A scope matches when the first path segment resolves in it; the rest
    /// of the path is then walked inside that scope only, so a partial miss
    /// does not fall through to outer scopes.
    pub fn resolve(&self, path: &str) -> Option<Resolved<'a>> {
        let mut segments = path.split('.');
        let head = segments.next()?;

        for scope in self.scopes.iter().rev() {
            match *scope {
                Scope::Loop { alias, item, index } => {
                    if head == alias {
                        return walk(item, segments.clone()).map(Resolved::Value);
                    }
                    if head == "index" && segments.clone().next().is_none() {
                        return Some(Resolved::Index(index));
                    }
                }
                Scope::Object(value) => {
                    if let Value::Object(map) = value {
                        if let Some(v) = map.get(head) {
                            return walk(v, segments.clone()).map(Resolved::Value);
                        }
                    }
                }
            }
        }

        None
    }
}

/// Iterative walk through nested objects and arrays-by-index.
fn walk<'v, 'p>(
    mut value: &'v Value,
    segments: impl Iterator<Item = &'p str>,
) -> Option<&'v Value> {
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}
