use std::collections::HashMap;

use chrono::{Datelike, Utc};
use compact_str::{CompactString, ToCompactString};
use serde_json::Value;

use crate::context::{DataContext, Resolved};

/// An engine-supplied named value, resolved ahead of ordinary data lookup
/// when a placeholder path matches the helper name exactly.
pub type HelperFn = dyn Fn(&HelperContext<'_, '_>) -> Option<CompactString> + Send + Sync;

/// Read-only view of the data context handed to helpers, so helpers like
/// `csrf` can pull engine-assembled values out of the request scope.
pub struct HelperContext<'c, 'a> {
    ctx: &'c DataContext<'a>,
}

impl<'c, 'a> HelperContext<'c, 'a> {
    pub(crate) fn new(ctx: &'c DataContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn resolve(&self, path: &str) -> Option<Resolved<'a>> {
        self.ctx.resolve(path)
    }

    /// Resolve a path to a string-able scalar, or `None`.
    pub fn resolve_str(&self, path: &str) -> Option<CompactString> {
        match self.resolve(path)? {
            Resolved::Value(Value::String(s)) => Some(s.as_str().into()),
            Resolved::Value(Value::Number(n)) => Some(n.to_compact_string()),
            Resolved::Index(index) => Some(index.to_compact_string()),
            _ => None,
        }
    }
}

/// Named helpers consulted before data lookup for placeholder paths.
pub struct HelperRegistry {
    helpers: HashMap<CompactString, Box<HelperFn>>,
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperRegistry {
    /// A registry with the built-in helpers: `year` (current UTC year),
    /// `csrf` (the request's `csrf_token`) and `base_url`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("year", |_: &HelperContext<'_, '_>| {
            Some(Utc::now().year().to_compact_string())
        });
        registry.register("csrf", |helper: &HelperContext<'_, '_>| {
            helper.resolve_str("csrf_token")
        });
        registry.register("base_url", |helper: &HelperContext<'_, '_>| {
            helper.resolve_str("base_url")
        });
        registry
    }

    pub fn empty() -> Self {
        Self {
            helpers: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: impl Into<CompactString>, helper: F)
    where
        F: Fn(&HelperContext<'_, '_>) -> Option<CompactString> + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Box::new(helper));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.helpers.keys().map(CompactString::as_str)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&HelperFn> {
        self.helpers.get(name).map(Box::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderData;
    use serde_json::json;

    #[test]
    fn year_helper_returns_current_year() {
        let registry = HelperRegistry::new();
        let data = RenderData::default();
        let ctx = DataContext::new(&data);
        let year = registry.get("year").unwrap()(&HelperContext::new(&ctx)).unwrap();
        assert_eq!(year, Utc::now().year().to_compact_string());
    }

    #[test]
    fn csrf_helper_reads_the_request_scope() {
        let registry = HelperRegistry::new();
        let data = RenderData::new(Value::Null, json!({ "csrf_token": "tok-123" }));
        let ctx = DataContext::new(&data);
        let token = registry.get("csrf").unwrap()(&HelperContext::new(&ctx));
        assert_eq!(token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn csrf_helper_without_token_yields_none() {
        let registry = HelperRegistry::new();
        let data = RenderData::default();
        let ctx = DataContext::new(&data);
        assert_eq!(registry.get("csrf").unwrap()(&HelperContext::new(&ctx)), None);
    }

    #[test]
    fn custom_helpers_can_be_registered() {
        let mut registry = HelperRegistry::empty();
        registry.register("shop_version", |_: &HelperContext<'_, '_>| {
            Some("2.4.0".into())
        });
        assert!(registry.contains("shop_version"));
        assert!(!registry.contains("year"));
    }
}
