use tracing::debug;

use crate::{
    cache::TemplateCache,
    context::RenderData,
    error::{EngineError, ParseError, StoreError},
    helpers::HelperRegistry,
    render::Renderer,
    store::{TemplateMeta, TemplateStore},
    template::CompiledTemplate,
};

/// One template engine instance: a store, a compiled-template cache and a
/// helper registry.
///
/// Owns its cache rather than sharing module-level state, so multiple
/// engines (e.g. per tenant) coexist without interference. All methods take
/// `&self`; an `Engine` can be shared across threads behind an `Arc`.
pub struct Engine {
    store: Box<dyn TemplateStore>,
    cache: TemplateCache,
    helpers: HelperRegistry,
}

impl Engine {
    pub fn new(store: impl TemplateStore + 'static) -> Self {
        Self::with_helpers(store, HelperRegistry::new())
    }

    pub fn with_helpers(store: impl TemplateStore + 'static, helpers: HelperRegistry) -> Self {
        Self {
            store: Box::new(store),
            cache: TemplateCache::new(),
            helpers,
        }
    }

    /// Render a stored template against a data payload.
    ///
    /// Compiles through the cache: an unchanged fingerprint serves the
    /// cached tree, a changed one recompiles, and a compile failure is
    /// surfaced on every call until the source is fixed without evicting
    /// the previous good entry.
    pub fn render(&self, name: &str, data: &RenderData) -> Result<String, EngineError> {
        // The store hands back text and fingerprint together; on a cache
        // hit the freshly read text is simply dropped.
        let (text, fingerprint) = self.store.load(name)?;
        let template = self.cache.get_or_compile(name, &fingerprint, || Ok(text))?;
        debug!("rendering template `{name}`");
        Ok(Renderer::new(&self.helpers).render(&template, data))
    }

    /// Compile and render raw source without touching the store or cache.
    pub fn render_source(&self, source: &str, data: &RenderData) -> Result<String, ParseError> {
        let template = CompiledTemplate::parse(source)?;
        Ok(Renderer::new(&self.helpers).render(&template, data))
    }

    /// Evict one cached template, or all of them.
    pub fn clear_cache(&self, name: Option<&str>) {
        self.cache.clear(name);
    }

    /// Write template source to the store and drop the stale cache entry.
    pub fn save_template(&self, name: &str, text: &str) -> Result<(), StoreError> {
        self.store.save(name, text)?;
        self.cache.clear(Some(name));
        Ok(())
    }

    pub fn delete_template(&self, name: &str) -> Result<(), StoreError> {
        self.store.delete(name)?;
        self.cache.clear(Some(name));
        Ok(())
    }

    pub fn list_templates(&self) -> Result<Vec<TemplateMeta>, StoreError> {
        self.store.list()
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    pub fn helpers_mut(&mut self) -> &mut HelperRegistry {
        &mut self.helpers
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }
}
