//! Declarative HTML template processing.
//!
//! Vellum takes stored HTML containing placeholder and loop/conditional
//! directives, combines it with a structured runtime data payload, and
//! renders final HTML. The directive language intentionally has no
//! arithmetic, function calls or external I/O: templates can substitute,
//! iterate and branch, nothing else.
//!
//! # Syntax
//!
//! ```html
//! <h1>[data-v-site.name]</h1>
//! <div>[data-v-embed.html:raw]</div>
//! <ul>
//!   <!-- @loop name="categories" as="c" -->
//!   <li>[data-v-c.name]</li>
//!   <!-- @endloop -->
//! </ul>
//! <!-- @if user.isAuthenticated -->Hi<!-- @else -->Guest<!-- @endif -->
//! ```
//!
//! `[data-v-<dotted.path>]` substitutes a value resolved against the data
//! context, HTML-escaped; the `:raw` suffix skips escaping and is intended
//! only for pre-sanitized engine-controlled fragments. Bracket runs that do
//! not match the `data-v-` prefix, and ordinary HTML comments, pass through
//! unchanged. Missing paths render as the empty string; malformed or
//! unterminated directives are compile errors.
//!
//! # Usage
//!
//! Compile once, render against any number of payloads:
//!
//! ```
//! use vellum::{CompiledTemplate, HelperRegistry, RenderData, Renderer};
//!
//! let template = CompiledTemplate::parse("<h1>[data-v-site.name]</h1>").unwrap();
//! let data: RenderData = serde_json::from_value(serde_json::json!({
//!     "global": { "site": { "name": "Acme" } }
//! }))
//! .unwrap();
//!
//! let html = Renderer::new(&HelperRegistry::new()).render(&template, &data);
//! assert_eq!(html, "<h1>Acme</h1>");
//! ```
//!
//! …or let an [`Engine`] manage storage and the compiled-template cache:
//!
//! ```
//! use vellum::{Engine, MemoryStore, RenderData};
//!
//! let engine = Engine::new(MemoryStore::with_templates([(
//!     "greeting",
//!     "Hello [data-v-name]!",
//! )]));
//! let data: RenderData = serde_json::from_value(serde_json::json!({
//!     "request": { "name": "world" }
//! }))
//! .unwrap();
//!
//! assert_eq!(engine.render("greeting", &data).unwrap(), "Hello world!");
//! ```
//!
//! # Data context
//!
//! Lookup walks a scope chain from innermost to outermost: loop scopes
//! (the item under its alias, plus a 0-based `index`), then the request
//! scope, then the global scope. Registered helper names — `year`, `csrf`
//! and `base_url` out of the box — win over data lookup for their exact
//! path.
//!
//! # Errors
//!
//! Compiling returns a [`ParseError`] (a miette diagnostic pointing at the
//! offending directive) for malformed or unbalanced directives. Rendering
//! itself never fails: resolution gaps degrade to empty output and are
//! logged as `tracing` warnings.

#[doc(inline)]
pub use cache::TemplateCache;
#[doc(inline)]
pub use context::{DataContext, RenderData, Resolved};
#[doc(inline)]
pub use engine::Engine;
#[doc(inline)]
pub use error::{EngineError, ParseError, ParseErrorKind, StoreError};
#[doc(inline)]
pub use helpers::{HelperContext, HelperFn, HelperRegistry};
#[doc(inline)]
pub use render::{escape_html, Renderer};
#[doc(inline)]
pub use store::{Fingerprint, FsStore, MemoryStore, TemplateMeta, TemplateStore};
#[doc(inline)]
pub use template::{CompiledTemplate, Node};

mod cache;
mod context;
mod engine;
mod error;
mod helpers;
mod parser;
mod render;
mod scanner;
mod store;
mod template;
