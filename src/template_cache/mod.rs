//! Per-locale template cache documents.
//!
//! One document is kept per locale plus one culture neutral document, all in
//! the engine base directory:
//!
//! ```json
//! {
//!   "cacheVersion": "1.0.0.0",
//!   "templateInfo": [ { "identity": "...", "name": "..." } ]
//! }
//! ```
//!
//! A locale's first document is a clone of the neutral document. After that
//! every write is a full merge of the new scan over the previous document.

mod cache;
mod manager;

pub use cache::TemplateCache;
pub use manager::{TemplateCacheManager, localizations_from_templates, merge_templates};
