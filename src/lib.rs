//! citeview: citation formatting and results panel glue for embedded document viewers.
//!
//! This library provides functionality to:
//! - Maintain a registry of CSL styles and locales
//! - Format bibliography records into inline citation markup
//! - Mirror a stream of result events into a results panel DOM
//! - Restructure host content with expandable and read-more sections
//! - Report panel interactions back to the embedding application

pub mod content;
pub mod dom;
pub mod engine;
pub mod formatter;
pub mod host;
pub mod markup;
pub mod panel;
pub mod registry;
pub mod template;

pub use content::process_new_content;
pub use dom::{Document, NodeId, SpinnerState};
pub use engine::{Bibliography, CitationEngine, EngineError, EngineSession, ItemDataSource};
pub use formatter::{format_citation, FormatError};
pub use host::{NoopHost, PanelHost, TracingHost};
pub use panel::{
    Effect, EffectKind, Panel, PanelConfig, PanelError, PanelEvent, ResultEntry,
};
pub use registry::StyleRegistry;
pub use template::{builtin_template, load_template, TemplateError};
