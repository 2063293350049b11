//! Citation engine contract.
//!
//! The engine that actually renders CSL is external; this module pins down
//! the narrow surface the formatter drives: open a session against a style
//! and a data source, declare items, ask for a bibliography.

use serde_json::Value;
use thiserror::Error;

/// Mode string an engine substitutes wherever a citation label belongs in
/// its output. Kept bit-exact; the post-processing step searches for it.
pub const LABEL_PLACEHOLDER: &str = "CITATION_LABEL";

/// Failure reported by a citation engine. Engine internals are opaque, so
/// their errors travel as text.
#[derive(Error, Debug)]
#[error("citation engine error: {0}")]
pub struct EngineError(pub String);

/// Result of a bibliography render: engine metadata plus one markup
/// fragment per formatted entry, in item order.
#[derive(Debug, Clone)]
pub struct Bibliography {
    pub meta: Value,
    pub entries: Vec<String>,
}

/// Data an engine pulls on demand while formatting.
pub trait ItemDataSource {
    /// Locale definition for a language tag, if one is registered.
    fn retrieve_locale(&self, name: &str) -> Option<&Value>;

    /// Item metadata by id.
    fn retrieve_item(&self, id: &str) -> Option<&Value>;

    /// Abbreviation table for the named list. Engines accept an empty
    /// object, which is the default.
    fn abbreviations(&self, _name: &str) -> Value {
        Value::Object(serde_json::Map::new())
    }
}

/// A configured engine able to open formatting sessions.
pub trait CitationEngine {
    /// Opens a session for one style and output locale over `source`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine rejects the style or locale.
    fn open<'a>(
        &'a self,
        style: &'a Value,
        locale: &str,
        source: &'a dyn ItemDataSource,
    ) -> Result<Box<dyn EngineSession + 'a>, EngineError>;
}

/// One open formatting session.
pub trait EngineSession {
    /// Declares the items subsequent renders cover. `rebuild` forces the
    /// engine to recompute its disambiguation state from scratch.
    fn update_items(&mut self, ids: &[&str], rebuild: bool) -> Result<(), EngineError>;

    /// Renders the bibliography for the declared items. `mode` selects a
    /// placeholder convention such as [`LABEL_PLACEHOLDER`]; `None` renders
    /// the style's own numbering.
    fn make_bibliography(&mut self, mode: Option<&str>) -> Result<Bibliography, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptySource;

    impl ItemDataSource for EmptySource {
        fn retrieve_locale(&self, _name: &str) -> Option<&Value> {
            None
        }

        fn retrieve_item(&self, _id: &str) -> Option<&Value> {
            None
        }
    }

    #[test]
    fn test_default_abbreviations_is_empty_object() {
        let source = EmptySource;
        assert_eq!(
            source.abbreviations("default"),
            Value::Object(serde_json::Map::new())
        );
    }

    #[test]
    fn test_engine_error_displays_message() {
        let err = EngineError("style rejected".to_string());
        assert_eq!(err.to_string(), "citation engine error: style rejected");
    }
}
