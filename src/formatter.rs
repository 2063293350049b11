//! Citation formatting.
//!
//! Drives an external citation engine for one metadata record at a time:
//! resolve the style, open a session, render, then post-process the
//! fragment (label injection or removal, block-to-inline rewrite).

use serde_json::Value;
use thiserror::Error;

use crate::engine::{CitationEngine, EngineError, ItemDataSource, LABEL_PLACEHOLDER};
use crate::markup::{apply_label, inline_fragment, strip_label};
use crate::registry::StyleRegistry;

/// Output locale every session is opened with. Rendering language follows
/// the style and the registered locale data, not the host environment.
pub const OUTPUT_LOCALE: &str = "en-GB";

/// Errors that can occur while formatting a citation.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("formatting failed: {0}")]
    Engine(#[from] EngineError),
}

/// Adapter the engine pulls data through: locales come from the registry,
/// item lookup always yields the one record being formatted.
struct SingleRecordSource<'a> {
    registry: &'a StyleRegistry,
    record: &'a Value,
}

impl ItemDataSource for SingleRecordSource<'_> {
    fn retrieve_locale(&self, name: &str) -> Option<&Value> {
        self.registry.locale_document(name)
    }

    fn retrieve_item(&self, _id: &str) -> Option<&Value> {
        Some(self.record)
    }
}

/// Formats one metadata record as an inline citation fragment.
///
/// The record is CSL-JSON. A missing, null or empty `id` is filled in from
/// the record's `label` field (or the empty string) before the engine sees
/// it; that mutation is kept on the record. A non-empty `citation-label`
/// string field switches the render to label mode: the engine is asked to
/// emit [`LABEL_PLACEHOLDER`] and every occurrence is replaced with the
/// label in bold. Without one, stray placeholders are stripped instead.
///
/// # Arguments
///
/// * `registry` - Style and locale definitions
/// * `engine` - The citation engine to drive
/// * `record` - The CSL-JSON metadata record
/// * `style` - Requested style code; resolution falls back per
///   [`StyleRegistry::resolve_style`]
///
/// # Returns
///
/// The rendered fragment with block wrappers rewritten to inline form, or
/// an empty string when no style resolves or the engine yields no entries.
///
/// # Errors
///
/// Returns [`FormatError::Engine`] when the engine rejects the session or
/// fails to render.
pub fn format_citation<E: CitationEngine>(
    registry: &StyleRegistry,
    engine: &E,
    record: &mut Value,
    style: Option<&str>,
) -> Result<String, FormatError> {
    let id = ensure_record_id(record);
    let label = record
        .get("citation-label")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let Some((style_code, style_doc)) = registry.resolve_style(style) else {
        tracing::warn!(requested = style.unwrap_or_default(), "no citation style resolved");
        return Ok(String::new());
    };
    tracing::debug!(style = style_code, item = %id, labeled = label.is_some(), "formatting citation");

    let source = SingleRecordSource {
        registry,
        record: &*record,
    };
    let mut session = engine.open(style_doc, OUTPUT_LOCALE, &source)?;
    session.update_items(&[id.as_str()], true)?;
    let mode = label.as_deref().map(|_| LABEL_PLACEHOLDER);
    let bibliography = session.make_bibliography(mode)?;

    let Some(fragment) = bibliography.entries.first() else {
        tracing::warn!(item = %id, "engine rendered no entries");
        return Ok(String::new());
    };

    let fragment = match &label {
        Some(label) => apply_label(fragment, LABEL_PLACEHOLDER, label),
        None => strip_label(fragment, LABEL_PLACEHOLDER),
    };
    Ok(inline_fragment(&fragment))
}

/// Returns the record's id, filling it in from `label` (or the empty
/// string) when missing. Numeric ids are used via their decimal form.
fn ensure_record_id(record: &mut Value) -> String {
    match record.get("id") {
        Some(Value::String(s)) if !s.is_empty() => return s.clone(),
        Some(Value::Number(n)) => return n.to_string(),
        _ => {}
    }
    let fallback = record
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    record["id"] = Value::String(fallback.clone());
    fallback
}
