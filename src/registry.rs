//! Citation style and locale registry.
//!
//! Holds named style and locale definitions as opaque JSON documents and
//! resolves style requests through a fail-soft fallback chain. A registry
//! is plain owned data; construct one, seed it, and hand it to whatever
//! formats citations.

use std::collections::BTreeMap;

use serde_json::Value;

/// Style code tried when neither the requested nor the configured default
/// style is registered.
pub const FALLBACK_STYLE_CODE: &str = "apa";

#[derive(Debug, Clone)]
struct RegistryEntry {
    description: String,
    document: Value,
}

/// Registry of citation styles and locales, keyed by code.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    styles: BTreeMap<String, RegistryEntry>,
    locales: BTreeMap<String, RegistryEntry>,
    default_style: Option<String>,
}

impl StyleRegistry {
    /// Creates an empty registry with no configured default style.
    pub fn new() -> Self {
        StyleRegistry::default()
    }

    /// Sets the default style code used when a requested style is absent.
    pub fn with_default(mut self, code: &str) -> Self {
        self.default_style = Some(code.to_string());
        self
    }

    pub fn set_default_style(&mut self, code: &str) {
        self.default_style = Some(code.to_string());
    }

    pub fn default_style(&self) -> Option<&str> {
        self.default_style.as_deref()
    }

    /// Registers a style definition under `code`.
    ///
    /// Re-registering an existing code replaces both the description and
    /// the document. The document is not validated here; a bad definition
    /// surfaces when a rendering engine first consumes it.
    pub fn install_style(&mut self, code: &str, description: &str, document: Value) {
        self.styles.insert(
            code.to_string(),
            RegistryEntry {
                description: description.to_string(),
                document,
            },
        );
    }

    /// Registers a locale definition under `code`. Same replacement
    /// semantics as [`install_style`](Self::install_style).
    pub fn install_locale(&mut self, code: &str, description: &str, document: Value) {
        self.locales.insert(
            code.to_string(),
            RegistryEntry {
                description: description.to_string(),
                document,
            },
        );
    }

    /// Lists registered styles as code → description.
    ///
    /// Documents are deliberately withheld; they are only reachable through
    /// [`style_document`](Self::style_document).
    pub fn styles(&self) -> BTreeMap<String, String> {
        self.styles
            .iter()
            .map(|(code, entry)| (code.clone(), entry.description.clone()))
            .collect()
    }

    /// Lists registered locales as code → description.
    pub fn locales(&self) -> BTreeMap<String, String> {
        self.locales
            .iter()
            .map(|(code, entry)| (code.clone(), entry.description.clone()))
            .collect()
    }

    /// Looks up a style document by exact code.
    pub fn style_document(&self, code: &str) -> Option<&Value> {
        self.styles.get(code).map(|entry| &entry.document)
    }

    /// Looks up a locale document by exact code.
    pub fn locale_document(&self, code: &str) -> Option<&Value> {
        self.locales.get(code).map(|entry| &entry.document)
    }

    /// Resolves a style request through the fallback chain.
    ///
    /// Tries the requested code, then the configured default, then
    /// [`FALLBACK_STYLE_CODE`]. Returns the code that matched together with
    /// its document, or `None` when the whole chain misses.
    pub fn resolve_style(&self, requested: Option<&str>) -> Option<(&str, &Value)> {
        requested
            .into_iter()
            .chain(self.default_style.as_deref())
            .chain(std::iter::once(FALLBACK_STYLE_CODE))
            .find_map(|code| {
                self.styles
                    .get_key_value(code)
                    .map(|(key, entry)| (key.as_str(), &entry.document))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn style_doc(name: &str) -> Value {
        json!({ "style": name })
    }

    #[test]
    fn test_install_style_then_lookup() {
        // Given: An empty registry
        let mut registry = StyleRegistry::new();

        // When: We install a style
        registry.install_style("apa", "APA 7th edition", style_doc("apa"));

        // Then: The document is retrievable by code
        assert_eq!(registry.style_document("apa"), Some(&style_doc("apa")));
        assert_eq!(registry.style_document("mla"), None);
    }

    #[test]
    fn test_reinstall_replaces_description_and_document() {
        // Given: A registry with a style installed
        let mut registry = StyleRegistry::new();
        registry.install_style("apa", "old", style_doc("v1"));

        // When: We install the same code again
        registry.install_style("apa", "new", style_doc("v2"));

        // Then: The latest registration wins
        assert_eq!(registry.styles().get("apa").map(String::as_str), Some("new"));
        assert_eq!(registry.style_document("apa"), Some(&style_doc("v2")));
    }

    #[test]
    fn test_listings_carry_descriptions_only() {
        let mut registry = StyleRegistry::new();
        registry.install_style("apa", "APA", style_doc("apa"));
        registry.install_locale("en-GB", "British English", json!({ "locale": "en-GB" }));

        let styles = registry.styles();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles.get("apa").map(String::as_str), Some("APA"));

        let locales = registry.locales();
        assert_eq!(locales.get("en-GB").map(String::as_str), Some("British English"));
    }

    #[test]
    fn test_styles_and_locales_are_separate_namespaces() {
        let mut registry = StyleRegistry::new();
        registry.install_locale("apa", "not a style", json!({}));
        assert!(registry.style_document("apa").is_none());
        assert!(registry.locale_document("apa").is_some());
    }

    #[test]
    fn test_resolve_prefers_requested_code() {
        let mut registry = StyleRegistry::new().with_default("mla");
        registry.install_style("apa", "APA", style_doc("apa"));
        registry.install_style("mla", "MLA", style_doc("mla"));
        registry.install_style("chicago", "Chicago", style_doc("chicago"));

        let (code, doc) = registry.resolve_style(Some("chicago")).unwrap();
        assert_eq!(code, "chicago");
        assert_eq!(doc, &style_doc("chicago"));
    }

    #[test]
    fn test_resolve_falls_back_to_configured_default() {
        // Given: A registry whose default is registered but the request is not
        let mut registry = StyleRegistry::new().with_default("mla");
        registry.install_style("mla", "MLA", style_doc("mla"));

        // When: We resolve an unknown code
        let (code, _) = registry.resolve_style(Some("vancouver")).unwrap();

        // Then: The configured default is used
        assert_eq!(code, "mla");
    }

    #[test]
    fn test_resolve_falls_back_to_apa() {
        // Given: Neither the request nor the default is registered
        let mut registry = StyleRegistry::new().with_default("mla");
        registry.install_style("apa", "APA", style_doc("apa"));

        // When/Then: Resolution lands on the hardwired fallback
        let (code, _) = registry.resolve_style(Some("vancouver")).unwrap();
        assert_eq!(code, FALLBACK_STYLE_CODE);

        // And a request of None takes the same path
        let (code, _) = registry.resolve_style(None).unwrap();
        assert_eq!(code, FALLBACK_STYLE_CODE);
    }

    #[test]
    fn test_resolve_exhausted_chain_is_none() {
        let registry = StyleRegistry::new().with_default("mla");
        assert!(registry.resolve_style(Some("vancouver")).is_none());
    }
}
