//! Host-side callbacks for panel interactions.
//!
//! The panel never performs navigation, content generation, or any other
//! application work itself. Interactions that leave the panel are reported
//! through the [`PanelHost`] trait, and the embedding application decides
//! what to do with them. All methods have empty default implementations so
//! hosts only implement the callbacks they care about.

use crate::panel::ResultEntry;

/// Receiver for interactions the panel cannot handle on its own.
pub trait PanelHost {
    /// Called when an anchor inside the panel is activated.
    ///
    /// # Arguments
    ///
    /// * `href` - The anchor's link target
    /// * `target` - The anchor's window target, if any
    fn activate_link(&self, _href: &str, _target: Option<&str>) {}

    /// Called when the source icon of a result is activated.
    fn activate_source(&self, _entry: &ResultEntry) {}

    /// Called when the author avatar of a result is activated.
    fn activate_author(&self, _entry: &ResultEntry) {}

    /// Called when a result header is activated.
    ///
    /// Returns whether the panel should toggle the result's body now. A
    /// host that needs to generate content first can return `false` and
    /// toggle later through [`crate::panel::Panel::toggle_slide`].
    fn toggle_content(&self, _entry: &ResultEntry) -> bool {
        true
    }

    /// Called just before a result's body is revealed.
    fn result_opened(&self, _entry: &ResultEntry) {}

    /// Called just after a result's body is hidden.
    fn result_closed(&self, _entry: &ResultEntry) {}
}

/// Host that ignores every interaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl NoopHost {
    pub fn new() -> Self {
        Self
    }
}

impl PanelHost for NoopHost {}

/// Host that logs every interaction through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHost;

impl TracingHost {
    pub fn new() -> Self {
        Self
    }
}

impl PanelHost for TracingHost {
    fn activate_link(&self, href: &str, target: Option<&str>) {
        tracing::info!(href = href, target = target, "Link activated");
    }

    fn activate_source(&self, entry: &ResultEntry) {
        tracing::info!(result = %entry.id, "Source activated");
    }

    fn activate_author(&self, entry: &ResultEntry) {
        tracing::info!(result = %entry.id, "Author activated");
    }

    fn toggle_content(&self, entry: &ResultEntry) -> bool {
        tracing::info!(result = %entry.id, "Content toggle requested");
        true
    }

    fn result_opened(&self, entry: &ResultEntry) {
        tracing::info!(result = %entry.id, "Result opened");
    }

    fn result_closed(&self, entry: &ResultEntry) {
        tracing::info!(result = %entry.id, "Result closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> ResultEntry {
        ResultEntry {
            id: id.to_string(),
            ..ResultEntry::default()
        }
    }

    #[test]
    fn test_noop_host_accepts_every_callback() {
        // Given the no-op host
        let host = NoopHost::new();
        let e = entry("r1");

        // When invoking every callback
        host.activate_link("http://example.com", None);
        host.activate_source(&e);
        host.activate_author(&e);
        host.result_opened(&e);
        host.result_closed(&e);

        // Then toggle requests are approved by default
        assert!(host.toggle_content(&e));
    }

    #[test]
    fn test_default_toggle_content_approves() {
        // Given a host that overrides nothing
        struct Silent;
        impl PanelHost for Silent {}

        // When a toggle is requested
        let approved = Silent.toggle_content(&entry("r1"));

        // Then the panel is told to toggle immediately
        assert!(approved);
    }

    #[test]
    fn test_tracing_host_approves_toggles() {
        // Given the tracing host
        let host = TracingHost::new();

        // When a toggle is requested
        let approved = host.toggle_content(&entry("r1"));

        // Then it logs and approves
        assert!(approved);
    }
}
