//! Shared helpers for integration tests.

use std::cell::RefCell;

use citeview::{Panel, PanelConfig, PanelHost, ResultEntry};

/// Host double that records every callback for later assertions.
///
/// `toggle_content` replies with `approve_toggle`, so tests can model both
/// hosts that let the panel toggle immediately and hosts that defer.
pub struct RecordingHost {
    pub links: RefCell<Vec<(String, Option<String>)>>,
    pub sources: RefCell<Vec<String>>,
    pub authors: RefCell<Vec<String>>,
    pub toggles: RefCell<Vec<String>>,
    pub opened: RefCell<Vec<String>>,
    pub closed: RefCell<Vec<String>>,
    approve_toggle: bool,
}

impl RecordingHost {
    /// A host that approves every toggle request.
    pub fn new() -> Self {
        Self {
            links: RefCell::new(Vec::new()),
            sources: RefCell::new(Vec::new()),
            authors: RefCell::new(Vec::new()),
            toggles: RefCell::new(Vec::new()),
            opened: RefCell::new(Vec::new()),
            closed: RefCell::new(Vec::new()),
            approve_toggle: true,
        }
    }

    /// A host that records toggle requests but defers them.
    pub fn deferring() -> Self {
        Self {
            approve_toggle: false,
            ..Self::new()
        }
    }
}

impl PanelHost for RecordingHost {
    fn activate_link(&self, href: &str, target: Option<&str>) {
        self.links
            .borrow_mut()
            .push((href.to_string(), target.map(String::from)));
    }

    fn activate_source(&self, entry: &ResultEntry) {
        self.sources.borrow_mut().push(entry.id.clone());
    }

    fn activate_author(&self, entry: &ResultEntry) {
        self.authors.borrow_mut().push(entry.id.clone());
    }

    fn toggle_content(&self, entry: &ResultEntry) -> bool {
        self.toggles.borrow_mut().push(entry.id.clone());
        self.approve_toggle
    }

    fn result_opened(&self, entry: &ResultEntry) {
        self.opened.borrow_mut().push(entry.id.clone());
    }

    fn result_closed(&self, entry: &ResultEntry) {
        self.closed.borrow_mut().push(entry.id.clone());
    }
}

/// Build a result entry with the given id and weight.
pub fn entry(id: &str, weight: i32) -> ResultEntry {
    ResultEntry {
        id: id.to_string(),
        title: format!("Title {}", id),
        weight,
        ..ResultEntry::default()
    }
}

/// Build a panel over the builtin template with default settings.
pub fn new_panel<H: PanelHost>(host: H) -> Panel<H> {
    Panel::new(citeview::builtin_template(), host, PanelConfig::default()).unwrap()
}
