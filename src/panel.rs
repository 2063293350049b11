//! Results panel controller.
//!
//! The panel owns a DOM tree built from a template (see [`crate::template`])
//! and mirrors a stream of result events into it: result elements are cloned
//! from a prototype and inserted in weight order, generated content is
//! appended to open results, and spinners run while content is pending.
//! Interactions that must leave the panel (link activation, content
//! generation, open and close notifications) are reported to a
//! [`PanelHost`]. Nothing here touches a real browser; the embedding view
//! drives [`Panel::click`] and friends from its own events and reads back
//! the tree, the pending [`Effect`]s, and the serialized markup.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::process_new_content;
use crate::dom::{Document, NodeId, ParseError, SpinnerState};
use crate::host::PanelHost;
use crate::markup;
use crate::template::hooks;

/// Duration of slide and fade effects, in milliseconds.
pub const SLIDE_DURATION_MS: u32 = 100;

/// Duration of caption arrow rotations, in milliseconds.
pub const ROTATE_DURATION_MS: u32 = 200;

#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Invalid template markup: {0}")]
    Markup(#[from] ParseError),
    #[error("Template has no '#{0}' container element")]
    MissingContainer(&'static str),
    #[error("Template has no '#{0}' prototype element")]
    MissingTemplate(&'static str),
}

/// A result as announced by the host.
///
/// Field names follow the camel-case convention of the host protocol, so a
/// JSON object like `{"id": "r1", "sourceDatabase": "pubmed"}` deserializes
/// directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_icon: Option<String>,
    #[serde(default)]
    pub source_database: Option<String>,
    #[serde(default)]
    pub author_uri: Option<String>,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub headless: bool,
    #[serde(default)]
    pub open_by_default: bool,
}

/// One message of the host-to-panel stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PanelEvent {
    ResultAdded(ResultEntry),
    ContentAdded { result: String, html: String },
    ContentFinished { result: String },
    Clear,
}

/// Static panel settings supplied by the embedding application.
#[derive(Debug, Clone, Default)]
pub struct PanelConfig {
    /// Base URL for source icons looked up by database name. A result with
    /// `sourceDatabase` "pubmed" resolves to `<base>/pubmed.png`.
    pub icon_base_url: Option<String>,
    /// Image URL for the arrows of generated captions.
    pub arrow_icon_url: Option<String>,
}

/// An animation the embedding view should run.
///
/// The panel updates the tree to the animation's end state immediately;
/// effects only describe the transition. Views that do not animate can
/// drop them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    pub node: NodeId,
    pub kind: EffectKind,
    pub duration_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    /// Slide the element into view while fading it in.
    SlideFadeIn,
    /// Slide the element out of view while fading it out.
    SlideFadeOut,
    /// Rotate the element between two angles, in degrees.
    Rotate { from: u16, to: u16 },
}

struct Binding {
    root: NodeId,
    entry: ResultEntry,
}

/// The results panel.
pub struct Panel<H: PanelHost> {
    doc: Document,
    container: NodeId,
    template: NodeId,
    host: H,
    config: PanelConfig,
    bindings: Vec<Binding>,
    effects: Vec<Effect>,
}

impl<H: PanelHost> Panel<H> {
    /// Builds a panel from template markup.
    ///
    /// The prototype result element is detached from the tree and kept
    /// aside for cloning.
    ///
    /// # Errors
    ///
    /// Returns an error when the markup cannot be parsed or lacks the
    /// container or prototype elements.
    pub fn new(markup: &str, host: H, config: PanelConfig) -> Result<Self, PanelError> {
        let mut doc = Document::parse(markup)?;
        let root = doc.root();
        let container = doc
            .find_by_id(root, hooks::CONTAINER_ID)
            .ok_or(PanelError::MissingContainer(hooks::CONTAINER_ID))?;
        let template = doc
            .find_by_id(root, hooks::TEMPLATE_ID)
            .ok_or(PanelError::MissingTemplate(hooks::TEMPLATE_ID))?;
        doc.detach(template);
        Ok(Self {
            doc,
            container,
            template,
            host,
            config,
            bindings: Vec::new(),
            effects: Vec::new(),
        })
    }

    /// Applies one message of the host-to-panel stream.
    pub fn apply(&mut self, event: PanelEvent) {
        match event {
            PanelEvent::ResultAdded(entry) => self.add_result(entry),
            PanelEvent::ContentAdded { result, html } => self.add_content(&result, &html),
            PanelEvent::ContentFinished { result } => self.finish_content(&result),
            PanelEvent::Clear => self.clear(),
        }
    }

    /// Instantiates the prototype for `entry` and inserts it in weight
    /// order.
    ///
    /// Results are kept sorted by ascending weight. A headless result may
    /// be inserted ahead of any candidate; a headed one never lands ahead
    /// of a headless candidate.
    pub fn add_result(&mut self, entry: ResultEntry) {
        let root = self.doc.clone_subtree(self.template);
        self.doc.set_attr(root, "id", &entry.id);

        match self.insertion_point(&entry) {
            Some(reference) => self.doc.insert_before(reference, root),
            None => self.doc.append(self.container, root),
        }

        for body in self.body_regions(root) {
            self.doc.set_hidden(body, true);
        }

        if entry.headless {
            if let Some(header) = self.doc.find_class(root, hooks::HEADER) {
                self.doc.set_hidden(header, true);
            }
        } else {
            self.populate(root, &entry);
        }

        self.effects.push(Effect {
            node: root,
            kind: EffectKind::SlideFadeIn,
            duration_ms: SLIDE_DURATION_MS,
        });

        for loading in self.loading_nodes(root) {
            self.doc.set_spinner(loading, Some(SpinnerState::Running));
        }

        let open_by_default = entry.open_by_default;
        let highlight = entry.highlight.clone();
        self.bindings.push(Binding { root, entry });

        if open_by_default {
            if let Some(header) = self.doc.find_class(root, hooks::HEADER) {
                self.click(header);
            }
        }

        if let Some(color) = highlight {
            if let Some(header) = self.doc.find_class(root, hooks::HEADER) {
                let style = format!("border-left: solid 4px {}; padding-left: 6px", color);
                self.doc.set_attr(header, "style", &style);
            }
        }
    }

    /// Appends generated content to a result's content region.
    ///
    /// The fragment is wrapped in a `div`, its images are hidden until the
    /// view reports them loaded, and expandable and readmore elements are
    /// restructured. Content for an unknown result is dropped; the host may
    /// legitimately still be sending content for results that were cleared.
    pub fn add_content(&mut self, result_id: &str, html: &str) {
        let Some(root) = self.find_result(result_id) else {
            tracing::debug!(result = result_id, "content for unknown result dropped");
            return;
        };
        let wrapper = self.doc.create_element("div");
        self.doc.append_fragment(wrapper, html);
        for img in self.doc.find_all_tag(wrapper, "img") {
            self.doc.set_hidden(img, true);
        }
        let Some(region) = self.doc.find_class(root, hooks::CONTENT) else {
            tracing::debug!(result = result_id, "result has no content region");
            return;
        };
        self.doc.append(region, wrapper);
        process_new_content(&mut self.doc, wrapper, self.config.arrow_icon_url.as_deref());
    }

    /// Removes the spinners of a fully rendered result.
    pub fn finish_content(&mut self, result_id: &str) {
        let Some(root) = self.find_result(result_id) else {
            tracing::debug!(result = result_id, "finish for unknown result ignored");
            return;
        };
        for loading in self.loading_nodes(root) {
            self.doc.set_spinner(loading, None);
        }
    }

    /// Removes every result from the panel. The host is not notified.
    pub fn clear(&mut self) {
        for binding in std::mem::take(&mut self.bindings) {
            self.doc.detach(binding.root);
        }
    }

    /// Dispatches a click on `target`.
    ///
    /// Handlers run innermost first, the way a browser bubbles events:
    /// readmore and caption toggles fire on their own elements, header
    /// clicks ask the host whether to toggle, and thumbnail activations
    /// stop the walk entirely. Anchors passed on the way up are collected
    /// and reported to the host last.
    pub fn click(&mut self, target: NodeId) {
        let mut anchors: Vec<NodeId> = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            if node == self.container {
                break;
            }
            if self.doc.tag(node) == Some("a") {
                anchors.push(node);
                if self.doc.has_class(node, hooks::MORELINK) {
                    self.expand_readmore(node);
                } else if self.doc.has_class(node, hooks::LESSLINK) {
                    self.collapse_readmore(node);
                }
            } else if self.doc.has_class(node, hooks::CAPTION) {
                self.toggle_caption(node);
            } else if self.is_thumbnail_image(node, hooks::SOURCE) {
                if self.activate_source_image(node) {
                    return;
                }
            } else if self.is_thumbnail_image(node, hooks::AUTHOR) {
                if self.activate_author_image(node) {
                    return;
                }
            } else if self.doc.has_class(node, hooks::HEADER) {
                self.request_toggle(node);
            }
            current = self.doc.parent(node);
        }
        for anchor in anchors {
            self.activate_anchor(anchor);
        }
    }

    /// Toggles the selection highlight of the result under `node`.
    pub fn hover(&mut self, node: NodeId, entering: bool) {
        let Some(result) = self.enclosing_result(node) else {
            return;
        };
        if entering {
            self.doc.add_class(result, hooks::SELECTED);
        } else {
            self.doc.remove_class(result, hooks::SELECTED);
        }
    }

    /// Toggles the body of the result under `node`.
    ///
    /// Opening plays the result's spinners and notifies the host before
    /// the body becomes visible; closing notifies after it is hidden.
    pub fn toggle_slide(&mut self, node: NodeId) {
        let Some(result) = self.enclosing_result(node) else {
            return;
        };
        for body in self.body_regions(result) {
            if self.doc.is_hidden(body) {
                self.notify_opened(result);
                self.doc.set_hidden(body, false);
                self.effects.push(Effect {
                    node: body,
                    kind: EffectKind::SlideFadeIn,
                    duration_ms: SLIDE_DURATION_MS,
                });
            } else {
                self.effects.push(Effect {
                    node: body,
                    kind: EffectKind::SlideFadeOut,
                    duration_ms: SLIDE_DURATION_MS,
                });
                self.doc.set_hidden(body, true);
                self.notify_closed(result);
            }
        }
    }

    /// Reveals a content image the view has finished loading.
    pub fn image_loaded(&mut self, img: NodeId) {
        if !self.doc.is_hidden(img) {
            return;
        }
        self.doc.set_hidden(img, false);
        self.effects.push(Effect {
            node: img,
            kind: EffectKind::SlideFadeIn,
            duration_ms: SLIDE_DURATION_MS,
        });
    }

    /// Removes an image the view failed to load.
    pub fn image_error(&mut self, img: NodeId) {
        self.doc.detach(img);
    }

    /// Returns and clears the pending animation effects.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Serializes the container element and everything in it.
    pub fn render(&self) -> String {
        self.doc.serialize(self.container)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Root element of the result with the given id, if it is live.
    pub fn find_result(&self, id: &str) -> Option<NodeId> {
        self.bindings
            .iter()
            .find(|b| b.entry.id == id)
            .map(|b| b.root)
    }

    /// Ids of the live results in document order.
    pub fn result_ids(&self) -> Vec<String> {
        self.doc
            .children(self.container)
            .iter()
            .filter_map(|&child| {
                self.bindings
                    .iter()
                    .find(|b| b.root == child)
                    .map(|b| b.entry.id.clone())
            })
            .collect()
    }

    fn insertion_point(&self, entry: &ResultEntry) -> Option<NodeId> {
        self.doc.children(self.container).iter().copied().find(|&child| {
            let Some(candidate) = self.bindings.iter().find(|b| b.root == child) else {
                return false;
            };
            (entry.headless || !candidate.entry.headless)
                && candidate.entry.weight > entry.weight
        })
    }

    fn populate(&mut self, root: NodeId, entry: &ResultEntry) {
        if let Some(title) = self.doc.find_class(root, hooks::TITLE) {
            let text = markup::decode_text(&entry.title);
            self.doc.set_text_content(title, &text);
        }
        if let Some(description) = entry.description.as_deref().filter(|d| !d.is_empty()) {
            if let Some(node) = self.doc.find_class(root, hooks::DESCRIPTION) {
                let text = markup::decode_text(description);
                self.doc.set_text_content(node, &text);
            }
        }

        if let Some(img) = self.thumbnail_image(root, hooks::SOURCE) {
            if let Some(icon) = &entry.source_icon {
                self.doc.set_attr(img, "src", icon);
            } else if let Some(url) = entry
                .source_database
                .as_deref()
                .and_then(|db| self.source_icon_url(db))
            {
                self.doc.set_attr(img, "src", &url);
            } else {
                self.doc.detach(img);
            }
        }
        if let Some(img) = self.thumbnail_image(root, hooks::AUTHOR) {
            match &entry.author_uri {
                Some(uri) => {
                    let src = format!("{}/avatar", uri);
                    self.doc.set_attr(img, "src", &src);
                }
                None => self.doc.detach(img),
            }
        }
    }

    fn source_icon_url(&self, database: &str) -> Option<String> {
        let base = self.config.icon_base_url.as_deref()?;
        Some(format!("{}/{}.png", base.trim_end_matches('/'), database))
    }

    fn thumbnail_image(&self, root: NodeId, class: &str) -> Option<NodeId> {
        let header = self.doc.find_class(root, hooks::HEADER)?;
        let thumbnail = self.doc.find_class(header, hooks::THUMBNAIL)?;
        self.doc
            .find_all_tag(thumbnail, "img")
            .into_iter()
            .find(|&img| self.doc.has_class(img, class))
    }

    fn is_thumbnail_image(&self, node: NodeId, class: &str) -> bool {
        if self.doc.tag(node) != Some("img") || !self.doc.has_class(node, class) {
            return false;
        }
        let mut in_thumbnail = false;
        let mut in_header = false;
        let mut current = self.doc.parent(node);
        while let Some(ancestor) = current {
            if self.doc.has_class(ancestor, hooks::THUMBNAIL) {
                in_thumbnail = true;
            }
            if self.doc.has_class(ancestor, hooks::HEADER) {
                in_header = true;
            }
            current = self.doc.parent(ancestor);
        }
        in_thumbnail && in_header
    }

    fn activate_source_image(&self, img: NodeId) -> bool {
        let Some(entry) = self
            .enclosing_result(img)
            .and_then(|result| self.binding_for(result))
        else {
            return false;
        };
        if entry.headless {
            return false;
        }
        self.host.activate_source(entry);
        true
    }

    fn activate_author_image(&self, img: NodeId) -> bool {
        let Some(entry) = self
            .enclosing_result(img)
            .and_then(|result| self.binding_for(result))
        else {
            return false;
        };
        if entry.headless {
            return false;
        }
        self.host.activate_author(entry);
        true
    }

    fn request_toggle(&mut self, header: NodeId) {
        let Some(result) = self.enclosing_result(header) else {
            return;
        };
        let Some(entry) = self.binding_for(result).cloned() else {
            return;
        };
        if self.host.toggle_content(&entry) {
            self.toggle_slide(result);
        }
    }

    fn activate_anchor(&self, anchor: NodeId) {
        let href = self
            .doc
            .attr(anchor, "href")
            .or_else(|| self.doc.attr(anchor, "xlink:href"));
        let Some(href) = href else {
            return;
        };
        let target = self
            .doc
            .attr(anchor, "target")
            .or_else(|| self.doc.attr(anchor, "xlink:show"));
        self.host.activate_link(href, target);
    }

    fn toggle_caption(&mut self, caption: NodeId) {
        let Some(expansion) = self
            .next_element_sibling(caption)
            .filter(|&n| self.doc.has_class(n, hooks::EXPANSION))
        else {
            return;
        };
        let arrow = self.doc.find_class(caption, hooks::ARROW);
        if self.doc.is_hidden(expansion) {
            if let Some(arrow) = arrow {
                self.effects.push(Effect {
                    node: arrow,
                    kind: EffectKind::Rotate { from: 0, to: 90 },
                    duration_ms: ROTATE_DURATION_MS,
                });
            }
            self.doc.set_hidden(expansion, false);
            self.effects.push(Effect {
                node: expansion,
                kind: EffectKind::SlideFadeIn,
                duration_ms: SLIDE_DURATION_MS,
            });
        } else {
            if let Some(arrow) = arrow {
                self.effects.push(Effect {
                    node: arrow,
                    kind: EffectKind::Rotate { from: 90, to: 0 },
                    duration_ms: ROTATE_DURATION_MS,
                });
            }
            self.effects.push(Effect {
                node: expansion,
                kind: EffectKind::SlideFadeOut,
                duration_ms: SLIDE_DURATION_MS,
            });
            self.doc.set_hidden(expansion, true);
        }
    }

    fn expand_readmore(&mut self, anchor: NodeId) {
        let Some(more) = self.doc.parent(anchor) else {
            return;
        };
        let Some(expansion) = self
            .next_element_sibling(more)
            .filter(|&n| self.doc.has_class(n, hooks::EXPANSION))
        else {
            return;
        };
        self.doc.set_hidden(expansion, false);
        self.doc.set_hidden(more, true);
        if let Some(less) = self.next_element_sibling(expansion) {
            self.doc.set_hidden(less, false);
        }
    }

    fn collapse_readmore(&mut self, anchor: NodeId) {
        let Some(less) = self.doc.parent(anchor) else {
            return;
        };
        let Some(expansion) = self
            .prev_element_sibling(less)
            .filter(|&n| self.doc.has_class(n, hooks::EXPANSION))
        else {
            return;
        };
        self.doc.set_hidden(expansion, true);
        if let Some(more) = self.prev_element_sibling(expansion) {
            self.doc.set_hidden(more, false);
        }
        self.doc.set_hidden(less, true);
    }

    fn notify_opened(&mut self, result: NodeId) {
        for loading in self.loading_nodes(result) {
            self.doc.set_spinner(loading, Some(SpinnerState::Running));
        }
        if let Some(entry) = self.binding_for(result) {
            self.host.result_opened(entry);
        }
    }

    fn notify_closed(&mut self, result: NodeId) {
        for loading in self.loading_nodes(result) {
            self.doc.set_spinner(loading, Some(SpinnerState::Paused));
        }
        if let Some(entry) = self.binding_for(result) {
            self.host.result_closed(entry);
        }
    }

    /// Bodies of the result, strictly below a summary element.
    fn body_regions(&self, result: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for summary in self.doc.find_all_class(result, hooks::SUMMARY) {
            for body in self.doc.find_all_class(summary, hooks::BODY) {
                if body != summary && !out.contains(&body) {
                    out.push(body);
                }
            }
        }
        out
    }

    fn loading_nodes(&self, result: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for body in self.body_regions(result) {
            for loading in self.doc.find_all_class(body, hooks::LOADING) {
                if !out.contains(&loading) {
                    out.push(loading);
                }
            }
        }
        out
    }

    fn enclosing_result(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.doc.has_class(n, hooks::RESULT) {
                return Some(n);
            }
            current = self.doc.parent(n);
        }
        None
    }

    fn binding_for(&self, result: NodeId) -> Option<&ResultEntry> {
        self.bindings
            .iter()
            .find(|b| b.root == result)
            .map(|b| &b.entry)
    }

    fn next_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.doc.parent(node)?;
        let children = self.doc.children(parent);
        let pos = children.iter().position(|&c| c == node)?;
        children[pos + 1..]
            .iter()
            .copied()
            .find(|&c| self.doc.tag(c).is_some())
    }

    fn prev_element_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.doc.parent(node)?;
        let children = self.doc.children(parent);
        let pos = children.iter().position(|&c| c == node)?;
        children[..pos]
            .iter()
            .rev()
            .copied()
            .find(|&c| self.doc.tag(c).is_some())
    }
}
