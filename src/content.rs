//! Restructuring of host-supplied content.
//!
//! Content handed to the panel may mark elements with the `expandable` or
//! `readmore` classes. This module rewrites such elements in place:
//! expandable elements get a clickable caption above a hidden wrapper
//! holding their original children, and readmore elements get show-more and
//! show-less toggles around theirs. The panel runs this pass over every
//! content fragment after insertion and dispatches clicks on the generated
//! affordances.

use crate::dom::{Document, NodeId};
use crate::template::hooks;

/// Rewrites expandable and readmore elements under `root`, `root` included.
///
/// `arrow_icon` is the image URL used for caption arrows; captions are
/// generated without an image source when it is absent.
pub fn process_new_content(doc: &mut Document, root: NodeId, arrow_icon: Option<&str>) {
    for node in doc.find_all_class(root, hooks::EXPANDABLE) {
        let Some(title) = doc.attr(node, "title").map(str::to_owned) else {
            continue;
        };
        doc.remove_attr(node, "title");
        collapse_behind_caption(doc, node, &title, arrow_icon);
    }
    for node in doc.find_all_class(root, hooks::READMORE) {
        collapse_behind_morelink(doc, node);
    }
}

/// Moves the children of `node` into a hidden `div.expansion` and prepends
/// a `div.caption` holding the arrow image and the caption text.
fn collapse_behind_caption(doc: &mut Document, node: NodeId, title: &str, arrow_icon: Option<&str>) {
    let children = doc.take_children(node);

    let expansion = doc.create_element("div");
    doc.add_class(expansion, hooks::EXPANSION);
    for child in children {
        doc.append(expansion, child);
    }
    doc.set_hidden(expansion, true);

    let caption = doc.create_element("div");
    doc.add_class(caption, hooks::CAPTION);
    let arrow = doc.create_element("img");
    doc.add_class(arrow, hooks::ARROW);
    doc.set_attr(arrow, "width", "10");
    doc.set_attr(arrow, "height", "10");
    if let Some(src) = arrow_icon {
        doc.set_attr(arrow, "src", src);
    }
    doc.append(caption, arrow);
    if !title.is_empty() {
        let text = doc.create_text(title);
        doc.append(caption, text);
    }

    doc.append(node, caption);
    doc.append(node, expansion);
}

/// Moves the children of `node` into a hidden `span.expansion` bracketed by
/// a show-more span and a hidden show-less span.
fn collapse_behind_morelink(doc: &mut Document, node: NodeId) {
    let children = doc.take_children(node);

    let expansion = doc.create_element("span");
    doc.add_class(expansion, hooks::EXPANSION);
    for child in children {
        doc.append(expansion, child);
    }
    doc.set_hidden(expansion, true);

    let more = doc.create_element("span");
    let ellipsis = doc.create_text("\u{2026} ");
    doc.append(more, ellipsis);
    let morelink = doc.create_element("a");
    doc.add_class(morelink, hooks::MORELINK);
    doc.set_attr(morelink, "title", "Show more\u{2026}");
    doc.set_attr(morelink, "href", "#");
    let label = doc.create_text("[more]");
    doc.append(morelink, label);
    doc.append(more, morelink);

    let less = doc.create_element("span");
    let space = doc.create_text(" ");
    doc.append(less, space);
    let lesslink = doc.create_element("a");
    doc.add_class(lesslink, hooks::LESSLINK);
    doc.set_attr(lesslink, "title", "Show less.");
    doc.set_attr(lesslink, "href", "#");
    let label = doc.create_text("[less]");
    doc.append(lesslink, label);
    doc.append(less, lesslink);
    doc.set_hidden(less, true);

    doc.append(node, more);
    doc.append(node, expansion);
    doc.append(node, less);
}
