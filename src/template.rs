//! Panel template handling.
//!
//! A template is an HTML fragment containing the results container and a
//! prototype result element. The panel detaches the prototype at startup
//! and clones it once per incoming result. Hosts may supply their own
//! template file as long as it carries the hook ids and classes listed in
//! [`hooks`]; [`builtin_template`] returns a minimal one that does.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Ids and class names the panel looks up in a template.
///
/// Names carrying the `citeview-` prefix belong to the template itself and
/// must be present for the panel to work. The unprefixed names are applied
/// to host-supplied content at runtime (expandable sections, read-more
/// toggles) and to results on interaction (`selected`).
pub mod hooks {
    /// Id of the element results are inserted into.
    pub const CONTAINER_ID: &str = "citeview-results";
    /// Id of the prototype result element.
    pub const TEMPLATE_ID: &str = "citeview-result-template";

    /// Class of every instantiated result element.
    pub const RESULT: &str = "citeview-result";
    /// Class of the clickable header region.
    pub const HEADER: &str = "citeview-header";
    /// Class of the thumbnail strip inside the header.
    pub const THUMBNAIL: &str = "citeview-thumbnail";
    /// Class of the source icon image.
    pub const SOURCE: &str = "citeview-source";
    /// Class of the author avatar image.
    pub const AUTHOR: &str = "citeview-author";
    /// Class of the title element.
    pub const TITLE: &str = "citeview-title";
    /// Class of the description element.
    pub const DESCRIPTION: &str = "citeview-description";
    /// Class of the collapsible summary region.
    pub const SUMMARY: &str = "citeview-summary";
    /// Class of the body inside the summary; hidden until opened.
    pub const BODY: &str = "citeview-body";
    /// Class of the element generated content is appended to.
    pub const CONTENT: &str = "citeview-content";
    /// Class of the element spinners are attached to.
    pub const LOADING: &str = "citeview-loading";

    /// Class toggled on a result while the pointer hovers it.
    pub const SELECTED: &str = "selected";
    /// Class marking host content that collapses behind a caption.
    pub const EXPANDABLE: &str = "expandable";
    /// Class of the wrapper holding collapsed content.
    pub const EXPANSION: &str = "expansion";
    /// Class of the clickable caption generated for expandable content.
    pub const CAPTION: &str = "caption";
    /// Class of the rotating arrow image inside a caption.
    pub const ARROW: &str = "arrow";
    /// Class marking host content that collapses behind a more link.
    pub const READMORE: &str = "readmore";
    /// Class of the generated show-more anchor.
    pub const MORELINK: &str = "morelink";
    /// Class of the generated show-less anchor.
    pub const LESSLINK: &str = "lesslink";
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template file: {0}")]
    IoError(#[from] std::io::Error),
}

const BUILTIN_TEMPLATE: &str = r#"<div id="citeview-results">
  <div id="citeview-result-template" class="citeview-result">
    <div class="citeview-header">
      <div class="citeview-thumbnail">
        <img class="citeview-source"/>
        <img class="citeview-author"/>
      </div>
      <div class="citeview-title"></div>
      <div class="citeview-description"></div>
    </div>
    <div class="citeview-summary">
      <div class="citeview-body">
        <div class="citeview-content"></div>
        <div class="citeview-loading"></div>
      </div>
    </div>
  </div>
</div>"#;

/// Returns the built-in panel template.
pub fn builtin_template() -> &'static str {
    BUILTIN_TEMPLATE
}

/// Loads a template from a file.
///
/// # Arguments
///
/// * `path` - Path to the template file
///
/// # Errors
///
/// Returns `TemplateError::IoError` if the file cannot be read.
pub fn load_template(path: &Path) -> Result<String, TemplateError> {
    Ok(fs::read_to_string(path)?)
}

/// Hook names with a one-line description each, for diagnostic listings.
pub fn hook_descriptions() -> Vec<(&'static str, &'static str)> {
    vec![
        (hooks::CONTAINER_ID, "id of the results container"),
        (hooks::TEMPLATE_ID, "id of the prototype result element"),
        (hooks::RESULT, "class of every instantiated result"),
        (hooks::HEADER, "class of the clickable header region"),
        (hooks::THUMBNAIL, "class of the thumbnail strip"),
        (hooks::SOURCE, "class of the source icon image"),
        (hooks::AUTHOR, "class of the author avatar image"),
        (hooks::TITLE, "class of the title element"),
        (hooks::DESCRIPTION, "class of the description element"),
        (hooks::SUMMARY, "class of the collapsible summary region"),
        (hooks::BODY, "class of the body hidden until opened"),
        (hooks::CONTENT, "class of the generated-content region"),
        (hooks::LOADING, "class of the spinner attachment point"),
        (hooks::SELECTED, "class toggled on hover"),
        (hooks::EXPANDABLE, "class of collapsible host content"),
        (hooks::EXPANSION, "class of the collapsed-content wrapper"),
        (hooks::CAPTION, "class of the generated caption"),
        (hooks::ARROW, "class of the caption arrow image"),
        (hooks::READMORE, "class of truncatable host content"),
        (hooks::MORELINK, "class of the generated show-more anchor"),
        (hooks::LESSLINK, "class of the generated show-less anchor"),
    ]
}
