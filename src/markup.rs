//! HTML fragment post-processing.
//!
//! Rendered citation fragments arrive with a `CITATION_LABEL` placeholder
//! and block-level wrappers; the helpers here inject or strip labels and
//! rewrite the wrappers into inline form. Also hosts the entity decoding
//! shared with the element tree parser.

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;

/// Replaces every placeholder occurrence with the label in bold.
///
/// When the fragment does not contain the placeholder at all, it is
/// prefixed with `"{token}. "` first, so the label always ends up in the
/// output exactly where a numbered entry would carry it.
///
/// # Arguments
///
/// * `fragment` - The rendered citation markup
/// * `token` - The placeholder string the renderer was asked to emit
/// * `label` - The label text; markup characters are escaped
pub fn apply_label(fragment: &str, token: &str, label: &str) -> String {
    let fragment = if fragment.contains(token) {
        fragment.to_string()
    } else {
        format!("{token}. {fragment}")
    };
    let strong = format!("<strong>{}</strong>", partial_escape(label));
    fragment.replace(token, &strong)
}

/// Removes every placeholder occurrence from the fragment.
///
/// The placeholder is stripped together with the punctuation run around
/// it: any non-letters before it (stopping at a tag close, `>`) and any
/// non-letters after it (stopping at a tag open, `<`), so a leading
/// `"TOKEN. "` disappears without leaving stray punctuation behind.
pub fn strip_label(fragment: &str, token: &str) -> String {
    // Non-letters around the token, bounded by the surrounding tags
    let re = Regex::new(&format!("[^a-zA-Z>]*{}[^a-zA-Z<]*", regex::escape(token))).unwrap();
    re.replace_all(fragment, "").into_owned()
}

/// Rewrites every `<div>` in the fragment to a `<span>`, attributes kept.
///
/// Citation renderers wrap their output in block-level elements; callers
/// here splice fragments into running text, so the wrappers must flow
/// inline. Input that does not parse is returned unchanged.
pub fn inline_fragment(fragment: &str) -> String {
    match rewrite_block_tags(fragment) {
        Some(rewritten) => rewritten,
        None => fragment.to_string(),
    }
}

fn rewrite_block_tags(fragment: &str) -> Option<String> {
    let mut reader = Reader::from_str(fragment);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"div" => {
                let mut span = BytesStart::new("span");
                span.extend_attributes(e.attributes().flatten());
                writer.write_event(Event::Start(span)).ok()?;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"div" => {
                let mut span = BytesStart::new("span");
                span.extend_attributes(e.attributes().flatten());
                writer.write_event(Event::Empty(span)).ok()?;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"div" => {
                writer.write_event(Event::End(BytesEnd::new("span"))).ok()?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event).ok()?,
            Err(_) => return None,
        }
    }
    String::from_utf8(writer.into_inner()).ok()
}

/// Extracts the plain text of an HTML snippet, decoding entities.
///
/// Tags are dropped, text runs are concatenated. Input that does not
/// parse falls back to entity decoding over the raw string.
pub fn decode_text(html: &str) -> String {
    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut out = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(e)) => match e.decode() {
                Ok(text) => out.push_str(&text),
                Err(_) => return decode_entities(html),
            },
            Ok(Event::GeneralRef(e)) => {
                let name = String::from_utf8_lossy(e.as_ref());
                match resolve_entity(&name) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('&');
                        out.push_str(&name);
                        out.push(';');
                    }
                }
            }
            Ok(Event::CData(e)) => out.push_str(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => return decode_entities(html),
        }
    }
    out
}

/// Named entities worth decoding in scholarly metadata. Anything else is
/// kept verbatim rather than dropped.
const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("hellip", '\u{2026}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("middot", '\u{b7}'),
    ("bull", '\u{2022}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("trade", '\u{2122}'),
    ("sect", '\u{a7}'),
    ("para", '\u{b6}'),
    ("deg", '\u{b0}'),
    ("plusmn", '\u{b1}'),
    ("times", '\u{d7}'),
    ("laquo", '\u{ab}'),
    ("raquo", '\u{bb}'),
    ("szlig", '\u{df}'),
    ("agrave", '\u{e0}'),
    ("aacute", '\u{e1}'),
    ("ccedil", '\u{e7}'),
    ("egrave", '\u{e8}'),
    ("eacute", '\u{e9}'),
    ("euml", '\u{eb}'),
    ("ntilde", '\u{f1}'),
    ("ouml", '\u{f6}'),
    ("uuml", '\u{fc}'),
];

/// Resolves one entity name (without `&`/`;`) to its character.
pub(crate) fn resolve_entity(name: &str) -> Option<char> {
    if let Some(rest) = name.strip_prefix('#') {
        let code = if let Some(hex) = rest.strip_prefix(['x', 'X']) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            rest.parse::<u32>().ok()?
        };
        return char::from_u32(code);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, ch)| *ch)
}

/// Decodes recognizable `&name;` references in a plain string, leaving
/// everything unrecognized in place.
pub(crate) fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let resolved = tail[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 32)
            .and_then(|end| {
                let name = &tail[1..1 + end];
                resolve_entity(name).map(|ch| (ch, 2 + end))
            });
        match resolved {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "CITATION_LABEL";

    #[test]
    fn test_apply_label_replaces_every_token() {
        // Given a fragment where the renderer emitted the placeholder twice
        let fragment = "CITATION_LABEL. Title (CITATION_LABEL)";

        // When applying a label
        let out = apply_label(fragment, TOKEN, "X");

        // Then every occurrence is replaced with the bold label
        assert_eq!(out, "<strong>X</strong>. Title (<strong>X</strong>)");
    }

    #[test]
    fn test_apply_label_prefixes_when_token_missing() {
        // Given a fragment the renderer produced without the placeholder
        let fragment = "Body.";

        // When applying a label
        let out = apply_label(fragment, TOKEN, "X");

        // Then a label-dot-space prefix is synthesized
        assert_eq!(out, "<strong>X</strong>. Body.");
    }

    #[test]
    fn test_apply_label_escapes_label_text() {
        let out = apply_label("Body.", TOKEN, "a<b&c");
        assert_eq!(out, "<strong>a&lt;b&amp;c</strong>. Body.");
    }

    #[test]
    fn test_strip_label_removes_token_and_padding() {
        // Given a fragment with the placeholder and its punctuation
        let fragment = r#"<span class="entry">CITATION_LABEL. Some title.</span>"#;

        // When stripping
        let out = strip_label(fragment, TOKEN);

        // Then the token and the dot-space run vanish, tags untouched
        assert_eq!(out, r#"<span class="entry">Some title.</span>"#);
    }

    #[test]
    fn test_strip_label_stops_at_tag_boundaries() {
        let fragment = "<b>x</b> (CITATION_LABEL) <i>y</i>";
        assert_eq!(strip_label(fragment, TOKEN), "<b>x</b><i>y</i>");
    }

    #[test]
    fn test_strip_label_leaves_tokenless_input_alone() {
        assert_eq!(strip_label("Just text.", TOKEN), "Just text.");
    }

    #[test]
    fn test_inline_fragment_rewrites_nested_divs() {
        // Given nested block wrappers with attributes
        let fragment =
            r#"<div class="csl-entry"><div class="csl-block">x</div> y</div>"#;

        // When rewriting
        let out = inline_fragment(fragment);

        // Then every div becomes a span and attributes survive
        assert_eq!(
            out,
            r#"<span class="csl-entry"><span class="csl-block">x</span> y</span>"#
        );
    }

    #[test]
    fn test_inline_fragment_keeps_other_tags() {
        let fragment = "<div><i>ital</i> and <strong>bold</strong></div>";
        assert_eq!(
            inline_fragment(fragment),
            "<span><i>ital</i> and <strong>bold</strong></span>"
        );
    }

    #[test]
    fn test_inline_fragment_rewrites_empty_elements() {
        assert_eq!(inline_fragment(r#"<div class="pad"/>"#), r#"<span class="pad"/>"#);
    }

    #[test]
    fn test_inline_fragment_passes_through_unparseable_input() {
        let fragment = "<div <broken";
        assert_eq!(inline_fragment(fragment), fragment);
    }

    #[test]
    fn test_decode_text_drops_tags_and_decodes_entities() {
        let out = decode_text("Tom &amp; Jerry &hellip; <b>bold</b>");
        assert_eq!(out, "Tom & Jerry \u{2026} bold");
    }

    #[test]
    fn test_decode_text_resolves_numeric_references() {
        assert_eq!(decode_text("&#8230; &#x2026;"), "\u{2026} \u{2026}");
    }

    #[test]
    fn test_decode_text_keeps_unknown_entities() {
        assert_eq!(decode_text("a &unknownref; b"), "a &unknownref; b");
    }

    #[test]
    fn test_decode_entities_plain_string() {
        assert_eq!(decode_entities("5 &gt; 3 &amp;&amp; 2 &lt; 4"), "5 > 3 && 2 < 4");
        assert_eq!(decode_entities("AT&T"), "AT&T");
    }
}
