//! HTML escaping and the allow-lists applied to captions and image markup.

use ammonia::Builder;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Tags allowed in captions. None of them keep attributes.
pub const CAPTION_TAGS: &[&str] = &["strong", "b", "em", "i"];

/// Attributes kept on `<img>`, the only tag allowed in image markup.
pub const IMAGE_ATTRIBUTES: &[&str] = &[
    "src", "srcset", "loading", "sizes", "class", "id", "width", "height", "alt", "align",
    "draggable",
];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "data:", "vbscript:"];

static CAPTION_CLEANER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        .tags(CAPTION_TAGS.iter().copied().collect())
        .tag_attributes(HashMap::new())
        .generic_attributes(HashSet::new());
    builder
});

static IMAGE_CLEANER: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::default();
    builder
        .tags(HashSet::from(["img"]))
        .tag_attributes(HashMap::from([(
            "img",
            IMAGE_ATTRIBUTES.iter().copied().collect(),
        )]))
        .generic_attributes(HashSet::new());
    builder
});

/// Escapes `&`, `<`, `>` and both quote characters.
pub fn escape_attr(s: &str) -> String {
    html_escape::encode_quoted_attribute(s).into_owned()
}

pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).into_owned()
}

/// Captions are decoded first so encoded tags cannot slip past the filter.
pub fn sanitize_caption(caption: &str) -> String {
    CAPTION_CLEANER.clean(&decode_entities(caption)).to_string()
}

pub fn sanitize_image_markup(html: &str) -> String {
    IMAGE_CLEANER.clean(html).to_string()
}

fn has_blocked_scheme(url: &str) -> bool {
    let normalized = decode_entities(url)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCKED_SCHEMES
        .iter()
        .any(|scheme| normalized.starts_with(scheme))
}

/// Link targets: drops script-capable schemes. Escaping happens where the
/// URL is rendered.
pub fn sanitize_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() || has_blocked_scheme(url) {
        return None;
    }
    Some(url.replace(' ', "%20"))
}
