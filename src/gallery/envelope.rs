use super::sanitize::decode_entities;
use super::skeleton::synthesize;
use super::{CompositionRequest, GalleryError, GalleryImages, HookChain, ResolvedOptions};
use crate::layouts::LayoutDescriptor;
use crate::options::{PluginOptions, RenderingMode};
use maud::{PreEscaped, html};
use tracing::error;

pub const OPTIONS_ATTR: &str = "data-gallery-options";
pub const IMAGES_ATTR: &str = "data-gallery-images";
pub const ATTS_ATTR: &str = "data-atts";

/// Wraps a composition in the root container read by the client renderer.
pub struct EnvelopeBuilder<'a> {
    pub hooks: &'a HookChain,
    pub defaults: &'a PluginOptions,
}

/// The root must open with a single tag that still carries the last payload.
fn check_embeddable(html: &str, gallery_id: &str) -> Result<(), GalleryError> {
    let opening = html.find('>').map_or(html, |end| &html[..=end]);
    if opening.matches('<').count() == 1 && opening.contains(ATTS_ATTR) {
        return Ok(());
    }
    error!("Gallery {} produced a root tag that cannot be embedded", gallery_id);
    Err(GalleryError::EncodingFailure(format!(
        "root container of gallery {} is not a single tag",
        gallery_id
    )))
}

impl EnvelopeBuilder<'_> {
    pub fn build(
        &self,
        options: &ResolvedOptions,
        images: &GalleryImages,
        request: &CompositionRequest,
        layout: &LayoutDescriptor,
    ) -> Result<String, GalleryError> {
        let mut class = "mgl-root".to_string();
        if let Some(align) = request.text("align").filter(|align| !align.is_empty()) {
            class.push_str(" align");
            class.push_str(&align);
        }

        let options_json = serde_json::to_string(options)?;
        let images_json = serde_json::to_string(images)?;
        let atts_json = serde_json::to_string(request)?;

        let pre_rendered = match images {
            GalleryImages::Standard(images)
                if layout.server_markup
                    && self.defaults.rendering_mode == RenderingMode::Dom =>
            {
                Some(images)
            }
            _ => None,
        };

        let markup = html! {
            div class=(class) data-gallery-options=(options_json) data-gallery-images=(images_json) data-atts=(atts_json) {
                div class="mgl-gallery-container" {}
                @if self.defaults.skeleton_loading {
                    (synthesize(layout.layout, options))
                }
                @if let Some(images) = pre_rendered {
                    div class="mgl-gallery-images" {
                        @for image in images {
                            @if let Some(href) = &image.link_href {
                                a class=(self.hooks.custom_link_classes(String::new(), image))
                                    href=(href)
                                    target=(image.link_target.as_deref().unwrap_or_default())
                                    rel=(image.link_rel.as_deref().unwrap_or_default())
                                    aria-label=(image.alt.as_deref().unwrap_or_default()) {
                                    (PreEscaped(image.img_html.as_str()))
                                }
                            } @else {
                                (PreEscaped(image.img_html.as_str()))
                            }
                        }
                    }
                }
            }
        }
        .into_string();

        check_embeddable(&markup, &options.id)?;
        Ok(markup)
    }
}

/// Decodes one of the JSON payloads from a composed envelope.
pub fn read_payload(markup: &str, attr: &str) -> Option<serde_json::Value> {
    let marker = format!(r#"{}=""#, attr);
    let start = markup.find(&marker)? + marker.len();
    let end = start + markup[start..].find('"')?;
    serde_json::from_str(&decode_entities(&markup[start..end])).ok()
}
