use super::{AttrValue, CompositionRequest, GalleryError, HookChain, LayoutSet};
use crate::layouts::{Layout, LayoutDescriptor, LayoutRegistry};
use crate::library::MediaId;
use crate::options::PluginOptions;
use base64::{Engine, engine::general_purpose};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

/// Sentinel that defers to the next layout source.
const DEFAULT_SENTINEL: &str = "default";

/// The option record handed to the client renderer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    pub image_ids: Vec<MediaId>,
    pub id: String,
    pub size: String,
    pub infinite: bool,
    pub infinite_buffer: u32,
    pub custom_class: Option<String>,
    pub link: Option<String>,
    pub is_preview: bool,
    pub updir: String,
    pub captions: String,
    pub captions_alignment: String,
    pub captions_background: String,
    pub animation: Option<String>,
    pub layout: Layout,
    pub class_id: String,
    pub layouts: Vec<&'static str>,
    #[serde(flatten)]
    pub blocks: LayoutSet,
}

/// Picks the layout: `layout` attribute, then `mgl-layout`, then the stored
/// record's layout, then the plugin default. `none` and empty values fall
/// back to the plugin default.
pub fn select_layout<'r>(
    request: &CompositionRequest,
    layout_hint: Option<&str>,
    defaults: &PluginOptions,
    registry: &'r LayoutRegistry,
) -> Result<&'r LayoutDescriptor, GalleryError> {
    let explicit = |key: &str| {
        request
            .text(key)
            .filter(|value| value != DEFAULT_SENTINEL)
    };

    let chosen = explicit("layout")
        .or_else(|| explicit("mgl-layout"))
        .or_else(|| layout_hint.map(str::to_string))
        .unwrap_or_else(|| defaults.layout.clone());

    let chosen = if chosen.is_empty() || chosen == "none" {
        defaults.layout.clone()
    } else {
        chosen
    };

    registry.lookup(&chosen)
}

/// Deterministic composition id derived from everything that shapes the
/// output, so identical inputs produce identical records.
fn composition_id(request: &CompositionRequest, layout: Layout, ids: &[MediaId]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(request).unwrap_or_default());
    hasher.update(layout.name().as_bytes());
    for id in ids {
        hasher.update(id.to_le_bytes());
    }
    let digest = hasher.finalize();
    general_purpose::URL_SAFE_NO_PAD.encode(&digest[..9])
}

pub struct OptionResolver<'a> {
    defaults: &'a PluginOptions,
    hooks: &'a HookChain,
    uploads_base_url: String,
}

impl<'a> OptionResolver<'a> {
    pub fn new(defaults: &'a PluginOptions, hooks: &'a HookChain, uploads_base_url: String) -> Self {
        Self {
            defaults,
            hooks,
            uploads_base_url,
        }
    }

    pub fn resolve(
        &self,
        request: &CompositionRequest,
        stored: &BTreeMap<String, AttrValue>,
        descriptor: &LayoutDescriptor,
        image_ids: &[MediaId],
        infinite: bool,
        is_preview: bool,
    ) -> ResolvedOptions {
        let defaults = self.defaults;
        let layout = descriptor.layout;
        let id = composition_id(request, layout, image_ids);

        let size = self
            .hooks
            .media_size(request.text("size").unwrap_or_else(|| "large".to_string()));
        let link = match request.get("link") {
            Some(value) if *value != AttrValue::Null => Some(value.to_text()),
            _ => defaults.link.clone(),
        };
        let captions = request
            .text("captions")
            .unwrap_or_else(|| defaults.captions.clone());
        let animation = request
            .text("animation")
            .filter(|animation| animation != DEFAULT_SENTINEL)
            .or_else(|| defaults.animation.clone());
        let layouts = if layout == Layout::Cascade {
            vec!["o", "i", "ii"]
        } else {
            Vec::new()
        };

        let options = ResolvedOptions {
            image_ids: image_ids.to_vec(),
            class_id: format!("mgl-gallery-{}", id),
            id,
            size,
            infinite,
            infinite_buffer: defaults.infinite_buffer,
            custom_class: request.text("custom-class"),
            link,
            is_preview,
            updir: self.uploads_base_url.clone(),
            captions,
            captions_alignment: defaults.captions_alignment.clone(),
            captions_background: defaults.captions_background.clone(),
            animation,
            layout,
            layouts,
            blocks: LayoutSet::resolve(descriptor, request, stored, defaults),
        };
        debug!(
            "Resolved options {} for {} layout ({} ids)",
            options.id,
            layout,
            options.image_ids.len()
        );
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver<'a>(defaults: &'a PluginOptions, hooks: &'a HookChain) -> OptionResolver<'a> {
        OptionResolver::new(defaults, hooks, "https://example.com/uploads/".to_string())
    }

    #[test]
    fn test_layout_precedence() {
        let registry = LayoutRegistry::default();
        let defaults = PluginOptions::default();

        let request = CompositionRequest::new()
            .with("layout", "default")
            .with("mgl-layout", "square");
        let chosen = select_layout(&request, Some("masonry"), &defaults, &registry).unwrap();
        assert_eq!(chosen.layout, Layout::Square);

        let request = CompositionRequest::new();
        let chosen = select_layout(&request, Some("masonry"), &defaults, &registry).unwrap();
        assert_eq!(chosen.layout, Layout::Masonry);

        let request = CompositionRequest::new().with("layout", "none");
        let chosen = select_layout(&request, Some("masonry"), &defaults, &registry).unwrap();
        assert_eq!(chosen.layout, Layout::Tiles);
    }

    #[test]
    fn test_unknown_layout_fails() {
        let request = CompositionRequest::new().with("layout", "foo");
        assert_eq!(
            select_layout(
                &request,
                None,
                &PluginOptions::default(),
                &LayoutRegistry::default()
            ),
            Err(GalleryError::UnknownLayout("foo".to_string()))
        );
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let defaults = PluginOptions::default();
        let hooks = HookChain::new();
        let request = CompositionRequest::new()
            .with("ids", "1,2,3")
            .with("gutter", "7");
        let stored = BTreeMap::new();

        let first = resolver(&defaults, &hooks).resolve(
            &request,
            &stored,
            &LayoutDescriptor::of(Layout::Justified),
            &[1, 2, 3],
            false,
            false,
        );
        let second = resolver(&defaults, &hooks).resolve(
            &request,
            &stored,
            &LayoutDescriptor::of(Layout::Justified),
            &[1, 2, 3],
            false,
            false,
        );

        assert_eq!(first, second);
        assert_eq!(first.class_id, format!("mgl-gallery-{}", first.id));
        assert_eq!(first.blocks.justified.justified_gutter, 7);
        assert_eq!(first.blocks.masonry.masonry_gutter, 5);
    }

    #[test]
    fn test_scalar_fields() {
        let defaults = PluginOptions {
            link: Some("media".to_string()),
            animation: Some("zoom-in".to_string()),
            ..PluginOptions::default()
        };
        let hooks = HookChain::new();
        let request = CompositionRequest::new()
            .with("animation", "default")
            .with("custom-class", "wide")
            .with("captions", "all");
        let options = resolver(&defaults, &hooks).resolve(
            &request,
            &BTreeMap::new(),
            &LayoutDescriptor::of(Layout::Cascade),
            &[1],
            true,
            false,
        );

        assert_eq!(options.size, "large");
        assert_eq!(options.link.as_deref(), Some("media"));
        assert_eq!(options.animation.as_deref(), Some("zoom-in"));
        assert_eq!(options.custom_class.as_deref(), Some("wide"));
        assert_eq!(options.captions, "all");
        assert_eq!(options.layouts, vec!["o", "i", "ii"]);
        assert_eq!(options.updir, "https://example.com/uploads/");

        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["layout"], "cascade");
        assert_eq!(value["cascade_gutter"], 10);
        assert_eq!(value["tiles_density_mobile"], "low");
    }
}
