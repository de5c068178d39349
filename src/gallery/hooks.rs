use super::{CompositionRequest, ImageDescriptor, LinkAttributes};
use crate::layouts::Layout;
use crate::library::{MediaId, MediaMetadata};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Extension points of the composition pipeline. Every method defaults to
/// passing its input through unchanged.
pub trait GalleryHooks: Send + Sync {
    /// Runs on the resolved id set before the empty check.
    fn filter_ids(&self, ids: Vec<MediaId>, _request: &CompositionRequest) -> Vec<MediaId> {
        ids
    }

    /// Runs once the layout is known, before options are resolved.
    fn sort_ahead(
        &self,
        ids: Vec<MediaId>,
        _layout: Layout,
        _request: &CompositionRequest,
    ) -> Vec<MediaId> {
        ids
    }

    /// Runs on the loading window and again once metadata is fetched.
    fn sort(
        &self,
        ids: Vec<MediaId>,
        _metadata: &HashMap<MediaId, MediaMetadata>,
        _layout: Layout,
        _request: &CompositionRequest,
    ) -> Vec<MediaId> {
        ids
    }

    fn media_size(&self, size: String) -> String {
        size
    }

    fn responsive_sizes(
        &self,
        sizes: Option<String>,
        _layout: Layout,
        _id: MediaId,
    ) -> Option<String> {
        sizes
    }

    fn video_url(
        &self,
        url: Option<String>,
        _id: MediaId,
        _meta: &MediaMetadata,
    ) -> Option<String> {
        url
    }

    fn caption(&self, caption: String, _id: MediaId) -> String {
        caption
    }

    fn link_attributes(
        &self,
        link: LinkAttributes,
        _id: MediaId,
        _meta: &MediaMetadata,
    ) -> LinkAttributes {
        link
    }

    fn image_markup(&self, html: String, _layout: Layout) -> String {
        html
    }

    fn attributes(
        &self,
        attributes: BTreeMap<String, String>,
        _id: MediaId,
        _meta: &MediaMetadata,
    ) -> BTreeMap<String, String> {
        attributes
    }

    /// Classes for the anchor wrapping a pre-rendered image.
    fn custom_link_classes(&self, classes: String, _image: &ImageDescriptor) -> String {
        classes
    }

    fn on_layout_created(&self, _layout: Layout) {}

    fn on_gallery_created(&self, _request: &CompositionRequest, _ids: &[MediaId], _layout: Layout) {}
}

/// Hooks applied in registration order, each receiving the previous output.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn GalleryHooks>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: Arc<dyn GalleryHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn push(&mut self, hook: Arc<dyn GalleryHooks>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn filter_ids(&self, ids: Vec<MediaId>, request: &CompositionRequest) -> Vec<MediaId> {
        self.hooks
            .iter()
            .fold(ids, |ids, hook| hook.filter_ids(ids, request))
    }

    pub fn sort_ahead(
        &self,
        ids: Vec<MediaId>,
        layout: Layout,
        request: &CompositionRequest,
    ) -> Vec<MediaId> {
        self.hooks
            .iter()
            .fold(ids, |ids, hook| hook.sort_ahead(ids, layout, request))
    }

    pub fn sort(
        &self,
        ids: Vec<MediaId>,
        metadata: &HashMap<MediaId, MediaMetadata>,
        layout: Layout,
        request: &CompositionRequest,
    ) -> Vec<MediaId> {
        self.hooks
            .iter()
            .fold(ids, |ids, hook| hook.sort(ids, metadata, layout, request))
    }

    pub fn media_size(&self, size: String) -> String {
        self.hooks.iter().fold(size, |size, hook| hook.media_size(size))
    }

    pub fn responsive_sizes(
        &self,
        sizes: Option<String>,
        layout: Layout,
        id: MediaId,
    ) -> Option<String> {
        self.hooks
            .iter()
            .fold(sizes, |sizes, hook| hook.responsive_sizes(sizes, layout, id))
    }

    pub fn video_url(&self, url: Option<String>, id: MediaId, meta: &MediaMetadata) -> Option<String> {
        self.hooks
            .iter()
            .fold(url, |url, hook| hook.video_url(url, id, meta))
    }

    pub fn caption(&self, caption: String, id: MediaId) -> String {
        self.hooks
            .iter()
            .fold(caption, |caption, hook| hook.caption(caption, id))
    }

    pub fn link_attributes(
        &self,
        link: LinkAttributes,
        id: MediaId,
        meta: &MediaMetadata,
    ) -> LinkAttributes {
        self.hooks
            .iter()
            .fold(link, |link, hook| hook.link_attributes(link, id, meta))
    }

    pub fn image_markup(&self, html: String, layout: Layout) -> String {
        self.hooks
            .iter()
            .fold(html, |html, hook| hook.image_markup(html, layout))
    }

    pub fn attributes(
        &self,
        attributes: BTreeMap<String, String>,
        id: MediaId,
        meta: &MediaMetadata,
    ) -> BTreeMap<String, String> {
        self.hooks
            .iter()
            .fold(attributes, |attributes, hook| hook.attributes(attributes, id, meta))
    }

    pub fn custom_link_classes(&self, classes: String, image: &ImageDescriptor) -> String {
        self.hooks
            .iter()
            .fold(classes, |classes, hook| hook.custom_link_classes(classes, image))
    }

    pub fn on_layout_created(&self, layout: Layout) {
        for hook in &self.hooks {
            hook.on_layout_created(layout);
        }
    }

    pub fn on_gallery_created(&self, request: &CompositionRequest, ids: &[MediaId], layout: Layout) {
        for hook in &self.hooks {
            hook.on_gallery_created(request, ids, layout);
        }
    }
}
