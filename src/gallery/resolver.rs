use super::{AttrValue, CompositionRequest, GalleryError, HookChain};
use crate::library::{GalleryRecord, GalleryRepository, MediaId, PostId, PostProvider, RepositoryError};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Preview renders never look at more than this many images.
pub const PREVIEW_LIMIT: usize = 40;

/// What the caller knows about the surrounding page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositionContext {
    /// The post being rendered, for the attached-media fallback.
    pub post_id: Option<PostId>,
    pub preview: bool,
}

impl CompositionContext {
    pub fn preview() -> Self {
        Self {
            preview: true,
            ..Self::default()
        }
    }

    pub fn for_post(post_id: PostId) -> Self {
        Self {
            post_id: Some(post_id),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSet {
    pub ids: Vec<MediaId>,
    /// Layout stored on a referenced gallery record.
    pub layout_hint: Option<String>,
    /// The working attribute set, including merged record fields.
    pub attributes: CompositionRequest,
    /// Per-gallery layout values stored on the record.
    pub stored_options: BTreeMap<String, AttrValue>,
    /// Which post supplied each featured image.
    pub backing_posts: Vec<(MediaId, PostId)>,
}

pub struct ImageSetResolver<'a> {
    repository: &'a dyn GalleryRepository,
    posts: &'a dyn PostProvider,
    hooks: &'a HookChain,
}

fn join_ids<T: ToString>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Record fields fill gaps in the attribute set; call-site values win.
fn merge_record(request: &mut CompositionRequest, record: &GalleryRecord) {
    request.insert_if_absent("name", AttrValue::text(&record.name));
    if let Some(description) = &record.description {
        request.insert_if_absent("description", AttrValue::text(description));
    }
    if let Some(lead) = record.lead_image_id {
        request.insert_if_absent("lead_image_id", AttrValue::text(lead.to_string()));
    }
    if let Some(order_by) = record.order_by.as_deref().filter(|o| !o.is_empty()) {
        request.insert_if_absent("order_by", AttrValue::text(order_by));
    }
    if record.hero {
        request.insert_if_absent("hero", AttrValue::Bool(true));
    }
    if record.is_post_mode {
        request.insert_if_absent("is_post_mode", AttrValue::Bool(true));
        if let Some(posts) = record.post_ids.as_deref().filter(|p| !p.is_empty()) {
            request.insert_if_absent("posts", AttrValue::text(join_ids(posts)));
        }
        if let Some(latest) = record.latest_posts.filter(|n| *n > 0) {
            request.insert_if_absent("latest_posts", AttrValue::text(latest.to_string()));
        }
    }
}

impl<'a> ImageSetResolver<'a> {
    pub fn new(
        repository: &'a dyn GalleryRepository,
        posts: &'a dyn PostProvider,
        hooks: &'a HookChain,
    ) -> Self {
        Self {
            repository,
            posts,
            hooks,
        }
    }

    /// Turns the attribute set into the ordered id list of the gallery.
    /// A `collection` attribute is not handled here.
    pub fn resolve(
        &self,
        mut request: CompositionRequest,
        context: &CompositionContext,
    ) -> Result<ResolvedSet, GalleryError> {
        if request.is_set("id") && request.is_set("ids") {
            if request.is_empty("ids") {
                request.remove("ids");
            } else {
                warn!(
                    "Gallery {}: both 'id' and 'ids' are set, 'id' will be ignored",
                    request.text("id").unwrap_or_default()
                );
            }
        }

        let mut ids: Vec<MediaId> = Vec::new();
        let mut layout_hint = None;
        let mut stored_options = BTreeMap::new();
        let mut backing_posts = Vec::new();

        if !request.is_empty("id") && !request.is_set("ids") {
            let id = request.text("id").unwrap_or_default();
            let record = self.repository.gallery_by_id(&id).map_err(|e| match e {
                RepositoryError::NotFound(_) => GalleryError::GalleryNotFound(id.clone()),
                RepositoryError::TableMissing(table) => GalleryError::TableMissing(table),
            })?;
            if record.media_ids.is_empty() && !record.is_post_mode {
                return Err(GalleryError::GalleryDataMissing(id));
            }

            debug!(
                "Gallery '{}' resolved from record with {} media ids",
                id,
                record.media_ids.len()
            );
            ids = record.media_ids.clone();
            layout_hint = record.layout.clone().filter(|layout| !layout.is_empty());
            stored_options = record.options.clone();
            merge_record(&mut request, &record);
        }

        if request.is_set("ids") {
            ids = request.ids("ids");
        }

        if request.is_set("include") {
            let joined = request.list("include").join(",");
            request.insert("include", AttrValue::text(joined));
            ids = request.ids("include");
        }

        let latest = request.u32("latest_posts").unwrap_or(0);
        if latest > 0 {
            let recent = self.posts.recent_posts(latest as usize);
            let merged = if request.is_set("posts") {
                warn!(
                    "Both 'latest_posts' and 'posts' are set, the lists are concatenated without deduplication"
                );
                let mut merged: Vec<String> = recent.iter().map(ToString::to_string).collect();
                merged.extend(request.list("posts"));
                merged.join(",")
            } else {
                join_ids(&recent)
            };
            request.insert("posts", AttrValue::text(merged));
        }

        if request.is_set("posts") {
            let post_ids = request.ids("posts");
            let featured: Vec<(MediaId, PostId)> = post_ids
                .iter()
                .filter_map(|&post| self.posts.featured_image_id(post).map(|image| (image, post)))
                .collect();
            if featured.len() != post_ids.len() {
                return Err(GalleryError::InconsistentPostImageCount {
                    posts: post_ids.len(),
                    images: featured.len(),
                });
            }
            ids = featured.iter().map(|(image, _)| *image).collect();
            backing_posts = featured;
        }

        let mut ids = self.hooks.filter_ids(ids, &request);

        if ids.is_empty() {
            ids = self.posts.attached_media(context.post_id);
            if ids.is_empty() {
                return Err(GalleryError::EmptyGallery);
            }
            debug!("Using {} attached images", ids.len());
        }

        if context.preview && ids.len() > PREVIEW_LIMIT {
            debug!("Preview truncated from {} to {} ids", ids.len(), PREVIEW_LIMIT);
            ids.truncate(PREVIEW_LIMIT);
        }

        Ok(ResolvedSet {
            ids,
            layout_hint,
            attributes: request,
            stored_options,
            backing_posts,
        })
    }
}
