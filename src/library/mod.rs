// Library module - the collaborators the composition pipeline reads from
mod error;
mod gps;
mod manifest;
mod types;

pub use error::{LibraryError, RepositoryError};
pub use gps::{ExifGpsReader, MetadataGpsReader};
pub use manifest::{Library, LibraryManifest, MediaItem, PostEntry};
#[cfg(test)]
pub(crate) use manifest::test_helpers;
pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;

/// Read access to the curated gallery and collection tables.
pub trait GalleryRepository: Send + Sync {
    fn gallery_by_id(&self, id: &str) -> Result<GalleryRecord, RepositoryError>;

    fn galleries_by_ids(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, GalleryRecord>, RepositoryError>;

    fn list_galleries(&self, page: PageRequest) -> Result<Page<GalleryRecord>, RepositoryError>;

    fn collection_by_id(&self, id: &str) -> Result<CollectionWithGalleries, RepositoryError>;

    fn list_collections(
        &self,
        page: PageRequest,
    ) -> Result<Page<CollectionWithGalleries>, RepositoryError>;
}

/// Attributes handed to the media library when rendering one `<img>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageAttributes {
    pub class: String,
    pub draggable: Option<bool>,
    pub sizes: Option<String>,
}

pub trait MediaProvider: Send + Sync {
    /// One bulk read for the whole id set. Ids without metadata are absent
    /// from the result.
    fn metadata_for(&self, ids: &[MediaId]) -> HashMap<MediaId, MediaMetadata>;

    fn image_markup(&self, id: MediaId, size: &str, attrs: &ImageAttributes) -> Option<String>;

    fn image_url(&self, id: MediaId, size: &str) -> Option<String>;

    fn file_url(&self, id: MediaId) -> Option<String>;

    fn srcset_and_sizes(&self, id: MediaId, size: &str) -> (Option<String>, Option<String>);

    fn permalink(&self, id: MediaId) -> Option<String>;

    /// Base URL of the uploads directory, with a trailing slash.
    fn uploads_base_url(&self) -> String;
}

pub trait PostProvider: Send + Sync {
    fn featured_image_id(&self, post: PostId) -> Option<MediaId>;

    /// The `n` most recent post ids, newest first.
    fn recent_posts(&self, n: usize) -> Vec<PostId>;

    fn post(&self, id: PostId) -> Option<PostSummary>;

    /// Images attached to the content being rendered.
    fn attached_media(&self, context: Option<PostId>) -> Vec<MediaId>;
}

/// Optional GPS extraction; without one, map galleries render no markers.
pub trait GpsReader: Send + Sync {
    fn gps(&self, id: MediaId, meta: &MediaMetadata) -> Option<GpsCoordinates>;
}

pub type DynGalleryRepository = Arc<dyn GalleryRepository>;
pub type DynMediaProvider = Arc<dyn MediaProvider>;
pub type DynPostProvider = Arc<dyn PostProvider>;
