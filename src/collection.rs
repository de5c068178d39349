//! Rendering of `collection` requests, which group several galleries.

use crate::gallery::{Composer, CompositionContext, CompositionRequest, GalleryError};
use crate::library::{DynGalleryRepository, RepositoryError};
use maud::{PreEscaped, html};
use tracing::debug;

/// Receives every request carrying a non-empty `collection` attribute.
pub trait CollectionRenderer: Send + Sync {
    fn render(
        &self,
        composer: &Composer,
        collection_id: &str,
        context: &CompositionContext,
    ) -> Result<String, GalleryError>;
}

/// Composes each member gallery by id, in collection order.
pub struct ExpandingCollectionRenderer {
    repository: DynGalleryRepository,
}

impl ExpandingCollectionRenderer {
    pub fn new(repository: DynGalleryRepository) -> Self {
        Self { repository }
    }
}

impl CollectionRenderer for ExpandingCollectionRenderer {
    fn render(
        &self,
        composer: &Composer,
        collection_id: &str,
        context: &CompositionContext,
    ) -> Result<String, GalleryError> {
        let collection = self
            .repository
            .collection_by_id(collection_id)
            .map_err(|e| match e {
                RepositoryError::NotFound(_) => {
                    GalleryError::CollectionNotFound(collection_id.to_string())
                }
                RepositoryError::TableMissing(table) => GalleryError::TableMissing(table),
            })?;

        debug!(
            "Collection '{}' expands to {} galleries",
            collection_id,
            collection.galleries.len()
        );

        let markup = html! {
            div class="mgl-collection" data-collection-id=(collection_id) {
                @for gallery in &collection.galleries {
                    @let request = CompositionRequest::new().with("id", gallery.id.as_str());
                    (PreEscaped(composer.compose(&request, context)))
                }
            }
        };
        Ok(markup.into_string())
    }
}
