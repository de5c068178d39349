use maud::html;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GalleryError {
    #[error("This ID wasn't found in the Gallery Manager. (ID: {0}).")]
    GalleryNotFound(String),

    #[error("Thumbnail IDs not found.")]
    GalleryDataMissing(String),

    #[error("This collection wasn't found. (ID: {0}).")]
    CollectionNotFound(String),

    #[error("The gallery is empty.")]
    EmptyGallery,

    #[error("The layout {0} is not available in this version.")]
    UnknownLayout(String),

    #[error("The number of featured images and posts id should be the same.")]
    InconsistentPostImageCount { posts: usize, images: usize },

    #[error("The {0} table does not exist yet. A database migration is pending.")]
    TableMissing(String),

    #[error("Payload could not be embedded: {0}")]
    EncodingFailure(String),
}

impl From<serde_json::Error> for GalleryError {
    fn from(e: serde_json::Error) -> Self {
        GalleryError::EncodingFailure(e.to_string())
    }
}

impl GalleryError {
    /// The fragment rendered in place of a gallery that failed to compose.
    pub fn to_inline_markup(&self) -> String {
        let message = match self {
            GalleryError::EncodingFailure(_) => {
                "There was an error while building the gallery. Check your logs.".to_string()
            }
            other => other.to_string(),
        };
        html! {
            p class="mgl-error" { b { "Gallery:" } " " (message) }
        }
        .into_string()
    }
}
