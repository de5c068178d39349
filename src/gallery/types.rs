use crate::library::{GpsCoordinates, MediaId, PostId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkKind {
    #[serde(rename = "media")]
    Media,
    /// A custom per-image link. Such images skip the lightbox.
    #[serde(rename = "link")]
    Link,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkAttributes {
    pub href: Option<String>,
    pub target: Option<String>,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub rel: Option<String>,
}

impl LinkAttributes {
    pub fn none() -> Self {
        Self {
            href: None,
            target: Some("_self".to_string()),
            kind: LinkKind::Media,
            rel: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    #[serde(rename = "o")]
    Landscape,
    #[serde(rename = "i")]
    Portrait,
}

impl Orientation {
    pub fn of(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeaturedPost {
    pub featured_post_id: PostId,
    pub featured_post_title: String,
    pub featured_post_excerpt: String,
    pub featured_post_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescriptor {
    pub id: MediaId,
    pub caption: String,
    pub img_html: String,
    pub link_href: Option<String>,
    pub link_target: Option<String>,
    pub link_rel: Option<String>,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(flatten)]
    pub featured_post: Option<FeaturedPost>,
    #[serde(skip)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapData {
    pub caption: String,
    pub gps: GpsCoordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapImageDescriptor {
    pub id: MediaId,
    pub file: Option<String>,
    pub file_full: Option<String>,
    pub file_srcset: Option<String>,
    pub file_sizes: Option<String>,
    pub dimension: Dimension,
    /// Size name to URL.
    pub sizes: BTreeMap<String, String>,
    pub data: MapData,
    pub link: LinkAttributes,
}

/// The image list of one composition, serialized as a plain JSON array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GalleryImages {
    Standard(Vec<ImageDescriptor>),
    Map(Vec<MapImageDescriptor>),
}

impl GalleryImages {
    pub fn len(&self) -> usize {
        match self {
            GalleryImages::Standard(images) => images.len(),
            GalleryImages::Map(images) => images.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<MediaId> {
        match self {
            GalleryImages::Standard(images) => images.iter().map(|image| image.id).collect(),
            GalleryImages::Map(images) => images.iter().map(|image| image.id).collect(),
        }
    }
}
