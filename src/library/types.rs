use crate::gallery::AttrValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

pub type MediaId = u64;
pub type PostId = u64;

/// A curated gallery as persisted by the gallery manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub media_ids: Vec<MediaId>,
    #[serde(default)]
    pub post_ids: Option<Vec<PostId>>,
    #[serde(default)]
    pub latest_posts: Option<u32>,
    #[serde(default)]
    pub lead_image_id: Option<MediaId>,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default)]
    pub is_post_mode: bool,
    #[serde(default)]
    pub hero: bool,
    /// Stored per-gallery layout values, keyed by plugin option name
    /// (`masonry_columns`, `justified_row_height`, ...).
    #[serde(default)]
    pub options: BTreeMap<String, AttrValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub gallery_ids: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionWithGalleries {
    #[serde(flatten)]
    pub collection: CollectionRecord,
    pub galleries: Vec<GalleryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub order: SortDirection,
}

impl PageRequest {
    /// A 1-based `page` only applies when no explicit offset was given.
    pub fn new(offset: usize, limit: usize, order: SortDirection, page: usize) -> Self {
        let offset = if page > 1 && offset == 0 {
            (page - 1) * limit
        } else {
            offset
        };
        Self {
            offset,
            limit,
            order,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(0, 10, SortDirection::Desc, 1)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub total: usize,
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeVariant {
    pub file: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomLink {
    pub url: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Metadata embedded in the file itself (EXIF/IPTC).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedMeta {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Everything the pipeline needs to know about one media item, as returned
/// by a single bulk metadata read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaMetadata {
    pub caption: String,
    pub alt: Option<String>,
    pub title: String,
    pub mime: String,
    pub file: Option<String>,
    pub width: u32,
    pub height: u32,
    pub sizes: BTreeMap<String, SizeVariant>,
    pub image_meta: EmbeddedMeta,
    pub date: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub menu_order: i64,
    pub custom_link: Option<CustomLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: PostId,
    pub title: String,
    pub excerpt: String,
    pub permalink: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_uses_page_only_without_offset() {
        let page = PageRequest::new(0, 10, SortDirection::Desc, 3);
        assert_eq!(page.offset, 20);

        let page = PageRequest::new(5, 10, SortDirection::Desc, 3);
        assert_eq!(page.offset, 5);
    }

    #[test]
    fn test_sort_direction_parsing() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert_eq!("sideways".parse::<SortDirection>().unwrap(), SortDirection::Asc);
    }
}
