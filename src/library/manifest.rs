use super::{
    CollectionRecord, CollectionWithGalleries, CustomLink, EmbeddedMeta, GalleryRecord,
    GalleryRepository, GpsCoordinates, ImageAttributes, LibraryError, MediaId, MediaMetadata,
    MediaProvider, Page, PageRequest, PostId, PostProvider, PostSummary, RepositoryError,
    SizeVariant, SortDirection,
};
use chrono::{DateTime, Utc};
use maud::html;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

const GALLERIES_TABLE: &str = "galleries";
const COLLECTIONS_TABLE: &str = "collections";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    /// Path relative to the uploads directory.
    pub file: String,
    #[serde(default)]
    pub mime: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub sizes: BTreeMap<String, SizeVariant>,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub menu_order: i64,
    #[serde(default)]
    pub custom_link: Option<CustomLink>,
    #[serde(default)]
    pub gps: Option<GpsCoordinates>,
    #[serde(default)]
    pub embedded_caption: String,
    /// The post this item was uploaded to.
    #[serde(default)]
    pub parent: Option<PostId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEntry {
    pub id: PostId,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub slug: String,
    #[serde(default)]
    pub featured_image: Option<MediaId>,
    pub date: DateTime<Utc>,
}

/// On-disk description of a media library, its posts and the gallery
/// manager tables. A missing table is `None`, not an empty list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryManifest {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub posts: Vec<PostEntry>,
    #[serde(default)]
    pub galleries: Option<Vec<GalleryRecord>>,
    #[serde(default)]
    pub collections: Option<Vec<CollectionRecord>>,
}

/// In-memory media library backed by a [`LibraryManifest`]. Serves as the
/// gallery repository, media provider and post provider at once.
pub struct Library {
    manifest: LibraryManifest,
    media_index: HashMap<MediaId, usize>,
    post_index: HashMap<PostId, usize>,
}

impl Library {
    pub fn new(manifest: LibraryManifest) -> Self {
        let media_index = manifest
            .media
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id, index))
            .collect();
        let post_index = manifest
            .posts
            .iter()
            .enumerate()
            .map(|(index, post)| (post.id, index))
            .collect();

        Self {
            manifest,
            media_index,
            post_index,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LibraryError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let content = std::fs::read_to_string(path)?;
        let library = Self::from_json(&content)?;
        info!(
            "Loaded library from {:?}: {} media items, {} posts",
            path,
            library.manifest.media.len(),
            library.manifest.posts.len()
        );
        Ok(library)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.manifest.base_url = base_url.to_string();
        self
    }

    pub fn manifest(&self) -> &LibraryManifest {
        &self.manifest
    }

    fn media(&self, id: MediaId) -> Option<&MediaItem> {
        self.media_index.get(&id).map(|&i| &self.manifest.media[i])
    }

    fn post_entry(&self, id: PostId) -> Option<&PostEntry> {
        self.post_index.get(&id).map(|&i| &self.manifest.posts[i])
    }

    fn galleries(&self) -> Result<&[GalleryRecord], RepositoryError> {
        self.manifest
            .galleries
            .as_deref()
            .ok_or_else(|| RepositoryError::TableMissing(GALLERIES_TABLE.to_string()))
    }

    fn collections(&self) -> Result<&[CollectionRecord], RepositoryError> {
        self.manifest
            .collections
            .as_deref()
            .ok_or_else(|| RepositoryError::TableMissing(COLLECTIONS_TABLE.to_string()))
    }

    fn site_url(&self) -> &str {
        self.manifest.base_url.trim_end_matches('/')
    }

    fn upload_url(&self, file: &str) -> String {
        let encoded: Vec<String> = file
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}{}", self.uploads_base_url(), encoded.join("/"))
    }

    /// Size variants live next to the original file.
    fn variant_url(&self, item: &MediaItem, variant: &SizeVariant) -> String {
        match item.file.rsplit_once('/') {
            Some((dir, _)) => self.upload_url(&format!("{}/{}", dir, variant.file)),
            None => self.upload_url(&variant.file),
        }
    }

    fn sized(&self, item: &MediaItem, size: &str) -> (String, u32, u32) {
        match item.sizes.get(size) {
            Some(variant) if size != "full" => {
                (self.variant_url(item, variant), variant.width, variant.height)
            }
            _ => (self.upload_url(&item.file), item.width, item.height),
        }
    }

    fn srcset(&self, item: &MediaItem) -> Option<String> {
        let mut candidates: Vec<(u32, String)> = item
            .sizes
            .values()
            .map(|variant| (variant.width, self.variant_url(item, variant)))
            .collect();
        candidates.push((item.width, self.upload_url(&item.file)));
        candidates.sort();
        candidates.dedup_by_key(|(width, _)| *width);

        if candidates.len() < 2 {
            return None;
        }
        Some(
            candidates
                .iter()
                .map(|(width, url)| format!("{} {}w", url, width))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    fn collection_with_galleries(
        &self,
        collection: &CollectionRecord,
    ) -> Result<CollectionWithGalleries, RepositoryError> {
        let found = self.galleries_by_ids(&collection.gallery_ids)?;
        let members = collection
            .gallery_ids
            .iter()
            .filter_map(|id| found.get(id).cloned())
            .collect();
        Ok(CollectionWithGalleries {
            collection: collection.clone(),
            galleries: members,
        })
    }
}

fn paginate<T: Clone>(
    mut records: Vec<&T>,
    page: PageRequest,
    updated: impl Fn(&T) -> DateTime<Utc>,
) -> (usize, Vec<T>) {
    records.sort_by_key(|record| updated(record));
    if page.order == SortDirection::Desc {
        records.reverse();
    }
    let total = records.len();
    let items = records
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .cloned()
        .collect();
    (total, items)
}

impl GalleryRepository for Library {
    fn gallery_by_id(&self, id: &str) -> Result<GalleryRecord, RepositoryError> {
        self.galleries()?
            .iter()
            .find(|gallery| gallery.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    fn galleries_by_ids(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, GalleryRecord>, RepositoryError> {
        Ok(self
            .galleries()?
            .iter()
            .filter(|gallery| ids.contains(&gallery.id))
            .map(|gallery| (gallery.id.clone(), gallery.clone()))
            .collect())
    }

    fn list_galleries(&self, page: PageRequest) -> Result<Page<GalleryRecord>, RepositoryError> {
        let (total, items) = paginate(self.galleries()?.iter().collect(), page, |g| g.updated_at);
        Ok(Page { total, items })
    }

    fn collection_by_id(&self, id: &str) -> Result<CollectionWithGalleries, RepositoryError> {
        let collection = self
            .collections()?
            .iter()
            .find(|collection| collection.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        self.collection_with_galleries(collection)
    }

    fn list_collections(
        &self,
        page: PageRequest,
    ) -> Result<Page<CollectionWithGalleries>, RepositoryError> {
        let (total, collections) =
            paginate(self.collections()?.iter().collect(), page, |c| c.updated_at);
        let items = collections
            .iter()
            .map(|collection| self.collection_with_galleries(collection))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page { total, items })
    }
}

impl MediaProvider for Library {
    fn metadata_for(&self, ids: &[MediaId]) -> HashMap<MediaId, MediaMetadata> {
        let found: HashMap<MediaId, MediaMetadata> = ids
            .iter()
            .filter_map(|&id| self.media(id).map(|item| (id, item)))
            .map(|(id, item)| {
                let mime = item.mime.clone().unwrap_or_else(|| {
                    mime_guess::from_path(&item.file)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string()
                });
                let meta = MediaMetadata {
                    caption: item.caption.clone(),
                    alt: item.alt.clone(),
                    title: item.title.clone(),
                    mime,
                    file: Some(item.file.clone()).filter(|f| !f.is_empty()),
                    width: item.width,
                    height: item.height,
                    sizes: item.sizes.clone(),
                    image_meta: EmbeddedMeta {
                        caption: item.embedded_caption.clone(),
                        latitude: item.gps.map(|gps| gps.lat),
                        longitude: item.gps.map(|gps| gps.lon),
                    },
                    date: item.date,
                    modified: item.modified,
                    menu_order: item.menu_order,
                    custom_link: item.custom_link.clone(),
                };
                (id, meta)
            })
            .collect();

        debug!("Metadata fetch: {} requested, {} found", ids.len(), found.len());
        found
    }

    fn image_markup(&self, id: MediaId, size: &str, attrs: &ImageAttributes) -> Option<String> {
        let item = self.media(id)?;
        let (src, width, height) = self.sized(item, size);

        let srcset = self.srcset(item);
        let sizes = srcset.as_ref().map(|_| {
            attrs
                .sizes
                .clone()
                .unwrap_or_else(|| format!("(max-width: {}px) 100vw, {}px", width, width))
        });

        let markup = html! {
            img width=(width) height=(height) src=(src) class=(attrs.class)
                alt=(item.alt.as_deref().unwrap_or_default())
                decoding="async" loading="lazy"
                srcset=[srcset] sizes=[sizes]
                draggable=[attrs.draggable.map(|draggable| draggable.to_string())];
        };
        Some(markup.into_string())
    }

    fn image_url(&self, id: MediaId, size: &str) -> Option<String> {
        self.media(id).map(|item| self.sized(item, size).0)
    }

    fn file_url(&self, id: MediaId) -> Option<String> {
        self.media(id)
            .filter(|item| !item.file.is_empty())
            .map(|item| self.upload_url(&item.file))
    }

    fn srcset_and_sizes(&self, id: MediaId, size: &str) -> (Option<String>, Option<String>) {
        let Some(item) = self.media(id) else {
            return (None, None);
        };
        let Some(srcset) = self.srcset(item) else {
            return (None, None);
        };
        let (_, width, _) = self.sized(item, size);
        (
            Some(srcset),
            Some(format!("(max-width: {}px) 100vw, {}px", width, width)),
        )
    }

    fn permalink(&self, id: MediaId) -> Option<String> {
        self.media(id)
            .map(|item| format!("{}/?attachment_id={}", self.site_url(), item.id))
    }

    fn uploads_base_url(&self) -> String {
        format!("{}/uploads/", self.site_url())
    }
}

impl PostProvider for Library {
    fn featured_image_id(&self, post: PostId) -> Option<MediaId> {
        self.post_entry(post)
            .and_then(|entry| entry.featured_image)
            .filter(|&id| id != 0)
    }

    fn recent_posts(&self, n: usize) -> Vec<PostId> {
        let mut posts: Vec<&PostEntry> = self.manifest.posts.iter().collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date));
        posts.into_iter().take(n).map(|post| post.id).collect()
    }

    fn post(&self, id: PostId) -> Option<PostSummary> {
        self.post_entry(id).map(|entry| PostSummary {
            id: entry.id,
            title: entry.title.clone(),
            excerpt: entry.excerpt.clone(),
            permalink: format!("{}/{}/", self.site_url(), entry.slug.trim_matches('/')),
        })
    }

    fn attached_media(&self, context: Option<PostId>) -> Vec<MediaId> {
        let Some(parent) = context else {
            return Vec::new();
        };
        self.manifest
            .media
            .iter()
            .filter(|item| item.parent == Some(parent))
            .filter(|item| {
                item.mime
                    .as_deref()
                    .map(|mime| mime.starts_with("image/"))
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&item.file)
                            .first()
                            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
                    })
            })
            .map(|item| item.id)
            .collect()
    }
}
