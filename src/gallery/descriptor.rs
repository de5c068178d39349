use super::sanitize::{sanitize_caption, sanitize_image_markup, sanitize_url};
use super::{
    CompositionRequest, Dimension, FeaturedPost, GalleryImages, HookChain, ImageDescriptor,
    LinkAttributes, LinkKind, MapData, MapImageDescriptor, Orientation, ResolvedOptions,
};
use crate::layouts::{ColumnScaling, Layout, LayoutDescriptor};
use crate::library::{
    GpsReader, ImageAttributes, MediaId, MediaMetadata, MediaProvider, PostId, PostProvider,
};
use crate::options::PluginOptions;
use maud::html;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Builds the per-image payload for one composition.
pub struct DescriptorAssembler<'a> {
    pub media: &'a dyn MediaProvider,
    pub posts: &'a dyn PostProvider,
    pub gps: Option<&'a dyn GpsReader>,
    pub hooks: &'a HookChain,
    pub defaults: &'a PluginOptions,
}

/// `100vw` scaled down for a column layout, e.g. `25vw` for three columns.
fn scaled_width(divisor: u32) -> String {
    let width = 100.0 / f64::from(divisor.max(1));
    let formatted = format!("{:.4}", width);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    format!("{}vw", trimmed)
}

impl DescriptorAssembler<'_> {
    /// Metadata is fetched once for the whole id list. Ids without metadata
    /// are dropped; the survivors keep their order.
    pub fn assemble(
        &self,
        ids: &[MediaId],
        request: &CompositionRequest,
        layout: &LayoutDescriptor,
        options: &ResolvedOptions,
        backing_posts: &[(MediaId, PostId)],
    ) -> GalleryImages {
        let metadata = self.media.metadata_for(ids);
        let found: Vec<MediaId> = ids
            .iter()
            .copied()
            .filter(|id| metadata.contains_key(id))
            .collect();
        if found.len() < ids.len() {
            warn!(
                "{} of {} images have no metadata and were dropped",
                ids.len() - found.len(),
                ids.len()
            );
        }

        let ids = self.hooks.sort(found, &metadata, layout.layout, request);
        let ids: Vec<MediaId> = ids
            .into_iter()
            .filter(|id| metadata.contains_key(id))
            .collect();

        if layout.layout == Layout::Map {
            return GalleryImages::Map(self.map_images(&ids, &metadata, options));
        }

        let hero = !backing_posts.is_empty() && request.flag("hero").unwrap_or(false);
        let mut pending = backing_posts.to_vec();
        let images = ids
            .iter()
            .map(|&id| {
                let meta = &metadata[&id];
                let mut descriptor = self.image(id, meta, layout, options);
                if hero {
                    descriptor.featured_post = self.featured_post(id, &mut pending);
                }
                descriptor
            })
            .collect();
        GalleryImages::Standard(images)
    }

    fn image(
        &self,
        id: MediaId,
        meta: &MediaMetadata,
        layout: &LayoutDescriptor,
        options: &ResolvedOptions,
    ) -> ImageDescriptor {
        let link = self.link_attributes(id, meta, options.link.as_deref());
        let no_lightbox = link.kind == LinkKind::Link;

        let orientation = layout
            .orientation_sensitive
            .then(|| Orientation::of(meta.width, meta.height));

        let mut attributes = BTreeMap::new();
        if layout.orientation_sensitive {
            attributes.insert("data-mgl-id".to_string(), id.to_string());
            attributes.insert("data-mgl-width".to_string(), meta.width.to_string());
            attributes.insert("data-mgl-height".to_string(), meta.height.to_string());
        }
        let attributes = self.hooks.attributes(attributes, id, meta);

        let caption = sanitize_caption(&self.hooks.caption(meta.caption.clone(), id));
        let img_html = self.hooks.image_markup(
            self.image_markup(id, meta, layout, options, no_lightbox),
            layout.layout,
        );

        ImageDescriptor {
            id,
            caption,
            img_html,
            link_href: link.href,
            link_target: link.target,
            link_rel: link.rel,
            attributes,
            orientation,
            featured_post: None,
            alt: meta.alt.clone(),
        }
    }

    /// Takes the first unused pair for `id`, so dropped or reordered images
    /// keep their post and a repeated image gets the next post in line.
    fn featured_post(
        &self,
        id: MediaId,
        pending: &mut Vec<(MediaId, PostId)>,
    ) -> Option<FeaturedPost> {
        let position = pending.iter().position(|(image, _)| *image == id)?;
        let (_, post_id) = pending.remove(position);
        let post = self.posts.post(post_id)?;
        Some(FeaturedPost {
            featured_post_id: post.id,
            featured_post_title: post.title,
            featured_post_excerpt: post.excerpt,
            featured_post_url: post.permalink,
        })
    }

    fn link_attributes(
        &self,
        id: MediaId,
        meta: &MediaMetadata,
        link: Option<&str>,
    ) -> LinkAttributes {
        let mut attributes = LinkAttributes::none();

        let url = match link {
            Some("attachment") => self.media.permalink(id),
            Some("media") | Some("file") => match meta.file.as_deref() {
                Some(_) => self.media.file_url(id),
                None => self.media.permalink(id),
            },
            None => match &meta.custom_link {
                Some(custom) if !custom.url.trim().is_empty() => {
                    attributes.kind = LinkKind::Link;
                    if let Some(target) = custom.target.as_deref().filter(|t| !t.is_empty()) {
                        attributes.target = Some(target.to_string());
                    }
                    Some(custom.url.clone())
                }
                _ => None,
            },
            Some(_) => None,
        };

        attributes.href = url.as_deref().and_then(sanitize_url);
        self.hooks.link_attributes(attributes, id, meta)
    }

    fn image_class(id: MediaId, layout: Layout, no_lightbox: bool) -> String {
        let mut class = if layout == Layout::Carousel {
            "skip-lazy".to_string()
        } else {
            format!("wp-image-{}", id)
        };
        if no_lightbox {
            class.push_str(" no-lightbox");
        }
        class
    }

    fn image_markup(
        &self,
        id: MediaId,
        meta: &MediaMetadata,
        layout: &LayoutDescriptor,
        options: &ResolvedOptions,
        no_lightbox: bool,
    ) -> String {
        if meta.mime.contains("video") {
            let url = self.hooks.video_url(self.media.file_url(id), id, meta);
            if let Some(url) = url.filter(|url| !url.is_empty()) {
                return html! {
                    video class=(format!("wp-video-{}", id)) controls="controls" onclick="() => this.play();" {
                        source src=(url) type=(meta.mime);
                    }
                }
                .into_string();
            }
        }

        let class = Self::image_class(id, layout.layout, no_lightbox);
        let html = if self.defaults.uses_srcset() {
            let attrs = ImageAttributes {
                class,
                draggable: (layout.layout == Layout::Carousel).then_some(false),
                sizes: self.hooks.responsive_sizes(
                    layout.sizes_hint.map(str::to_string),
                    layout.layout,
                    id,
                ),
            };
            self.media
                .image_markup(id, &options.size, &attrs)
                .unwrap_or_default()
        } else {
            let src = self
                .media
                .image_url(id, &self.defaults.image_size)
                .unwrap_or_default();
            html! { img loading="lazy" src=(src) class=(class); }.into_string()
        };

        let html = match layout.column_scaling {
            ColumnScaling::None => html,
            ColumnScaling::Columns => {
                let columns = options.blocks.active(layout.layout).columns().unwrap_or(1);
                html.replace("100vw", &scaled_width(columns.saturating_add(1)))
            }
            ColumnScaling::Fixed(divisor) => html.replace("100vw", &scaled_width(divisor)),
        };

        sanitize_image_markup(&html)
    }

    fn map_images(
        &self,
        ids: &[MediaId],
        metadata: &HashMap<MediaId, MediaMetadata>,
        options: &ResolvedOptions,
    ) -> Vec<MapImageDescriptor> {
        let images: Vec<MapImageDescriptor> = ids
            .iter()
            .filter_map(|&id| {
                let meta = &metadata[&id];
                let gps = self.gps.and_then(|reader| reader.gps(id, meta))?;
                let link = self.link_attributes(id, meta, options.link.as_deref());
                let sizes = meta
                    .sizes
                    .keys()
                    .filter_map(|name| {
                        self.media
                            .image_url(id, name)
                            .map(|url| (name.clone(), url))
                    })
                    .collect();
                let (file_srcset, file_sizes) = self.media.srcset_and_sizes(id, "full");

                Some(MapImageDescriptor {
                    id,
                    file: meta.file.clone(),
                    file_full: self.media.file_url(id),
                    file_srcset,
                    file_sizes,
                    dimension: Dimension {
                        width: meta.width,
                        height: meta.height,
                    },
                    sizes,
                    data: MapData {
                        caption: meta.image_meta.caption.clone(),
                        gps,
                    },
                    link,
                })
            })
            .collect();

        if images.len() < ids.len() {
            debug!(
                "{} of {} images have no GPS data and are left off the map",
                ids.len() - images.len(),
                ids.len()
            );
        }
        images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::OptionResolver;
    use crate::layouts::LayoutRegistry;
    use crate::library::test_helpers::{sample_library, sample_manifest};
    use crate::library::{Library, MetadataGpsReader};
    use serde_json::json;

    struct Fixture {
        library: Library,
        hooks: HookChain,
        defaults: PluginOptions,
        registry: LayoutRegistry,
    }

    impl Fixture {
        fn new(library: Library) -> Self {
            Self {
                library,
                hooks: HookChain::new(),
                defaults: PluginOptions::default(),
                registry: LayoutRegistry::default(),
            }
        }

        fn assemble(
            &self,
            ids: &[MediaId],
            request: &CompositionRequest,
            layout: Layout,
            backing_posts: &[(MediaId, PostId)],
        ) -> GalleryImages {
            let options = OptionResolver::new(&self.defaults, &self.hooks, String::new()).resolve(
                request,
                &BTreeMap::new(),
                self.registry.get(layout).unwrap(),
                ids,
                false,
                false,
            );
            let assembler = DescriptorAssembler {
                media: &self.library,
                posts: &self.library,
                gps: Some(&MetadataGpsReader),
                hooks: &self.hooks,
                defaults: &self.defaults,
            };
            assembler.assemble(
                ids,
                request,
                self.registry.get(layout).unwrap(),
                &options,
                backing_posts,
            )
        }
    }

    fn standard(images: GalleryImages) -> Vec<ImageDescriptor> {
        match images {
            GalleryImages::Standard(images) => images,
            GalleryImages::Map(_) => panic!("expected standard images"),
        }
    }

    #[test]
    fn test_scaled_width() {
        assert_eq!(scaled_width(4), "25vw");
        assert_eq!(scaled_width(3), "33.3333vw");
        assert_eq!(scaled_width(6), "16.6667vw");
    }

    #[test]
    fn test_fetch_misses_are_dropped_in_order() {
        let fixture = Fixture::new(sample_library());
        let images = fixture.assemble(&[3, 404, 1, 2], &CompositionRequest::new(), Layout::Justified, &[]);
        assert_eq!(images.ids(), vec![3, 1, 2]);
    }

    #[test]
    fn test_tiles_orientation_and_attributes() {
        let fixture = Fixture::new(sample_library());
        let images = standard(fixture.assemble(&[1, 2], &CompositionRequest::new(), Layout::Tiles, &[]));

        assert_eq!(images[0].orientation, Some(Orientation::Landscape));
        assert_eq!(images[1].orientation, Some(Orientation::Portrait));
        assert_eq!(images[0].attributes["data-mgl-width"], "1200");
        assert!(images[0].img_html.contains(r#"sizes="50vw""#));
        assert!(images[0].img_html.contains(r#"class="wp-image-1""#));

        let images = standard(fixture.assemble(&[1], &CompositionRequest::new(), Layout::Square, &[]));
        assert_eq!(images[0].orientation, None);
        assert!(images[0].attributes.is_empty());
    }

    #[test]
    fn test_column_layouts_rescale_sizes() {
        let fixture = Fixture::new(sample_library());
        let request = CompositionRequest::new().with("columns", "3");
        let images = standard(fixture.assemble(&[1], &request, Layout::Masonry, &[]));
        assert!(images[0].img_html.contains("(max-width: 1024px) 25vw, 1024px"));

        let images = standard(fixture.assemble(&[1], &CompositionRequest::new(), Layout::Cascade, &[]));
        assert!(images[0].img_html.contains("33.3333vw"));
    }

    #[test]
    fn test_scaled_width_survives_extreme_columns() {
        assert_eq!(scaled_width(u32::MAX.saturating_add(1)), "0vw");

        let fixture = Fixture::new(sample_library());
        let request = CompositionRequest::new().with("columns", "4294967295");
        let images = standard(fixture.assemble(&[1], &request, Layout::Masonry, &[]));
        assert!(images[0].img_html.contains("7.6923vw"));
    }

    #[test]
    fn test_links() {
        let mut manifest = sample_manifest();
        manifest["media"][0]["custom_link"] = json!({ "url": "https://shop.example.com/p/1", "target": "_blank" });
        let fixture = Fixture::new(Library::new(serde_json::from_value(manifest).unwrap()));

        let images = standard(fixture.assemble(&[1, 2], &CompositionRequest::new(), Layout::Justified, &[]));
        assert_eq!(images[0].link_href.as_deref(), Some("https://shop.example.com/p/1"));
        assert_eq!(images[0].link_target.as_deref(), Some("_blank"));
        assert!(images[0].img_html.contains("no-lightbox"));
        assert_eq!(images[1].link_href, None);

        let request = CompositionRequest::new().with("link", "file");
        let images = standard(fixture.assemble(&[2], &request, Layout::Justified, &[]));
        assert_eq!(
            images[0].link_href.as_deref(),
            Some("https://example.com/uploads/2024/05/photo-2.jpg")
        );

        let request = CompositionRequest::new().with("link", "attachment");
        let images = standard(fixture.assemble(&[2], &request, Layout::Justified, &[]));
        assert_eq!(
            images[0].link_href.as_deref(),
            Some("https://example.com/?attachment_id=2")
        );
        assert_eq!(images[0].link_target.as_deref(), Some("_self"));
    }

    #[test]
    fn test_carousel_markup() {
        let fixture = Fixture::new(sample_library());
        let images = standard(fixture.assemble(&[1], &CompositionRequest::new(), Layout::Carousel, &[]));
        assert!(images[0].img_html.contains(r#"class="skip-lazy""#));
        assert!(images[0].img_html.contains(r#"draggable="false""#));
    }

    #[test]
    fn test_fixed_size_path() {
        let mut fixture = Fixture::new(sample_library());
        fixture.defaults.image_size = "medium".to_string();
        let images = standard(fixture.assemble(&[1], &CompositionRequest::new(), Layout::Justified, &[]));
        assert_eq!(
            images[0].img_html,
            r#"<img loading="lazy" src="https://example.com/uploads/2024/05/photo-1-300.jpg" class="wp-image-1">"#
        );
    }

    #[test]
    fn test_video_short_circuits() {
        let mut manifest = sample_manifest();
        manifest["media"][0]["file"] = json!("2024/05/clip.mp4");
        manifest["media"][0]["mime"] = json!("video/mp4");
        let fixture = Fixture::new(Library::new(serde_json::from_value(manifest).unwrap()));

        let images = standard(fixture.assemble(&[1], &CompositionRequest::new(), Layout::Justified, &[]));
        assert_eq!(
            images[0].img_html,
            r#"<video class="wp-video-1" controls="controls" onclick="() =&gt; this.play();"><source src="https://example.com/uploads/2024/05/clip.mp4" type="video/mp4"></video>"#
        );
    }

    #[test]
    fn test_caption_is_sanitized() {
        let mut manifest = sample_manifest();
        manifest["media"][0]["caption"] = json!("<b>Bold</b> &lt;script&gt;x&lt;/script&gt;");
        let fixture = Fixture::new(Library::new(serde_json::from_value(manifest).unwrap()));

        let images = standard(fixture.assemble(&[1], &CompositionRequest::new(), Layout::Justified, &[]));
        assert_eq!(images[0].caption, "<b>Bold</b> ");
    }

    #[test]
    fn test_hero_pairs_posts_by_image() {
        let fixture = Fixture::new(sample_library());
        let request = CompositionRequest::new().with("hero", true);
        let images = standard(fixture.assemble(&[4, 3], &request, Layout::Justified, &[(4, 7), (3, 5)]));

        let post = images[0].featured_post.as_ref().unwrap();
        assert_eq!(post.featured_post_id, 7);
        assert_eq!(post.featured_post_title, "Seven");
        assert_eq!(post.featured_post_url, "https://example.com/seven/");
        assert_eq!(images[1].featured_post.as_ref().unwrap().featured_post_id, 5);

        let images = standard(fixture.assemble(&[4, 3], &CompositionRequest::new(), Layout::Justified, &[(4, 7), (3, 5)]));
        assert!(images[0].featured_post.is_none());
    }

    #[test]
    fn test_hero_shared_featured_image_keeps_each_post() {
        let fixture = Fixture::new(sample_library());
        let request = CompositionRequest::new().with("hero", true);
        let images = standard(fixture.assemble(&[3, 3], &request, Layout::Justified, &[(3, 5), (3, 7)]));

        let post_ids: Vec<_> = images
            .iter()
            .map(|image| image.featured_post.as_ref().map(|post| post.featured_post_id))
            .collect();
        assert_eq!(post_ids, vec![Some(5), Some(7)]);
    }

    #[test]
    fn test_map_keeps_only_geotagged_images() {
        let fixture = Fixture::new(sample_library());
        let ids: Vec<MediaId> = (1..=10).collect();
        let images = fixture.assemble(&ids, &CompositionRequest::new(), Layout::Map, &[]);

        let GalleryImages::Map(images) = images else {
            panic!("expected map images");
        };
        assert_eq!(images.len(), 7);
        assert_eq!(images.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(images[0].data.gps.lat, 49.0);
        assert_eq!(
            images[0].sizes["medium"],
            "https://example.com/uploads/2024/05/photo-1-300.jpg"
        );
        assert_eq!(
            images[0].file_full.as_deref(),
            Some("https://example.com/uploads/2024/05/photo-1.jpg")
        );
        assert!(images[0].file_srcset.is_some());
    }
}
