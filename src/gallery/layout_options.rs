use super::{AttrValue, CompositionRequest};
use crate::layouts::{Layout, LayoutDescriptor};
use crate::options::PluginOptions;
use serde::Serialize;
use std::collections::BTreeMap;

/// Upper bound for column counts, whatever the request or stored record says.
pub const MAX_COLUMNS: u32 = 12;

/// Where one layout block reads its values from. Each field resolves as
/// request attribute, then stored gallery value, then plugin default.
/// Request attributes are only read for the active layout, and only those
/// its descriptor lists as sub-options.
pub struct BlockSource<'a> {
    request: Option<&'a CompositionRequest>,
    sub_options: &'a [&'a str],
    stored: &'a BTreeMap<String, AttrValue>,
}

impl<'a> BlockSource<'a> {
    pub fn new(
        request: Option<&'a CompositionRequest>,
        sub_options: &'a [&'a str],
        stored: &'a BTreeMap<String, AttrValue>,
    ) -> Self {
        Self {
            request,
            sub_options,
            stored,
        }
    }

    fn request(&self, attr: &str) -> Option<&'a CompositionRequest> {
        self.request
            .filter(|_| self.sub_options.iter().any(|option| *option == attr))
    }

    fn number(&self, attr: &str, key: &str, default: u32) -> u32 {
        self.request(attr)
            .and_then(|request| request.u32(attr))
            .or_else(|| self.stored.get(key).and_then(AttrValue::as_u32))
            .unwrap_or(default)
    }

    fn columns(&self, key: &str, default: u32) -> u32 {
        self.number("columns", key, default).clamp(1, MAX_COLUMNS)
    }

    fn flag(&self, attr: &str, key: &str, default: bool) -> bool {
        self.request(attr)
            .and_then(|request| request.flag(attr))
            .or_else(|| self.stored.get(key).and_then(AttrValue::as_bool))
            .unwrap_or(default)
    }

    fn text(&self, attr: &str, key: &str, default: &str) -> String {
        self.request(attr)
            .and_then(|request| request.text(attr))
            .filter(|value| !value.is_empty())
            .or_else(|| {
                self.stored
                    .get(key)
                    .map(AttrValue::to_text)
                    .filter(|value| !value.is_empty())
            })
            .unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesOptions {
    pub tiles_gutter: u32,
    pub tiles_gutter_tablet: u32,
    pub tiles_gutter_mobile: u32,
    pub tiles_density: String,
    pub tiles_density_tablet: String,
    pub tiles_density_mobile: String,
}

impl TilesOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        // A single `gutter`/`density` attribute applies to every breakpoint.
        Self {
            tiles_gutter: source.number("gutter", "tiles_gutter", defaults.tiles_gutter),
            tiles_gutter_tablet: source.number(
                "gutter",
                "tiles_gutter_tablet",
                defaults.tiles_gutter_tablet,
            ),
            tiles_gutter_mobile: source.number(
                "gutter",
                "tiles_gutter_mobile",
                defaults.tiles_gutter_mobile,
            ),
            tiles_density: source.text("density", "tiles_density", &defaults.tiles_density),
            tiles_density_tablet: source.text(
                "density",
                "tiles_density_tablet",
                &defaults.tiles_density_tablet,
            ),
            tiles_density_mobile: source.text(
                "density",
                "tiles_density_mobile",
                &defaults.tiles_density_mobile,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MasonryOptions {
    pub masonry_gutter: u32,
    pub masonry_columns: u32,
}

impl MasonryOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            masonry_gutter: source.number("gutter", "masonry_gutter", defaults.masonry_gutter),
            masonry_columns: source.columns("masonry_columns", defaults.masonry_columns),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JustifiedOptions {
    pub justified_row_height: u32,
    pub justified_gutter: u32,
}

impl JustifiedOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            justified_row_height: source.number(
                "row-height",
                "justified_row_height",
                defaults.justified_row_height,
            ),
            justified_gutter: source.number("gutter", "justified_gutter", defaults.justified_gutter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquareOptions {
    pub square_gutter: u32,
    pub square_columns: u32,
}

impl SquareOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            square_gutter: source.number("gutter", "square_gutter", defaults.square_gutter),
            square_columns: source.columns("square_columns", defaults.square_columns),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeOptions {
    pub cascade_gutter: u32,
}

impl CascadeOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            cascade_gutter: source.number("gutter", "cascade_gutter", defaults.cascade_gutter),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizontalOptions {
    pub horizontal_gutter: u32,
    pub horizontal_image_height: u32,
    pub horizontal_hide_scrollbar: bool,
}

impl HorizontalOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            horizontal_gutter: source.number(
                "gutter",
                "horizontal_gutter",
                defaults.horizontal_gutter,
            ),
            horizontal_image_height: source.number(
                "image_height",
                "horizontal_image_height",
                defaults.horizontal_image_height,
            ),
            horizontal_hide_scrollbar: source.flag(
                "hide_scrollbar",
                "horizontal_hide_scrollbar",
                defaults.horizontal_hide_scrollbar,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarouselOptions {
    pub carousel_gutter: u32,
    pub carousel_arrow_nav_enabled: bool,
    pub carousel_dot_nav_enabled: bool,
    pub carousel_image_height: u32,
    pub carousel_keep_aspect_ratio: bool,
}

impl CarouselOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            carousel_gutter: source.number("gutter", "carousel_gutter", defaults.carousel_gutter),
            carousel_arrow_nav_enabled: source.flag(
                "arrow_nav_enabled",
                "carousel_arrow_nav_enabled",
                defaults.carousel_arrow_nav_enabled,
            ),
            carousel_dot_nav_enabled: source.flag(
                "dot_nav_enabled",
                "carousel_dot_nav_enabled",
                defaults.carousel_dot_nav_enabled,
            ),
            carousel_image_height: source.number(
                "image_height",
                "carousel_image_height",
                defaults.carousel_image_height,
            ),
            carousel_keep_aspect_ratio: source.flag(
                "keep-aspect-ratio",
                "carousel_aspect_ratio",
                defaults.carousel_aspect_ratio,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapOptions {
    pub map_gutter: u32,
    pub map_height: u32,
}

impl MapOptions {
    fn resolve(source: &BlockSource<'_>, defaults: &PluginOptions) -> Self {
        Self {
            map_gutter: source.number("gutter", "map_gutter", defaults.map_gutter),
            map_height: source.number("map_height", "map_height", defaults.map_height),
        }
    }
}

/// Every layout's option block. All blocks are emitted so a client can
/// switch layouts, but only the active one honours call-site attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSet {
    #[serde(flatten)]
    pub tiles: TilesOptions,
    #[serde(flatten)]
    pub masonry: MasonryOptions,
    #[serde(flatten)]
    pub justified: JustifiedOptions,
    #[serde(flatten)]
    pub square: SquareOptions,
    #[serde(flatten)]
    pub cascade: CascadeOptions,
    #[serde(flatten)]
    pub horizontal: HorizontalOptions,
    #[serde(flatten)]
    pub carousel: CarouselOptions,
    #[serde(flatten)]
    pub map: MapOptions,
}

impl LayoutSet {
    pub fn resolve(
        active: &LayoutDescriptor,
        request: &CompositionRequest,
        stored: &BTreeMap<String, AttrValue>,
        defaults: &PluginOptions,
    ) -> Self {
        let source = |layout: Layout| {
            BlockSource::new(
                (layout == active.layout).then_some(request),
                active.sub_options,
                stored,
            )
        };

        Self {
            tiles: TilesOptions::resolve(&source(Layout::Tiles), defaults),
            masonry: MasonryOptions::resolve(&source(Layout::Masonry), defaults),
            justified: JustifiedOptions::resolve(&source(Layout::Justified), defaults),
            square: SquareOptions::resolve(&source(Layout::Square), defaults),
            cascade: CascadeOptions::resolve(&source(Layout::Cascade), defaults),
            horizontal: HorizontalOptions::resolve(&source(Layout::Horizontal), defaults),
            carousel: CarouselOptions::resolve(&source(Layout::Carousel), defaults),
            map: MapOptions::resolve(&source(Layout::Map), defaults),
        }
    }

    pub fn active(&self, layout: Layout) -> LayoutOptions<'_> {
        match layout {
            Layout::Tiles => LayoutOptions::Tiles(&self.tiles),
            Layout::Masonry => LayoutOptions::Masonry(&self.masonry),
            Layout::Justified => LayoutOptions::Justified(&self.justified),
            Layout::Square => LayoutOptions::Square(&self.square),
            Layout::Cascade => LayoutOptions::Cascade(&self.cascade),
            Layout::Horizontal => LayoutOptions::Horizontal(&self.horizontal),
            Layout::Carousel => LayoutOptions::Carousel(&self.carousel),
            Layout::Map => LayoutOptions::Map(&self.map),
        }
    }
}

/// The option block of one layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutOptions<'a> {
    Tiles(&'a TilesOptions),
    Masonry(&'a MasonryOptions),
    Justified(&'a JustifiedOptions),
    Square(&'a SquareOptions),
    Cascade(&'a CascadeOptions),
    Horizontal(&'a HorizontalOptions),
    Carousel(&'a CarouselOptions),
    Map(&'a MapOptions),
}

impl LayoutOptions<'_> {
    pub fn gutter(&self) -> u32 {
        match self {
            LayoutOptions::Tiles(o) => o.tiles_gutter,
            LayoutOptions::Masonry(o) => o.masonry_gutter,
            LayoutOptions::Justified(o) => o.justified_gutter,
            LayoutOptions::Square(o) => o.square_gutter,
            LayoutOptions::Cascade(o) => o.cascade_gutter,
            LayoutOptions::Horizontal(o) => o.horizontal_gutter,
            LayoutOptions::Carousel(o) => o.carousel_gutter,
            LayoutOptions::Map(o) => o.map_gutter,
        }
    }

    pub fn columns(&self) -> Option<u32> {
        match self {
            LayoutOptions::Masonry(o) => Some(o.masonry_columns),
            LayoutOptions::Square(o) => Some(o.square_columns),
            _ => None,
        }
    }

    pub fn image_height(&self) -> Option<u32> {
        match self {
            LayoutOptions::Horizontal(o) => Some(o.horizontal_image_height),
            LayoutOptions::Carousel(o) => Some(o.carousel_image_height),
            LayoutOptions::Map(o) => Some(o.map_height),
            _ => None,
        }
    }
}
