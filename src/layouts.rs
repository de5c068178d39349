use crate::gallery::GalleryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    Tiles,
    Masonry,
    Justified,
    Square,
    Cascade,
    Horizontal,
    Carousel,
    Map,
}

impl Layout {
    pub const ALL: [Layout; 8] = [
        Layout::Tiles,
        Layout::Masonry,
        Layout::Justified,
        Layout::Square,
        Layout::Cascade,
        Layout::Horizontal,
        Layout::Carousel,
        Layout::Map,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Layout::Tiles => "tiles",
            Layout::Masonry => "masonry",
            Layout::Justified => "justified",
            Layout::Square => "square",
            Layout::Cascade => "cascade",
            Layout::Horizontal => "horizontal",
            Layout::Carousel => "carousel",
            Layout::Map => "map",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Layout::ALL
            .into_iter()
            .find(|layout| layout.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GalleryError::UnknownLayout(wanted.to_string()))
    }
}

/// How the responsive `100vw` width hint is scaled for column layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnScaling {
    None,
    /// Divided by the active column count plus one.
    Columns,
    /// Divided by a fixed factor.
    Fixed(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDescriptor {
    pub layout: Layout,
    /// Call-site attributes that override this layout's option block.
    pub sub_options: &'static [&'static str],
    pub supports_infinite: bool,
    /// Whether `<img>` markup is also rendered into the page.
    pub server_markup: bool,
    /// Orientation tags and `data-mgl-*` size attributes per image.
    pub orientation_sensitive: bool,
    pub sizes_hint: Option<&'static str>,
    pub column_scaling: ColumnScaling,
}

impl LayoutDescriptor {
    /// The built-in descriptor of a layout.
    pub fn of(layout: Layout) -> Self {
        let base = Self {
            layout,
            sub_options: &["gutter"],
            supports_infinite: false,
            server_markup: true,
            orientation_sensitive: false,
            sizes_hint: None,
            column_scaling: ColumnScaling::None,
        };

        match layout {
            Layout::Tiles => Self {
                sub_options: &["gutter", "density"],
                supports_infinite: true,
                orientation_sensitive: true,
                sizes_hint: Some("50vw"),
                ..base
            },
            Layout::Masonry => Self {
                sub_options: &["gutter", "columns"],
                supports_infinite: true,
                column_scaling: ColumnScaling::Columns,
                ..base
            },
            Layout::Justified => Self {
                sub_options: &["gutter", "row-height"],
                supports_infinite: true,
                sizes_hint: Some("(max-width: 800px) 80vw, 50vw"),
                ..base
            },
            Layout::Square => Self {
                sub_options: &["gutter", "columns"],
                supports_infinite: true,
                column_scaling: ColumnScaling::Columns,
                ..base
            },
            Layout::Cascade => Self {
                supports_infinite: true,
                column_scaling: ColumnScaling::Fixed(3),
                ..base
            },
            Layout::Horizontal => Self {
                sub_options: &["gutter", "image_height", "hide_scrollbar"],
                ..base
            },
            Layout::Carousel => Self {
                sub_options: &[
                    "gutter",
                    "image_height",
                    "arrow_nav_enabled",
                    "dot_nav_enabled",
                    "keep-aspect-ratio",
                ],
                server_markup: false,
                ..base
            },
            Layout::Map => Self {
                sub_options: &["gutter", "map_height"],
                server_markup: false,
                ..base
            },
        }
    }
}

/// The layouts available to a composer.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    layouts: Vec<LayoutDescriptor>,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self {
            layouts: Layout::ALL.into_iter().map(LayoutDescriptor::of).collect(),
        }
    }
}

impl LayoutRegistry {
    /// Removes a layout, as in editions that do not ship it.
    pub fn without(mut self, layout: Layout) -> Self {
        self.layouts.retain(|descriptor| descriptor.layout != layout);
        self
    }

    pub fn get(&self, layout: Layout) -> Option<&LayoutDescriptor> {
        self.layouts
            .iter()
            .find(|descriptor| descriptor.layout == layout)
    }

    pub fn lookup(&self, name: &str) -> Result<&LayoutDescriptor, GalleryError> {
        let layout: Layout = name.parse()?;
        self.get(layout)
            .ok_or_else(|| GalleryError::UnknownLayout(name.trim().to_string()))
    }

    /// Layouts whose first paint is limited to an initial window of images.
    /// The carousel only joins when `carousel_infinite` is set.
    pub fn infinite_layouts(&self, carousel_infinite: bool) -> Vec<Layout> {
        self.layouts
            .iter()
            .filter(|descriptor| {
                descriptor.supports_infinite
                    || (carousel_infinite && descriptor.layout == Layout::Carousel)
            })
            .map(|descriptor| descriptor.layout)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutDescriptor> {
        self.layouts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = LayoutRegistry::default();
        assert_eq!(registry.lookup("Masonry").unwrap().layout, Layout::Masonry);
        assert_eq!(
            registry.lookup("foo"),
            Err(GalleryError::UnknownLayout("foo".to_string()))
        );
    }

    #[test]
    fn test_narrowed_registry_rejects_removed_layout() {
        let registry = LayoutRegistry::default().without(Layout::Map);
        assert_eq!(
            registry.lookup("map"),
            Err(GalleryError::UnknownLayout("map".to_string()))
        );
        assert_eq!(registry.iter().count(), 7);
    }

    #[test]
    fn test_infinite_layouts() {
        let registry = LayoutRegistry::default();
        let layouts = registry.infinite_layouts(false);
        assert_eq!(
            layouts,
            vec![
                Layout::Tiles,
                Layout::Masonry,
                Layout::Justified,
                Layout::Square,
                Layout::Cascade
            ]
        );
        assert!(registry.infinite_layouts(true).contains(&Layout::Carousel));
    }

    #[test]
    fn test_capabilities() {
        let registry = LayoutRegistry::default();
        let map = registry.get(Layout::Map).unwrap();
        assert!(!map.server_markup);
        assert!(registry.get(Layout::Tiles).unwrap().orientation_sensitive);
        assert_eq!(
            registry.get(Layout::Cascade).unwrap().column_scaling,
            ColumnScaling::Fixed(3)
        );
    }
}
