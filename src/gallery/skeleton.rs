//! Placeholder markup painted before the client renderer takes over.

use super::{MAX_COLUMNS, ResolvedOptions};
use crate::layouts::Layout;
use maud::{Markup, html};

const ROWS: u32 = 3;
const TILE_PATTERNS: [&str; 5] = ["oo", "oio", "ooo", "oi", "o"];
const ITEM_STYLE: &str =
    "background-color: #e2e2e2; border-radius: 4px; overflow: hidden; position: relative;";

/// Pixel value without a trailing `.0` and without `-0`.
fn px(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn half(gutter: u32) -> String {
    px(f64::from(gutter) / 2.0)
}

fn negative_half(gutter: u32) -> String {
    px(-f64::from(gutter) / 2.0)
}

fn shimmer() -> Markup {
    html! { div class="mgl-skeleton-shimmer" {} }
}

/// Skeleton for a layout, sized from its resolved option block.
pub fn synthesize(layout: Layout, options: &ResolvedOptions) -> Markup {
    let blocks = &options.blocks;
    let body = match layout {
        Layout::Tiles => tiles(ROWS, blocks.tiles.tiles_gutter),
        Layout::Masonry => masonry(blocks.masonry.masonry_columns, blocks.masonry.masonry_gutter),
        Layout::Square => square(blocks.square.square_columns, blocks.square.square_gutter),
        Layout::Justified => justified(ROWS, blocks.justified.justified_gutter),
        Layout::Cascade => cascade(ROWS, blocks.cascade.cascade_gutter),
        Layout::Horizontal => horizontal(
            blocks.horizontal.horizontal_image_height,
            blocks.horizontal.horizontal_gutter,
        ),
        Layout::Carousel => horizontal(
            blocks.carousel.carousel_image_height,
            blocks.carousel.carousel_gutter,
        ),
        Layout::Map => map(blocks.map.map_height),
    };
    html! {
        div class="mgl-gallery-skeleton" style="opacity: 1;" { (body) }
    }
}

/// Skeleton for a layout name. Unknown names get the tiles skeleton.
pub fn synthesize_named(name: &str, options: &ResolvedOptions) -> Markup {
    synthesize(name.parse().unwrap_or(Layout::Tiles), options)
}

fn tiles(rows: u32, gutter: u32) -> Markup {
    let box_style = format!("flex: 1; padding: {}px;", half(gutter));
    html! {
        @for row in 0..rows as usize {
            div class="mgl-skeleton-row" style="display: flex; margin-bottom: 10px;" {
                @for orientation in TILE_PATTERNS[row % TILE_PATTERNS.len()].chars() {
                    @let aspect_ratio = if orientation == 'o' { "3/2" } else { "2/3" };
                    div class="mgl-skeleton-box" style=(box_style) {
                        div class="mgl-skeleton-item" style=(format!("aspect-ratio: {}; {}", aspect_ratio, ITEM_STYLE)) {
                            (shimmer())
                        }
                    }
                }
            }
        }
    }
}

fn masonry(columns: u32, gutter: u32) -> Markup {
    html! {
        div class="mgl-skeleton-masonry" style=(format!("column-count: {}; margin: {}px;", columns, negative_half(gutter))) {
            @for i in 0..6u32 {
                div class="mgl-skeleton-item" style=(format!(
                    "height: {}px; padding: {}px; break-inside: avoid; display: block; margin-bottom: 0; {}",
                    200 + (i % 3) * 100,
                    half(gutter),
                    ITEM_STYLE
                )) {
                    (shimmer())
                }
            }
        }
    }
}

/// Two rows of placeholders, never more than `MAX_COLUMNS` per row.
fn square(columns: u32, gutter: u32) -> Markup {
    let columns = columns.clamp(1, MAX_COLUMNS);
    let item_style = format!(
        "width: calc(100% / {c}); padding-bottom: calc(100% / {c}); {style}",
        c = columns,
        style = ITEM_STYLE
    );
    html! {
        div class="mgl-skeleton-square" style=(format!("margin: {}px; display: flex; flex-wrap: wrap;", negative_half(gutter))) {
            @for _ in 0..columns.saturating_mul(2) {
                div class="mgl-skeleton-item" style=(item_style) { (shimmer()) }
            }
        }
    }
}

fn justified(rows: u32, gutter: u32) -> Markup {
    let item_style = format!("flex: 1; margin: {}px; height: 100%; {}", half(gutter), ITEM_STYLE);
    html! {
        div class="mgl-skeleton-justified" style=(format!("margin: {}px;", negative_half(gutter))) {
            @for row in 0..rows {
                div style=(format!("display: flex; margin-bottom: {}px; height: 200px;", gutter)) {
                    @for _ in 0..3 + row % 2 {
                        div class="mgl-skeleton-item" style=(item_style) { (shimmer()) }
                    }
                }
            }
        }
    }
}

fn cascade(rows: u32, gutter: u32) -> Markup {
    html! {
        div class="mgl-skeleton-cascade" style=(format!("margin: {}px;", negative_half(gutter))) {
            @for row in 0..rows {
                @let (width, margin_left) = if row % 2 == 0 { ("60%", "0") } else { ("40%", "auto") };
                div style=(format!("padding: {}px;", half(gutter))) {
                    div class="mgl-skeleton-item" style=(format!(
                        "height: {}px; width: {}; margin-left: {}; {}",
                        150 + (row % 4) * 50,
                        width,
                        margin_left,
                        ITEM_STYLE
                    )) {
                        (shimmer())
                    }
                }
            }
        }
    }
}

fn horizontal(image_height: u32, gutter: u32) -> Markup {
    html! {
        div class="mgl-skeleton-horizontal" style=(format!("min-height: {}px;", image_height)) {
            div style=(format!("display: flex; height: {}px; overflow: hidden;", image_height)) {
                @for i in 0..8u32 {
                    // 0.7, 1.0 and 1.3 times the row height
                    @let width = f64::from(image_height) * f64::from(7 + (i % 3) * 3) / 10.0;
                    div class="mgl-skeleton-item" style=(format!(
                        "height: 100%; width: {}px; flex-shrink: 0; padding: 0 {}px; {}",
                        px(width),
                        half(gutter),
                        ITEM_STYLE
                    )) {
                        (shimmer())
                    }
                }
            }
        }
    }
}

fn map(height: u32) -> Markup {
    html! {
        div class="mgl-skeleton-map" style=(format!(
            "height: {}px; background-color: #f0f0f0; display: flex; align-items: center; justify-content: center; position: relative; border-radius: 4px; overflow: hidden;",
            height
        )) {
            (shimmer())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{CompositionRequest, HookChain, OptionResolver};
    use crate::layouts::LayoutDescriptor;
    use crate::options::PluginOptions;
    use std::collections::BTreeMap;

    fn options(layout: Layout, request: CompositionRequest) -> ResolvedOptions {
        let defaults = PluginOptions::default();
        let hooks = HookChain::new();
        OptionResolver::new(&defaults, &hooks, String::new()).resolve(
            &request,
            &BTreeMap::new(),
            &LayoutDescriptor::of(layout),
            &[1, 2, 3],
            false,
            false,
        )
    }

    fn render(layout: Layout, options: &ResolvedOptions) -> String {
        synthesize(layout, options).into_string()
    }

    #[test]
    fn test_px_formatting() {
        assert_eq!(half(5), "2.5");
        assert_eq!(half(10), "5");
        assert_eq!(negative_half(0), "0");
        assert_eq!(negative_half(5), "-2.5");
    }

    #[test]
    fn test_skeleton_is_deterministic() {
        let opts = options(Layout::Masonry, CompositionRequest::new());
        for layout in Layout::ALL {
            assert_eq!(render(layout, &opts), render(layout, &opts));
        }
    }

    #[test]
    fn test_unknown_name_uses_tiles() {
        let opts = options(Layout::Tiles, CompositionRequest::new());
        assert_eq!(
            synthesize_named("mosaic", &opts).into_string(),
            render(Layout::Tiles, &opts)
        );
        assert_eq!(
            synthesize_named("map", &opts).into_string(),
            render(Layout::Map, &opts)
        );
    }

    #[test]
    fn test_masonry_uses_resolved_values() {
        let opts = options(
            Layout::Masonry,
            CompositionRequest::new().with("columns", "4").with("gutter", "8"),
        );
        let html = render(Layout::Masonry, &opts);
        assert!(html.starts_with(r#"<div class="mgl-gallery-skeleton" style="opacity: 1;"><div class="mgl-skeleton-masonry" style="column-count: 4; margin: -4px;">"#));
        assert_eq!(html.matches(r#"class="mgl-skeleton-item""#).count(), 6);
        assert!(html.contains("height: 400px; padding: 4px;"));
    }

    #[test]
    fn test_tile_rows_follow_patterns() {
        let opts = options(Layout::Tiles, CompositionRequest::new());
        let html = render(Layout::Tiles, &opts);
        assert_eq!(html.matches("mgl-skeleton-row").count(), 3);
        // "oo" + "oio" + "ooo"
        assert_eq!(html.matches("mgl-skeleton-box").count(), 8);
        assert_eq!(html.matches("aspect-ratio: 2/3").count(), 1);
    }

    #[test]
    fn test_square_and_horizontal() {
        let opts = options(Layout::Square, CompositionRequest::new());
        let html = render(Layout::Square, &opts);
        assert_eq!(html.matches(r#"class="mgl-skeleton-item""#).count(), 10);
        assert!(html.contains("width: calc(100% / 5)"));

        let opts = options(Layout::Horizontal, CompositionRequest::new().with("image_height", "300"));
        let html = render(Layout::Horizontal, &opts);
        assert!(html.contains("min-height: 300px;"));
        assert!(html.contains("width: 210px;"));
        assert!(html.contains("width: 390px;"));
    }

    #[test]
    fn test_square_placeholder_count_is_bounded() {
        for columns in ["200000", "2147483648", "4294967295"] {
            let opts = options(Layout::Square, CompositionRequest::new().with("columns", columns));
            let html = render(Layout::Square, &opts);
            assert_eq!(
                html.matches(r#"class="mgl-skeleton-item""#).count(),
                2 * MAX_COLUMNS as usize
            );
        }

        let mut opts = options(Layout::Square, CompositionRequest::new());
        opts.blocks.square.square_columns = u32::MAX;
        let html = render(Layout::Square, &opts);
        assert_eq!(
            html.matches(r#"class="mgl-skeleton-item""#).count(),
            2 * MAX_COLUMNS as usize
        );
        assert!(html.contains(&format!("width: calc(100% / {})", MAX_COLUMNS)));
    }

    #[test]
    fn test_map_height() {
        let opts = options(Layout::Map, CompositionRequest::new().with("map_height", "320"));
        assert!(render(Layout::Map, &opts).contains("height: 320px;"));
    }
}
