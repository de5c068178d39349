// Gallery module - the composition pipeline
mod core;
mod descriptor;
mod envelope;
mod error;
mod hooks;
mod layout_options;
mod options;
mod ordering;
mod request;
mod resolver;
mod sanitize;
mod skeleton;
mod types;

pub use self::core::{Capabilities, Composer, ComposerBuilder, Composition, INITIAL_WINDOW};
pub use descriptor::DescriptorAssembler;
pub use envelope::{ATTS_ATTR, EnvelopeBuilder, IMAGES_ATTR, OPTIONS_ATTR, read_payload};
pub use error::GalleryError;
pub use hooks::{GalleryHooks, HookChain};
pub use layout_options::{
    CarouselOptions, CascadeOptions, HorizontalOptions, JustifiedOptions, LayoutOptions,
    LayoutSet, MAX_COLUMNS, MapOptions, MasonryOptions, SquareOptions, TilesOptions,
};
pub use options::{OptionResolver, ResolvedOptions, select_layout};
pub use ordering::{ImageOrderer, MetadataOrderer, apply_order, order_rule};
pub use request::{AttrValue, CompositionRequest};
pub use resolver::{CompositionContext, ImageSetResolver, PREVIEW_LIMIT, ResolvedSet};
pub use sanitize::{decode_entities, escape_attr, sanitize_caption, sanitize_url};
pub use skeleton::{synthesize, synthesize_named};
pub use types::*;
