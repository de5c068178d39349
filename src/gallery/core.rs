use super::descriptor::DescriptorAssembler;
use super::envelope::EnvelopeBuilder;
use super::ordering::{ImageOrderer, MetadataOrderer, apply_order};
use super::{
    AttrValue, CompositionContext, CompositionRequest, GalleryError, GalleryImages, HookChain,
    ImageSetResolver, OptionResolver, ResolvedOptions, select_layout,
};
use crate::collection::{CollectionRenderer, ExpandingCollectionRenderer};
use crate::layouts::LayoutRegistry;
use crate::library::{
    DynGalleryRepository, DynMediaProvider, DynPostProvider, GpsReader, MediaId,
};
use crate::options::Settings;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Ids rendered up front when infinite loading is on.
pub const INITIAL_WINDOW: usize = 12;

/// Environment switches passed in by the host instead of detected at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The extension edition is present: infinite loading and GPS.
    pub extension: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Composition {
    Gallery {
        markup: String,
        options: Box<ResolvedOptions>,
        images: GalleryImages,
    },
    /// Rendered by the collection delegate.
    Delegated { markup: String },
}

impl Composition {
    pub fn markup(&self) -> &str {
        match self {
            Composition::Gallery { markup, .. } | Composition::Delegated { markup } => markup,
        }
    }

    pub fn into_markup(self) -> String {
        match self {
            Composition::Gallery { markup, .. } | Composition::Delegated { markup } => markup,
        }
    }
}

/// Runs the whole pipeline, from call-site attributes to the markup envelope.
pub struct Composer {
    repository: DynGalleryRepository,
    media: DynMediaProvider,
    posts: DynPostProvider,
    settings: Arc<Settings>,
    registry: LayoutRegistry,
    hooks: HookChain,
    orderer: Arc<dyn ImageOrderer>,
    gps: Option<Arc<dyn GpsReader>>,
    collections: Arc<dyn CollectionRenderer>,
    capabilities: Capabilities,
}

pub struct ComposerBuilder {
    repository: DynGalleryRepository,
    media: DynMediaProvider,
    posts: DynPostProvider,
    settings: Arc<Settings>,
    registry: LayoutRegistry,
    hooks: HookChain,
    orderer: Option<Arc<dyn ImageOrderer>>,
    gps: Option<Arc<dyn GpsReader>>,
    collections: Option<Arc<dyn CollectionRenderer>>,
    capabilities: Capabilities,
}

impl ComposerBuilder {
    pub fn registry(mut self, registry: LayoutRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn hooks(mut self, hooks: HookChain) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn orderer(mut self, orderer: Arc<dyn ImageOrderer>) -> Self {
        self.orderer = Some(orderer);
        self
    }

    pub fn gps(mut self, gps: Arc<dyn GpsReader>) -> Self {
        self.gps = Some(gps);
        self
    }

    pub fn collections(mut self, collections: Arc<dyn CollectionRenderer>) -> Self {
        self.collections = Some(collections);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn build(self) -> Composer {
        let orderer = self
            .orderer
            .unwrap_or_else(|| Arc::new(MetadataOrderer::new(self.media.clone())));
        let collections = self
            .collections
            .unwrap_or_else(|| Arc::new(ExpandingCollectionRenderer::new(self.repository.clone())));
        Composer {
            repository: self.repository,
            media: self.media,
            posts: self.posts,
            settings: self.settings,
            registry: self.registry,
            hooks: self.hooks,
            orderer,
            gps: self.gps,
            collections,
            capabilities: self.capabilities,
        }
    }
}

/// Old block editors send `captions=false`.
fn normalize_captions(request: &mut CompositionRequest) {
    let disabled = match request.get("captions") {
        Some(AttrValue::Bool(false)) => true,
        Some(AttrValue::Text(text)) => text == "false",
        _ => false,
    };
    if disabled {
        request.insert("captions", AttrValue::text("none"));
    }
}

impl Composer {
    pub fn builder(
        repository: DynGalleryRepository,
        media: DynMediaProvider,
        posts: DynPostProvider,
        settings: Arc<Settings>,
    ) -> ComposerBuilder {
        ComposerBuilder {
            repository,
            media,
            posts,
            settings,
            registry: LayoutRegistry::default(),
            hooks: HookChain::new(),
            orderer: None,
            gps: None,
            collections: None,
            capabilities: Capabilities::default(),
        }
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    pub fn registry(&self) -> &LayoutRegistry {
        &self.registry
    }

    /// Composes a gallery. Failures come back as an inline error fragment so
    /// a broken gallery never breaks the page around it.
    pub fn compose(&self, request: &CompositionRequest, context: &CompositionContext) -> String {
        match self.try_compose(request, context) {
            Ok(composition) => composition.into_markup(),
            Err(e) => {
                match &e {
                    GalleryError::EncodingFailure(_) => error!("Gallery composition failed: {}", e),
                    _ => warn!("Gallery composition failed: {}", e),
                }
                e.to_inline_markup()
            }
        }
    }

    pub fn try_compose(
        &self,
        request: &CompositionRequest,
        context: &CompositionContext,
    ) -> Result<Composition, GalleryError> {
        let request = request.sanitized();
        let defaults = self.settings.load();

        if !request.is_empty("collection") {
            let id = request.text("collection").unwrap_or_default();
            debug!("Delegating collection '{}'", id);
            let markup = self.collections.render(self, &id, context)?;
            return Ok(Composition::Delegated { markup });
        }

        let set = ImageSetResolver::new(self.repository.as_ref(), self.posts.as_ref(), &self.hooks)
            .resolve(request, context)?;
        let mut attributes = set.attributes;
        let ids = apply_order(self.orderer.as_ref(), set.ids, &attributes);

        let descriptor = select_layout(
            &attributes,
            set.layout_hint.as_deref(),
            &defaults,
            &self.registry,
        )?;
        let layout = descriptor.layout;

        normalize_captions(&mut attributes);

        let ids = self.hooks.sort_ahead(ids, layout, &attributes);
        self.hooks.on_layout_created(layout);
        self.hooks.on_gallery_created(&attributes, &ids, layout);

        let infinite = defaults.infinite && self.capabilities.extension;
        let options = OptionResolver::new(&defaults, &self.hooks, self.media.uploads_base_url())
            .resolve(
                &attributes,
                &set.stored_options,
                descriptor,
                &ids,
                infinite,
                context.preview,
            );

        let mut window: Vec<MediaId> = self.hooks.sort(ids, &HashMap::new(), layout, &attributes);
        let infinite_layouts = self
            .registry
            .infinite_layouts(infinite && defaults.carousel_infinite);
        if !context.preview && infinite && infinite_layouts.contains(&layout) {
            window.truncate(INITIAL_WINDOW);
        }

        let assembler = DescriptorAssembler {
            media: self.media.as_ref(),
            posts: self.posts.as_ref(),
            gps: self.gps.as_deref(),
            hooks: &self.hooks,
            defaults: &defaults,
        };
        let images = assembler.assemble(
            &window,
            &attributes,
            descriptor,
            &options,
            &set.backing_posts,
        );

        let markup = EnvelopeBuilder {
            hooks: &self.hooks,
            defaults: &defaults,
        }
        .build(&options, &images, &attributes, descriptor)?;

        info!(
            "Composed {} gallery {} with {} of {} images",
            layout,
            options.id,
            images.len(),
            options.image_ids.len()
        );
        Ok(Composition::Gallery {
            markup,
            options: Box::new(options),
            images,
        })
    }
}
