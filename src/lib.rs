use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod collection;
pub mod gallery;
pub mod layouts;
pub mod library;
pub mod options;
pub mod startup_checks;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub library: LibraryConfig,
    pub options: OptionsConfig,
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// JSON manifest with media, posts, galleries and collections.
    pub manifest: PathBuf,
    /// Overrides the manifest's base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Where uploaded files live, for reading EXIF GPS data.
    #[serde(default)]
    pub uploads_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptionsConfig {
    /// JSON document backing the option store.
    pub store: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CapabilitiesConfig {
    #[serde(default)]
    pub extension: bool,
    #[serde(default)]
    pub exif_gps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Tessera".to_string(),
                log_level: "info".to_string(),
            },
            library: LibraryConfig {
                manifest: PathBuf::from("library.json"),
                base_url: None,
                uploads_directory: None,
            },
            options: OptionsConfig {
                store: PathBuf::from("data/options.json"),
            },
            capabilities: CapabilitiesConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Library error: {0}")]
    Library(#[from] library::LibraryError),
    #[error("Option store error: {0}")]
    Options(#[from] options::OptionStoreError),
}

use axum::Router;
use gallery::{Capabilities, Composer};
use library::{DynGalleryRepository, ExifGpsReader, GpsReader, Library, MetadataGpsReader};
use options::{JsonFileOptionStore, Settings};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<Composer>,
    pub galleries: DynGalleryRepository,
    pub settings: Arc<Settings>,
    pub config: Config,
}

impl AppState {
    /// Loads the library manifest and opens the option store.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let mut library = Library::load(&config.library.manifest)?;
        if let Some(base_url) = &config.library.base_url {
            library = library.with_base_url(base_url);
        }
        let library = Arc::new(library);

        let store = JsonFileOptionStore::open(&config.options.store)?;
        let settings = Arc::new(Settings::new(Arc::new(store)));

        let mut builder = Composer::builder(
            library.clone(),
            library.clone(),
            library.clone(),
            settings.clone(),
        )
        .capabilities(Capabilities {
            extension: config.capabilities.extension,
        });
        if config.capabilities.extension {
            let gps: Arc<dyn GpsReader> = match &config.library.uploads_directory {
                Some(uploads) if config.capabilities.exif_gps => {
                    Arc::new(ExifGpsReader::new(uploads.clone()))
                }
                _ => Arc::new(MetadataGpsReader),
            };
            builder = builder.gps(gps);
        }

        Ok(Self {
            composer: Arc::new(builder.build()),
            galleries: library,
            settings,
            config: config.clone(),
        })
    }
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/gallery", axum::routing::get(api::gallery_handler))
        .route(
            "/api/gallery/preview",
            axum::routing::get(api::gallery_preview_handler),
        )
        .route(
            "/api/galleries",
            axum::routing::get(api::list_galleries_handler),
        )
        .route(
            "/api/collections",
            axum::routing::get(api::list_collections_handler),
        )
        .route(
            "/api/collections/{id}",
            axum::routing::get(api::collection_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let method = request.method();
                    let uri = request.uri();
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %method,
                        uri = %uri,
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}
