use crate::Config;
use crate::library::Library;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Library manifest does not exist: {0}")]
    LibraryManifestMissing(String),

    #[error("Library manifest cannot be read: {0}")]
    LibraryManifestInvalid(String),

    #[error("Failed to create option store directory: {0}")]
    OptionStoreDirectoryCreationFailed(#[from] std::io::Error),

    #[error("Uploads directory does not exist: {0}")]
    UploadsDirectoryMissing(String),
}

impl StartupCheckError {
    /// Without a readable manifest there is nothing to compose from.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            StartupCheckError::LibraryManifestMissing(_)
                | StartupCheckError::LibraryManifestInvalid(_)
                | StartupCheckError::OptionStoreDirectoryCreationFailed(_)
        )
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let manifest = &config.library.manifest;
    if !manifest.exists() {
        error!("Library manifest does not exist: {:?}", manifest);
        errors.push(StartupCheckError::LibraryManifestMissing(
            manifest.display().to_string(),
        ));
    } else {
        match Library::load(manifest) {
            Ok(library) => info!(
                "Library manifest is readable: {} galleries, {} collections",
                library.manifest().galleries.as_ref().map_or(0, Vec::len),
                library.manifest().collections.as_ref().map_or(0, Vec::len)
            ),
            Err(e) => {
                error!("Library manifest {:?} cannot be read: {}", manifest, e);
                errors.push(StartupCheckError::LibraryManifestInvalid(e.to_string()));
            }
        }
    }

    if let Some(store_dir) = config.options.store.parent()
        && !store_dir.as_os_str().is_empty()
    {
        if !store_dir.exists() {
            info!("Option store directory does not exist, creating: {:?}", store_dir);
            if let Err(e) = tokio::fs::create_dir_all(store_dir).await {
                error!("Failed to create option store directory: {}", e);
                errors.push(StartupCheckError::OptionStoreDirectoryCreationFailed(e));
            }
        } else {
            info!("Option store directory exists: {:?}", store_dir);
        }
    }

    if config.capabilities.exif_gps {
        match &config.library.uploads_directory {
            Some(uploads) if uploads.exists() => {
                info!("Uploads directory exists: {:?}", uploads)
            }
            Some(uploads) => {
                warn!("Uploads directory does not exist: {:?}", uploads);
                errors.push(StartupCheckError::UploadsDirectoryMissing(
                    uploads.display().to_string(),
                ));
            }
            None => {
                warn!("EXIF GPS is enabled but no uploads directory is configured");
                errors.push(StartupCheckError::UploadsDirectoryMissing(String::new()));
            }
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
