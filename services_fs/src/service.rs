//! Filesystem service lifecycle

use crate::config::FsConfig;
use crate::registry::{ArchiveIdCode, ArchiveRegistry};
use crate::save_data::{self, MediaType};
use fs_backend::HostDirectoryArchiveFactory;
use fs_result::ResultVal;
use tracing::{error, info};

/// A running filesystem service: one registry plus its configuration
pub struct FsService {
    registry: ArchiveRegistry,
    config: FsConfig,
}

impl FsService {
    /// Creates the registry and registers the built-in archives
    ///
    /// An archive whose host directory cannot be prepared is logged and left
    /// unregistered; opening it later reports "not found".
    pub fn start(config: FsConfig) -> Self {
        let registry = ArchiveRegistry::new();
        if config.register_default_archives {
            let sdmc = HostDirectoryArchiveFactory::new("SDMC", &config.sdmc_directory);
            match sdmc.initialize() {
                Ok(()) => registry.register_archive(Box::new(sdmc), ArchiveIdCode::Sdmc),
                Err(e) => error!(error = %e, "can't instantiate SDMC archive"),
            }
        }
        info!(
            sdmc = %config.sdmc_directory.display(),
            nand = %config.nand_directory.display(),
            "filesystem service started"
        );
        Self { registry, config }
    }

    pub fn registry(&self) -> &ArchiveRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub fn create_ext_save_data(&self, media: MediaType, high: u32, low: u32) -> ResultVal<()> {
        save_data::create_ext_save_data(&self.config, media, high, low)
    }

    pub fn delete_ext_save_data(&self, media: MediaType, high: u32, low: u32) -> ResultVal<()> {
        save_data::delete_ext_save_data(&self.config, media, high, low)
    }

    pub fn create_system_save_data(&self, high: u32, low: u32) -> ResultVal<()> {
        save_data::create_system_save_data(&self.config, high, low)
    }

    pub fn delete_system_save_data(&self, high: u32, low: u32) -> ResultVal<()> {
        save_data::delete_system_save_data(&self.config, high, low)
    }

    /// Closes every archive and forgets every factory
    pub fn shutdown(&self) {
        self.registry.shutdown();
        info!("filesystem service stopped");
    }
}
