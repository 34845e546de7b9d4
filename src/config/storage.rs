//! Local Storage Config

use std::path::PathBuf;

use clap::Args;

/// Local storage settings.
#[derive(Debug, Args)]
pub struct StorageConfig {
    /// Directory holding the persisted cart and session token
    #[arg(long, env = "GENZIKART_STORAGE_DIR", default_value = ".genzikart")]
    pub storage_dir: PathBuf,
}
