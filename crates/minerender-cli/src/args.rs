//! Command-line arguments.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use minerender_assets::{AssetSource, DirectorySource, HttpSource};
use minerender_world::{BatchConfig, WorldConfig};

/// Default number of chunks along each world axis.
const DEFAULT_WORLD_SIZE: u32 = 4;
/// Default number of placements in flight per batch.
const DEFAULT_BATCH_SIZE: usize = 64;
/// Default pause between batches in milliseconds.
const DEFAULT_BATCH_INTERVAL_MS: u64 = 5;

#[derive(Parser, Debug)]
#[command(about = "Place a block structure into a MineRender world")]
pub struct CliArgs {
    /// Structure file: `{"blocks": [{"type": "stone", "position": [0, 0, 0]}]}`.
    pub structure: PathBuf,

    /// Primary asset location: a resource pack directory or an http(s) base URL.
    #[arg(long, default_value = ".")]
    pub assets: String,

    /// Fallback asset location used when the primary one has no asset.
    #[arg(long)]
    pub defaults: Option<String>,

    /// Directory for persistent caches.
    #[arg(long, default_value = ".minerender-cache")]
    pub cache_dir: PathBuf,

    /// Chunks along each world axis.
    #[arg(long, default_value_t = DEFAULT_WORLD_SIZE)]
    pub world_size: u32,

    /// Placements in flight per batch.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Pause between batches in milliseconds.
    #[arg(long, default_value_t = DEFAULT_BATCH_INTERVAL_MS)]
    pub batch_interval_ms: u64,

    /// Start every placement at once instead of batching.
    #[arg(long)]
    pub no_batches: bool,

    /// Give every block its own scene object instead of pooling by state.
    #[arg(long)]
    pub no_instancing: bool,

    /// Wipe the persistent texture metadata cache before loading.
    #[arg(long)]
    pub clear_cache: bool,
}

impl CliArgs {
    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            size: self.world_size,
            batch: BatchConfig {
                batch_size: self.batch_size,
                interval: Duration::from_millis(self.batch_interval_ms),
            },
            instance_blocks: !self.no_instancing,
        }
    }
}

/// Build an asset source from a location argument.
///
/// Locations starting with `http://` or `https://` are fetched over HTTP;
/// anything else is a directory.
pub fn source_for(location: &str) -> Arc<dyn AssetSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let base = if location.ends_with('/') {
            location.to_owned()
        } else {
            format!("{location}/")
        };
        Arc::new(HttpSource::new(base))
    } else {
        Arc::new(DirectorySource::new(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["minerender", "house.json"]).unwrap();
        assert_eq!(args.structure, PathBuf::from("house.json"));
        assert!(!args.no_batches && !args.clear_cache);

        let config = args.world_config();
        assert_eq!(config.size, 4);
        assert_eq!(config.batch, BatchConfig::default());
        assert!(config.instance_blocks);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "minerender",
            "--world-size",
            "8",
            "--batch-size",
            "16",
            "--no-batches",
            "--no-instancing",
            "--defaults",
            "https://assets.example/",
            "tower.json",
        ])
        .unwrap();
        let config = args.world_config();
        assert_eq!(config.size, 8);
        assert_eq!(config.batch.batch_size, 16);
        assert!(args.no_batches);
        assert!(!config.instance_blocks);
        assert_eq!(args.defaults.as_deref(), Some("https://assets.example/"));
    }

    #[test]
    fn test_source_for() {
        assert_eq!(source_for("packs/vanilla").describe(), "directory packs/vanilla");
        assert_eq!(
            source_for("https://assets.example/mc").describe(),
            "http https://assets.example/mc/"
        );
    }
}
