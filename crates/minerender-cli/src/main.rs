//! Place a block structure into a MineRender world.
//!
//! Reads a structure JSON file, resolves block states and textures from a
//! resource pack directory or HTTP mirror, and reports what was placed.

mod args;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use minerender_assets::{AssetLoader, Assets, CacheDirectory};
use minerender_world::{MineRenderWorld, MultiBlockStructure, PlacementReport, Scene};

use args::{CliArgs, source_for};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let report = run(&args).await?;
    if !report.failures.is_empty() {
        anyhow::bail!("{} block(s) could not be placed", report.failures.len());
    }
    Ok(())
}

async fn run(args: &CliArgs) -> anyhow::Result<PlacementReport> {
    let structure = load_structure(&args.structure).await?;
    tracing::info!(
        path = %args.structure.display(),
        blocks = structure.blocks.len(),
        "loaded structure"
    );

    let primary = source_for(&args.assets);
    let loader = match &args.defaults {
        Some(defaults) => AssetLoader::with_defaults(primary, source_for(defaults)),
        None => AssetLoader::new(primary),
    };
    tracing::info!(?loader, cache_dir = %args.cache_dir.display(), "asset sources ready");

    let assets = Assets::new(loader, &CacheDirectory::filesystem(&args.cache_dir));
    if args.clear_cache {
        assets
            .textures
            .clear_cache()
            .await
            .context("failed to clear texture metadata cache")?;
        tracing::info!("cleared texture metadata cache");
    }

    let world = MineRenderWorld::with_config(Arc::new(Scene::new()), assets, args.world_config());
    let report = world
        .place_multi_block(&structure, !args.no_batches)
        .await
        .context("failed to place structure")?;

    let stats = world.scene().stats();
    tracing::info!(
        placed = report.placed,
        superseded = report.superseded,
        failed = report.failures.len(),
        chunks = world.chunk_count(),
        objects = stats.object_count,
        pools = stats.pool_count,
        instances = stats.instance_count,
        "done"
    );
    Ok(report)
}

async fn load_structure(path: &Path) -> anyhow::Result<MultiBlockStructure> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;

    use super::*;

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_places_structure_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let pack = dir.path().join("pack");
        write(
            &pack,
            "assets/minecraft/blockstates/stone.json",
            br#"{"variants":{"":{"model":"block/stone"}}}"#,
        );
        let structure = dir.path().join("house.json");
        write(
            dir.path(),
            "house.json",
            br#"{"blocks":[
                {"type":"stone","position":[0,0,0]},
                {"type":"stone","position":[1,0,0]},
                {"type":"stone","position":[99,0,0]}
            ]}"#,
        );

        let args = CliArgs::try_parse_from([
            OsString::from("minerender"),
            "--assets".into(),
            pack.into_os_string(),
            "--cache-dir".into(),
            dir.path().join("cache").into_os_string(),
            "--clear-cache".into(),
            structure.into_os_string(),
        ])
        .unwrap();

        let report = run(&args).await.unwrap();
        assert_eq!(report.placed, 2);
        assert_eq!(report.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_structure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_structure(&dir.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
