use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marker_sprites::{
    assets::{BackgroundSet, IconResolver, RoutingAssetLoader},
    atlas::InMemoryAtlas,
    batch::{composite_for_features, FeatureCollection},
    compositing::{AssetCompositor, Compositor, ParleyTextPainter},
    config::Config,
    sprites::SpriteCache,
};

#[derive(Parser)]
#[command(name = "marker-sprites")]
#[command(version = "0.1.0")]
#[command(about = "Composite marker label sprites for a GeoJSON feature collection")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// GeoJSON FeatureCollection to composite
    #[arg(short, long, value_name = "FILE")]
    features: PathBuf,

    /// Map zoom level the features are shown at
    #[arg(short, long, default_value_t = 12.0)]
    zoom: f64,

    /// Write every registered sprite here as PNG
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Where to write the annotated features (stdout when omitted)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Slot capacity of the simulated atlas
    #[arg(long, default_value_t = 1000)]
    atlas_capacity: usize,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("marker_sprites={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting marker-sprites v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    let raw = tokio::fs::read_to_string(&cli.features)
        .await
        .with_context(|| format!("Failed to read {}", cli.features.display()))?;
    let mut collection: FeatureCollection = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a FeatureCollection", cli.features.display()))?;

    let loader = Arc::new(RoutingAssetLoader::from_timeout(
        config.assets.request_timeout(),
    ));
    let backgrounds = if config.assets.base_background.is_some() {
        match BackgroundSet::load(&*loader, &config.assets, &config.layout).await {
            Ok(set) => set,
            Err(e) => {
                warn!("Failed to load marker backgrounds, using plain pills: {}", e);
                BackgroundSet::synthesized(&config.layout)
            }
        }
    } else {
        BackgroundSet::synthesized(&config.layout)
    };

    let icons = IconResolver::new(loader.clone(), config.assets.icons.clone(), &config.layout);
    let painter = Arc::new(ParleyTextPainter::from_layout(&config.layout));
    let compositor = Compositor::new(config.layout.clone(), painter);
    let renderer = Arc::new(AssetCompositor::new(
        compositor,
        Arc::new(backgrounds),
        icons,
    ));

    let atlas = Arc::new(InMemoryAtlas::new(cli.atlas_capacity));
    let cache = SpriteCache::new(atlas.clone(), renderer, config.sprites.clone());

    let summary = composite_for_features(&cache, &mut collection.features, cli.zoom).await;
    info!(
        "Batch finished: {} features, {} skipped, {} written, {} failed",
        summary.features, summary.skipped, summary.written, summary.failed
    );

    if let Some(out_dir) = &cli.out_dir {
        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        let mut written = 0;
        for key in atlas.keys() {
            let Some(raster) = atlas.image(&key).and_then(|image| image.to_raster()) else {
                continue;
            };
            let path = out_dir.join(format!("{}.png", key));
            raster
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += 1;
        }
        info!("Wrote {} sprites to {}", written, out_dir.display());
    }

    let annotated = serde_json::to_string_pretty(&collection)?;
    match &cli.output {
        Some(path) => tokio::fs::write(path, annotated)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", annotated),
    }

    let stats = cache.stats();
    info!(
        "Sprite cache: {} entries, {} created, {} evictions, {} failures",
        stats.entries, stats.created, stats.evictions, stats.failures
    );
    Ok(())
}
