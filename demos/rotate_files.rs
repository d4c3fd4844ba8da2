//! Rotating File Segments Example
//!
//! Streams generated log lines through a funnel whose shutoff valve caps
//! each segment file at a byte budget. Every shutoff attaches a fresh
//! segment built from the first bucket entry of the configuration.
//!
//! Run with: cargo run --bin rotate_files [config.toml] [output_dir]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config_loader::ConfigLoader;
use contracts::{BucketConfig, BucketType, ChannelUpstream, Chunk, FunnelConfig};
use funnel::{create_bucket, ByteBudget, DynBucket, Funnel, FunnelDriver, FunnelEvent};
use tokio::sync::mpsc;

const SEGMENT_BYTES: u64 = 512;
const LINES: usize = 200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    // ==== Stage 1: Load config ====
    let config = match args.next() {
        Some(path) => ConfigLoader::load_from_path(Path::new(&path))?,
        None => FunnelConfig {
            name: "rotate_demo".to_string(),
            ..Default::default()
        },
    };
    let output_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("funnel_rotate_demo"));

    observability::init(&config.telemetry).map_err(|e| e.to_string())?;
    tracing::info!(funnel = %config.name, dir = %output_dir.display(), "Starting rotation demo");

    let template = segment_template(&config, &output_dir);

    // ==== Stage 2: Build funnel ====
    let budget = ByteBudget::new(SEGMENT_BYTES);
    let mut funnel: Funnel<DynBucket, ByteBudget> = Funnel::from_config(&config, budget.clone());

    let (shutoff_tx, mut shutoff_rx) = mpsc::unbounded_channel();
    funnel.subscribe(FunnelEvent::Shutoff, move || {
        let _ = shutoff_tx.send(());
    });

    let (line_tx, upstream) = ChannelUpstream::channel("generator", 64);
    let (driver, handle) = FunnelDriver::new(funnel, upstream, 8);
    handle.attach(create_bucket(&segment(&template, 0))?).await?;

    // ==== Stage 3: Rotate on shutoff ====
    let controller = {
        let handle = handle.clone();
        let budget = budget.clone();
        tokio::spawn(async move {
            let mut index = 1;
            while shutoff_rx.recv().await.is_some() {
                budget.reset();
                let bucket = match create_bucket(&segment(&template, index)) {
                    Ok(bucket) => bucket,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create segment");
                        break;
                    }
                };
                if handle.attach(bucket).await.is_err() {
                    break;
                }
                index += 1;
            }
            index
        })
    };

    // ==== Stage 4: Produce ====
    let producer = tokio::spawn(async move {
        for i in 0..LINES {
            let line = format!("line {i:04} level=info msg=\"request served\"\n");
            if line_tx.send(Chunk::text(line)).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    });

    let report = driver.run().await?;
    producer.await?;
    let segments = controller.await?;

    // ==== Stage 5: Summary ====
    tracing::info!(
        reason = ?report.reason,
        stranded = report.stranded.len(),
        segments,
        "Demo finished"
    );

    let metrics = report.metrics;
    println!("=== Funnel Summary ===");
    println!("Ingested: {}", metrics.ingested_count);
    println!("Delivered: {}", metrics.delivered_count);
    println!("Shutoffs: {}", metrics.shutoff_count);
    println!("Segments:");
    let mut paths: Vec<_> = std::fs::read_dir(&output_dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<_, _>>()?;
    paths.sort();
    for path in paths {
        let bytes = std::fs::metadata(&path)?.len();
        println!("  {}: {bytes} bytes", path.display());
    }

    Ok(())
}

/// First configured file bucket, or a default one under `dir`
fn segment_template(config: &FunnelConfig, dir: &Path) -> BucketConfig {
    config
        .buckets
        .iter()
        .find(|bucket| bucket.bucket_type == BucketType::File)
        .cloned()
        .unwrap_or_else(|| BucketConfig {
            name: "segment".to_string(),
            bucket_type: BucketType::File,
            high_water_mark: 4096,
            params: HashMap::from([(
                "path".to_string(),
                dir.join("segment-{timestamp}.log").display().to_string(),
            )]),
        })
}

/// Bucket config for segment `index`
fn segment(template: &BucketConfig, index: usize) -> BucketConfig {
    let mut config = template.clone();
    config.name = format!("{}-{index:03}", template.name);
    if let Some(path) = config.params.get_mut("path") {
        *path = path.replace("{timestamp}", &format!("{index:03}-{{timestamp}}"));
    }
    config
}
