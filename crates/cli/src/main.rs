//! Compositar CLI - annual cloud-free composite synthesis

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use compositar_algorithms::classification::{binarize, otsu_threshold_for};
use compositar_algorithms::pipeline::{run_pipeline, ExportSink, PipelineParams, SceneSource};
use compositar_algorithms::statistics::HistogramParams;
use compositar_core::io::{read_geotiff, write_geotiff};
use compositar_core::{BandStack, Error, Raster, Region, Scene, LANDSAT_SR_BANDS};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "compositar")]
#[command(author, version, about = "Annual cloud-free Landsat composite synthesis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the yearly compositing pipeline over a scene archive
    Run {
        /// Scene archive: one subdirectory per scene with band GeoTIFFs
        /// (SR_B1.tif .. SR_B7.tif, QA_PIXEL.tif) and a metadata.json
        #[arg(long)]
        scenes: PathBuf,
        /// Output directory for composites, classifications and summary
        #[arg(long)]
        output: PathBuf,
        /// First year to process
        #[arg(long, default_value = "2013")]
        start_year: i32,
        /// Last year to process (inclusive)
        #[arg(long, default_value = "2024")]
        end_year: i32,
        /// Study-area bounding box as "min_x,min_y,max_x,max_y"; full grid
        /// when omitted
        #[arg(long)]
        bounds: Option<String>,
        /// Largest gap (in pixels) eligible for spatial interpolation
        #[arg(long, default_value = "100")]
        small_gap_max: usize,
        /// Focal mean radius (in cells) for spatial interpolation
        #[arg(long, default_value = "2")]
        fill_radius: usize,
        /// Histogram bin count for Otsu thresholding
        #[arg(long, default_value = "255")]
        bins: usize,
    },
    /// Otsu threshold of a single raster
    Threshold {
        /// Input raster file
        input: PathBuf,
        /// Optional output file for the binarized raster
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Histogram bin count
        #[arg(long, default_value = "255")]
        bins: usize,
    },
}

// ─── Scene archive ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SceneMetadata {
    id: Option<String>,
    year: i32,
    cloud_cover: f64,
}

struct SceneEntry {
    id: String,
    year: i32,
    cloud_cover: f64,
    dir: PathBuf,
}

/// Scene source over a directory archive, loading bands lazily per year
struct DirectorySceneSource {
    entries: Vec<SceneEntry>,
}

impl DirectorySceneSource {
    fn scan(root: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for item in fs::read_dir(root)
            .with_context(|| format!("Cannot read scene archive {}", root.display()))?
        {
            let dir = item?.path();
            if !dir.is_dir() {
                continue;
            }
            let meta_path = dir.join("metadata.json");
            if !meta_path.is_file() {
                warn!("skipping {}: no metadata.json", dir.display());
                continue;
            }
            let meta: SceneMetadata = serde_json::from_reader(
                fs::File::open(&meta_path)
                    .with_context(|| format!("Cannot open {}", meta_path.display()))?,
            )
            .with_context(|| format!("Invalid metadata in {}", meta_path.display()))?;
            let id = meta.id.unwrap_or_else(|| {
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            entries.push(SceneEntry {
                id,
                year: meta.year,
                cloud_cover: meta.cloud_cover,
                dir,
            });
        }
        entries.sort_by(|a, b| (a.year, &a.id).cmp(&(b.year, &b.id)));
        Ok(Self { entries })
    }

    fn load_scene(entry: &SceneEntry) -> compositar_core::Result<Scene> {
        let bands = LANDSAT_SR_BANDS
            .iter()
            .map(|&name| read_geotiff::<f64, _>(entry.dir.join(format!("{}.tif", name))))
            .collect::<compositar_core::Result<Vec<_>>>()?;
        let stack = BandStack::landsat_sr(bands)?;
        let qa: Raster<u16> = read_geotiff(entry.dir.join("QA_PIXEL.tif"))?;
        Scene::new(entry.id.clone(), entry.year, entry.cloud_cover, stack, qa)
    }

    /// The reference band of the first archived scene, for grid metadata
    fn reference_band(&self) -> Result<Raster<f64>> {
        let entry = self
            .entries
            .first()
            .context("Scene archive contains no scenes")?;
        let path = entry.dir.join(format!("{}.tif", LANDSAT_SR_BANDS[0]));
        read_geotiff(&path).with_context(|| format!("Cannot read {}", path.display()))
    }
}

impl SceneSource for DirectorySceneSource {
    fn scenes_for_year(&self, year: i32) -> compositar_core::Result<Vec<Scene>> {
        self.entries
            .iter()
            .filter(|e| e.year == year)
            .map(Self::load_scene)
            .collect()
    }
}

// ─── Export sink ────────────────────────────────────────────────────────

/// Writes each year's products as GeoTIFFs under the output directory
struct GeoTiffSink {
    dir: PathBuf,
    progress: ProgressBar,
}

impl ExportSink for GeoTiffSink {
    fn export_composite(&mut self, year: i32, composite: &BandStack) -> compositar_core::Result<()> {
        for (name, band) in composite.iter() {
            let path = self.dir.join(format!("composite_{}_{}.tif", year, name));
            write_geotiff(band, path)?;
        }
        self.progress.inc(1);
        Ok(())
    }

    fn export_index(
        &mut self,
        year: i32,
        name: &str,
        index: &Raster<f64>,
    ) -> compositar_core::Result<()> {
        let path = self
            .dir
            .join(format!("{}_{}.tif", name.to_lowercase(), year));
        write_geotiff(index, path)
    }

    fn export_classification(
        &mut self,
        year: i32,
        threshold: f64,
        classified: &Raster<u8>,
    ) -> compositar_core::Result<()> {
        info!(year, threshold, "writing built-up classification");
        write_geotiff(classified, self.dir.join(format!("builtup_{}.tif", year)))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn year_bar(years: u64) -> ProgressBar {
    let pb = ProgressBar::new(years);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.green} {pos}/{len} years {msg}")
            .unwrap(),
    );
    pb
}

fn parse_bounds(s: &str) -> Result<(f64, f64, f64, f64)> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        anyhow::bail!("Bounds must be 'min_x,min_y,max_x,max_y', got: {}", s);
    }
    let min_x: f64 = parts[0].parse().context("Invalid min_x")?;
    let min_y: f64 = parts[1].parse().context("Invalid min_y")?;
    let max_x: f64 = parts[2].parse().context("Invalid max_x")?;
    let max_y: f64 = parts[3].parse().context("Invalid max_y")?;
    if min_x >= max_x || min_y >= max_y {
        anyhow::bail!("Degenerate bounds: {}", s);
    }
    Ok((min_x, min_y, max_x, max_y))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            scenes,
            output,
            start_year,
            end_year,
            bounds,
            small_gap_max,
            fill_radius,
            bins,
        } => {
            let source = DirectorySceneSource::scan(&scenes)?;
            info!(scene_count = source.entries.len(), "scene archive indexed");

            let reference = source.reference_band()?;
            let (rows, cols) = reference.shape();
            let region = match bounds.as_deref() {
                Some(s) => {
                    let (min_x, min_y, max_x, max_y) = parse_bounds(s)?;
                    let region = Region::from_bounds(
                        min_x,
                        min_y,
                        max_x,
                        max_y,
                        reference.transform(),
                        rows,
                        cols,
                    );
                    if region.pixel_count() == 0 {
                        anyhow::bail!("Bounds {} select no pixels on the scene grid", s);
                    }
                    region
                }
                None => Region::full(rows, cols),
            };
            info!(
                rows,
                cols,
                region_pixels = region.pixel_count(),
                "study grid"
            );

            fs::create_dir_all(&output)
                .with_context(|| format!("Cannot create output directory {}", output.display()))?;

            let mut params = PipelineParams {
                start_year,
                end_year,
                ..Default::default()
            };
            params.cascade.small_gap_max = small_gap_max;
            params.cascade.fill_radius = fill_radius;
            params.histogram.bins = bins;

            let mut sink = GeoTiffSink {
                dir: output.clone(),
                progress: year_bar((end_year - start_year + 1) as u64),
            };

            let start = Instant::now();
            let summaries = run_pipeline(&source, &region, &mut sink, &params)
                .map_err(|e| anyhow::anyhow!("Pipeline failed: {}", e))?;
            sink.progress.finish_and_clear();

            let summary_path = output.join("summary.json");
            let file = fs::File::create(&summary_path)
                .with_context(|| format!("Cannot create {}", summary_path.display()))?;
            serde_json::to_writer_pretty(file, &summaries).context("Cannot write summary")?;

            println!("Processed {} years in {:.2?}", summaries.len(), start.elapsed());
            for s in &summaries {
                let worst = s
                    .diagnostics
                    .iter()
                    .map(|d| d.missing_percent)
                    .fold(0.0f64, f64::max);
                match s.threshold {
                    Some(t) => println!(
                        "  {}: NDBI threshold {:.4}, worst band missing {:.1}%",
                        s.year, t, worst
                    ),
                    None => println!(
                        "  {}: no usable threshold, worst band missing {:.1}%",
                        s.year, worst
                    ),
                }
            }
            println!("Outputs saved to: {}", output.display());
        }

        Commands::Threshold {
            input,
            output,
            bins,
        } => {
            let pb = spinner("Reading raster...");
            let raster: Raster<f64> = read_geotiff(&input)
                .with_context(|| format!("Cannot read {}", input.display()))?;
            pb.finish_and_clear();

            let (rows, cols) = raster.shape();
            let region = Region::full(rows, cols);
            let params = HistogramParams {
                bins,
                ..Default::default()
            };

            let start = Instant::now();
            let threshold = otsu_threshold_for(&raster, &region, &params).map_err(|e| match e {
                Error::Algorithm(_) => anyhow::anyhow!(
                    "No usable threshold: the histogram has no valid foreground/background split"
                ),
                other => anyhow::anyhow!("Thresholding failed: {}", other),
            })?;
            let elapsed = start.elapsed();

            println!("Otsu threshold: {:.6}", threshold);
            println!("  Processing time: {:.2?}", elapsed);

            if let Some(path) = output {
                let classified = binarize(&raster, threshold);
                write_geotiff(&classified, &path)
                    .with_context(|| format!("Cannot write {}", path.display()))?;
                println!("Binarized raster saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
