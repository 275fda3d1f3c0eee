//! FloodScope CLI - flood extent analysis from a DEM and two spectral bands

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use floodscope_algorithms::hydrology::{condition_dem, ConditioningParams, FillMethod};
use floodscope_algorithms::imagery::mndwi_water_mask;
use floodscope_algorithms::interpolation::{
    flood_extent_from_gauges, gauge_points, GaugeExtentParams, IdwParams,
};
use floodscope_core::io::{read_geojson, read_geotiff, write_geojson, write_geotiff};
use floodscope_core::Raster;
use floodscope_pipeline::{
    run_analysis_with, vectorize_mask, AnalysisConfig, AnalysisInputs, AnalysisStatus,
    AreaProjectionConfig, FillMethodConfig, PermanentWaterSource,
};
use floodscope_render::{render_geojson_files, RenderParams};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "floodscope")]
#[command(author, version, about = "Flood extent analysis", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Run the full flood analysis and print its result as JSON
    Analyze(AnalyzeArgs),
    /// DEM conditioning
    Hydrology {
        #[command(subcommand)]
        algorithm: HydrologyCommands,
    },
    /// MNDWI water mask from green and SWIR bands
    Mndwi {
        /// Green band
        green: PathBuf,
        /// Short-wave infrared band
        swir: PathBuf,
        /// Output mask
        output: PathBuf,
    },
    /// Vectorize a binary mask to GeoJSON (EPSG:4326)
    Polygonize {
        /// Input mask
        input: PathBuf,
        /// Output GeoJSON
        output: PathBuf,
        /// Minimum region size in pixels
        #[arg(short, long, default_value = "100")]
        min_pixels: usize,
        /// Area projection: auto, web_mercator, utm
        #[arg(short, long, default_value = "auto")]
        area_projection: String,
    },
    /// Flood polygons from an IDW water-level surface over gauge points
    GaugeExtent {
        /// GeoJSON point layer with water levels
        input: PathBuf,
        /// Output GeoJSON
        output: PathBuf,
        /// Attribute holding the water level
        #[arg(short, long, default_value = "level")]
        field: String,
        /// Interpolation cell size in layer units
        #[arg(short, long, default_value = "0.001")]
        pixel_size: f64,
        /// Cells strictly above this level are flooded
        #[arg(short, long, default_value = "0")]
        level: f64,
        /// IDW distance exponent
        #[arg(long, default_value = "2")]
        power: f64,
        /// Minimum region size in pixels
        #[arg(short, long, default_value = "1")]
        min_pixels: usize,
    },
    /// Render lost/gained/persistent GeoJSON layers to a PNG map
    Render {
        /// Lost water layer (permanent only)
        lost: PathBuf,
        /// Gained water layer (spectral only)
        gained: PathBuf,
        /// Persistent water layer
        persistent: PathBuf,
        /// Output PNG
        output: PathBuf,
        /// Bounds sidecar JSON (defaults to `<output>_bounds.json`)
        #[arg(short, long)]
        bounds: Option<PathBuf>,
        /// Longest side of the image in pixels
        #[arg(long, default_value = "1024")]
        max_dimension: u32,
        /// Alpha of class pixels
        #[arg(long, default_value = "180")]
        opacity: u8,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Elevation model
    #[arg(long)]
    dem: PathBuf,
    /// Green band
    #[arg(long)]
    green: PathBuf,
    /// Short-wave infrared band
    #[arg(long)]
    swir: PathBuf,
    /// Directory for every artifact
    #[arg(short, long)]
    output_dir: PathBuf,
    /// Analysis identifier
    #[arg(long, default_value = "1")]
    id: String,
    /// Analysis name (spaces become underscores in file names)
    #[arg(long, default_value = "analysis")]
    name: String,
    /// JSON configuration file; the flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Permanent water strategy: vector, accumulation, dem_threshold
    #[arg(short, long)]
    strategy: Option<String>,
    /// Permanent water polygons (vector strategy)
    #[arg(long)]
    vector: Option<PathBuf>,
    /// Accumulation threshold in cells (accumulation strategy)
    #[arg(short, long)]
    threshold: Option<u64>,
    /// Height threshold (dem_threshold strategy)
    #[arg(long)]
    height: Option<f64>,
    /// Fill method: priority_flood, planchon_darboux
    #[arg(short, long)]
    fill_method: Option<String>,
    /// The DEM is already depression-free
    #[arg(long)]
    already_filled: bool,
    /// Minimum polygon size in pixels
    #[arg(short, long)]
    min_pixels: Option<usize>,
    /// Area projection: auto, web_mercator, utm
    #[arg(short, long)]
    area_projection: Option<String>,
    /// Also write the conditioned DEM
    #[arg(long)]
    write_filled_dem: bool,
    /// Also write the permanent-vs-spectral difference raster
    #[arg(long)]
    write_difference_map: bool,
}

// ─── Hydrology subcommands ──────────────────────────────────────────────

#[derive(Subcommand)]
enum HydrologyCommands {
    /// Fill depressions in a DEM
    Fill {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Method: priority_flood, planchon_darboux
        #[arg(short, long, default_value = "priority_flood")]
        method: String,
    },
    /// Condition a DEM and write its D8 flow accumulation
    FlowAccumulation {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Skip depression filling
        #[arg(long)]
        already_filled: bool,
        /// Method: priority_flood, planchon_darboux
        #[arg(short, long, default_value = "priority_flood")]
        method: String,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_band(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result<T: floodscope_core::RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_fill_method(s: &str) -> Result<FillMethodConfig> {
    let cfg = match s {
        "priority_flood" | "priority-flood" => FillMethodConfig::default(),
        "planchon_darboux" | "planchon-darboux" => FillMethodConfig::planchon_darboux(),
        other => anyhow::bail!(
            "Unknown fill method: {}. Use: priority_flood, planchon_darboux",
            other
        ),
    };
    Ok(cfg)
}

fn parse_area_projection(s: &str) -> Result<AreaProjectionConfig> {
    match s {
        "auto" => Ok(AreaProjectionConfig::Auto),
        "web_mercator" | "web-mercator" | "3857" => Ok(AreaProjectionConfig::WebMercator),
        "utm" => Ok(AreaProjectionConfig::Utm),
        other => anyhow::bail!(
            "Unknown area projection: {}. Use: auto, web_mercator, utm",
            other
        ),
    }
}

/// Config file (or defaults) with command-line overrides applied
fn analysis_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut cfg = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let strategy = match (&args.strategy, &args.vector) {
        (Some(s), _) => Some(s.as_str()),
        (None, Some(_)) => Some("vector"),
        (None, None) => None,
    };
    match strategy {
        Some("vector") => {
            let path = args
                .vector
                .clone()
                .context("--vector is required for the vector strategy")?;
            cfg.permanent_water = PermanentWaterSource::Vector { path };
        }
        Some("accumulation") => {
            let threshold = match (&cfg.permanent_water, args.threshold) {
                (_, Some(t)) => t,
                (PermanentWaterSource::Accumulation { threshold }, None) => *threshold,
                _ => 1000,
            };
            cfg.permanent_water = PermanentWaterSource::Accumulation { threshold };
        }
        Some("dem_threshold") | Some("dem-threshold") => {
            let (height, use_filled) = match cfg.permanent_water {
                PermanentWaterSource::DemThreshold { height, use_filled } => (height, use_filled),
                _ => (0.0, false),
            };
            cfg.permanent_water = PermanentWaterSource::DemThreshold {
                height: args.height.unwrap_or(height),
                use_filled,
            };
        }
        Some(other) => anyhow::bail!(
            "Unknown strategy: {}. Use: vector, accumulation, dem_threshold",
            other
        ),
        None => match &mut cfg.permanent_water {
            PermanentWaterSource::Accumulation { threshold } => {
                if let Some(t) = args.threshold {
                    *threshold = t;
                }
            }
            PermanentWaterSource::DemThreshold { height, .. } => {
                if let Some(h) = args.height {
                    *height = h;
                }
            }
            PermanentWaterSource::Vector { .. } => {}
        },
    }

    if let Some(method) = &args.fill_method {
        cfg.fill_method = parse_fill_method(method)?;
    }
    if args.already_filled {
        cfg.dem_already_filled = true;
    }
    if let Some(n) = args.min_pixels {
        cfg.min_polygon_pixels = n;
    }
    if let Some(p) = &args.area_projection {
        cfg.area_projection = parse_area_projection(p)?;
    }
    cfg.write_filled_dem |= args.write_filled_dem;
    cfg.write_difference_map |= args.write_difference_map;
    Ok(cfg)
}

fn conditioning(method: &str, already_filled: bool) -> Result<ConditioningParams> {
    Ok(ConditioningParams {
        already_filled,
        fill_method: FillMethod::from(&parse_fill_method(method)?),
    })
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster = read_band(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            match raster.crs() {
                Some(crs) => println!("CRS: {}", crs),
                None => println!("CRS: none"),
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }

            let valid: Vec<f64> = raster
                .data()
                .iter()
                .copied()
                .filter(|&v| !v.is_nan() && !raster.is_nodata(v))
                .collect();
            println!("\nStatistics:");
            if !valid.is_empty() {
                let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
                let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mean = valid.iter().sum::<f64>() / valid.len() as f64;
                println!("  Min: {:.4}", min);
                println!("  Max: {:.4}", max);
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                valid.len(),
                100.0 * valid.len() as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Analyze(args) => {
            let config = analysis_config(&args)?;
            let inputs = AnalysisInputs {
                id: args.id,
                name: args.name,
                dem: args.dem,
                green: args.green,
                swir: args.swir,
                output_dir: args.output_dir,
            };

            let pb = spinner("Analyzing...");
            let start = Instant::now();
            let result = run_analysis_with(&inputs, &config, |status| {
                pb.set_message(format!("Analysis {}", status));
            });
            pb.finish_and_clear();
            info!("Finished in {:.2?}", start.elapsed());

            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
            println!("{}", json);

            if result.status == AnalysisStatus::Error {
                anyhow::bail!(
                    "Analysis failed: {}",
                    result.error_message.as_deref().unwrap_or("unknown error")
                );
            }
        }

        Commands::Hydrology { algorithm } => match algorithm {
            HydrologyCommands::Fill {
                input,
                output,
                method,
            } => {
                let params = conditioning(&method, false)?;
                let dem = read_band(&input)?;
                let start = Instant::now();
                let result = condition_dem(&dem, &params).context("Failed to fill depressions")?;
                let elapsed = start.elapsed();
                write_result(&result.filled, &output)?;
                done("Filled DEM", &output, elapsed);
            }

            HydrologyCommands::FlowAccumulation {
                input,
                output,
                already_filled,
                method,
            } => {
                let params = conditioning(&method, already_filled)?;
                let dem = read_band(&input)?;
                let start = Instant::now();
                let result =
                    condition_dem(&dem, &params).context("Failed to calculate flow accumulation")?;
                let elapsed = start.elapsed();
                write_result(&result.accumulation, &output)?;
                done("Flow accumulation", &output, elapsed);
            }
        },

        Commands::Mndwi {
            green,
            swir,
            output,
        } => {
            let green_r = read_band(&green)?;
            let swir_r = read_band(&swir)?;
            let start = Instant::now();
            let result = mndwi_water_mask(&green_r, &swir_r).context("Failed to calculate MNDWI")?;
            let elapsed = start.elapsed();
            write_result(&result.mask, &output)?;
            println!("Water pixels: {}", result.mask.count_ones());
            done("MNDWI water mask", &output, elapsed);
        }

        Commands::Polygonize {
            input,
            output,
            min_pixels,
            area_projection,
        } => {
            let projection = parse_area_projection(&area_projection)?;
            let pb = spinner("Reading mask...");
            let mask: Raster<u8> = read_geotiff(&input)
                .with_context(|| format!("Failed to read mask {}", input.display()))?;
            pb.finish_and_clear();

            let start = Instant::now();
            let vectors = vectorize_mask(&mask, min_pixels, projection.into())
                .context("Failed to vectorize mask")?;
            let elapsed = start.elapsed();
            write_geojson(&vectors.features, &output).context("Failed to write output")?;
            println!(
                "Polygons: {} ({:.4} km²)",
                vectors.summary.num_polygons, vectors.summary.total_area_sqkm
            );
            done("Polygons", &output, elapsed);
        }

        Commands::GaugeExtent {
            input,
            output,
            field,
            pixel_size,
            level,
            power,
            min_pixels,
        } => {
            let layer = read_geojson(&input)
                .with_context(|| format!("Failed to read gauges {}", input.display()))?;
            let gauges = gauge_points(&layer, &field);
            if gauges.is_empty() {
                anyhow::bail!("No point features with a numeric '{}' attribute", field);
            }
            info!("Gauges: {}", gauges.len());

            let params = GaugeExtentParams {
                pixel_size,
                level,
                min_pixels,
                idw: IdwParams {
                    power,
                    ..Default::default()
                },
            };
            let start = Instant::now();
            let extent = flood_extent_from_gauges(&gauges, layer.crs_or_wgs84(), &params)
                .context("Failed to calculate flood extent")?;
            let elapsed = start.elapsed();
            write_geojson(&extent, &output).context("Failed to write output")?;
            println!("Polygons: {}", extent.len());
            done("Flood extent", &output, elapsed);
        }

        Commands::Render {
            lost,
            gained,
            persistent,
            output,
            bounds,
            max_dimension,
            opacity,
        } => {
            let bounds_path = bounds.unwrap_or_else(|| {
                let stem = output.file_stem().map(|s| s.to_string_lossy().into_owned());
                output.with_file_name(format!("{}_bounds.json", stem.unwrap_or_default()))
            });
            let params = RenderParams {
                max_dimension,
                opacity,
            };
            let start = Instant::now();
            let map_bounds = render_geojson_files(
                &lost,
                &gained,
                &persistent,
                &params,
                &output,
                &bounds_path,
            )
            .context("Failed to render map")?;
            let elapsed = start.elapsed();
            match map_bounds {
                Some(b) => println!(
                    "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                    b.west, b.south, b.east, b.north
                ),
                None => println!("No polygons; wrote an empty map"),
            }
            done("Map", &output, elapsed);
        }
    }

    Ok(())
}
