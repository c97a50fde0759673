pub mod types;
pub mod config;
pub mod data;
pub mod zone;
pub mod index;
pub mod stats;
pub mod penetration;
pub mod cluster;
pub mod view;
pub mod analytics;
pub mod export;
pub mod server;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Totals for the business centers inside a zone
    Stats {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Zone JSON or GeoJSON polygon
        #[arg(long, value_name = "FILE", conflicts_with = "bounds")]
        zone: Option<PathBuf>,
        /// Rectangle given as north south east west
        #[arg(
            long,
            num_args = 4,
            value_names = ["NORTH", "SOUTH", "EAST", "WEST"],
            allow_negative_numbers = true
        )]
        bounds: Option<Vec<f64>>,
    },
    /// Print the analytics report as JSON
    Analytics {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        district: Option<String>,
        #[arg(long)]
        building_type: Option<String>,
    },
    /// Export business centers with their figures
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
        /// Defaults to stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = view::ClientFilter::All)]
        filter: view::ClientFilter,
    },
    /// Serve the map API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Geojson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { config, zone: zone_file, bounds } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let selection = match (zone_file, bounds) {
                (Some(path), _) => Some(zone::load_zone_file(&path)?),
                (None, Some(b)) => Some(rectangle_from_args(&b)?),
                (None, None) => None,
            };

            let centers = data::load_business_centers(&app_config.input.business_centers)?;
            match stats::selection_stats(selection.as_ref(), &centers) {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => info!("No zone selected, nothing to report"),
            }
        }
        Commands::Analytics { config, district, building_type } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let centers = data::load_business_centers(&app_config.input.business_centers)?;

            let filter = analytics::AnalyticsFilter { district, building_type };
            let report = analytics::build_report(
                &centers,
                &filter,
                app_config.map.low_penetration_threshold,
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Export { config, format, output, filter } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let centers = data::load_business_centers(&app_config.input.business_centers)?;
            let selected = filter.apply(&centers);

            let mut writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("Failed to create {:?}", path))?,
                )),
                None => Box::new(io::stdout().lock()),
            };

            match format {
                ExportFormat::Csv => export::write_csv(selected, &mut writer)?,
                ExportFormat::Geojson => {
                    let fc = export::to_feature_collection(
                        selected,
                        app_config.map.low_penetration_threshold,
                    );
                    writeln!(writer, "{}", fc)?;
                }
            }
            writer.flush()?;

            if let Some(path) = output {
                info!("Export written to {:?}", path);
            }
        }
        Commands::Serve { config } => {
            info!("Serving map with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dataset = data::Dataset::load(&app_config)?;

            server::start_server(app_config, dataset).await?;
        }
    }

    Ok(())
}

fn rectangle_from_args(values: &[f64]) -> Result<zone::Zone> {
    match values {
        [north, south, east, west] => Ok(zone::Zone::Rectangle {
            bounds: zone::Bounds {
                north: *north,
                south: *south,
                east: *east,
                west: *west,
            },
        }),
        _ => Err(anyhow!("--bounds takes exactly four values")),
    }
}
