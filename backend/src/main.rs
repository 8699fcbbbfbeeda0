//! Levelgrid CLI - expand spreadsheet counts into threshold rows
//!
//! ```bash
//! levelgrid run --spreadsheet-id <ID>            # Sheet -> new sheet (+ ArcGIS if configured)
//! levelgrid run --spreadsheet-id <ID> --dry-run  # Print expanded rows as JSON
//! levelgrid expand input.csv -o output.csv       # Local CSV export -> CSV
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use levelgrid::config::{DEFAULT_LOG_FILE, DEFAULT_MAX_LEVELS};
use levelgrid::logs::{self, log_info, log_success};
use levelgrid::{
    expand_csv_file, load_credentials, run_spreadsheet, write_csv_rows, BatchResult,
    CoordinatePolicy, GisClient, RunOptions, Settings, SheetsClient,
    TransformConfig,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "levelgrid")]
#[command(about = "Expand spreadsheet count columns into binary threshold rows", long_about = None)]
struct Cli {
    /// Diagnostics log file
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a Google Sheet, expand it, write a new sheet and export to ArcGIS
    Run {
        /// Source spreadsheet id
        #[arg(long)]
        spreadsheet_id: String,

        /// Source range (default: SHEET_RANGE or A:O)
        #[arg(long)]
        range: Option<String>,

        /// Title of the created spreadsheet
        #[arg(long)]
        title: Option<String>,

        /// Skip the ArcGIS export even if configured
        #[arg(long)]
        no_gis: bool,

        /// Print the expanded rows as JSON instead of writing anywhere
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        transform: TransformArgs,
    },

    /// Expand a local CSV export of the sheet
    Expand {
        /// Input CSV file (encoding and delimiter auto-detected)
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Do not repeat the header row in the output
        #[arg(long)]
        no_header: bool,

        #[command(flatten)]
        transform: TransformArgs,
    },
}

#[derive(Args)]
struct TransformArgs {
    /// Indicator columns per expanded row
    #[arg(long, default_value = "10")]
    indicator_width: usize,

    /// How coordinate cells are carried over
    #[arg(long, value_enum, default_value = "numeric")]
    coordinates: CoordinatePolicy,

    /// Rows whose highest count exceeds this are skipped
    #[arg(long, default_value_t = DEFAULT_MAX_LEVELS)]
    max_levels: usize,
}

impl TransformArgs {
    fn to_config(&self) -> TransformConfig {
        TransformConfig::default()
            .with_indicator_width(self.indicator_width)
            .with_coordinate_policy(self.coordinates)
            .with_max_levels(self.max_levels)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = logs::init(&cli.log_file) {
        eprintln!("⚠️  Cannot open log file {}: {}", cli.log_file.display(), e);
    }

    let result = match cli.command {
        Commands::Run {
            spreadsheet_id,
            range,
            title,
            no_gis,
            dry_run,
            transform,
        } => {
            tokio::select! {
                result = cmd_run(spreadsheet_id, range, title, no_gis, dry_run, transform.to_config()) => result,
                _ = tokio::signal::ctrl_c() => Err("Interrupted".into()),
            }
        }

        Commands::Expand {
            input,
            output,
            format,
            no_header,
            transform,
        } => cmd_expand(&input, output.as_deref(), format, no_header, &transform.to_config()),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_run(
    spreadsheet_id: String,
    range: Option<String>,
    title: Option<String>,
    no_gis: bool,
    dry_run: bool,
    config: TransformConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();

    let credentials = load_credentials(&settings).await?;
    let sheets = SheetsClient::new(credentials.access_token());

    let gis = if no_gis || dry_run {
        None
    } else {
        match GisClient::from_settings(&settings) {
            Ok(client) => Some(client),
            Err(e) => {
                log_info(format!("ArcGIS export disabled: {}", e));
                None
            }
        }
    };

    let options = RunOptions {
        spreadsheet_id,
        range: range.unwrap_or(settings.sheet_range),
        title,
        dry_run,
    };

    let report = run_spreadsheet(&sheets, gis.as_ref(), &options, &config).await?;

    if dry_run {
        let json = serde_json::to_string_pretty(&report.batch.to_cells(true))?;
        println!("{}", json);
        return Ok(());
    }

    report_skipped(&report.batch);
    if let Some(id) = &report.target_spreadsheet_id {
        println!("{}", id);
    }
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_expand(
    input: &Path,
    output: Option<&Path>,
    format: OutputFormat,
    no_header: bool,
    config: &TransformConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (batch, info) = expand_csv_file(input, config)?;
    let cells = batch.to_cells(!no_header);

    match (format, output) {
        (OutputFormat::Csv, Some(path)) => {
            write_csv_rows(fs::File::create(path)?, &cells, info.delimiter)?;
            log_success(format!("Output written to: {}", path.display()));
        }
        (OutputFormat::Csv, None) => {
            write_csv_rows(std::io::stdout().lock(), &cells, info.delimiter)?;
        }
        (OutputFormat::Json, Some(path)) => {
            fs::write(path, serde_json::to_string_pretty(&cells)?)?;
            log_success(format!("Output written to: {}", path.display()));
        }
        (OutputFormat::Json, None) => {
            println!("{}", serde_json::to_string_pretty(&cells)?);
        }
    }

    report_skipped(&batch);
    Ok(())
}

fn report_skipped(batch: &BatchResult) {
    if batch.skipped.is_empty() {
        return;
    }
    eprintln!("\n⚠️  {} rows skipped:", batch.skipped.len());
    for skipped in batch.skipped.iter().take(10) {
        eprintln!("   - row {}: {}", skipped.row, skipped.reason);
    }
    if batch.skipped.len() > 10 {
        eprintln!("   ... and {} more (see log file)", batch.skipped.len() - 10);
    }
}
