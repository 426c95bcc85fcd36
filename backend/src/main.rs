//! skurecon CLI - Reconcile a WEB sales export against an accounting export
//!
//! # Main Commands
//!
//! ```bash
//! skurecon reconcile --web web.csv --accounting qbo.xlsx   # Match on SKU, write CSV
//! skurecon inspect qbo.xlsx                                # Show the file summary
//! skurecon serve                                           # Start HTTP server (port 3000)
//! ```
//!
//! Chunk sizes come from `SKURECON_*` variables (a `.env` file is read
//! when present); command-line flags override them.

use clap::{Parser, Subcommand};
use skurecon::{
    decode, default_export_name, reconcile, CancelFlag, ChunkPlan, ExportFormat, ProgressSink,
    ReconcileOptions, ReconciliationRecord, SourceFile, Stage,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "skurecon")]
#[command(about = "Reconcile WEB and accounting sales exports by SKU", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match accounting rows to WEB rows on normalized SKU
    Reconcile {
        /// WEB sales export (CSV or spreadsheet)
        #[arg(long)]
        web: PathBuf,

        /// Accounting sales-document export (CSV or spreadsheet)
        #[arg(long)]
        accounting: PathBuf,

        /// Output file (default: reconciliation_export_<date>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write an XLSX workbook instead of CSV
        #[arg(long)]
        xlsx: bool,

        /// Print matched records as JSON to stdout instead of writing a file
        #[arg(long, conflicts_with_all = ["output", "xlsx"])]
        json: bool,

        /// Rows decoded per chunk
        #[arg(long)]
        decode_chunk: Option<usize>,

        /// WEB records indexed per chunk
        #[arg(long)]
        index_chunk: Option<usize>,

        /// Accounting records joined per chunk
        #[arg(long)]
        join_chunk: Option<usize>,
    },

    /// Decode one file and print its summary as JSON
    Inspect {
        /// Input file (CSV or spreadsheet)
        input: PathBuf,

        /// Number of preview rows
        #[arg(long)]
        preview: Option<usize>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

/// Progress on stderr, one line per finished stage.
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn progress(&self, stage: Stage, percent: u8) {
        eprint!("\r   {:<20} {:>3}%", stage.as_str(), percent);
        if percent >= 100 {
            eprintln!();
        }
        let _ = std::io::stderr().flush();
    }

    fn status(&self, message: &str) {
        eprintln!("📄 {}", message);
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Reconcile {
            web,
            accounting,
            output,
            xlsx,
            json,
            decode_chunk,
            index_chunk,
            join_chunk,
        } => {
            let mut options = ReconcileOptions::from_env();
            apply_overrides(&mut options, decode_chunk, index_chunk, join_chunk);

            let format = if xlsx { ExportFormat::Xlsx } else { ExportFormat::Csv };
            cmd_reconcile(&web, &accounting, &options, output.as_deref(), format, json).await
        }

        Commands::Inspect { input, preview } => cmd_inspect(&input, preview).await,

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Flag values win over environment values. Zero is ignored.
fn apply_overrides(
    options: &mut ReconcileOptions,
    decode_chunk: Option<usize>,
    index_chunk: Option<usize>,
    join_chunk: Option<usize>,
) {
    if let Some(n) = decode_chunk.filter(|n| *n > 0) {
        options.decode_chunk_size = n;
    }
    if let Some(n) = index_chunk.filter(|n| *n > 0) {
        options.index_chunk_size = n;
    }
    if let Some(n) = join_chunk.filter(|n| *n > 0) {
        options.join_chunk_size = n;
    }
}

async fn cmd_reconcile(
    web: &Path,
    accounting: &Path,
    options: &ReconcileOptions,
    output: Option<&Path>,
    format: ExportFormat,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let web = SourceFile::from_path(web)?;
    let accounting = SourceFile::from_path(accounting)?;

    let report = reconcile(&web, &accounting, options, &StderrProgress, &CancelFlag::new()).await?;

    eprintln!("   WEB rows:        {}", report.web_records);
    eprintln!("   Accounting rows: {}", report.accounting_records);
    eprintln!("   Indexed SKUs:    {}", report.indexed_skus);
    if report.duplicate_skus > 0 {
        eprintln!("   Duplicate SKUs:  {} (later row kept)", report.duplicate_skus);
    }
    eprintln!("   Matched:         {}", report.records.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&report.records)?);
        return Ok(());
    }

    if report.is_empty() {
        eprintln!("\n⚠️  No SKU overlap: nothing to export.");
        return Ok(());
    }

    let default_path = PathBuf::from(default_export_name(format.extension()));
    let path = output.unwrap_or(default_path.as_path());
    write_export(&report.records, format, path)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn write_export(
    records: &[ReconciliationRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = format.export(records)?;
    fs::write(path, &bytes)?;
    eprintln!("💾 {} records written to: {}", records.len(), path.display());
    Ok(())
}

async fn cmd_inspect(input: &Path, preview: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let source = SourceFile::from_path(input)?;
    let options = ReconcileOptions::from_env();
    let preview_rows = preview.unwrap_or(options.preview_rows);

    let cancel = CancelFlag::new();
    let plan = ChunkPlan::new(Stage::DecodingWeb, options.decode_chunk_size, &StderrProgress, &cancel);
    let decoded = decode(&source, preview_rows, plan).await?;

    println!("{}", serde_json::to_string_pretty(&decoded.summary)?);
    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    skurecon::server::start_server(port).await
}
