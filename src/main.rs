use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use gc_data_processor::data::batch::{process_batch, Alignment, BatchOptions};
use gc_data_processor::data::discovery::{DiscoveryOptions, DEFAULT_RESULT_FILE};
use gc_data_processor::data::export::{render_table, ExportFormats};

fn existing_dir(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("directory not found: {raw}"))
    }
}

#[derive(Parser)]
#[command(name = "gc-data-processor")]
#[command(about = "Combine per-sample GC result files into concentration and response tables")]
#[command(version)]
struct Cli {
    /// Batch folder holding one subfolder per sample
    #[arg(long, value_parser = existing_dir)]
    path: PathBuf,

    /// 0-based compound row to remove from both tables
    #[arg(long = "index_to_drop")]
    index_to_drop: Option<usize>,

    /// Write concentration.csv and response.csv into the batch folder
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    export: bool,

    /// Also write .parquet copies of both tables
    #[arg(long)]
    parquet: bool,

    /// Result file name looked for in each sample folder
    #[arg(long, default_value = DEFAULT_RESULT_FILE)]
    file: String,

    /// Search sample folders at any depth
    #[arg(long)]
    recursive: bool,

    /// Match rows by compound name instead of position
    #[arg(long)]
    align_by_name: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let options = BatchOptions {
        discovery: DiscoveryOptions {
            file_name: cli.file,
            recursive: cli.recursive,
        },
        alignment: if cli.align_by_name {
            Alignment::ByCompound
        } else {
            Alignment::Strict
        },
        index_to_drop: cli.index_to_drop,
        export: cli.export.then_some(ExportFormats {
            csv: true,
            parquet: cli.parquet,
        }),
        ..BatchOptions::default()
    };

    let tables = process_batch(&cli.path, &options)?;

    println!("Processing complete!");
    println!("Concentration:\n{}", render_table(&tables.concentration)?);
    println!("Response:\n{}", render_table(&tables.response)?);
    if cli.export {
        println!("The files were exported to {}.", cli.path.display());
    }
    Ok(())
}
