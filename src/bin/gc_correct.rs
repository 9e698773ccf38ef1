use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use gc_data_processor::correction::masses::{read_sample_masses, write_sample_mass_template};
use gc_data_processor::correction::vendor::load_vendor_csv;
use gc_data_processor::correction::{CompoundPanel, CorrectionPipeline, CorrectionReport};
use gc_data_processor::data::export::{render_table, write_table_csv};
use gc_data_processor::data::loader::load_table;
use gc_data_processor::data::model::{ResultTables, Table};
use gc_data_processor::report::render_report;
use gc_data_processor::stats::summary_table;

/// File name of the sample list written when no masses are given.
const EMPTY_SAMPLE_LIST: &str = "sample_list_empty.csv";

#[derive(Parser)]
#[command(name = "gc-correct")]
#[command(about = "Recovery, blank and QC correction of a GC batch")]
#[command(version)]
struct Cli {
    /// Batch table exported by the instrument software (two header rows)
    #[arg(long, required_unless_present_all = ["concentration", "response"])]
    input: Option<PathBuf>,

    /// Concentration table written by gc-data-processor (.csv or .parquet)
    #[arg(long, conflicts_with = "input", requires = "response")]
    concentration: Option<PathBuf>,

    /// Response table written by gc-data-processor (.csv or .parquet)
    #[arg(long, conflicts_with = "input", requires = "concentration")]
    response: Option<PathBuf>,

    /// Compound panel as JSON; the built-in PBDE panel when omitted
    #[arg(long)]
    panel: Option<PathBuf>,

    /// Sample list with extracted amounts (Sample,Mass)
    #[arg(long)]
    masses: Option<PathBuf>,

    /// Output directory; defaults to the folder of the input
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write SVG charts into <out>/plots
    #[arg(long)]
    plots: bool,
}

impl Cli {
    fn load_tables(&self, panel: &CompoundPanel) -> Result<ResultTables> {
        match (&self.input, &self.concentration, &self.response) {
            (Some(input), _, _) => Ok(load_vendor_csv(input)?.assemble(panel)),
            (None, Some(conc), Some(resp)) => Ok(ResultTables {
                concentration: load_table(conc)?,
                response: load_table(resp)?,
            }),
            _ => anyhow::bail!("either --input or both --concentration and --response are required"),
        }
    }

    fn out_dir(&self) -> PathBuf {
        if let Some(out) = &self.out {
            return out.clone();
        }
        self.input
            .as_ref()
            .or(self.concentration.as_ref())
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn print_table(title: &str, table: &Table) -> Result<()> {
    println!("{title}:\n{}", render_table(table)?);
    Ok(())
}

fn print_intermediate(report: &CorrectionReport) -> Result<()> {
    print_table("Average RRF", &report.average_rrf.to_table("Compound"))?;
    print_table("Recovery (%)", &summary_table(&report.recovery))?;
    print_table("Blank (pg)", &report.blank.to_table("Compound"))?;
    print_table("Correction factors", &report.correction_factors.to_table("Compound"))?;
    print_table("Corrected amounts (pg)", &report.corrected_pg)?;
    Ok(())
}

fn write_outputs(report: &CorrectionReport, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut tables = vec![
        ("rrf", report.rrf.clone()),
        ("recovery", report.recovery.clone()),
        ("recovery_summary", summary_table(&report.recovery)),
        ("correction_factors", report.correction_factors.to_table("Compound")),
        ("corrected_pg", report.corrected_pg.clone()),
    ];
    if let Some(final_conc) = &report.final_concentration {
        tables.push(("final_concentration", final_conc.clone()));
        tables.push(("final_concentration_summary", summary_table(final_conc)));
    }

    let mut written = Vec::new();
    for (stem, table) in &tables {
        let path = dir.join(format!("{stem}.csv"));
        write_table_csv(table, &path)?;
        written.push(path);
    }
    Ok(written)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let panel = match &cli.panel {
        Some(path) => CompoundPanel::from_json_file(path)?,
        None => CompoundPanel::pbde(),
    };
    let tables = cli.load_tables(&panel)?;
    let out = cli.out_dir();
    fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;

    let pipeline = CorrectionPipeline::new(&panel);
    let masses = match &cli.masses {
        Some(path) => Some(read_sample_masses(path)?),
        None => None,
    };
    let report = pipeline.run(&tables, masses.as_ref())?;

    print_intermediate(&report)?;
    let written = write_outputs(&report, &out)?;
    info!("wrote {} tables to {}", written.len(), out.display());

    match &report.final_concentration {
        Some(final_conc) => {
            print_table("Final concentration", final_conc)?;
            print_table("Final concentration summary", &summary_table(final_conc))?;
        }
        None => {
            let template = out.join(EMPTY_SAMPLE_LIST);
            write_sample_mass_template(&report.groups.samples, &template)?;
            println!(
                "No sample masses given. Fill in {} and rerun with --masses.",
                template.display()
            );
        }
    }

    if cli.plots {
        let charts = render_report(&report, &out.join("plots"))?;
        println!("Wrote {} charts to {}.", charts.len(), out.join("plots").display());
    }
    println!("Results written to {}.", out.display());
    Ok(())
}
