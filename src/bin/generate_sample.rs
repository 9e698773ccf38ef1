use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use gc_data_processor::correction::CompoundPanel;
use gc_data_processor::data::discovery::DEFAULT_RESULT_FILE;
use gc_data_processor::data::fixed_width::FixedWidthLayout;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

#[derive(Parser)]
#[command(name = "generate_sample")]
#[command(about = "Write a synthetic GC batch and a matching vendor export")]
struct Cli {
    /// Output directory
    #[arg(long, default_value = "sample_batch")]
    out: PathBuf,

    /// Number of real samples
    #[arg(long, default_value_t = 6)]
    samples: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Label the instrument software would print for a panel compound.
fn vendor_label(name: &str, aliases: &[String]) -> String {
    aliases.first().map(String::as_str).unwrap_or(name).replace('_', "-")
}

/// Short label used in the fixed-width result files (12 characters wide).
fn report_label(name: &str) -> String {
    name.replace('_', "-")
}

// ---------------------------------------------------------------------------
// Simulated injections
// ---------------------------------------------------------------------------

/// One compound of one injection.
struct Peak {
    area: f64,
    /// pg on column.
    amount: f64,
}

/// Injection names with their vendor `Type`, in acquisition order.
fn injection_list(samples: &[String]) -> Vec<(String, &'static str)> {
    let mut injections: Vec<(String, &'static str)> = vec![("Cal_check".to_string(), "Cal")];
    injections.extend(["IS-RS_std1", "IS-RS_std2"].iter().map(|s| (s.to_string(), "Sample")));
    injections.extend(["AMAP_1", "AMAP_2", "Blank_1", "Blank_2"].iter().map(|s| (s.to_string(), "Sample")));
    injections.extend(samples.iter().map(|s| (s.clone(), "Sample")));
    injections
}

/// Peaks in panel order: internal standards, recovery standard, natives.
fn simulate_injection(panel: &CompoundPanel, name: &str, rng: &mut SimpleRng) -> Vec<Peak> {
    let calibration = name.contains(&panel.calibration_marker);
    let qc = name.contains(&panel.qc_marker);
    let blank = name.to_lowercase().contains(&panel.blank_marker.to_lowercase());
    let rs = &panel.recovery_standard;
    let rs_area = rng.uniform(18_000.0, 22_000.0);

    let mut peaks: Vec<Peak> = panel
        .internal_standards
        .iter()
        .enumerate()
        .map(|(k, is)| {
            let rrf = 0.9 + 0.1 * k as f64;
            let recovery = if calibration { 1.0 } else { rng.uniform(0.6, 1.05) };
            Peak {
                area: rs_area * is.spiked_mass / rs.spiked_mass * rrf * recovery,
                amount: is.spiked_mass,
            }
        })
        .collect();
    peaks.push(Peak {
        area: rs_area,
        amount: rs.spiked_mass,
    });
    for native in &panel.natives {
        let background = rng.uniform(5.0, 15.0);
        let theoretical = native.theoretical.unwrap_or(1.0);
        let pg = if calibration {
            0.0
        } else if qc {
            theoretical * panel.qc_extract_amount * 1000.0 * rng.uniform(0.8, 1.0) + background
        } else if blank {
            background
        } else {
            rng.uniform(50.0, 500.0)
        };
        peaks.push(Peak {
            area: pg * 10.0,
            amount: pg,
        });
    }
    peaks
}

// ---------------------------------------------------------------------------
// Per-injection fixed-width result files
// ---------------------------------------------------------------------------

fn write_result_file(
    path: &Path,
    injection: &str,
    labels: &[String],
    peaks: &[Peak],
    rng: &mut SimpleRng,
) -> Result<()> {
    let layout = FixedWidthLayout::default();
    let mut text = String::new();
    text.push_str(&format!("Quantitation Report for {injection}\n"));
    for i in 1..layout.header_rows {
        text.push_str(&format!("header line {i}\n"));
    }

    for (i, (label, peak)) in labels.iter().zip(peaks).enumerate() {
        // Non-detects, and the occasional dropout, are written the way the instrument does.
        let detected = peak.amount > 0.0 && rng.next_f64() >= 0.05;
        let (response, conc) = if detected {
            (format!("{:.0}", peak.area), format!("{:.2}", peak.amount))
        } else {
            (String::new(), "N.D.".to_string())
        };
        let fields = [
            (i + 1).to_string(),
            label.clone(),
            format!("{:.2}", 10.0 + 0.55 * i as f64 + rng.gauss(0.0, 0.01)),
            (400 + 26 * i).to_string(),
            response,
            conc,
        ];
        let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
        text.push_str(&layout.format_row(&refs));
        text.push('\n');
    }

    for i in 0..layout.footer_rows {
        text.push_str(&format!("footer line {i}\n"));
    }
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// One `<injection>.D/a-all.txt` per injection of `Sample` type.
fn write_batch(
    dir: &Path,
    panel: &CompoundPanel,
    injections: &[(String, &str)],
    rng: &mut SimpleRng,
) -> Result<usize> {
    let labels: Vec<String> = panel.compound_order().iter().map(|n| report_label(n)).collect();
    let mut written = 0;
    for (name, kind) in injections {
        if *kind != panel.sample_type {
            continue;
        }
        let peaks = simulate_injection(panel, name, rng);
        let folder = dir.join(format!("{name}.D"));
        fs::create_dir_all(&folder)?;
        write_result_file(&folder.join(DEFAULT_RESULT_FILE), name, &labels, &peaks, rng)?;
        written += 1;
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Vendor batch export
// ---------------------------------------------------------------------------

fn write_vendor_export(
    path: &Path,
    panel: &CompoundPanel,
    injections: &[(String, &str)],
    rng: &mut SimpleRng,
) -> Result<()> {
    let mut groups = vec!["Sample".to_string(), String::new(), String::new(), String::new()];
    let mut metrics: Vec<String> = ["Name", "Data File", "Type", "Acq. Date-Time"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rs = &panel.recovery_standard;
    let blocks: Vec<String> = panel
        .internal_standards
        .iter()
        .map(|s| vendor_label(&s.name, &s.aliases))
        .chain(std::iter::once(vendor_label(&rs.name, &rs.aliases)))
        .chain(panel.natives.iter().map(|n| vendor_label(&n.name, &n.aliases)))
        .collect();
    for label in &blocks {
        groups.extend([format!("{label} Results"), String::new(), String::new()]);
        metrics.extend(["Final Conc.", "Area", "ISTD Resp."].iter().map(|s| s.to_string()));
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating vendor export {}", path.display()))?;
    writer.write_record(&groups)?;
    writer.write_record(&metrics)?;

    for (i, (name, kind)) in injections.iter().enumerate() {
        let peaks = simulate_injection(panel, name, rng);
        let istd_area = peaks.first().map(|p| p.area).unwrap_or(0.0);
        let mut record = vec![
            name.clone(),
            format!("{name}.D"),
            kind.to_string(),
            format!("2022-02-17 {:02}:{:02}", 8 + i / 4, (i % 4) * 15),
        ];
        for peak in &peaks {
            record.extend([
                format!("{:.3}", peak.amount),
                format!("{:.0}", peak.area),
                format!("{istd_area:.0}"),
            ]);
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut rng = SimpleRng::new(cli.seed);

    let samples: Vec<String> = (1..=cli.samples).map(|i| format!("S_{i:03}")).collect();
    let injections = injection_list(&samples);
    let panel = CompoundPanel::pbde();

    let batch_dir = cli.out.join("batch");
    fs::create_dir_all(&batch_dir)
        .with_context(|| format!("creating {}", batch_dir.display()))?;
    let folders = write_batch(&batch_dir, &panel, &injections, &mut rng)?;

    let export = cli.out.join("vendor_export.csv");
    write_vendor_export(&export, &panel, &injections, &mut rng)?;

    let masses = cli.out.join("sample_list.csv");
    let mut filled = String::from("Sample,Mass\n");
    for sample in &samples {
        filled.push_str(&format!("{sample},{:.2}\n", rng.uniform(1.0, 3.0)));
    }
    fs::write(&masses, filled).with_context(|| format!("writing {}", masses.display()))?;

    println!(
        "Wrote {} injection folders to {}, a vendor export to {} and sample masses to {}",
        folders,
        batch_dir.display(),
        export.display(),
        masses.display()
    );
    Ok(())
}
