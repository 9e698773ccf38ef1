use std::path::Path;

use anyhow::{Context, Result};
use log::debug;

use super::model::{Metric, ResultRow, SampleResult};

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Half-open character range `[start, end)` holding one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub metric: Metric,
    pub start: usize,
    pub end: usize,
}

impl ColumnSpec {
    pub const fn new(metric: Metric, start: usize, end: usize) -> Self {
        ColumnSpec { metric, start, end }
    }
}

/// Describes where fields sit in a fixed-width report and how much of the
/// file is header/footer boilerplate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthLayout {
    pub columns: Vec<ColumnSpec>,
    pub header_rows: usize,
    pub footer_rows: usize,
}

impl Default for FixedWidthLayout {
    fn default() -> Self {
        Self::gc_default()
    }
}

impl FixedWidthLayout {
    /// Quantitation report layout of the GC result files (`a-all.txt`).
    pub fn gc_default() -> Self {
        FixedWidthLayout {
            columns: vec![
                ColumnSpec::new(Metric::Number, 0, 6),
                ColumnSpec::new(Metric::Compound, 7, 19),
                ColumnSpec::new(Metric::RetentionTime, 20, 40),
                ColumnSpec::new(Metric::QuantIon, 41, 46),
                ColumnSpec::new(Metric::Response, 47, 55),
                ColumnSpec::new(Metric::Concentration, 56, 64),
            ],
            header_rows: 19,
            footer_rows: 5,
        }
    }

    /// Split report text into rows of trimmed fields, one entry per column spec.
    ///
    /// The first `header_rows` and last `footer_rows` lines are skipped, as are
    /// blank lines in between. Fields past the end of a short line are empty.
    pub fn parse_str(&self, text: &str) -> Vec<Vec<String>> {
        let lines: Vec<&str> = text.lines().collect();
        let body_end = lines.len().saturating_sub(self.footer_rows);

        lines
            .iter()
            .take(body_end)
            .skip(self.header_rows)
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let chars: Vec<char> = line.chars().collect();
                self.columns
                    .iter()
                    .map(|spec| slice_field(&chars, spec.start, spec.end))
                    .collect()
            })
            .collect()
    }

    /// Parse a report into a [`SampleResult`] named `name`.
    pub fn parse_sample(&self, name: &str, text: &str) -> SampleResult {
        let rows = self
            .parse_str(text)
            .into_iter()
            .map(|fields| ResultRow {
                fields: self
                    .columns
                    .iter()
                    .map(|spec| spec.metric)
                    .zip(fields)
                    .collect(),
            })
            .collect();
        SampleResult {
            name: name.to_string(),
            rows,
        }
    }

    /// Render fields right-aligned at this layout's offsets. Over-long fields
    /// are truncated to the column width.
    pub fn format_row(&self, fields: &[&str]) -> String {
        let mut line = String::new();
        let mut len = 0;
        for (spec, field) in self.columns.iter().zip(fields) {
            let width = spec.end.saturating_sub(spec.start);
            while len < spec.start {
                line.push(' ');
                len += 1;
            }
            let cell: String = field.chars().take(width).collect();
            line.push_str(&format!("{cell:>width$}"));
            len += width;
        }
        line
    }

    /// Read and parse a report file. Invalid UTF-8 is replaced, not rejected.
    pub fn parse_file(&self, name: &str, path: &Path) -> Result<SampleResult> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading result file {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        let sample = self.parse_sample(name, &text);
        debug!("{}: {} compound rows", path.display(), sample.len());
        Ok(sample)
    }
}

fn slice_field(chars: &[char], start: usize, end: usize) -> String {
    if start >= chars.len() {
        return String::new();
    }
    let end = end.min(chars.len());
    chars[start..end].iter().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(header_rows: usize, footer_rows: usize) -> FixedWidthLayout {
        FixedWidthLayout {
            header_rows,
            footer_rows,
            ..FixedWidthLayout::gc_default()
        }
    }

    const LINE: &str =
        "    1  BDE-28       12.345               246    123456   12.50";

    #[test]
    fn fields_are_cut_at_fixed_offsets() {
        let rows = layout(0, 0).parse_str(LINE);
        assert_eq!(
            rows,
            vec![vec!["1", "BDE-28", "12.345", "246", "123456", "12.50"]]
        );
    }

    #[test]
    fn header_and_footer_lines_are_skipped() {
        let text = format!("head\nhead\n{LINE}\n\n{LINE}\nfoot\n");
        let rows = layout(2, 1).parse_str(&text);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn short_lines_yield_empty_fields() {
        let rows = layout(0, 0).parse_str("    7  CB-207");
        assert_eq!(rows[0][1], "CB-207");
        assert_eq!(rows[0][4], "");
        assert_eq!(rows[0][5], "");
    }

    #[test]
    fn too_short_file_has_no_rows() {
        assert!(layout(19, 5).parse_str("only\nthree\nlines").is_empty());
    }

    #[test]
    fn formatted_rows_parse_back() {
        let l = layout(0, 0);
        let line = l.format_row(&["3", "BDE-99", "14.2", "79", "98765", "4.75"]);
        assert_eq!(
            l.parse_str(&line),
            vec![vec!["3", "BDE-99", "14.2", "79", "98765", "4.75"]]
        );
    }

    #[test]
    fn parse_sample_keys_fields_by_metric() {
        let sample = layout(0, 0).parse_sample("A", LINE);
        assert_eq!(sample.name, "A");
        assert_eq!(sample.rows[0].compound(), "BDE-28");
        assert_eq!(sample.rows[0].get(Metric::Response), "123456");
    }
}
