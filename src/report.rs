use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::core::{AgeResult, SweepResult};

// Column layout follows the historical export of this tool.
#[derive(Debug, Serialize)]
struct CsvRow {
    retire_age: u32,
    best_monthly_spending: Option<f64>,
    total_enjoyment: Option<f64>,
    final_wealth: Option<f64>,
}

impl From<&AgeResult> for CsvRow {
    fn from(record: &AgeResult) -> Self {
        Self {
            retire_age: record.retirement_age,
            best_monthly_spending: record.best_monthly_spending,
            total_enjoyment: record.total_enjoyment,
            final_wealth: record.final_wealth,
        }
    }
}

pub fn render_table(sweep: &SweepResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>10} {:>22} {:>18} {:>16}\n",
        "retire_age", "best_monthly_spending", "total_enjoyment", "final_wealth"
    ));
    for record in &sweep.age_results {
        out.push_str(&format!(
            "{:>10} {:>22} {:>18} {:>16}\n",
            record.retirement_age,
            format_cell(record.best_monthly_spending),
            format_cell(record.total_enjoyment),
            format_cell(record.final_wealth),
        ));
    }
    out
}

fn format_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "unattainable".to_string(),
    }
}

pub fn write_csv<W: Write>(writer: W, records: &[AgeResult]) -> Result<(), String> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer
            .serialize(CsvRow::from(record))
            .map_err(|e| format!("Failed to write CSV row: {e}"))?;
    }
    csv_writer
        .flush()
        .map_err(|e| format!("Failed to flush CSV output: {e}"))
}

pub fn write_csv_file(path: &Path, records: &[AgeResult]) -> Result<(), String> {
    let file = std::fs::File::create(path)
        .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;
    write_csv(file, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sweep() -> SweepResult {
        SweepResult {
            age_results: vec![
                AgeResult {
                    retirement_age: 34,
                    best_monthly_spending: Some(1_000.0),
                    total_enjoyment: Some(1.5),
                    final_wealth: Some(250.25),
                },
                AgeResult {
                    retirement_age: 35,
                    best_monthly_spending: None,
                    total_enjoyment: None,
                    final_wealth: None,
                },
            ],
            best_index: Some(0),
        }
    }

    #[test]
    fn table_formats_values_and_unattainable_ages() {
        let table = render_table(&sample_sweep());
        let mut lines = table.lines();

        let header = lines.next().expect("header line");
        assert!(header.contains("retire_age"));
        assert!(header.contains("best_monthly_spending"));
        assert!(header.contains("total_enjoyment"));
        assert!(header.contains("final_wealth"));

        let first = lines.next().expect("first record line");
        assert!(first.contains("34"));
        assert!(first.contains("1000.00"));
        assert!(first.contains("1.50"));
        assert!(first.contains("250.25"));

        let second = lines.next().expect("second record line");
        assert!(second.contains("35"));
        assert!(second.contains("unattainable"));
    }

    #[test]
    fn csv_export_leaves_unattainable_fields_empty() {
        let sweep = sample_sweep();
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &sweep.age_results).expect("csv write must succeed");

        let text = String::from_utf8(buffer).expect("valid utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("retire_age,best_monthly_spending,total_enjoyment,final_wealth")
        );
        assert_eq!(lines.next(), Some("34,1000.0,1.5,250.25"));
        assert_eq!(lines.next(), Some("35,,,"));
        assert_eq!(lines.next(), None);
    }
}
