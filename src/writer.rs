//! # CSV Writer Collaborator
//!
//! Serializes the three generated tables to CSV. Owns column naming and file
//! layout; the simulation core never touches the filesystem.

use std::fs;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::generator::Dataset;

pub const METADATA_FILE: &str = "facility_metadata.csv";
pub const TIMESERIES_FILE: &str = "facility_timeseries.csv";
pub const CYCLE_SUMMARY_FILE: &str = "cycle_summary.csv";

/// Write all three tables under `out_dir`, creating it if needed.
pub fn write_dataset(dataset: &Dataset, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    write_table(&out_dir.join(METADATA_FILE), &dataset.facilities)?;
    write_table(&out_dir.join(TIMESERIES_FILE), &dataset.timeseries)?;
    write_table(&out_dir.join(CYCLE_SUMMARY_FILE), &dataset.cycles)?;
    Ok(())
}

fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    write_rows(&mut writer, rows)?;
    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "written");
    Ok(())
}

fn write_rows<W: Write, T: Serialize>(writer: &mut csv::Writer<W>, rows: &[T]) -> Result<()> {
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;
    use crate::testing::test_params;

    fn to_csv_string<T: Serialize>(rows: &[T]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_rows(&mut writer, rows).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_timeseries_csv_shape() {
        let params = test_params();
        let dataset = generate(&params).unwrap();
        let csv = to_csv_string(&dataset.timeseries);
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("facility_id,timestamp,cycle_index,cycle_mode"));
        assert!(header.ends_with("mass_balance_residual"));
        assert_eq!(lines.count(), dataset.timeseries.len());
    }

    #[test]
    fn test_metadata_csv_leaves_cavern_porosity_empty() {
        let facility = crate::testing::test_facility(1_000_000.0);
        let csv = to_csv_string(&[facility]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains("salt_cavern"));
        // Option::None porosity/permeability serialize as empty CSV fields
        assert!(row.contains(",,"));
    }

    #[test]
    fn test_cycle_summary_csv_mode_tokens() {
        let params = test_params();
        let dataset = generate(&params).unwrap();
        let csv = to_csv_string(&dataset.cycles);
        for line in csv.lines().skip(1) {
            assert!(
                line.contains("injection_heavy")
                    || line.contains("withdrawal_heavy")
                    || line.contains("balanced")
            );
        }
    }
}
