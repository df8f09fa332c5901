/*
Copyright 2021 Jakub Lewandowski

This file is part of Pseudo-Global Warming perturbation tool (PGW).

Pseudo-Global Warming perturbation tool (PGW) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Pseudo-Global Warming perturbation tool (PGW) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Pseudo-Global Warming perturbation tool (PGW). If not, see https://www.gnu.org/licenses/.
*/

//! Sub-module writing the run report.
//!
//! The report has one row per snapshot, with the status of the
//! perturbation and a few statistics useful for checking
//! the output without opening it.

use crate::model::surface::BlendCounts;
use crate::Float;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Name of the report file in the output directory.
pub const REPORT_FILE: &str = "perturbation_report.csv";

/// Statistics of a perturbed snapshot.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct PerturbationStats {
    /// Domain mean change of surface pressure (Pa).
    pub mean_surface_pressure_change: Float,

    /// Domain mean change of the lowest level temperature (K).
    pub mean_lowest_temp_change: Float,

    /// Columns in which the signal had no valid levels.
    pub empty_signal_columns: usize,

    /// Present only when the SST climatology was used.
    pub blend_counts: Option<BlendCounts>,
}

/// Outcome of a single snapshot.
#[derive(Clone, PartialEq, Debug)]
pub struct ReportEntry {
    pub file: PathBuf,
    pub datetime: Option<NaiveDateTime>,
    pub outcome: Result<PerturbationStats, String>,
}

pub fn save_report(out_path: &Path, entries: &[ReportEntry]) -> Result<(), csv::Error> {
    let mut out_file = csv::Writer::from_path(out_path)?;

    out_file.write_record(&[
        "file",
        "dateTime",
        "status",
        "meanSurfacePressureChange",
        "meanLowestTemperatureChange",
        "emptySignalColumns",
        "oceanCells",
        "landCells",
        "mixedCells",
        "oceanNoSstCells",
        "unchangedCells",
        "filledSstCells",
        "error",
    ])?;

    for entry in entries {
        out_file.write_record(&report_record(entry))?;
    }

    out_file.flush()?;

    Ok(())
}

fn report_record(entry: &ReportEntry) -> Vec<String> {
    let mut record = vec![
        entry.file.display().to_string(),
        entry
            .datetime
            .map(|datetime| datetime.format("%Y-%m-%dT%H%M%S").to_string())
            .unwrap_or_default(),
    ];

    match &entry.outcome {
        Ok(stats) => {
            record.push("perturbed".to_string());
            record.push(format!("{:.3}", stats.mean_surface_pressure_change));
            record.push(format!("{:.3}", stats.mean_lowest_temp_change));
            record.push(stats.empty_signal_columns.to_string());

            match stats.blend_counts {
                Some(counts) => record.extend(
                    [
                        counts.ocean,
                        counts.land,
                        counts.mixed,
                        counts.ocean_no_sst,
                        counts.unchanged,
                        counts.filled,
                    ]
                    .iter()
                    .map(|count| count.to_string()),
                ),
                None => record.extend(vec![String::new(); 6]),
            }

            record.push(String::new());
        }
        Err(err) => {
            record.push("failed".to_string());
            record.extend(vec![String::new(); 9]);
            record.push(err.clone());
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::{report_record, PerturbationStats, ReportEntry};
    use crate::model::surface::BlendCounts;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    #[test]
    fn perturbed_record() {
        let entry = ReportEntry {
            file: PathBuf::from("cas20200101000000.nc"),
            datetime: NaiveDate::from_ymd_opt(2020, 1, 1).and_then(|date| date.and_hms_opt(6, 0, 0)),
            outcome: Ok(PerturbationStats {
                mean_surface_pressure_change: 52.25,
                mean_lowest_temp_change: 2.0,
                empty_signal_columns: 0,
                blend_counts: Some(BlendCounts {
                    ocean: 3,
                    filled: 1,
                    ..BlendCounts::default()
                }),
            }),
        };

        let record = report_record(&entry);

        assert_eq!(record.len(), 13);
        assert_eq!(record[1], "2020-01-01T060000");
        assert_eq!(record[2], "perturbed");
        assert_eq!(record[3], "52.250");
        assert_eq!(record[6], "3");
        assert_eq!(record[11], "1");
        assert_eq!(record[12], "");
    }

    #[test]
    fn failed_record() {
        let entry = ReportEntry {
            file: PathBuf::from("cas.nc"),
            datetime: None,
            outcome: Err("Required field T is not present in the input".to_string()),
        };

        let record = report_record(&entry);

        assert_eq!(record.len(), 13);
        assert_eq!(record[1], "");
        assert_eq!(record[2], "failed");
        assert_eq!(record[12], "Required field T is not present in the input");
    }
}
