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

//! Module containing the actual perturbation code.
//!
//! The tool reads the configuration, loads the climate change signal once
//! and then perturbs the snapshots one by one. Each snapshot is either
//! perturbed and written completely or not written at all. A failure of one
//! snapshot is logged and recorded in the run report, and the remaining
//! snapshots are still processed.

mod atmosphere;
mod configuration;
mod input;
mod report;
mod surface;


use crate::errors::{ModelError, PerturbationError, SnapshotError};
use crate::model::configuration::{Config, Signal};
use crate::model::input::{
    netcdf::{NetCdfSink, NetCdfSource},
    signal::{load_sst_climatology, ClimateSignal, Signals, SoilMoistureSignal},
    PerturbedSnapshot, Snapshot,
};
use crate::model::report::{save_report, PerturbationStats, ReportEntry, REPORT_FILE};
use crate::{Float, ALLOCATOR};
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use ndarray::{ArrayBase, Axis, Data, Ix2};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{fs, path::Path};

/// Numbers of snapshots processed in the run.
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Main tool function, responsible for all perturbation steps.
///
/// It reads the provided configuration and the climate change signal
/// and then perturbs all snapshots on the threadpool.
pub fn main() -> Result<RunSummary, ModelError> {
    info!("Preparing the tool core");

    let core = Core::new()?;
    let output_dir = core.config.input.output_dir.as_path();

    prepare_output_dir(output_dir)?;

    info!(
        "Loading climate change signal of {}",
        core.config.signal.model_name
    );
    let signals = load_signals(&core.config.signal)?;

    let snapshot_files = &core.config.input.snapshot_files;
    let mut summary = RunSummary::default();
    let mut report = Vec::with_capacity(snapshot_files.len());

    info!("Perturbing snapshots");

    // set progress bar for perturbed snapshots
    let snapshots_bar = ProgressBar::new(snapshot_files.len() as u64);
    snapshots_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    snapshots_bar.set_prefix("Perturbed snapshots");

    for snapshot_file in snapshot_files {
        let datetime = snapshot_datetime(snapshot_file);

        debug!(
            "Perturbing {} ({})",
            snapshot_file.display(),
            datetime.map_or_else(|| "unknown time".to_string(), |dt| dt.to_string())
        );

        let outcome = core
            .threadpool
            .install(|| process_snapshot(snapshot_file, &signals, output_dir));

        let outcome = match outcome {
            Ok(stats) => {
                summary.succeeded += 1;
                Ok(stats)
            }
            Err(err) => {
                error!(
                    "Perturbation of {} failed, check the details and rerun the tool for this snapshot: {}",
                    snapshot_file.display(),
                    err
                );
                // this is neccessary to make sure that all error messages
                // are fully written to stdout before the progress bar updates
                println!();
                summary.failed += 1;
                Err(err.to_string())
            }
        };

        report.push(ReportEntry {
            file: snapshot_file.clone(),
            datetime,
            outcome,
        });

        snapshots_bar.inc(1);
    }

    snapshots_bar.finish_with_message("All snapshots processed");
    info!("Writing run report");

    save_report(&output_dir.join(REPORT_FILE), &report)?;

    Ok(summary)
}

/// Structure containing tool prerequisites.
#[derive(Debug)]
pub struct Core {
    pub config: Config,
    pub threadpool: ThreadPool,
}

impl Core {
    /// Tool [`Core`] constructor.
    ///
    /// Before the perturbation can start (and to run it safely),
    /// configuration provided by the user must be loaded and checked.
    pub fn new() -> Result<Self, ModelError> {
        debug!("Reading configuration from config.yaml");
        let config = Config::new_from_file(Path::new("config.yaml"))?;

        debug!("Setting memory limit");
        let memory = config.resources.memory;
        ALLOCATOR
            .set_limit(memory.saturating_mul(1024 * 1024))
            .map_err(|_| ModelError::MemoryLimit(memory))?;

        debug!("Setting up ThreadPool");
        let threadpool = ThreadPoolBuilder::new()
            .num_threads(config.resources.threads as usize)
            .stack_size(2 * 1024 * 1024)
            .build()?;

        Ok(Core { config, threadpool })
    }
}

/// Creates the output directory if it does not exist,
/// or checks if the existing one is empty, so that no
/// previous results are overwritten.
fn prepare_output_dir(out_path: &Path) -> Result<(), ModelError> {
    debug!("Checking and setting output directory");

    if out_path.is_dir() {
        if out_path.read_dir()?.next().is_none() {
            debug!("Output directory exists but is empty so continuing");
        } else {
            return Err(ModelError::FaultyOutput(
                "Output directory exists and is not empty",
            ));
        }
    } else {
        debug!("Output directory does not exist so creating a new one");
        fs::create_dir_all(out_path)?;
    }

    Ok(())
}

/// Reads the snapshot datetime from the file name
/// (eg. `cas20200101000000.nc`).
fn snapshot_datetime(snapshot_file: &Path) -> Option<NaiveDateTime> {
    let stem = snapshot_file.file_stem()?.to_str()?;
    let digits = stem.trim_start_matches(|c: char| !c.is_ascii_digit());

    NaiveDateTime::parse_from_str(digits.get(..14)?, "%Y%m%d%H%M%S").ok()
}

/// Perturbs the snapshot with all available signals.
fn perturb_snapshot(
    snapshot: &Snapshot,
    signals: &Signals,
) -> Result<(PerturbedSnapshot, PerturbationStats), PerturbationError> {
    let atmosphere = atmosphere::perturb_atmosphere(snapshot, &signals.climate)?;
    let surface = surface::perturb_surface(snapshot, signals)?;

    let levels = Axis(0);
    let lowest = atmosphere.temperature.len_of(levels) - 1;

    let stats = PerturbationStats {
        mean_surface_pressure_change: mean_difference(
            &atmosphere.surface_pressure,
            &snapshot.surface_pressure,
        ),
        mean_lowest_temp_change: mean_difference(
            &atmosphere.temperature.index_axis(levels, lowest),
            &snapshot.temperature.index_axis(levels, lowest),
        ),
        empty_signal_columns: atmosphere.empty_signal_columns,
        blend_counts: surface.blend_counts,
    };

    let perturbed = PerturbedSnapshot {
        temperature: atmosphere.temperature,
        spec_humidity: atmosphere.spec_humidity,
        surface_pressure: atmosphere.surface_pressure,
        skin_temperature: surface.skin_temperature,
        soil_temperature: surface.soil_temperature,
        soil_moisture: surface.soil_moisture,
    };

    Ok((perturbed, stats))
}

fn mean_difference<S, T>(new: &ArrayBase<S, Ix2>, old: &ArrayBase<T, Ix2>) -> Float
where
    S: Data<Elem = Float>,
    T: Data<Elem = Float>,
{
    (new - old).mean().unwrap_or(0.0)
}

fn load_signals(signal: &Signal) -> Result<Signals, ModelError> {
    let atmosphere = NetCdfSource::open(&signal.atmosphere_file)?;

    let climate = match &signal.surface_file {
        Some(surface_file) => ClimateSignal::load(&atmosphere, &NetCdfSource::open(surface_file)?)?,
        None => ClimateSignal::load(&atmosphere, &atmosphere)?,
    };

    let sst = match &signal.sst_file {
        Some(sst_file) => Some(load_sst_climatology(&NetCdfSource::open(sst_file)?)?),
        None => None,
    };

    let soil_moisture = match &signal.soil_moisture {
        Some(source) => Some(SoilMoistureSignal::load(
            &NetCdfSource::open(source.file())?,
            source,
        )?),
        None => None,
    };

    Ok(Signals {
        climate,
        sst,
        soil_moisture,
    })
}

/// Reads, perturbs and writes a single snapshot.
///
/// Output is written to a temporary file which is renamed
/// only after all fields have been written.
fn process_snapshot(
    snapshot_file: &Path,
    signals: &Signals,
    output_dir: &Path,
) -> Result<PerturbationStats, SnapshotError> {
    let file_name = snapshot_file.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Snapshot path has no file name")
    })?;

    let snapshot = Snapshot::load(&NetCdfSource::open(snapshot_file)?)?;
    let (perturbed, stats) = perturb_snapshot(&snapshot, signals)?;

    let target = output_dir.join(file_name);
    let partial = output_dir.join(format!("{}.partial", file_name.to_string_lossy()));

    if let Err(err) = write_snapshot(snapshot_file, &partial, &perturbed) {
        discard_partial(&partial);
        return Err(err);
    }

    commit_partial(&partial, &target)?;

    Ok(stats)
}

/// Moves the completely written snapshot to its final name.
/// The partial file is removed when the move fails.
fn commit_partial(partial: &Path, target: &Path) -> Result<(), SnapshotError> {
    if let Err(err) = fs::rename(partial, target) {
        discard_partial(partial);
        return Err(err.into());
    }

    Ok(())
}

/// Nothing half-written can stay in the output.
fn discard_partial(partial: &Path) {
    if partial.exists() {
        if let Err(err) = fs::remove_file(partial) {
            warn!("Cannot remove {}: {}", partial.display(), err);
        }
    }
}

fn write_snapshot(
    template: &Path,
    target: &Path,
    perturbed: &PerturbedSnapshot,
) -> Result<(), SnapshotError> {
    let mut sink = NetCdfSink::copy_of(template, target)?;
    perturbed.write_to(&mut sink)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{commit_partial, prepare_output_dir, snapshot_datetime};
    use crate::errors::{ModelError, SnapshotError};
    use chrono::NaiveDate;
    use std::{env, fs, path::Path, process};

    #[test]
    fn datetime_from_file_name() {
        assert_eq!(
            snapshot_datetime(Path::new("/data/cas/cas20200101063000.nc")),
            NaiveDate::from_ymd_opt(2020, 1, 1).and_then(|date| date.and_hms_opt(6, 30, 0))
        );
        assert_eq!(snapshot_datetime(Path::new("laf2020010100.nc")), None);
        assert_eq!(snapshot_datetime(Path::new("snapshot.nc")), None);
    }

    #[test]
    fn output_dir_must_be_empty() {
        let out_path = env::temp_dir().join(format!("pgw-output-{}", process::id()));
        let _ = fs::remove_dir_all(&out_path);

        prepare_output_dir(&out_path).unwrap();
        assert!(out_path.is_dir());

        // empty directory can be reused
        prepare_output_dir(&out_path).unwrap();

        fs::write(out_path.join("cas20200101000000.nc"), b"").unwrap();
        assert!(matches!(
            prepare_output_dir(&out_path),
            Err(ModelError::FaultyOutput(_))
        ));

        fs::remove_dir_all(&out_path).unwrap();
    }

    #[test]
    fn failed_commit_removes_partial() {
        let out_path = env::temp_dir().join(format!("pgw-commit-{}", process::id()));
        let _ = fs::remove_dir_all(&out_path);
        fs::create_dir_all(&out_path).unwrap();

        let partial = out_path.join("cas20200101000000.nc.partial");
        let target = out_path.join("cas20200101000000.nc");
        fs::write(&partial, b"perturbed").unwrap();

        // file cannot replace a non-empty directory
        fs::create_dir_all(target.join("occupied")).unwrap();

        assert!(matches!(
            commit_partial(&partial, &target),
            Err(SnapshotError::Io(_))
        ));
        assert!(!partial.exists());

        fs::remove_dir_all(&out_path).unwrap();
    }

    #[test]
    fn commit_renames_partial() {
        let out_path = env::temp_dir().join(format!("pgw-rename-{}", process::id()));
        let _ = fs::remove_dir_all(&out_path);
        fs::create_dir_all(&out_path).unwrap();

        let partial = out_path.join("cas20200101000000.nc.partial");
        let target = out_path.join("cas20200101000000.nc");
        fs::write(&partial, b"perturbed").unwrap();

        commit_partial(&partial, &target).unwrap();

        assert!(!partial.exists());
        assert_eq!(fs::read(&target).unwrap(), b"perturbed");

        fs::remove_dir_all(&out_path).unwrap();
    }
}
