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

//! Module responsible for parsing and checking the configuration file.
//!
//! To provide meaningful error messages. The configuration file uses
//! [YAML](https://en.wikipedia.org/wiki/YAML) and `serde` to enforce
//! strong typing and automatic type checking.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.

use crate::constants::DEFAULT_POROSITY;
use crate::errors::ConfigError;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::Float;

/// Fields with information about snapshots
/// that should be perturbed.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Input {
    /// List of snapshot files (initial or boundary conditions
    /// of the regional model) to perturb.
    ///
    /// Each file must contain data for exactly one datetime
    /// and following variables: `T`, `QV`, `PS`, `FIS`, `akm`, `bkm`,
    /// `T_SKIN`, `T_SO`, `FR_LAND` and `W_SO_REL`.
    ///
    /// Perturbed files are saved under the same name in the output directory.
    pub snapshot_files: Vec<PathBuf>,

    /// _(Optional)_ Directory to which perturbed snapshots and
    /// the run report are written.
    ///
    /// Defaults to `./output/`. If exists, it must be empty.
    #[serde(default = "Input::default_output_dir")]
    pub output_dir: PathBuf,
}

impl Input {
    fn default_output_dir() -> PathBuf {
        PathBuf::from("./output/")
    }

    /// Checks if there is anything to perturb.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.snapshot_files.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "List of snapshot files cannot be empty",
            ));
        }

        Ok(())
    }
}

/// Source of the soil moisture climate change signal.
#[derive(Clone, PartialEq, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SoilMoistureSource {
    /// Multiplicative change of soil moisture (eg. from GCM ensemble mean).
    Ratio {
        file: PathBuf,

        /// _(Optional)_ Name of the ratio variable. Defaults to `mrso`.
        #[serde(default = "SoilMoistureSource::default_ratio_variable")]
        variable: String,
    },

    /// Volumetric soil moisture climatology which replaces
    /// the relative soil moisture of snapshots.
    Climatology {
        file: PathBuf,

        /// _(Optional)_ Names of volumetric soil moisture variables,
        /// one per soil layer from top to bottom.
        /// Defaults to ERA5 `swvl1` to `swvl4`.
        #[serde(default = "SoilMoistureSource::default_layers")]
        layers: Vec<String>,

        /// _(Optional)_ Soil porosity used to convert volumetric
        /// soil moisture into relative one. Defaults to `0.472`.
        ///
        /// Must meet the condition `0 < porosity <= 1`.
        #[serde(default = "SoilMoistureSource::default_porosity")]
        porosity: Float,
    },
}

impl SoilMoistureSource {
    fn default_ratio_variable() -> String {
        "mrso".to_string()
    }

    fn default_layers() -> Vec<String> {
        vec![
            "swvl1".to_string(),
            "swvl2".to_string(),
            "swvl3".to_string(),
            "swvl4".to_string(),
        ]
    }

    fn default_porosity() -> Float {
        DEFAULT_POROSITY
    }

    /// File from which the soil moisture signal is read.
    pub fn file(&self) -> &Path {
        match self {
            SoilMoistureSource::Ratio { file, .. } | SoilMoistureSource::Climatology { file, .. } => {
                file.as_path()
            }
        }
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if let SoilMoistureSource::Climatology {
            layers, porosity, ..
        } = self
        {
            if layers.is_empty() {
                return Err(ConfigError::OutOfBounds(
                    "Soil moisture climatology needs at least one layer",
                ));
            }

            if !(*porosity > 0.0 && *porosity <= 1.0) {
                return Err(ConfigError::OutOfBounds(
                    "Soil porosity must be in range (0, 1]",
                ));
            }
        }

        Ok(())
    }
}

/// Fields with information about the climate change signal.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Signal {
    /// Name of the GCM (or ensemble) providing the signal.
    /// Used only for logging and in the run report.
    pub model_name: String,

    /// File with climate change signals on pressure levels (`plev`):
    /// air temperature `ta` (K) and relative humidity `hur` (%),
    /// and with the mean sea level pressure signal `psl` (Pa).
    pub atmosphere_file: PathBuf,

    /// _(Optional)_ File with skin temperature signal `ts` (K).
    ///
    /// Defaults to `atmosphere_file`.
    #[serde(default)]
    pub surface_file: Option<PathBuf>,

    /// _(Optional)_ Sea surface temperature climatology `sst` (in Celsius)
    /// used for ocean and coastal cells.
    ///
    /// When not provided skin temperature is perturbed
    /// with the `ts` signal everywhere.
    #[serde(default)]
    pub sst_file: Option<PathBuf>,

    /// _(Optional)_ Soil moisture signal. When not provided
    /// soil moisture is not modified.
    #[serde(default)]
    pub soil_moisture: Option<SoilMoistureSource>,
}

impl Signal {
    /// File from which the skin temperature signal is read.
    pub fn surface_file(&self) -> &Path {
        self.surface_file
            .as_deref()
            .unwrap_or(self.atmosphere_file.as_path())
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.model_name.trim().is_empty() {
            return Err(ConfigError::OutOfBounds("Model name cannot be empty"));
        }

        if let Some(soil_moisture) = &self.soil_moisture {
            soil_moisture.check_bounds()?;
        }

        Ok(())
    }
}

/// _(Optional)_ Fields with information about
/// resources available for the tool.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Thread count used for vertical interpolation.
    /// The thread pool initiated by this tool will use
    /// up to this number of workers.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,

    /// _(Optional)_ Heap memory limit for the tool in MB.
    /// Useful for enabling meaningful Out-of-memory error messages.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space
    /// (`2^32` or `2^64` bytes).
    ///
    /// Each snapshot is held in memory together with all derived fields
    /// and for high resolution domains this can be several GB.
    /// When the allocator has a capped memory amount available
    /// it will abort the process with (somehow useful) OOM error message
    /// instead of the system silently killing it.
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
            memory: Resources::default_memory(),
        }
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Config {
    pub input: Input,

    pub signal: Signal,

    #[serde(default)]
    pub resources: Resources,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;

        Config::new_from_slice(data.as_slice())
    }

    fn new_from_slice(data: &[u8]) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_slice(data)?;

        config.input.check_bounds()?;
        config.signal.check_bounds()?;
        config.resources.check_bounds()?;

        Ok(config)
    }
}
