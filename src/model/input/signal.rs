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

//! Sub-module responsible for reading climate change signals.
//!
//! Signals are anomalies (future minus present, or present minus past)
//! and are added to the snapshot state. Atmospheric signals are provided
//! on fixed pressure levels, not on the model levels.

use super::{check_shape, read_array, squeeze_into, FieldSource};
use crate::constants::{SIGNAL_MISSING_THRESHOLD, ZERO_CELSIUS};
use crate::model::configuration::SoilMoistureSource;
use crate::{errors::InputError, Float};
use log::debug;
use ndarray::{stack, Array1, Array2, Array3, Axis, Ix2, Ix3};

/// Climate change signal of the atmosphere and skin temperature.
#[derive(Clone, Debug)]
pub struct ClimateSignal {
    /// Pressure levels (Pa) of the signal, always ascending.
    pub plev: Array1<Float>,

    /// Air temperature change (K) on `plev`, missing values are NaN.
    pub temperature: Array3<Float>,

    /// Relative humidity change (%) on `plev`, missing values are NaN.
    pub relative_humidity: Array3<Float>,

    /// Mean sea level pressure change (Pa).
    pub sea_level_pressure: Array2<Float>,

    /// Skin temperature change (K).
    pub skin_temperature: Array2<Float>,
}

impl ClimateSignal {
    /// Reads the atmospheric signal from `atmosphere` and the skin
    /// temperature signal from `surface` (which can be the same source).
    pub fn load(
        atmosphere: &impl FieldSource,
        surface: &impl FieldSource,
    ) -> Result<Self, InputError> {
        debug!("Loading climate change signal");

        let mut plev: Array1<Float> = read_array(atmosphere, "plev")?;
        let mut temperature: Array3<Float> = read_array(atmosphere, "ta")?;
        let mut relative_humidity: Array3<Float> = read_array(atmosphere, "hur")?;
        let sea_level_pressure: Array2<Float> = read_array(atmosphere, "psl")?;
        let skin_temperature: Array2<Float> = read_array(surface, "ts")?;

        check_shape(
            "ta",
            temperature.shape(),
            &[plev.len(), sea_level_pressure.dim().0, sea_level_pressure.dim().1],
        )?;
        check_shape("hur", relative_humidity.shape(), temperature.shape())?;

        // interpolation expects pressure growing with level index,
        // same as in the snapshots
        if plev.len() > 1 && plev[0] > plev[plev.len() - 1] {
            debug!("Reversing pressure levels of the signal");
            plev.invert_axis(Axis(0));
            temperature.invert_axis(Axis(0));
            relative_humidity.invert_axis(Axis(0));
        }

        Ok(ClimateSignal {
            plev,
            temperature: mask_implausible(temperature),
            relative_humidity: mask_implausible(relative_humidity),
            sea_level_pressure,
            skin_temperature,
        })
    }

    /// Checks if the signal covers the same horizontal grid as snapshot.
    pub fn check_grid(&self, grid_shape: (usize, usize)) -> Result<(), InputError> {
        let (lat, lon) = grid_shape;
        let levels = self.plev.len();

        check_shape("ta", self.temperature.shape(), &[levels, lat, lon])?;
        check_shape("hur", self.relative_humidity.shape(), &[levels, lat, lon])?;
        check_shape("psl", self.sea_level_pressure.shape(), &[lat, lon])?;
        check_shape("ts", self.skin_temperature.shape(), &[lat, lon])?;

        Ok(())
    }
}

/// Values at or above the threshold are not physical
/// (most likely unmasked fill values) and are treated as missing.
fn mask_implausible(field: Array3<Float>) -> Array3<Float> {
    field.mapv(|v| {
        if v < SIGNAL_MISSING_THRESHOLD {
            v
        } else {
            Float::NAN
        }
    })
}

/// Reads the sea surface temperature climatology (in Celsius)
/// and converts it to Kelvin.
///
/// Missing values become exactly 273.15 K which
/// marks cells without SST data.
pub fn load_sst_climatology(source: &impl FieldSource) -> Result<Array2<Float>, InputError> {
    debug!("Loading SST climatology");

    let sst: Array2<Float> = read_array(source, "sst")?;

    Ok(sst.mapv(|v| (if v.is_finite() { v } else { 0.0 }) + ZERO_CELSIUS))
}

/// Soil moisture climate change signal.
#[derive(Clone, Debug)]
pub enum SoilMoistureSignal {
    /// Multiplicative change of relative soil moisture,
    /// as (layer, lat, lon) with one layer broadcast to all layers.
    Ratio(Array3<Float>),

    /// Relative soil moisture climatology
    /// as (layer, lat, lon) replacing the snapshot values.
    Climatology(Array3<Float>),
}

impl SoilMoistureSignal {
    pub fn load(
        source: &impl FieldSource,
        kind: &SoilMoistureSource,
    ) -> Result<Self, InputError> {
        debug!("Loading soil moisture signal");

        match kind {
            SoilMoistureSource::Ratio { variable, .. } => {
                let ratio = source.read_field(variable)?;
                let ratio = match ratio.ndim() {
                    2 => ratio.into_dimensionality::<Ix2>()?.insert_axis(Axis(0)),
                    _ => squeeze_into::<Ix3>(ratio, variable)?,
                };

                Ok(SoilMoistureSignal::Ratio(ratio))
            }
            SoilMoistureSource::Climatology {
                layers, porosity, ..
            } => {
                let mut volumetric: Vec<Array2<Float>> = Vec::with_capacity(layers.len());

                for layer in layers {
                    volumetric.push(read_array(source, layer)?);
                }

                let views: Vec<_> = volumetric.iter().map(|layer| layer.view()).collect();
                let stacked = stack(Axis(0), views.as_slice())?;

                Ok(SoilMoistureSignal::Climatology(stacked / *porosity))
            }
        }
    }
}

/// All signals needed to perturb a snapshot.
#[derive(Clone, Debug)]
pub struct Signals {
    pub climate: ClimateSignal,
    pub sst: Option<Array2<Float>>,
    pub soil_moisture: Option<SoilMoistureSignal>,
}
