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

//! Module responsible for perturbing the atmospheric state
//! of a snapshot.
//!
//! The perturbation is conducted in following steps:
//!
//! 1. Pressure on hybrid levels is reconstructed from the surface pressure.
//! 2. The sea level pressure change is converted into the surface pressure
//!    change with the hydrostatic expansion factor, and the pressure on hybrid
//!    levels is reconstructed again from the corrected surface pressure.
//! 3. Temperature and specific humidity are interpolated from the original
//!    to the corrected pressure levels.
//! 4. Temperature and relative humidity changes are interpolated from the
//!    signal pressure levels to the corrected pressure levels.
//! 5. The changes are added and specific humidity is reconstructed
//!    from the perturbed relative humidity and temperature.
//!
//! Any non-finite value in the result fails the whole snapshot,
//! so faulty values are never written to the output.

mod bisection;
mod interpolation;
mod lapse_rate;
mod moisture;
mod pressure;

pub use interpolation::{interpolate_field, EmptyColumn, SourceLevels};
pub use moisture::non_negative;

use crate::errors::PerturbationError;
use crate::model::input::{signal::ClimateSignal, Snapshot};
use crate::Float;
use lapse_rate::expansion_factor_field;
use log::{debug, warn};
use ndarray::{Array2, Array3, ArrayBase, Axis, Data, Dimension};
use pressure::{corrected_surface_pressure, pressure_field};

/// Perturbed atmospheric fields of a snapshot.
#[derive(Clone, Debug)]
pub struct PerturbedAtmosphere {
    pub temperature: Array3<Float>,
    pub spec_humidity: Array3<Float>,
    pub surface_pressure: Array2<Float>,

    /// Number of columns in which the signal had no valid levels
    /// and was treated as zero.
    pub empty_signal_columns: usize,
}

/// Adds the climate change signal to the atmospheric state of the snapshot.
pub fn perturb_atmosphere(
    snapshot: &Snapshot,
    signal: &ClimateSignal,
) -> Result<PerturbedAtmosphere, PerturbationError> {
    signal.check_grid(snapshot.grid_shape())?;

    debug!("Correcting surface pressure");

    let pressure = pressure_field(
        snapshot.hybrid_a.view(),
        snapshot.hybrid_b.view(),
        snapshot.surface_pressure.view(),
    );

    let levels = Axis(0);
    let lowest = pressure.len_of(levels) - 1;

    let expansion_factor = expansion_factor_field(
        snapshot.temperature.index_axis(levels, lowest),
        pressure.index_axis(levels, lowest),
        snapshot.surface_pressure.view(),
        snapshot.surface_geopotential.view(),
    );

    let surface_pressure = corrected_surface_pressure(
        snapshot.surface_pressure.view(),
        signal.sea_level_pressure.view(),
        expansion_factor.view(),
    );
    check_finite("PS", &surface_pressure)?;

    let new_pressure = pressure_field(
        snapshot.hybrid_a.view(),
        snapshot.hybrid_b.view(),
        surface_pressure.view(),
    );

    debug!("Interpolating state onto corrected pressure levels");

    let temperature = interpolate_field(
        SourceLevels::Columns(pressure.view()),
        snapshot.temperature.view(),
        new_pressure.view(),
        EmptyColumn::Fail,
    )?
    .field;

    let spec_humidity = interpolate_field(
        SourceLevels::Columns(pressure.view()),
        snapshot.spec_humidity.view(),
        new_pressure.view(),
        EmptyColumn::Fail,
    )?
    .field
    .mapv_into(non_negative);

    debug!("Interpolating signal onto corrected pressure levels");

    let delta_temp = interpolate_field(
        SourceLevels::Fixed(signal.plev.view()),
        signal.temperature.view(),
        new_pressure.view(),
        EmptyColumn::Zero,
    )?;

    let delta_rh = interpolate_field(
        SourceLevels::Fixed(signal.plev.view()),
        signal.relative_humidity.view(),
        new_pressure.view(),
        EmptyColumn::Zero,
    )?;

    let empty_signal_columns = delta_temp.empty_columns.max(delta_rh.empty_columns);

    if empty_signal_columns > 0 {
        warn!(
            "Signal has no valid levels in {} columns, these columns are not perturbed",
            empty_signal_columns
        );
    }

    debug!("Reconciling humidity with perturbed temperature");

    let reconciled = moisture::reconcile(
        new_pressure.view(),
        temperature.view(),
        spec_humidity.view(),
        delta_temp.field.view(),
        delta_rh.field.view(),
    );

    check_finite("T", &reconciled.temperature)?;
    check_finite("QV", &reconciled.spec_humidity)?;

    Ok(PerturbedAtmosphere {
        temperature: reconciled.temperature,
        spec_humidity: reconciled.spec_humidity,
        surface_pressure,
        empty_signal_columns,
    })
}

/// Fails when any value of the perturbed field is not finite.
pub(crate) fn check_finite<S, D>(
    field: &'static str,
    values: &ArrayBase<S, D>,
) -> Result<(), PerturbationError>
where
    S: Data<Elem = Float>,
    D: Dimension,
{
    let count = values.iter().filter(|v| !v.is_finite()).count();

    if count > 0 {
        return Err(PerturbationError::NonFinite { field, count });
    }

    Ok(())
}
