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

//! Module responsible for perturbing the surface and soil
//! of a snapshot.
//!
//! The skin and soil temperature signal is added to land cells.
//! When a sea surface temperature climatology is available, it is used
//! for ocean cells and blended with the perturbed land skin temperature
//! in coastal cells. Ocean cells without SST data receive the value
//! of the nearest ocean cell (in grid index space) which has it.

mod soil;

pub use soil::scale_soil_moisture;

use crate::constants::{
    LAND_MIN_LAND_FRACTION, OCEAN_MAX_LAND_FRACTION, SOIL_TEMPERATURE_MIN, ZERO_CELSIUS,
};
use crate::errors::PerturbationError;
use crate::model::atmosphere::check_finite;
use crate::model::input::{check_shape, signal::Signals, Snapshot};
use crate::Float;
use kd_tree::KdTree2;
use log::{debug, warn};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Zip};
use ordered_float::OrderedFloat;

/// Source of the skin temperature in a single cell.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BlendDecision {
    /// Original value of the snapshot is kept.
    Unchanged,

    /// Sea surface temperature.
    Ocean,

    /// Perturbed land skin temperature.
    Land,

    /// Land-fraction weighted mean of sea surface
    /// and perturbed land skin temperature.
    Mixed,

    /// Sea surface temperature taken from the nearest ocean cell.
    OceanNoSst,
}

impl BlendDecision {
    /// Evaluates the cell conditions in order, later conditions
    /// override the earlier ones.
    pub fn classify(
        land_fraction: Float,
        raw_sst: Float,
        filled_sst: Float,
        new_skin_temp: Float,
    ) -> Self {
        let mut decision = BlendDecision::Unchanged;

        if raw_sst.is_finite() && land_fraction <= OCEAN_MAX_LAND_FRACTION {
            decision = BlendDecision::Ocean;
        }

        if new_skin_temp.is_finite() && land_fraction >= LAND_MIN_LAND_FRACTION {
            decision = BlendDecision::Land;
        }

        if new_skin_temp.is_finite()
            && filled_sst.is_finite()
            && land_fraction > OCEAN_MAX_LAND_FRACTION
            && land_fraction < LAND_MIN_LAND_FRACTION
            && raw_sst > ZERO_CELSIUS
        {
            decision = BlendDecision::Mixed;
        }

        if is_missing_sst(land_fraction, raw_sst) {
            decision = BlendDecision::OceanNoSst;
        }

        decision
    }

    /// Skin temperature of the cell chosen by the decision.
    pub fn skin_temperature(
        self,
        original: Float,
        land_fraction: Float,
        filled_sst: Float,
        new_skin_temp: Float,
    ) -> Float {
        match self {
            BlendDecision::Unchanged => original,
            BlendDecision::Ocean | BlendDecision::OceanNoSst => filled_sst,
            BlendDecision::Land => new_skin_temp,
            BlendDecision::Mixed => {
                filled_sst * (1.0 - land_fraction) + new_skin_temp * land_fraction
            }
        }
    }
}

/// Number of cells per [`BlendDecision`].
#[derive(Copy, Clone, Default, Eq, PartialEq, Debug)]
pub struct BlendCounts {
    pub unchanged: usize,
    pub ocean: usize,
    pub land: usize,
    pub mixed: usize,
    pub ocean_no_sst: usize,

    /// Ocean cells which received SST from the nearest neighbour.
    pub filled: usize,
}

impl BlendCounts {
    fn add(&mut self, decision: BlendDecision) {
        match decision {
            BlendDecision::Unchanged => self.unchanged += 1,
            BlendDecision::Ocean => self.ocean += 1,
            BlendDecision::Land => self.land += 1,
            BlendDecision::Mixed => self.mixed += 1,
            BlendDecision::OceanNoSst => self.ocean_no_sst += 1,
        }
    }
}

/// Perturbed surface fields of a snapshot.
#[derive(Clone, Debug)]
pub struct PerturbedSurface {
    pub skin_temperature: Array2<Float>,
    pub soil_temperature: Array3<Float>,
    pub soil_moisture: Array3<Float>,

    /// Present only when the SST climatology was used.
    pub blend_counts: Option<BlendCounts>,
}

/// Adds the skin temperature and soil moisture signals
/// to the surface fields of the snapshot.
pub fn perturb_surface(
    snapshot: &Snapshot,
    signals: &Signals,
) -> Result<PerturbedSurface, PerturbationError> {
    let grid_shape = snapshot.grid_shape();
    signals.climate.check_grid(grid_shape)?;

    debug!("Perturbing skin and soil temperature");

    let skin_delta = signals.climate.skin_temperature.view();
    let new_skin_temp = perturb_skin_temperature(snapshot.skin_temperature.view(), skin_delta);
    let new_soil_temp = perturb_soil_temperature(snapshot.soil_temperature.view(), skin_delta);

    let soil_temperature =
        update_soil_temperature(snapshot.soil_temperature.view(), new_soil_temp.view());

    let (skin_temperature, blend_counts) = match &signals.sst {
        Some(sst) => {
            check_shape("sst", sst.shape(), &[grid_shape.0, grid_shape.1])?;

            let (skin_temperature, counts) = blend_skin_temperature(
                snapshot.skin_temperature.view(),
                snapshot.land_fraction.view(),
                sst.view(),
                new_skin_temp.view(),
            );

            (skin_temperature, Some(counts))
        }
        None => (new_skin_temp, None),
    };

    let soil_moisture = match &signals.soil_moisture {
        Some(signal) => {
            debug!("Applying soil moisture signal");
            scale_soil_moisture(snapshot.soil_moisture.view(), signal)?
        }
        None => snapshot.soil_moisture.clone(),
    };

    check_finite("T_SKIN", &skin_temperature)?;
    check_finite("T_SO", &soil_temperature)?;

    Ok(PerturbedSurface {
        skin_temperature,
        soil_temperature,
        soil_moisture,
        blend_counts,
    })
}

/// Adds the skin temperature change, missing change is treated as zero.
pub fn perturb_skin_temperature(
    skin_temperature: ArrayView2<Float>,
    delta: ArrayView2<Float>,
) -> Array2<Float> {
    Zip::from(skin_temperature)
        .and(delta)
        .map_collect(|&t, &dt| t + zero_if_missing(dt))
}

/// Adds the skin temperature change to all soil layers,
/// missing change is treated as zero.
pub fn perturb_soil_temperature(
    soil_temperature: ArrayView3<Float>,
    delta: ArrayView2<Float>,
) -> Array3<Float> {
    Zip::from(soil_temperature)
        .and_broadcast(delta)
        .map_collect(|&t, &dt| t + zero_if_missing(dt))
}

/// Uses the perturbed soil temperature where it is plausible.
pub fn update_soil_temperature(
    original: ArrayView3<Float>,
    perturbed: ArrayView3<Float>,
) -> Array3<Float> {
    Zip::from(original)
        .and(perturbed)
        .map_collect(|&old, &new| {
            if new.is_finite() && new >= SOIL_TEMPERATURE_MIN {
                new
            } else {
                old
            }
        })
}

/// Fills ocean cells without SST data with the SST
/// of the nearest ocean cell (in grid index space) that has it.
///
/// Returns filled SST and the number of filled cells. When there
/// is no ocean cell with SST data the field is returned unchanged.
pub fn fill_missing_sst(
    land_fraction: ArrayView2<Float>,
    sst: ArrayView2<Float>,
) -> (Array2<Float>, usize) {
    let donors: Vec<([Float; 2], Float)> = Zip::indexed(land_fraction)
        .and(sst)
        .fold(Vec::new(), |mut donors, (i, j), &fr, &sst| {
            if fr <= OCEAN_MAX_LAND_FRACTION && sst > ZERO_CELSIUS {
                donors.push(([i as Float, j as Float], sst));
            }
            donors
        });

    let mut filled = sst.to_owned();

    if donors.is_empty() {
        warn!("No ocean cells with SST data, missing SST is not filled");
        return (filled, 0);
    }

    let kdtree = KdTree2::build_by_key(donors, |item, k| OrderedFloat(item.0[k]));
    let mut filled_count = 0;

    Zip::indexed(&mut filled)
        .and(land_fraction)
        .for_each(|(i, j), sst, &fr| {
            if !is_missing_sst(fr, *sst) {
                return;
            }

            if let Some(nearest) =
                kdtree.nearest_by(&[i as Float, j as Float], |item, k| item.0[k])
            {
                *sst = nearest.item.1;
                filled_count += 1;
            }
        });

    (filled, filled_count)
}

/// Blends sea surface temperature with perturbed land
/// skin temperature according to the land fraction.
pub fn blend_skin_temperature(
    skin_temperature: ArrayView2<Float>,
    land_fraction: ArrayView2<Float>,
    sst: ArrayView2<Float>,
    new_skin_temp: ArrayView2<Float>,
) -> (Array2<Float>, BlendCounts) {
    let (filled_sst, filled) = fill_missing_sst(land_fraction, sst);

    let mut counts = BlendCounts {
        filled,
        ..BlendCounts::default()
    };
    let mut blended = Array2::zeros(skin_temperature.raw_dim());

    Zip::from(&mut blended)
        .and(skin_temperature)
        .and(land_fraction)
        .and(sst)
        .and(&filled_sst)
        .and(new_skin_temp)
        .for_each(|blended, &original, &fr, &raw_sst, &filled_sst, &new_ts| {
            let decision = BlendDecision::classify(fr, raw_sst, filled_sst, new_ts);
            counts.add(decision);

            *blended = decision.skin_temperature(original, fr, filled_sst, new_ts);
        });

    debug!("Skin temperature blending: {:?}", counts);

    (blended, counts)
}

/// Ocean cell with SST equal to the freezing point
/// which marks missing data.
fn is_missing_sst(land_fraction: Float, sst: Float) -> bool {
    land_fraction.is_finite()
        && land_fraction <= OCEAN_MAX_LAND_FRACTION
        && sst == ZERO_CELSIUS
}

fn zero_if_missing(delta: Float) -> Float {
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}
