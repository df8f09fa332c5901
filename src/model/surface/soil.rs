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

//! Sub-module applying the soil moisture signal.

use crate::errors::InputError;
use crate::model::input::{check_shape, signal::SoilMoistureSignal, SnapshotField};
use crate::Float;
use ndarray::{s, Array3, ArrayView3, Zip};

/// Applies the soil moisture signal to the relative soil moisture
/// (soil layer, lat, lon) of the snapshot.
///
/// The new value is used only when it is finite and positive,
/// otherwise the original value is retained.
pub fn scale_soil_moisture(
    soil_moisture: ArrayView3<Float>,
    signal: &SoilMoistureSignal,
) -> Result<Array3<Float>, InputError> {
    let (layers, lat, lon) = soil_moisture.dim();

    match signal {
        SoilMoistureSignal::Ratio(ratio) => {
            let ratio_layers = if ratio.dim().0 == 1 { 1 } else { layers };
            check_shape(
                SnapshotField::SoilMoisture.name(),
                ratio.shape(),
                &[ratio_layers, lat, lon],
            )?;

            let ratio = ratio
                .broadcast(soil_moisture.raw_dim())
                .ok_or_else(|| InputError::ShapeMismatch {
                    field: SnapshotField::SoilMoisture.name().to_string(),
                    expected: vec![layers, lat, lon],
                    found: ratio.shape().to_vec(),
                })?;

            Ok(Zip::from(soil_moisture)
                .and(ratio)
                .map_collect(|&w, &r| valid_or(w * r, w)))
        }
        SoilMoistureSignal::Climatology(climatology) => {
            let clim_layers = climatology.dim().0;

            // climatology covers only the upper layers
            if clim_layers > layers {
                return Err(InputError::ShapeMismatch {
                    field: SnapshotField::SoilMoisture.name().to_string(),
                    expected: vec![layers, lat, lon],
                    found: climatology.shape().to_vec(),
                });
            }
            check_shape(
                SnapshotField::SoilMoisture.name(),
                climatology.shape(),
                &[clim_layers, lat, lon],
            )?;

            let mut scaled = soil_moisture.to_owned();

            Zip::from(scaled.slice_mut(s![..clim_layers, .., ..]))
                .and(climatology)
                .for_each(|w, &c| *w = valid_or(c, *w));

            Ok(scaled)
        }
    }
}

fn valid_or(candidate: Float, original: Float) -> Float {
    if candidate.is_finite() && candidate > 0.0 {
        candidate
    } else {
        original
    }
}

#[cfg(test)]
mod tests {
    use super::scale_soil_moisture;
    use crate::errors::InputError;
    use crate::model::input::signal::SoilMoistureSignal;
    use crate::Float;
    use float_cmp::approx_eq;
    use ndarray::{arr3, Array3};

    #[test]
    fn ratio_keeps_original_where_missing() {
        let soil_moisture = Array3::from_elem((2, 1, 3), 0.4);
        let ratio = arr3(&[[[1.5, Float::NAN, 0.0]]]);

        let scaled =
            scale_soil_moisture(soil_moisture.view(), &SoilMoistureSignal::Ratio(ratio)).unwrap();

        for layer in 0..2 {
            assert!(approx_eq!(Float, scaled[[layer, 0, 0]], 0.6, epsilon = 1e-12));
            assert_eq!(scaled[[layer, 0, 1]], 0.4);
            assert_eq!(scaled[[layer, 0, 2]], 0.4);
        }
    }

    #[test]
    fn ratio_per_layer() {
        let soil_moisture = Array3::from_elem((2, 1, 1), 0.5);
        let ratio = arr3(&[[[0.5]], [[2.0]]]);

        let scaled =
            scale_soil_moisture(soil_moisture.view(), &SoilMoistureSignal::Ratio(ratio)).unwrap();

        assert_eq!(scaled[[0, 0, 0]], 0.25);
        assert_eq!(scaled[[1, 0, 0]], 1.0);
    }

    #[test]
    fn climatology_replaces_upper_layers() {
        let soil_moisture = Array3::from_elem((3, 1, 2), 0.4);
        let climatology = arr3(&[[[0.7, Float::NAN]], [[0.8, -1.0]]]);

        let scaled = scale_soil_moisture(
            soil_moisture.view(),
            &SoilMoistureSignal::Climatology(climatology),
        )
        .unwrap();

        assert_eq!(scaled[[0, 0, 0]], 0.7);
        assert_eq!(scaled[[1, 0, 0]], 0.8);
        assert_eq!(scaled[[2, 0, 0]], 0.4);
        assert_eq!(scaled[[0, 0, 1]], 0.4);
        assert_eq!(scaled[[1, 0, 1]], 0.4);
    }

    #[test]
    fn incompatible_signal() {
        let soil_moisture = Array3::from_elem((2, 1, 2), 0.4);

        assert!(matches!(
            scale_soil_moisture(
                soil_moisture.view(),
                &SoilMoistureSignal::Ratio(Array3::from_elem((3, 1, 2), 1.0)),
            ),
            Err(InputError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            scale_soil_moisture(
                soil_moisture.view(),
                &SoilMoistureSignal::Climatology(Array3::from_elem((3, 1, 2), 0.5)),
            ),
            Err(InputError::ShapeMismatch { .. })
        ));
    }
}
