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

//! Sub-module responsible for reconstructing pressure
//! on hybrid sigma-pressure levels.

use crate::Float;
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Zip};

/// Computes pressure (level, lat, lon) on hybrid levels
/// as `P = A + B * S`.
pub fn pressure_field(
    hybrid_a: ArrayView1<Float>,
    hybrid_b: ArrayView1<Float>,
    surface_pressure: ArrayView2<Float>,
) -> Array3<Float> {
    let (lat, lon) = surface_pressure.dim();

    Array3::from_shape_fn((hybrid_a.len(), lat, lon), |(k, i, j)| {
        hybrid_a[k] + hybrid_b[k] * surface_pressure[[i, j]]
    })
}

/// Applies the sea level pressure change to the surface pressure,
/// scaled down by the expansion factor of the air column
/// between the sea level and the surface.
///
/// Missing changes are treated as zero.
pub fn corrected_surface_pressure(
    surface_pressure: ArrayView2<Float>,
    sea_level_delta: ArrayView2<Float>,
    expansion_factor: ArrayView2<Float>,
) -> Array2<Float> {
    Zip::from(surface_pressure)
        .and(sea_level_delta)
        .and(expansion_factor)
        .map_collect(|&ps, &delta, &expfac| {
            let delta = if delta.is_finite() { delta } else { 0.0 };
            ps + delta / expfac
        })
}

#[cfg(test)]
mod tests {
    use super::{corrected_surface_pressure, pressure_field};
    use crate::Float;
    use float_cmp::approx_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn hybrid_levels() {
        let hybrid_a = arr1(&[2_000.0, 5_000.0, 1_000.0, 0.0]);
        let hybrid_b = arr1(&[0.0, 0.2, 0.8, 1.0]);
        let surface_pressure = arr2(&[[101_325.0, 85_000.0], [70_000.0, 100_000.0]]);

        let pressure = pressure_field(hybrid_a.view(), hybrid_b.view(), surface_pressure.view());

        assert_eq!(pressure.dim(), (4, 2, 2));
        assert!(approx_eq!(Float, pressure[[1, 0, 1]], 22_000.0, epsilon = 1e-9));
        assert!(approx_eq!(Float, pressure[[3, 1, 0]], 70_000.0, epsilon = 1e-9));

        // pressure must grow towards the surface in every column
        for column in pressure.lanes(ndarray::Axis(0)) {
            assert!(column.to_vec().windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn missing_delta_is_zero() {
        let surface_pressure = arr2(&[[100_000.0, 90_000.0]]);
        let delta = arr2(&[[200.0, Float::NAN]]);
        let expfac = arr2(&[[1.0, 1.2]]);

        let corrected =
            corrected_surface_pressure(surface_pressure.view(), delta.view(), expfac.view());

        assert!(approx_eq!(Float, corrected[[0, 0]], 100_200.0, epsilon = 1e-9));
        assert_eq!(corrected[[0, 1]], 90_000.0);
    }
}
