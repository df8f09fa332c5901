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

//! Sub-module converting the sea level pressure change
//! into surface pressure change.
//!
//! The air column between the sea level and the surface is
//! extrapolated hydrostatically from the lowest model level,
//! with the lapse rate limited for very warm and very cold surfaces.
//! The state of each cell is passed through the ordered sequence
//! of limiting steps before the expansion factor is computed.

use crate::constants::{G, LAPSE_COLD_LIMIT, LAPSE_WARM_LIMIT, R_D, STD_LAPSE_RATE};
use crate::Float;
use float_cmp::approx_eq;
use ndarray::{Array2, ArrayView2, Zip};

/// Temperatures and lapse rate of the air column below the surface.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SurfaceState {
    /// Surface geopotential (m^2 s^-2).
    pub geopotential: Float,

    /// Surface temperature (K).
    pub surface_temp: Float,

    /// Temperature extrapolated to the sea level (K).
    pub sea_level_temp: Float,

    /// Lapse rate used for the extrapolation (K m^-1).
    pub lapse_rate: Float,
}

impl SurfaceState {
    /// Extrapolates the surface temperature from the lowest model level
    /// with the standard lapse rate.
    pub fn new(
        lowest_temp: Float,
        lowest_pressure: Float,
        surface_pressure: Float,
        geopotential: Float,
    ) -> Self {
        let surface_temp = lowest_temp
            + STD_LAPSE_RATE * R_D * (surface_pressure / lowest_pressure - 1.0) * lowest_temp / G;

        SurfaceState {
            geopotential,
            surface_temp,
            sea_level_temp: surface_temp + STD_LAPSE_RATE * geopotential / G,
            lapse_rate: STD_LAPSE_RATE,
        }
    }

    /// Limits the sea level temperature for warm columns.
    ///
    /// Skipped at the sea level, where the lapse rate does not matter.
    pub fn limit_warm(self) -> Self {
        if approx_eq!(Float, self.geopotential, 0.0) || self.sea_level_temp <= LAPSE_WARM_LIMIT {
            return self;
        }

        if self.surface_temp <= LAPSE_WARM_LIMIT {
            SurfaceState {
                lapse_rate: (LAPSE_WARM_LIMIT - self.surface_temp) * G / self.geopotential,
                ..self
            }
        } else {
            SurfaceState {
                lapse_rate: 0.0,
                surface_temp: 0.5 * (LAPSE_WARM_LIMIT + self.surface_temp),
                ..self
            }
        }
    }

    /// Limits the surface temperature of cold columns.
    pub fn limit_cold(self) -> Self {
        if self.surface_temp < LAPSE_COLD_LIMIT {
            SurfaceState {
                surface_temp: 0.5 * (LAPSE_COLD_LIMIT + self.surface_temp),
                ..self
            }
        } else {
            self
        }
    }

    /// Ratio of the sea level pressure to the surface pressure
    /// from the third-order expansion of the hydrostatic equation.
    pub fn expansion_factor(&self) -> Float {
        let x = self.lapse_rate * self.geopotential / (G * self.surface_temp);

        (self.geopotential / (R_D * self.surface_temp) * (1.0 - x / 2.0 + x * x / 3.0)).exp()
    }
}

/// Computes the expansion factor for every cell from the
/// lowest model level temperature and pressure.
pub fn expansion_factor_field(
    lowest_temp: ArrayView2<Float>,
    lowest_pressure: ArrayView2<Float>,
    surface_pressure: ArrayView2<Float>,
    geopotential: ArrayView2<Float>,
) -> Array2<Float> {
    Zip::from(lowest_temp)
        .and(lowest_pressure)
        .and(surface_pressure)
        .and(geopotential)
        .map_collect(|&t, &p, &ps, &fis| {
            SurfaceState::new(t, p, ps, fis)
                .limit_warm()
                .limit_cold()
                .expansion_factor()
        })
}

#[cfg(test)]
mod tests {
    use super::{expansion_factor_field, SurfaceState};
    use crate::constants::{G, R_D, STD_LAPSE_RATE};
    use crate::Float;
    use float_cmp::approx_eq;
    use ndarray::arr2;

    #[test]
    fn flat_terrain() {
        for &t in &[230.0, 280.0, 300.0] {
            let state = SurfaceState::new(t, 100_000.0, 100_000.0, 0.0);
            let limited = state.limit_warm();

            assert_eq!(limited, state);
            assert_eq!(limited.lapse_rate, STD_LAPSE_RATE);
            assert!(approx_eq!(
                Float,
                limited.limit_cold().expansion_factor(),
                1.0,
                epsilon = 1e-12
            ));
        }
    }

    #[test]
    fn surface_extrapolation() {
        let state = SurfaceState::new(280.0, 99_000.0, 100_000.0, 1000.0 * G);

        let expected = 280.0 + STD_LAPSE_RATE * R_D * (100_000.0 / 99_000.0 - 1.0) * 280.0 / G;
        assert!(approx_eq!(Float, state.surface_temp, expected, epsilon = 1e-9));
        assert!(approx_eq!(
            Float,
            state.sea_level_temp,
            expected + 6.5,
            epsilon = 1e-9
        ));
    }

    #[test]
    fn warm_column_lapse_rate() {
        // 288 K at 500 m gives 291.25 K at the sea level
        let state = SurfaceState::new(288.0, 100_000.0, 100_000.0, 500.0 * G).limit_warm();

        assert!(approx_eq!(Float, state.surface_temp, 288.0, epsilon = 1e-9));
        assert!(approx_eq!(Float, state.lapse_rate, 2.5 / 500.0, epsilon = 1e-12));
    }

    #[test]
    fn hot_surface() {
        let state = SurfaceState::new(300.0, 100_000.0, 100_000.0, 500.0 * G).limit_warm();

        assert_eq!(state.lapse_rate, 0.0);
        assert!(approx_eq!(Float, state.surface_temp, 295.25, epsilon = 1e-9));
    }

    #[test]
    fn cold_surface() {
        let state = SurfaceState::new(245.0, 100_000.0, 100_000.0, 500.0 * G)
            .limit_warm()
            .limit_cold();

        assert_eq!(state.lapse_rate, STD_LAPSE_RATE);
        assert!(approx_eq!(Float, state.surface_temp, 250.0, epsilon = 1e-9));
    }

    #[test]
    fn elevated_surface_expands() {
        let expfac = expansion_factor_field(
            arr2(&[[280.0, 280.0]]).view(),
            arr2(&[[85_000.0, 99_000.0]]).view(),
            arr2(&[[85_000.0, 100_000.0]]).view(),
            arr2(&[[1500.0 * G, 0.0]]).view(),
        );

        // roughly exp(1500 m / 8 km)
        assert!(expfac[[0, 0]] > 1.15 && expfac[[0, 0]] < 1.25);
        assert!(approx_eq!(Float, expfac[[0, 1]], 1.0, epsilon = 1e-12));
    }
}
