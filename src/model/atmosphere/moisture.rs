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

//! Sub-module reconciling humidity with the perturbed temperature.
//!
//! The relative humidity is held as the conserved quantity: it is
//! diagnosed from the present-day state, the relative humidity change
//! is added and the specific humidity is rebuilt with the saturation
//! vapour pressure of the perturbed temperature.

use crate::constants::{
    EPSILON, ICE_THRESHOLD, SVP_ICE_A, SVP_ICE_B, SVP_REFERENCE, SVP_WATER_A, SVP_WATER_B,
    TRIPLE_POINT,
};
use crate::Float;
use ndarray::{Array3, ArrayView3, Zip};

/// Saturation vapour pressure (Pa) over water,
/// or over ice below 233.15 K (Murray, 1967).
pub fn saturation_vapour_pressure(temperature: Float) -> Float {
    let (a, b) = if temperature >= ICE_THRESHOLD {
        (SVP_WATER_A, SVP_WATER_B)
    } else {
        (SVP_ICE_A, SVP_ICE_B)
    };

    SVP_REFERENCE * (a * (temperature - TRIPLE_POINT) / (temperature - b)).exp()
}

/// Relative humidity (as fraction) from specific humidity.
pub fn relative_humidity(pressure: Float, spec_humidity: Float, svp: Float) -> Float {
    non_negative(pressure * spec_humidity / ((EPSILON + (1.0 - EPSILON) * spec_humidity) * svp))
}

/// Specific humidity from relative humidity (as fraction).
pub fn specific_humidity(pressure: Float, rel_humidity: Float, svp: Float) -> Float {
    let vapour_pressure = rel_humidity * svp;

    non_negative(EPSILON * vapour_pressure / (pressure - (1.0 - EPSILON) * vapour_pressure))
}

/// Clamps negative values to zero, NaN is passed through.
pub fn non_negative(value: Float) -> Float {
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Temperature and specific humidity after adding the change signal.
#[derive(Clone, Debug)]
pub struct Reconciled {
    pub temperature: Array3<Float>,
    pub spec_humidity: Array3<Float>,
}

/// Adds temperature change `delta_temp` (K) and relative humidity change
/// `delta_rh` (%) to the state interpolated on `pressure` levels.
pub fn reconcile(
    pressure: ArrayView3<Float>,
    temperature: ArrayView3<Float>,
    spec_humidity: ArrayView3<Float>,
    delta_temp: ArrayView3<Float>,
    delta_rh: ArrayView3<Float>,
) -> Reconciled {
    let new_temperature = Zip::from(temperature)
        .and(delta_temp)
        .map_collect(|&t, &dt| t + dt);

    let new_spec_humidity = Zip::from(pressure)
        .and(temperature)
        .and(spec_humidity)
        .and(&new_temperature)
        .and(delta_rh)
        .map_collect(|&p, &t, &q, &new_t, &drh| {
            let rh = relative_humidity(p, q, saturation_vapour_pressure(t));
            let new_rh = non_negative(rh + drh / 100.0);

            specific_humidity(p, new_rh, saturation_vapour_pressure(new_t))
        });

    Reconciled {
        temperature: new_temperature,
        spec_humidity: new_spec_humidity,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        non_negative, reconcile, relative_humidity, saturation_vapour_pressure,
        specific_humidity,
    };
    use crate::constants::ICE_THRESHOLD;
    use crate::Float;
    use float_cmp::approx_eq;
    use ndarray::Array3;

    #[test]
    fn svp_reference_points() {
        assert!(approx_eq!(
            Float,
            saturation_vapour_pressure(273.16),
            610.78,
            epsilon = 1e-9
        ));
        assert!(approx_eq!(
            Float,
            saturation_vapour_pressure(300.0),
            3531.674,
            epsilon = 1e-2
        ));
    }

    #[test]
    fn svp_jump_at_ice_threshold() {
        let water = saturation_vapour_pressure(ICE_THRESHOLD);
        let ice = saturation_vapour_pressure(ICE_THRESHOLD - 1e-9);
        let jump = water - ice;

        assert!(approx_eq!(Float, water, 18.4035, epsilon = 1e-3));
        assert!(approx_eq!(Float, ice, 12.5963, epsilon = 1e-3));
        assert!(jump > 5.80 && jump < 5.82, "jump: {}", jump);
    }

    #[test]
    fn humidity_conversions_are_inverse() {
        let (p, q) = (85_000.0, 0.008);
        let svp = saturation_vapour_pressure(285.0);

        let rh = relative_humidity(p, q, svp);
        assert!(rh > 0.0 && rh < 1.0);
        assert!(approx_eq!(Float, specific_humidity(p, rh, svp), q, epsilon = 1e-12));
    }

    #[test]
    fn clamps_keep_nan() {
        assert_eq!(non_negative(-1.0), 0.0);
        assert_eq!(non_negative(2.0), 2.0);
        assert!(non_negative(Float::NAN).is_nan());
        assert_eq!(relative_humidity(85_000.0, -0.001, 1000.0), 0.0);
    }

    #[test]
    fn zero_change_keeps_state() {
        let pressure = Array3::from_shape_fn((3, 2, 2), |(k, _, _)| 30_000.0 * (k + 1) as Float);
        let temperature = Array3::from_shape_fn((3, 2, 2), |(k, i, _)| {
            225.0 + 25.0 * k as Float + i as Float
        });
        let spec_humidity = Array3::from_shape_fn((3, 2, 2), |(k, _, j)| {
            0.0001 + 0.004 * k as Float + 0.001 * j as Float
        });
        let zeros = Array3::zeros((3, 2, 2));

        let result = reconcile(
            pressure.view(),
            temperature.view(),
            spec_humidity.view(),
            zeros.view(),
            zeros.view(),
        );

        for (&found, &expected) in result.temperature.iter().zip(temperature.iter()) {
            assert_eq!(found, expected);
        }
        for (&found, &expected) in result.spec_humidity.iter().zip(spec_humidity.iter()) {
            assert!(approx_eq!(Float, found, expected, epsilon = 1e-12));
        }
    }

    #[test]
    fn drying_never_goes_negative() {
        let pressure = Array3::from_elem((2, 1, 1), 90_000.0);
        let temperature = Array3::from_elem((2, 1, 1), 290.0);
        let spec_humidity = Array3::from_elem((2, 1, 1), 0.005);
        let warming = Array3::from_elem((2, 1, 1), 3.0);
        let drying = Array3::from_elem((2, 1, 1), -150.0);

        let result = reconcile(
            pressure.view(),
            temperature.view(),
            spec_humidity.view(),
            warming.view(),
            drying.view(),
        );

        assert!(result.spec_humidity.iter().all(|&q| q == 0.0));
        assert!(approx_eq!(Float, result.temperature[[0, 0, 0]], 293.0, epsilon = 1e-12));
    }

    #[test]
    fn warming_at_constant_rh_moistens() {
        let pressure = Array3::from_elem((1, 1, 1), 90_000.0);
        let temperature = Array3::from_elem((1, 1, 1), 290.0);
        let spec_humidity = Array3::from_elem((1, 1, 1), 0.005);
        let warming = Array3::from_elem((1, 1, 1), 2.0);
        let no_rh_change = Array3::zeros((1, 1, 1));

        let result = reconcile(
            pressure.view(),
            temperature.view(),
            spec_humidity.view(),
            warming.view(),
            no_rh_change.view(),
        );

        // roughly 7% per Kelvin
        let ratio = result.spec_humidity[[0, 0, 0]] / 0.005;
        assert!(ratio > 1.10 && ratio < 1.18, "ratio: {}", ratio);
    }
}
