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

//! Module containing constants used by the tool.

use crate::Float;

pub use floccus::constants::G;

/// Specific gas constant for dry air, as in ECMWF geopotential calculator
pub const R_D: Float = 287.06;

/// Molecular weight of water (kg/mol)
pub const M_W: Float = 18.0153 * 0.001;

/// Molecular weight of dry air (kg/mol)
pub const M_D: Float = 28.9644 * 0.001;

/// Ratio of molecular weights of water and dry air
pub const EPSILON: Float = M_W / M_D;

/// Standard atmosphere temperature lapse rate (K/m)
pub const STD_LAPSE_RATE: Float = 0.0065;

///Upper surface temperature limit for lapse rate extrapolation (K)
pub const LAPSE_WARM_LIMIT: Float = 290.5;

///Lower surface temperature limit for lapse rate extrapolation (K)
pub const LAPSE_COLD_LIMIT: Float = 255.0;

/// Saturation vapour pressure at the triple point (Pa), Murray (1967)
pub const SVP_REFERENCE: Float = 610.78;

/// Triple point temperature of water (K)
pub const TRIPLE_POINT: Float = 273.16;

/// Murray (1967) coefficients over liquid water
pub const SVP_WATER_A: Float = 17.269_388_2;
pub const SVP_WATER_B: Float = 35.86;

/// Murray (1967) coefficients over ice
pub const SVP_ICE_A: Float = 21.874_558_4;
pub const SVP_ICE_B: Float = 7.66;

/// Temperature below which saturation is computed over ice (K)
pub const ICE_THRESHOLD: Float = 233.15;

/// Zero degrees Celsius in Kelvin, also the "no data" value of SST climatology
pub const ZERO_CELSIUS: Float = 273.15;

/// Land fraction at and below which a cell is treated as ocean
pub const OCEAN_MAX_LAND_FRACTION: Float = 0.05;

/// Land fraction at and above which a cell is treated as land
pub const LAND_MIN_LAND_FRACTION: Float = 0.95;

/// Soil temperatures below this value (K) are not physical
pub const SOIL_TEMPERATURE_MIN: Float = 100.0;

/// Climate change signal values at or above are treated as missing
pub const SIGNAL_MISSING_THRESHOLD: Float = 1000.0;

/// Default soil porosity used to convert volumetric soil moisture
/// into relative soil moisture
pub const DEFAULT_POROSITY: Float = 0.472;
