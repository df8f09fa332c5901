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

//! Module containing vertical interpolation methods.
//!
//! Profiles are interpolated linearly in the logarithm of pressure
//! and extrapolated linearly beyond the source levels. Each column
//! is interpolated in isolation, so columns are processed in parallel
//! on the current rayon threadpool.

use super::bisection::find_segment;
use crate::{errors::InterpolationError, Float};
use ndarray::{s, Array1, Array3, ArrayView1, ArrayView3, ShapeError};
use rayon::prelude::*;

/// Pressure levels on which the source profiles are defined.
#[derive(Copy, Clone, Debug)]
pub enum SourceLevels<'a> {
    /// Pressure varying in every column (level, lat, lon),
    /// as on the hybrid levels of the snapshot.
    Columns(ArrayView3<'a, Float>),

    /// The same pressure levels in every column,
    /// as for the signal on pressure levels.
    Fixed(ArrayView1<'a, Float>),
}

impl<'a> SourceLevels<'a> {
    fn len(&self) -> usize {
        match self {
            SourceLevels::Columns(pressure) => pressure.dim().0,
            SourceLevels::Fixed(pressure) => pressure.len(),
        }
    }

    fn pressure(&self, level: usize, lat: usize, lon: usize) -> Float {
        match self {
            SourceLevels::Columns(pressure) => pressure[[level, lat, lon]],
            SourceLevels::Fixed(pressure) => pressure[level],
        }
    }
}

/// What to do with a column which has no valid source points.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EmptyColumn {
    /// Abort the interpolation with [`InterpolationError::EmptyColumn`].
    Fail,

    /// Fill the column with zeros.
    Zero,
}

/// Result of the interpolation of a whole field.
#[derive(Clone, Debug)]
pub struct Interpolated {
    pub field: Array3<Float>,

    /// Number of columns filled with zeros
    /// because of no valid source points.
    pub empty_columns: usize,
}

/// Interpolates `values` given on `source` pressure levels
/// onto `target` pressure field (level, lat, lon).
///
/// Source points with non-finite value or non-positive pressure
/// are excluded from the interpolation. Profiles can be ordered
/// in either direction but must be strictly monotonic in pressure.
pub fn interpolate_field(
    source: SourceLevels,
    values: ArrayView3<Float>,
    target: ArrayView3<Float>,
    on_empty: EmptyColumn,
) -> Result<Interpolated, InterpolationError> {
    let (levels, lat_count, lon_count) = target.dim();
    let (source_levels, values_lat, values_lon) = values.dim();

    if source_levels != source.len() || values_lat != lat_count || values_lon != lon_count {
        return Err(ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into());
    }

    if let SourceLevels::Columns(pressure) = source {
        if pressure.dim() != values.dim() {
            return Err(ShapeError::from_kind(ndarray::ErrorKind::IncompatibleShape).into());
        }
    }

    let columns: Vec<Option<Array1<Float>>> = (0..lat_count * lon_count)
        .into_par_iter()
        .map(|index| {
            let (lat, lon) = (index / lon_count, index % lon_count);

            let profile = Profile::new(source, values, lat, lon)?;

            if profile.is_empty() {
                return match on_empty {
                    EmptyColumn::Fail => Err(InterpolationError::EmptyColumn(lat, lon)),
                    EmptyColumn::Zero => Ok(None),
                };
            }

            profile
                .interpolate(target.slice(s![.., lat, lon]))
                .map(Some)
        })
        .collect::<Result<_, InterpolationError>>()?;

    let mut field = Array3::zeros((levels, lat_count, lon_count));
    let mut empty_columns = 0;

    for (index, column) in columns.into_iter().enumerate() {
        match column {
            Some(column) => field
                .slice_mut(s![.., index / lon_count, index % lon_count])
                .assign(&column),
            None => empty_columns += 1,
        }
    }

    Ok(Interpolated {
        field,
        empty_columns,
    })
}

/// Valid points of a single column, ordered
/// by ascending logarithm of pressure.
#[derive(Clone, Debug)]
struct Profile {
    ln_pressure: Vec<Float>,
    values: Vec<Float>,
}

impl Profile {
    fn new(
        source: SourceLevels,
        values: ArrayView3<Float>,
        lat: usize,
        lon: usize,
    ) -> Result<Self, InterpolationError> {
        let mut ln_pressure = Vec::with_capacity(source.len());
        let mut valid_values = Vec::with_capacity(source.len());

        for level in 0..source.len() {
            let pressure = source.pressure(level, lat, lon);
            let value = values[[level, lat, lon]];

            if pressure.is_finite() && pressure > 0.0 && value.is_finite() {
                ln_pressure.push(pressure.ln());
                valid_values.push(value);
            }
        }

        if ln_pressure.len() > 1 && ln_pressure[0] > ln_pressure[ln_pressure.len() - 1] {
            ln_pressure.reverse();
            valid_values.reverse();
        }

        if !ln_pressure.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(InterpolationError::NotMonotonic(lat, lon));
        }

        Ok(Profile {
            ln_pressure,
            values: valid_values,
        })
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn interpolate(&self, target: ArrayView1<Float>) -> Result<Array1<Float>, InterpolationError> {
        // nothing to draw a line through
        if self.values.len() == 1 {
            return Ok(Array1::from_elem(target.len(), self.values[0]));
        }

        let mut column = Array1::zeros(target.len());

        for (value, &pressure) in column.iter_mut().zip(target.iter()) {
            let x = pressure.ln();
            let i = find_segment(&self.ln_pressure, &x)?;

            let (x0, x1) = (self.ln_pressure[i], self.ln_pressure[i + 1]);
            let (y0, y1) = (self.values[i], self.values[i + 1]);

            *value = y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }

        Ok(column)
    }
}

#[cfg(test)]
mod tests {
    use super::{interpolate_field, EmptyColumn, SourceLevels};
    use crate::errors::InterpolationError;
    use crate::Float;
    use float_cmp::approx_eq;
    use ndarray::{arr1, Array3};

    fn column(values: &[Float]) -> Array3<Float> {
        arr1(values).into_shape((values.len(), 1, 1)).unwrap()
    }

    #[test]
    fn own_levels_identity() {
        let pressure = Array3::from_shape_fn((5, 2, 3), |(k, i, j)| {
            20_000.0 + 20_000.0 * k as Float + 100.0 * (i + j) as Float
        });
        let values = Array3::from_shape_fn((5, 2, 3), |(k, i, j)| {
            210.0 + 15.0 * k as Float - (i * j) as Float
        });

        let result = interpolate_field(
            SourceLevels::Columns(pressure.view()),
            values.view(),
            pressure.view(),
            EmptyColumn::Fail,
        )
        .unwrap();

        assert_eq!(result.empty_columns, 0);
        for (&found, &expected) in result.field.iter().zip(values.iter()) {
            assert!(approx_eq!(Float, found, expected, epsilon = 1e-9));
        }
    }

    #[test]
    fn linear_in_log_pressure() {
        let plev = arr1(&[10_000.0, 100_000.0]);
        let values = column(&[0.0, 1.0]);
        // geometric mean lies in the middle in log-pressure
        let target = column(&[31_622.776_601_683_792]);

        let result = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Fail,
        )
        .unwrap();

        assert!(approx_eq!(Float, result.field[[0, 0, 0]], 0.5, epsilon = 1e-9));
    }

    #[test]
    fn extrapolates_linearly() {
        let plev = arr1(&[10_000.0, 100_000.0]);
        let values = column(&[0.0, 1.0]);
        let target = column(&[1_000.0, 1_000_000.0]);

        let result = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Fail,
        )
        .unwrap();

        assert!(approx_eq!(Float, result.field[[0, 0, 0]], -1.0, epsilon = 1e-9));
        assert!(approx_eq!(Float, result.field[[1, 0, 0]], 2.0, epsilon = 1e-9));
    }

    #[test]
    fn descending_profile() {
        let plev = arr1(&[100_000.0, 50_000.0, 10_000.0]);
        let values = column(&[3.0, 2.0, 1.0]);
        let target = column(&[50_000.0, 100_000.0]);

        let result = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Fail,
        )
        .unwrap();

        assert!(approx_eq!(Float, result.field[[0, 0, 0]], 2.0, epsilon = 1e-9));
        assert!(approx_eq!(Float, result.field[[1, 0, 0]], 3.0, epsilon = 1e-9));
    }

    #[test]
    fn missing_points_are_skipped() {
        let plev = arr1(&[10_000.0, 50_000.0, 100_000.0]);
        let values = column(&[0.0, Float::NAN, 1.0]);
        let target = column(&[50_000.0]);

        let result = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Fail,
        )
        .unwrap();

        let expected = (50_000.0 as Float / 10_000.0).ln() / (10.0 as Float).ln();
        assert!(approx_eq!(Float, result.field[[0, 0, 0]], expected, epsilon = 1e-9));
    }

    #[test]
    fn single_point_is_constant() {
        let plev = arr1(&[10_000.0, 50_000.0]);
        let values = column(&[Float::NAN, 4.0]);
        let target = column(&[20_000.0, 90_000.0]);

        let result = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Fail,
        )
        .unwrap();

        assert_eq!(result.field[[0, 0, 0]], 4.0);
        assert_eq!(result.field[[1, 0, 0]], 4.0);
    }

    #[test]
    fn empty_column_policy() {
        let plev = arr1(&[10_000.0, 50_000.0]);
        let values = column(&[Float::NAN, Float::NAN]);
        let target = column(&[20_000.0]);

        let failed = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Fail,
        );
        assert!(matches!(failed, Err(InterpolationError::EmptyColumn(0, 0))));

        let zeroed = interpolate_field(
            SourceLevels::Fixed(plev.view()),
            values.view(),
            target.view(),
            EmptyColumn::Zero,
        )
        .unwrap();
        assert_eq!(zeroed.empty_columns, 1);
        assert_eq!(zeroed.field[[0, 0, 0]], 0.0);
    }

    #[test]
    fn not_monotonic() {
        let plev = arr1(&[10_000.0, 50_000.0, 30_000.0]);
        let values = column(&[1.0, 2.0, 3.0]);
        let target = column(&[20_000.0]);

        assert!(matches!(
            interpolate_field(
                SourceLevels::Fixed(plev.view()),
                values.view(),
                target.view(),
                EmptyColumn::Fail,
            ),
            Err(InterpolationError::NotMonotonic(0, 0))
        ));
    }

    #[test]
    fn shape_mismatch() {
        let plev = arr1(&[10_000.0, 50_000.0, 100_000.0]);
        let values = column(&[1.0, 2.0]);
        let target = column(&[20_000.0]);

        assert!(matches!(
            interpolate_field(
                SourceLevels::Fixed(plev.view()),
                values.view(),
                target.view(),
                EmptyColumn::Fail,
            ),
            Err(InterpolationError::Shape(_))
        ));
    }
}
