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

//! Module responsible for reading snapshots and climate change
//! signals into memory, and for handing perturbed fields back
//! to the output container.
//!
//! The container format itself is hidden behind [`FieldSource`]
//! and [`FieldSink`] traits, so the perturbation code only ever
//! sees named arrays.

pub mod netcdf;
pub mod signal;

use crate::{errors::InputError, Float};
use log::debug;
use ndarray::{Array, Array1, Array2, Array3, ArrayD, ArrayViewD, Axis, Dimension};
use rustc_hash::FxHashMap;

/// Anything from which named fields can be read.
pub trait FieldSource {
    fn read_field(&self, name: &str) -> Result<ArrayD<Float>, InputError>;
}

/// Anything to which named fields can be written.
///
/// Written values must have the same number of elements
/// and memory order as the field read from the source.
pub trait FieldSink {
    fn write_field(&mut self, name: &str, values: ArrayViewD<Float>) -> Result<(), InputError>;
}

impl FieldSource for FxHashMap<String, ArrayD<Float>> {
    fn read_field(&self, name: &str) -> Result<ArrayD<Float>, InputError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| InputError::MissingField(name.to_string()))
    }
}

impl FieldSink for FxHashMap<String, ArrayD<Float>> {
    fn write_field(&mut self, name: &str, values: ArrayViewD<Float>) -> Result<(), InputError> {
        self.insert(name.to_string(), values.to_owned());
        Ok(())
    }
}

/// Enum containing snapshot fields
/// used by the perturbation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum SnapshotField {
    Temperature,
    SpecificHumidity,
    SurfacePressure,
    SurfaceGeopotential,
    HybridA,
    HybridB,
    SkinTemperature,
    SoilTemperature,
    SoilMoisture,
    LandFraction,
}

impl SnapshotField {
    /// Name of the field in the snapshot container.
    pub fn name(self) -> &'static str {
        match self {
            SnapshotField::Temperature => "T",
            SnapshotField::SpecificHumidity => "QV",
            SnapshotField::SurfacePressure => "PS",
            SnapshotField::SurfaceGeopotential => "FIS",
            SnapshotField::HybridA => "akm",
            SnapshotField::HybridB => "bkm",
            SnapshotField::SkinTemperature => "T_SKIN",
            SnapshotField::SoilTemperature => "T_SO",
            SnapshotField::SoilMoisture => "W_SO_REL",
            SnapshotField::LandFraction => "FR_LAND",
        }
    }
}

/// Struct for storing a single time snapshot of
/// regional model boundary conditions.
///
/// Atmospheric fields are stored as (level, lat, lon) arrays
/// with level index growing towards the surface, soil fields
/// as (soil layer, lat, lon) and surface fields as (lat, lon).
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub temperature: Array3<Float>,
    pub spec_humidity: Array3<Float>,
    pub surface_pressure: Array2<Float>,
    pub surface_geopotential: Array2<Float>,
    pub hybrid_a: Array1<Float>,
    pub hybrid_b: Array1<Float>,
    pub skin_temperature: Array2<Float>,
    pub soil_temperature: Array3<Float>,
    pub soil_moisture: Array3<Float>,
    pub land_fraction: Array2<Float>,
}

impl Snapshot {
    /// Reads all required fields from the source
    /// and checks if their shapes are compatible.
    pub fn load(source: &impl FieldSource) -> Result<Self, InputError> {
        debug!("Loading snapshot fields");

        let snapshot = Snapshot {
            temperature: read_array(source, SnapshotField::Temperature.name())?,
            spec_humidity: read_array(source, SnapshotField::SpecificHumidity.name())?,
            surface_pressure: read_array(source, SnapshotField::SurfacePressure.name())?,
            surface_geopotential: read_array(source, SnapshotField::SurfaceGeopotential.name())?,
            hybrid_a: read_array(source, SnapshotField::HybridA.name())?,
            hybrid_b: read_array(source, SnapshotField::HybridB.name())?,
            skin_temperature: read_array(source, SnapshotField::SkinTemperature.name())?,
            soil_temperature: read_array(source, SnapshotField::SoilTemperature.name())?,
            soil_moisture: read_array(source, SnapshotField::SoilMoisture.name())?,
            land_fraction: read_array(source, SnapshotField::LandFraction.name())?,
        };

        snapshot.check_shapes()?;

        Ok(snapshot)
    }

    /// Horizontal (lat, lon) shape of the snapshot grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        let (_, lat, lon) = self.temperature.dim();
        (lat, lon)
    }

    fn check_shapes(&self) -> Result<(), InputError> {
        let (levels, lat, lon) = self.temperature.dim();

        // surface pressure correction needs the lowest level
        if levels == 0 {
            return Err(InputError::ShapeMismatch {
                field: SnapshotField::Temperature.name().to_string(),
                expected: vec![1, lat, lon],
                found: vec![levels, lat, lon],
            });
        }

        check_shape(
            SnapshotField::SpecificHumidity.name(),
            self.spec_humidity.shape(),
            &[levels, lat, lon],
        )?;

        check_shape(SnapshotField::HybridA.name(), self.hybrid_a.shape(), &[levels])?;
        check_shape(SnapshotField::HybridB.name(), self.hybrid_b.shape(), &[levels])?;

        for (field, shape) in [
            (SnapshotField::SurfacePressure, self.surface_pressure.shape()),
            (SnapshotField::SurfaceGeopotential, self.surface_geopotential.shape()),
            (SnapshotField::SkinTemperature, self.skin_temperature.shape()),
            (SnapshotField::LandFraction, self.land_fraction.shape()),
        ] {
            check_shape(field.name(), shape, &[lat, lon])?;
        }

        // soil fields can have different number of layers
        for (field, shape) in [
            (SnapshotField::SoilTemperature, self.soil_temperature.shape()),
            (SnapshotField::SoilMoisture, self.soil_moisture.shape()),
        ] {
            check_shape(field.name(), shape, &[shape[0], lat, lon])?;
        }

        Ok(())
    }
}

/// Fields of the snapshot that are overwritten by the perturbation.
/// All other fields of the snapshot pass through unchanged.
#[derive(Clone, Debug)]
pub struct PerturbedSnapshot {
    pub temperature: Array3<Float>,
    pub spec_humidity: Array3<Float>,
    pub surface_pressure: Array2<Float>,
    pub skin_temperature: Array2<Float>,
    pub soil_temperature: Array3<Float>,
    pub soil_moisture: Array3<Float>,
}

impl PerturbedSnapshot {
    /// Writes all perturbed fields into the sink.
    pub fn write_to(&self, sink: &mut impl FieldSink) -> Result<(), InputError> {
        debug!("Writing perturbed fields");

        sink.write_field(
            SnapshotField::Temperature.name(),
            self.temperature.view().into_dyn(),
        )?;
        sink.write_field(
            SnapshotField::SpecificHumidity.name(),
            self.spec_humidity.view().into_dyn(),
        )?;
        sink.write_field(
            SnapshotField::SurfacePressure.name(),
            self.surface_pressure.view().into_dyn(),
        )?;
        sink.write_field(
            SnapshotField::SkinTemperature.name(),
            self.skin_temperature.view().into_dyn(),
        )?;
        sink.write_field(
            SnapshotField::SoilTemperature.name(),
            self.soil_temperature.view().into_dyn(),
        )?;
        sink.write_field(
            SnapshotField::SoilMoisture.name(),
            self.soil_moisture.view().into_dyn(),
        )?;

        Ok(())
    }
}

/// Reads the field and casts it into array of requested dimensionality.
pub(crate) fn read_array<D: Dimension>(
    source: &impl FieldSource,
    name: &str,
) -> Result<Array<Float, D>, InputError> {
    squeeze_into(source.read_field(name)?, name)
}

/// Casts the field into array of requested dimensionality.
///
/// Snapshots and signals usually carry a leading time axis of length one,
/// (as well as other singleton axes) which is removed here.
pub(crate) fn squeeze_into<D: Dimension>(
    mut field: ArrayD<Float>,
    name: &str,
) -> Result<Array<Float, D>, InputError> {
    if let Some(ndim) = D::NDIM {
        while field.ndim() > ndim && field.shape()[0] == 1 {
            field = field.index_axis_move(Axis(0), 0);
        }

        if field.ndim() != ndim {
            return Err(InputError::ShapeMismatch {
                field: name.to_string(),
                expected: vec![0; ndim],
                found: field.shape().to_vec(),
            });
        }
    }

    Ok(field.into_dimensionality::<D>()?)
}

/// Returns an error when the field shape is not as expected.
pub(crate) fn check_shape(
    field: &str,
    found: &[usize],
    expected: &[usize],
) -> Result<(), InputError> {
    if found != expected {
        return Err(InputError::ShapeMismatch {
            field: field.to_string(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        });
    }

    Ok(())
}
