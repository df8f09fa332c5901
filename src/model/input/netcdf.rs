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

//! Sub-module with netCDF implementation of field sources and sinks.
//!
//! Packed variables (`scale_factor`, `add_offset`) are unpacked on read
//! and packed again on write. Fill values are converted to NaN on read
//! and back to the fill value on write.

use super::{FieldSink, FieldSource};
use crate::{errors::InputError, Float};
use log::debug;
use ndarray::{ArrayD, ArrayViewD};
use netcdf::{AttrValue, Variable};
use std::{fs, path::Path};

/// Read-only netCDF file.
pub struct NetCdfSource {
    file: netcdf::File,
}

impl NetCdfSource {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        debug!("Opening {}", path.display());

        Ok(NetCdfSource {
            file: netcdf::open(path)?,
        })
    }
}

impl FieldSource for NetCdfSource {
    fn read_field(&self, name: &str) -> Result<ArrayD<Float>, InputError> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| InputError::MissingField(name.to_string()))?;

        let encoding = Encoding::of(&var);
        let values = var.values::<Float>(None, None)?;

        Ok(values.mapv(|v| encoding.decode(v)))
    }
}

/// netCDF file opened for overwriting perturbed variables.
///
/// The sink is created as a copy of the input snapshot,
/// so all fields which are not written pass through unchanged.
pub struct NetCdfSink {
    file: netcdf::MutableFile,
}

impl NetCdfSink {
    pub fn copy_of(template: &Path, target: &Path) -> Result<Self, InputError> {
        debug!("Copying {} to {}", template.display(), target.display());

        fs::copy(template, target)?;

        Ok(NetCdfSink {
            file: netcdf::append(target)?,
        })
    }
}

impl FieldSink for NetCdfSink {
    fn write_field(&mut self, name: &str, values: ArrayViewD<Float>) -> Result<(), InputError> {
        let mut var = self
            .file
            .variable_mut(name)
            .ok_or_else(|| InputError::MissingField(name.to_string()))?;

        let encoding = Encoding::of(&var);
        let data: Vec<Float> = values.iter().map(|&v| encoding.encode(v)).collect();

        var.put_values(&data, None, None)?;

        Ok(())
    }
}

/// Packing and missing value conventions of a variable.
#[derive(Copy, Clone, PartialEq, Debug)]
struct Encoding {
    scale: Float,
    offset: Float,
    fill: Option<Float>,

    /// Packed values are stored as integers.
    packed: bool,
}

impl Encoding {
    fn of(var: &Variable) -> Self {
        let scale = attribute_number(var, "scale_factor");
        let offset = attribute_number(var, "add_offset");

        Encoding {
            scale: scale.unwrap_or(1.0),
            offset: offset.unwrap_or(0.0),
            fill: attribute_number(var, "_FillValue")
                .or_else(|| attribute_number(var, "missing_value")),
            packed: scale.is_some() || offset.is_some(),
        }
    }

    fn decode(&self, raw: Float) -> Float {
        match self.fill {
            Some(fill) if raw == fill => Float::NAN,
            _ => raw * self.scale + self.offset,
        }
    }

    fn encode(&self, value: Float) -> Float {
        match self.fill {
            Some(fill) if !value.is_finite() => fill,
            _ => {
                let raw = (value - self.offset) / self.scale;

                // the library truncates when converting to integer type
                if self.packed {
                    raw.round()
                } else {
                    raw
                }
            }
        }
    }
}

fn attribute_number(var: &Variable, name: &str) -> Option<Float> {
    let value = var.attribute(name)?.value().ok()?;

    match value {
        AttrValue::Double(v) => Some(v),
        AttrValue::Float(v) => Some(Float::from(v)),
        AttrValue::Short(v) => Some(Float::from(v)),
        AttrValue::Int(v) => Some(Float::from(v)),
        _ => None,
    }
}
