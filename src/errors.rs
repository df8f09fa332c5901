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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Error while reading config.yaml: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Error while handling the output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error while writing the run report: {0}")]
    Report(#[from] csv::Error),

    #[error("Output is faulty: {0}")]
    FaultyOutput(&'static str),

    #[error("Cannot read the climate change signal: {0}")]
    Signal(#[from] InputError),

    #[error("Cannot set the memory limit of {0} MB, more memory is already in use")]
    MemoryLimit(usize),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config.yaml: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config.yaml: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds {0}")]
    OutOfBounds(&'static str),
}

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Required field {0} is not present in the input")]
    MissingField(String),

    #[error("Field {field} has shape {found:?} but {expected:?} was expected")]
    ShapeMismatch {
        field: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Cannot cast input data into array: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Cannot access the input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error while reading the netCDF file: {0}")]
    NetCdf(#[from] netcdf::error::Error),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Searched array is empty")]
    EmptyArray,

    #[error("Searched array has less than two elements")]
    TooShort,
}

#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Column at (lat: {0}, lon: {1}) has no valid points to interpolate from")]
    EmptyColumn(usize, usize),

    #[error("Pressure column at (lat: {0}, lon: {1}) is not strictly monotonic")]
    NotMonotonic(usize, usize),

    #[error("Profile search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Input shape is incorrect: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Error, Debug)]
pub enum PerturbationError {
    #[error("Perturbed field {field} contains {count} non-finite values")]
    NonFinite { field: &'static str, count: usize },

    #[error("Vertical interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("Fields are not compatible: {0}")]
    Input(#[from] InputError),
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Cannot load the snapshot: {0}")]
    Input(#[from] InputError),

    #[error("Cannot perturb the snapshot: {0}")]
    Perturbation(#[from] PerturbationError),

    #[error("Cannot write the snapshot: {0}")]
    Io(#[from] std::io::Error),
}
