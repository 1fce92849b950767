#![allow(clippy::too_many_arguments)]

mod compare_floats;
pub mod core;
pub mod engine;
pub mod errors;
pub mod input;
pub mod timeseries;


#[macro_use]
extern crate is_close;

pub use crate::core::geometry::{
    OrderedPVArray, PVGround, PVRow, PVRowSide, PVSegment, PVSurface, Side, SurfaceLocation,
};
pub use crate::core::irradiance::{
    FittedIrradiance, HybridPerezOrdered, IrradianceModel, IsotropicOrdered, SurfaceCategory,
};
pub use crate::core::view_factors::VFCalculator;
pub use crate::engine::PVEngine;
pub use crate::errors::PvError;
pub use crate::input::{ingest_parameters, PVArrayParameters, SideCut};
pub use crate::timeseries::{FittedInputs, SkipReason, TimeseriesInput};
