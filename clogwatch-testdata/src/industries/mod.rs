// clogwatch testdata - Plant presets
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Pre-configured channel sets for specific plants.

pub mod drying_line;

pub use drying_line::{create_drying_line_sensors, DryingLineScenario};
