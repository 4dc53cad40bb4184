//! Cell-related types and utilities
//!
//! This module contains:
//! - [`Cell`] - A cell's text, kind and presentation hints
//! - [`CellAddress`] - A cell's location (e.g., "A1") and column label arithmetic

mod address;
mod data;

pub use address::CellAddress;
pub use data::{Cell, CellKind};
