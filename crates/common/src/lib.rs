//! Shared infrastructure for the ophidian runtime crates: lock types with a
//! uniform naming scheme and once-initialised statics.

pub mod lock;
pub mod static_cell;
