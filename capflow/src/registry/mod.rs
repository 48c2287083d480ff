//! Capability registry subsystem.
//!
//! This module provides:
//! - The `Implementation` trait and a closure adapter
//! - The configuration-phase `CapabilityRegistry`
//! - The read-only `FrozenRegistry` used during execution

mod capability;
mod implementation;

pub use capability::{CapabilityRegistry, FrozenRegistry, RankedImplementation};
pub use implementation::{Args, FnImplementation, Implementation, Output};
