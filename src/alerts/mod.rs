//! Alert popover: data model, pure controller, and its executors.
//!
//! `model`/`pointer`/`controller`/`update` form the deterministic core. The
//! `driver` applies commands to a `timer::CloseScheduler`; `runtime` and
//! `scenario` are the wall-clock and virtual-clock ways of running it.

pub mod controller;
pub mod driver;
pub mod model;
pub mod pointer;
#[cfg(feature = "runtime")]
pub mod runtime;
pub mod scenario;
pub mod timer;
pub mod update;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod test_properties;
