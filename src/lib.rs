#![forbid(unsafe_code)]

//! Alert popover visibility controller for a desktop chat client.
//!
//! The controller decides when a stack of error/warning alerts is shown, kept
//! open, or hidden again, reconciling three independent signals:
//! 1. **Alert updates**: new or changed alerts auto-show the popover briefly
//! 2. **Pointer hover**: resting on the trigger, connector, or content holds it open
//! 3. **Outside clicks**: a pointer-down anywhere else closes it immediately
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use chat_alerts::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use chat_alerts::alerts::controller::AlertController;
//! use chat_alerts::alerts::update::update;
//! ```

pub mod prelude;

pub mod alerts;
pub mod core;
pub mod logger;
