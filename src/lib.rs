//! blink1-control — host-side control for blink(1) USB RGB LED devices.
//!
//! Synchronous and single-threaded: controllers are not `Sync`, and blocking
//! operations sleep on the calling thread.

pub mod color;
pub mod config;
pub mod controller;
pub mod error;
#[cfg(feature = "libblink1")]
pub mod ffi;
pub mod handle;
pub mod models;
pub mod protocol;
pub mod sequence;
pub mod transport;

pub use controller::{Blink1, devices};
pub use error::Blink1Error;
