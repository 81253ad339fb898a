//! Controller subsystem for gamepad hot-plug tracking
//!
//! Events flow through three layers:
//!
//! 1. [`gilrs_backend`] - Raw device events from gilrs, translated to [`types::DeviceEvent`]
//! 2. [`dispatcher`] - Attach, detach and remap handling on top of the [`registry`]
//! 3. [`snapshot`] - Per-frame text rendering of the registered controllers
//!
//! # Architecture
//!
//! ```text
//! gilrs ──► GilrsInput ──► EventDispatcher ──► Registry ──► StatusSnapshot
//!           (DeviceEvent)   (Dispatch)          (handles)    (lines)
//! ```
//!
//! Everything above the backend is written against [`backend::InputBackend`]
//! and runs on the UI thread once per frame.

pub mod backend;
pub mod dispatcher;
pub mod gilrs_backend;
pub mod mapping_db;
pub mod registry;
pub mod snapshot;
pub mod types;

pub use backend::{InputBackend, InputError};
pub use dispatcher::{Dispatch, EventDispatcher};
pub use gilrs_backend::GilrsInput;
pub use snapshot::{DisplaySelection, StatusSnapshot};
