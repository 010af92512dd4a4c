//! Timed writing session engine.
//!
//! # Responsibility
//! - Sequence one writing flow: pre-start configuration, writing with
//!   countdown and autosave, completion overlay, hand-off to viewing.
//! - Keep all timing on one deterministic scheduler so flows can be driven
//!   by wall-clock pumps or simulated time alike.

pub mod completion;
pub mod controller;
pub mod scheduler;
pub mod surface;
