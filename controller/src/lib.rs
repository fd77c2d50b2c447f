//! SPARC controller: blink-driven communication device.
//!
//! A single eye-state sensor is turned into Single/Double/Quad blink events
//! that drive a 12-cell letter grid, compose a message, raise caregiver
//! requests and latch an emergency alert.  Everything runs on one calloop
//! event loop.

pub mod backend;
pub mod blink;
pub mod clock;
pub mod config;
pub mod controller;
pub mod emergency;
pub mod gpio;
pub mod peripherals;
pub mod remote;
pub mod state;
pub mod ui;
