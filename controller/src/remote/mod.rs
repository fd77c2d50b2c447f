//! Remote link: TCP line protocol for caregiver apps.
//!
//! Clients send `SET_MINBLINK:<ms>`, `SET_BLINKINT:<ms>` or `STATUS` and
//! receive one-character event codes plus `NOTIFY:<user>:<KIND>` lines.

pub mod dispatch;
pub mod server;

pub use server::RemoteServer;
