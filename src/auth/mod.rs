// src/auth/mod.rs

//! BD Authentication: the first handshake phase.
//!
//! Core API: [`authenticate`] runs the whole phase. [`BdAuthentication`] exposes
//! the state machine for callers that want the state trace; [`packets`] holds
//! the byte layouts.

pub(crate) mod bd;
pub mod packets;

pub use bd::{authenticate, BdAuthentication, BdState};
