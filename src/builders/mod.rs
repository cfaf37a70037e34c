//! # Builders
//!
//! Builder patterns for constructing drive sessions.
//!
//! ## Modules
//!
//! - [`session_builder`] - Builder for [`DriveSession`](crate::session::DriveSession)

pub mod session_builder;

pub use session_builder::DriveSessionBuilder;
