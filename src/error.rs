//! # Error Types
//!
//! Every operation of this crate returns [`Result<T, SacdError>`](SacdError).
//! Failures raised by the device transport are carried as [`TransportError`].

use std::fmt;
use thiserror::Error;

/// The error type for all handshake and decryption operations.
///
/// Each handshake phase is all-or-nothing: a phase either completes or returns
/// one of these variants, and its intermediate state is discarded.
#[derive(Error, Debug)]
pub enum SacdError {
    /// A required key, IV or data buffer was empty.
    #[error("missing argument: {0}")]
    NullArgument(&'static str),

    /// A primitive rejected its input or failed internally.
    ///
    /// Used for wrong key/IV lengths, data that is not block aligned,
    /// RSA operands that do not match the modulus width, and an unavailable
    /// random source under [`FallbackPolicy::FailClosed`](crate::crypto::rng::FallbackPolicy).
    #[error("Crypto error: {0}")]
    CryptoFailed(String),

    /// BD Authentication failed.
    #[error("BD authentication failed: {0}")]
    AuthFailed(String),

    /// SAC Key Exchange failed.
    #[error("SAC key exchange failed: {0}")]
    SacFailed(String),

    /// A phase was entered before the phase it depends on completed.
    #[error("drive session is not authenticated")]
    NotAuthenticated,

    /// The transport reported an error.
    #[error("transport error: {0}")]
    TransportFailed(#[from] TransportError),

    /// The trust-anchor key file is malformed.
    #[error("key file error: {0}")]
    KeyFile(String),

    /// I/O error while reading the trust-anchor key file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<&'static str> for SacdError {
    fn from(msg: &'static str) -> Self {
        SacdError::CryptoFailed(msg.to_string())
    }
}

/// SCSI status of a failed command: sense key, additional sense code and
/// its qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode {
    pub sense_key: u8,
    pub asc: u8,
    pub ascq: u8,
}

impl StatusCode {
    pub const fn new(sense_key: u8, asc: u8, ascq: u8) -> Self {
        Self {
            sense_key,
            asc,
            ascq,
        }
    }

    /// NOT READY / MEDIUM NOT PRESENT (any qualifier).
    pub const fn is_medium_not_present(&self) -> bool {
        self.sense_key == 0x02 && self.asc == 0x3A
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sense {:02x}/{:02x}/{:02x}",
            self.sense_key, self.asc, self.ascq
        )
    }
}

/// Errors surfaced by a [`Transport`](crate::transport::Transport)
/// implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The device completed the command with a check condition.
    #[error("command failed with {0}")]
    Status(StatusCode),

    /// The command could not be delivered.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with something the transport could not frame.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<StatusCode> for TransportError {
    fn from(status: StatusCode) -> Self {
        TransportError::Status(status)
    }
}
