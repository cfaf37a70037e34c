//! # Transport
//!
//! The command layer the handshake runs over. An implementation delivers
//! opaque payloads to the drive (SEND KEY, REPORT KEY and the two vendor
//! commands) and returns the raw response bytes; it knows nothing about the
//! meaning of those bytes.
//!
//! Every call blocks until the drive has answered. The core never has more
//! than one command in flight.

use crate::error::{StatusCode, TransportError};

pub trait Transport {
    /// SEND KEY carrying `payload` under `key_class` / `subcommand`.
    fn send_key(
        &mut self,
        payload: &[u8],
        key_class: u8,
        subcommand: u8,
    ) -> Result<(), TransportError>;

    /// REPORT KEY returning exactly `response_len` bytes.
    fn report_key(
        &mut self,
        key_class: u8,
        subcommand: u8,
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError>;

    /// Vendor command 0xE0 with an 8-byte encrypted CDB; reads `response_len` bytes.
    fn vendor_command_e0(
        &mut self,
        cdb: &[u8; 8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError>;

    /// Vendor command 0xE1 with an 8-byte encrypted CDB and a data-out payload.
    fn vendor_command_e1(&mut self, cdb: &[u8; 8], payload: &[u8]) -> Result<(), TransportError>;

    /// TEST UNIT READY.
    fn ready_check(&mut self) -> Result<(), StatusCode>;

    /// Layer selection / feature negotiation done before the SAC phase.
    ///
    /// Drives that need none keep the default.
    fn prepare_key_exchange(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_key(
        &mut self,
        payload: &[u8],
        key_class: u8,
        subcommand: u8,
    ) -> Result<(), TransportError> {
        (**self).send_key(payload, key_class, subcommand)
    }

    fn report_key(
        &mut self,
        key_class: u8,
        subcommand: u8,
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).report_key(key_class, subcommand, response_len)
    }

    fn vendor_command_e0(
        &mut self,
        cdb: &[u8; 8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).vendor_command_e0(cdb, response_len)
    }

    fn vendor_command_e1(&mut self, cdb: &[u8; 8], payload: &[u8]) -> Result<(), TransportError> {
        (**self).vendor_command_e1(cdb, payload)
    }

    fn ready_check(&mut self) -> Result<(), StatusCode> {
        (**self).ready_check()
    }

    fn prepare_key_exchange(&mut self) -> Result<(), TransportError> {
        (**self).prepare_key_exchange()
    }
}

/// Checks a REPORT KEY / vendor response has the requested length.
pub(crate) fn expect_len(
    response: Vec<u8>,
    expected: usize,
    what: &str,
) -> Result<Vec<u8>, TransportError> {
    if response.len() != expected {
        return Err(TransportError::Protocol(format!(
            "{what}: expected {expected} bytes, got {}",
            response.len()
        )));
    }
    Ok(response)
}
