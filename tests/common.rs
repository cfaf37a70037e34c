//! tests/common.rs
//! Shared fixtures: test key tables, a fixed-output random source and a
//! simulated drive that checks every payload the host sends.

#![allow(dead_code)] // Each test file uses a different subset

use sacd_auth::anchors::TrustAnchors;
use sacd_auth::crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, des3_cbc_encrypt, rsa_private_op, rsa_public_op_pow65537,
    sha1_parts, RandomSource,
};
use sacd_auth::error::{SacdError, StatusCode, TransportError};
use sacd_auth::utils::checksum;
use sacd_auth::Transport;
use serde::Deserialize;
use std::path::PathBuf;

/// ILLEGAL REQUEST / INVALID FIELD IN CDB
pub const INVALID_FIELD: StatusCode = StatusCode::new(0x05, 0x24, 0x00);
/// NOT READY / MEDIUM NOT PRESENT
pub const NO_MEDIUM: StatusCode = StatusCode::new(0x02, 0x3A, 0x00);

pub fn data_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("vector")
        .join("data")
        .join(filename)
}

pub fn load_anchors() -> TrustAnchors {
    TrustAnchors::load(data_path("test_anchors.json"))
        .unwrap_or_else(|e| panic!("Failed to load test anchors: {e}"))
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    ca_private_exponent: String,
    drive_rsa_modulus: String,
    drive_rsa_private_exponent: String,
    drive_certificate_id: String,
    drive_challenge_response: String,
    drive_random_first: String,
    drive_random_second: String,
    drive_session_random: String,
    key_format: u8,
    disc_key: String,
}

/// Drive-side secrets of the simulated drive.
#[derive(Debug, Clone)]
pub struct DriveKeys {
    pub ca_private_exponent: Vec<u8>,
    pub drive_rsa_modulus: Vec<u8>,
    pub drive_rsa_private_exponent: Vec<u8>,
    pub drive_certificate_id: [u8; 8],
    pub drive_challenge_response: [u8; 16],
    pub drive_random_first: [u8; 16],
    pub drive_random_second: [u8; 16],
    pub drive_session_random: [u8; 16],
    pub key_format: u8,
    pub disc_key: [u8; 16],
}

fn fixed<const N: usize>(hex_value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    hex::decode_to_slice(hex_value, &mut out).expect("fixture field has the wrong length");
    out
}

pub fn load_drive_keys() -> DriveKeys {
    let path = data_path("test_drive.json");
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    let file: DriveFile = serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()));

    DriveKeys {
        ca_private_exponent: hex::decode(file.ca_private_exponent).unwrap(),
        drive_rsa_modulus: hex::decode(file.drive_rsa_modulus).unwrap(),
        drive_rsa_private_exponent: hex::decode(file.drive_rsa_private_exponent).unwrap(),
        drive_certificate_id: fixed(&file.drive_certificate_id),
        drive_challenge_response: fixed(&file.drive_challenge_response),
        drive_random_first: fixed(&file.drive_random_first),
        drive_random_second: fixed(&file.drive_random_second),
        drive_session_random: fixed(&file.drive_session_random),
        key_format: file.key_format,
        disc_key: fixed(&file.disc_key),
    }
}

/// Counter-based random source; the same seed always yields the same bytes.
#[derive(Debug, Clone)]
pub struct FixedRandom {
    next: u8,
}

impl FixedRandom {
    pub fn new(seed: u8) -> Self {
        Self { next: seed }
    }
}

impl RandomSource for FixedRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SacdError> {
        for byte in dest.iter_mut() {
            *byte = self.next;
            self.next = self.next.wrapping_mul(5).wrapping_add(17);
        }
        Ok(())
    }
}

/// One command as the simulated drive saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ReadyCheck,
    SendKey {
        class: u8,
        subcommand: u8,
        payload: Vec<u8>,
    },
    ReportKey {
        class: u8,
        subcommand: u8,
        len: usize,
    },
    VendorE1 {
        cdb: [u8; 8],
        payload: Vec<u8>,
    },
    VendorE0 {
        cdb: [u8; 8],
    },
    PrepareKeyExchange,
}

impl Command {
    pub fn subcommand(&self) -> Option<u8> {
        match self {
            Command::SendKey { subcommand, .. } | Command::ReportKey { subcommand, .. } => {
                Some(*subcommand)
            }
            _ => None,
        }
    }
}

/// Misbehaviours the simulated drive can be told to show.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Status returned by TEST UNIT READY.
    pub ready_status: Option<StatusCode>,
    /// Security initialisation is rejected.
    pub reject_security_init: bool,
    /// Flip one bit of the echoed host random in the first exchange.
    pub tamper_host_echo: bool,
    /// Flip one bit of the echoed host random in the re-established exchange.
    pub tamper_reestablish_echo: bool,
    /// Flip one bit of the E0 response checksum.
    pub tamper_e0_checksum: bool,
    /// Marker byte written into the Cmd3 certificate.
    pub certificate_marker: Option<u8>,
    /// Sign the drive certificate with the wrong header byte.
    pub bad_certificate_signature: bool,
    /// Echo a wrong host random in Cmd5.
    pub tamper_session_echo: bool,
    /// Put a wrong certificate id into the Cmd5 inner block.
    pub tamper_session_certificate_id: bool,
    /// Reject the Cmd0 key format request.
    pub reject_key_format: bool,
    /// Reject the Cmd2 host challenge.
    pub reject_host_challenge: bool,
    /// Reject the release command.
    pub reject_release: bool,
}

const BD_CLASS: u8 = 0xE0;

/// A drive that speaks the handshake with the test keys.
///
/// It decrypts and checks everything the host sends and answers with
/// correctly built responses, so a full run only succeeds if both sides agree
/// on every byte.
pub struct SimulatedDrive {
    pub anchors: TrustAnchors,
    pub keys: DriveKeys,
    pub faults: Faults,
    pub log: Vec<Command>,
    reestablished: bool,
    host_random: [u8; 16],
    drive_random: [u8; 16],
    key7: [u8; 16],
    sac_host_random: [u8; 16],
    host_session_random: [u8; 16],
}

impl SimulatedDrive {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            anchors: load_anchors(),
            keys: load_drive_keys(),
            faults,
            log: Vec::new(),
            reestablished: false,
            host_random: [0u8; 16],
            drive_random: [0u8; 16],
            key7: [0u8; 16],
            sac_host_random: [0u8; 16],
            host_session_random: [0u8; 16],
        }
    }

    /// Subcommands of SAC class commands, in order.
    pub fn sac_subcommands(&self) -> Vec<u8> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Command::SendKey {
                    class, subcommand, ..
                }
                | Command::ReportKey {
                    class, subcommand, ..
                } if *class != BD_CLASS => Some(*subcommand),
                _ => None,
            })
            .collect()
    }

    /// Every payload the host sent, in order.
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Command::SendKey { payload, .. } | Command::VendorE1 { payload, .. } => {
                    Some(payload.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn bd_keys(&self) -> ([u8; 16], [u8; 16]) {
        let a = &self.anchors;
        if self.reestablished {
            (*a.key5.expose_secret(), *a.key6.expose_secret())
        } else {
            (*a.key1.expose_secret(), *a.key2.expose_secret())
        }
    }

    fn derive_key7(&mut self) {
        let mut key7 = [0u8; 16];
        key7[..8].copy_from_slice(&self.host_random[..8]);
        key7[8..].copy_from_slice(&self.drive_random[8..]);
        aes_cbc_encrypt(
            self.anchors.key3.expose_secret(),
            self.anchors.iv1.expose_secret(),
            &mut key7,
        )
        .unwrap();
        self.key7 = key7;
    }

    fn expected_cdb(&self, marker: u8, len: u8) -> [u8; 8] {
        let mut cdb = [0x45, marker, 0, 0, 0, 0, len, 0];
        cdb[7] = checksum(&cdb[..7]);
        let mut key = [0u8; 24];
        key[..16].copy_from_slice(&self.key7);
        key[16..].copy_from_slice(&self.key7[..8]);
        des3_cbc_encrypt(&key, self.anchors.iv2.expose_secret(), &mut cdb).unwrap();
        cdb
    }

    fn sac_class_ok(&self, class: u8) -> Result<(), TransportError> {
        if class != self.keys.key_format {
            return Err(INVALID_FIELD.into());
        }
        Ok(())
    }

    fn bd_send(&mut self, payload: &[u8], subcommand: u8) -> Result<(), TransportError> {
        match subcommand {
            0x00 => {
                if self.faults.reject_security_init {
                    return Err(INVALID_FIELD.into());
                }
                Ok(())
            }
            0x01 | 0x11 => {
                self.reestablished = subcommand == 0x11;
                let random = self.decrypt_random_payload(payload)?;
                self.host_random = random;
                Ok(())
            }
            0x03 | 0x13 => {
                let random = self.decrypt_random_payload(payload)?;
                if random != self.drive_random {
                    return Err(INVALID_FIELD.into());
                }
                self.derive_key7();
                Ok(())
            }
            _ => Err(INVALID_FIELD.into()),
        }
    }

    fn decrypt_random_payload(&self, payload: &[u8]) -> Result<[u8; 16], TransportError> {
        if payload.len() != 20 || payload[..4] != [0x10, 0, 0, 0] {
            return Err(INVALID_FIELD.into());
        }
        let (enc_key, _) = self.bd_keys();
        let mut random = [0u8; 16];
        random.copy_from_slice(&payload[4..20]);
        aes_cbc_decrypt(&enc_key, self.anchors.iv1.expose_secret(), &mut random).unwrap();
        Ok(random)
    }

    fn bd_report(&mut self, subcommand: u8, len: usize) -> Result<Vec<u8>, TransportError> {
        if !matches!(subcommand, 0x02 | 0x12) || len != 0x24 {
            return Err(INVALID_FIELD.into());
        }
        self.drive_random = if self.reestablished {
            self.keys.drive_random_second
        } else {
            self.keys.drive_random_first
        };
        let (_, dec_key) = self.bd_keys();
        let iv = *self.anchors.iv1.expose_secret();

        let mut echo = self.host_random;
        let tamper = if self.reestablished {
            self.faults.tamper_reestablish_echo
        } else {
            self.faults.tamper_host_echo
        };
        if tamper {
            echo[3] ^= 0x08;
        }
        aes_cbc_encrypt(&dec_key, &iv, &mut echo).unwrap();
        let mut drive = self.drive_random;
        aes_cbc_encrypt(&dec_key, &iv, &mut drive).unwrap();

        let mut response = vec![0u8; 0x24];
        response[..4].copy_from_slice(&[0x00, 0x22, 0x00, 0x00]);
        response[4..20].copy_from_slice(&echo);
        response[0x14..0x24].copy_from_slice(&drive);
        Ok(response)
    }

    fn check_host_challenge(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.faults.reject_host_challenge {
            return Err(INVALID_FIELD.into());
        }
        let well_formed = payload.len() == 208
            && payload[..4] == 201u32.to_be_bytes()
            && payload[20..24] == [0u8; 4]
            && payload[24..28] == 1u32.to_be_bytes()
            && payload[28..30] == [0x00, 0x99]
            && payload[30..205] == self.anchors.host_certificate.expose_secret()[..]
            && payload[205..] == [0u8; 3];
        if !well_formed {
            return Err(INVALID_FIELD.into());
        }
        self.sac_host_random.copy_from_slice(&payload[4..20]);
        Ok(())
    }

    fn check_session_challenge(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() != 180 || payload[..4] != 174u32.to_be_bytes() {
            return Err(INVALID_FIELD.into());
        }
        let mut block = [0u8; 128];
        rsa_public_op_pow65537(
            self.anchors.host_rsa_modulus.expose_secret(),
            &payload[4..132],
            &mut block,
        )
        .unwrap();
        if block[0] != 0x6a
            || block[127] != 0xBC
            || block[1..17] != self.keys.drive_challenge_response
            || block[17..25] != self.keys.drive_certificate_id
        {
            return Err(INVALID_FIELD.into());
        }

        let mut encrypted = [0u8; 128];
        encrypted[..82].copy_from_slice(&block[25..107]);
        encrypted[82..].copy_from_slice(&payload[132..178]);
        let digest = sha1_parts(&[
            &self.keys.drive_challenge_response,
            &self.keys.drive_certificate_id,
            &encrypted,
        ]);
        if block[107..127] != digest.expose_secret()[..] {
            return Err(INVALID_FIELD.into());
        }

        let mut session = [0u8; 128];
        rsa_private_op(
            &self.keys.drive_rsa_modulus,
            &self.keys.drive_rsa_private_exponent,
            &encrypted,
            &mut session,
        )
        .unwrap();
        let host_id = self.anchors.host_certificate_id.expose_secret();
        if session[..2] != [0x00, 0x02]
            || session[2..103].contains(&0)
            || session[103] != 0x00
            || session[104..112] != host_id[..]
        {
            return Err(INVALID_FIELD.into());
        }
        self.host_session_random.copy_from_slice(&session[112..]);
        Ok(())
    }

    fn certificate_response(&mut self) -> Vec<u8> {
        let n_d = &self.keys.drive_rsa_modulus;
        let mut signed = [0x33u8; 128];
        signed[0] = if self.faults.bad_certificate_signature {
            0x4a
        } else {
            0x6a
        };
        signed[18..107].copy_from_slice(&n_d[..89]);
        signed[127] = 0xBC;
        let mut certificate = [0u8; 128];
        rsa_private_op(
            self.anchors.ca_root_modulus.expose_secret(),
            &self.keys.ca_private_exponent,
            &signed,
            &mut certificate,
        )
        .unwrap();

        let mut response = vec![0u8; 208];
        response[..4].copy_from_slice(&197u32.to_be_bytes());
        response[4..20].copy_from_slice(&self.keys.drive_challenge_response);
        response[20..28].copy_from_slice(&self.keys.drive_certificate_id);
        response[29] = self.faults.certificate_marker.unwrap_or(0x95);
        response[30..158].copy_from_slice(&certificate);
        response[158..197].copy_from_slice(&n_d[89..]);
        response
    }

    fn session_response(&mut self) -> Vec<u8> {
        let mut inner_plain = [0x5Au8; 128];
        inner_plain[0] = 0x00;
        inner_plain[1] = 0x02;
        inner_plain[103] = 0x00;
        inner_plain[104..112].copy_from_slice(&self.keys.drive_certificate_id);
        if self.faults.tamper_session_certificate_id {
            inner_plain[104] ^= 0x01;
        }
        inner_plain[112..].copy_from_slice(&self.keys.drive_session_random);
        let mut inner = [0u8; 128];
        rsa_public_op_pow65537(
            self.anchors.host_rsa_modulus.expose_secret(),
            &inner_plain,
            &mut inner,
        )
        .unwrap();

        let mut outer = [0u8; 128];
        outer[0] = 0x6a;
        outer[1..17].copy_from_slice(&self.sac_host_random);
        if self.faults.tamper_session_echo {
            outer[1] ^= 0x80;
        }
        outer[17..25].copy_from_slice(&self.keys.drive_certificate_id);
        outer[25..107].copy_from_slice(&inner[..82]);
        let digest = sha1_parts(&[&outer[1..107]]);
        outer[107..127].copy_from_slice(digest.expose_secret());
        outer[127] = 0xBC;
        let mut signature = [0u8; 128];
        rsa_private_op(
            &self.keys.drive_rsa_modulus,
            &self.keys.drive_rsa_private_exponent,
            &outer,
            &mut signature,
        )
        .unwrap();

        let mut response = vec![0u8; 174];
        response[..128].copy_from_slice(&signature);
        response[128..].copy_from_slice(&inner[82..]);
        response
    }

    fn disc_key_response(&self) -> Vec<u8> {
        let digest = sha1_parts(&[&self.host_session_random, &self.keys.drive_session_random]);
        let mut blob = vec![0xA5u8; 48];
        blob[0x20..0x30].copy_from_slice(&self.keys.disc_key);
        aes_cbc_encrypt(
            &digest.expose_secret()[..16],
            self.anchors.sac_static_iv.expose_secret(),
            &mut blob,
        )
        .unwrap();
        blob
    }
}

impl Transport for SimulatedDrive {
    fn send_key(
        &mut self,
        payload: &[u8],
        key_class: u8,
        subcommand: u8,
    ) -> Result<(), TransportError> {
        self.log.push(Command::SendKey {
            class: key_class,
            subcommand,
            payload: payload.to_vec(),
        });
        if key_class == BD_CLASS {
            return self.bd_send(payload, subcommand);
        }
        match subcommand {
            0x02 => {
                self.sac_class_ok(key_class)?;
                self.check_host_challenge(payload)
            }
            0x04 => {
                self.sac_class_ok(key_class)?;
                self.check_session_challenge(payload)
            }
            0x07 => {
                if self.faults.reject_release {
                    return Err(INVALID_FIELD.into());
                }
                Ok(())
            }
            _ => Err(INVALID_FIELD.into()),
        }
    }

    fn report_key(
        &mut self,
        key_class: u8,
        subcommand: u8,
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        self.log.push(Command::ReportKey {
            class: key_class,
            subcommand,
            len: response_len,
        });
        if key_class == BD_CLASS {
            return self.bd_report(subcommand, response_len);
        }
        match (subcommand, response_len) {
            (0x00, 8) if key_class == 0x00 && !self.faults.reject_key_format => {
                let mut response = vec![0u8; 8];
                response[7] = self.keys.key_format;
                Ok(response)
            }
            (0x03, 208) => {
                self.sac_class_ok(key_class)?;
                Ok(self.certificate_response())
            }
            (0x05, 174) => {
                self.sac_class_ok(key_class)?;
                Ok(self.session_response())
            }
            (0x06, 48) => {
                self.sac_class_ok(key_class)?;
                Ok(self.disc_key_response())
            }
            _ => Err(INVALID_FIELD.into()),
        }
    }

    fn vendor_command_e0(
        &mut self,
        cdb: &[u8; 8],
        response_len: usize,
    ) -> Result<Vec<u8>, TransportError> {
        self.log.push(Command::VendorE0 { cdb: *cdb });
        if *cdb != self.expected_cdb(0x30, 0x54) || response_len != 0x54 {
            return Err(INVALID_FIELD.into());
        }
        let mut response = vec![0u8; 0x54];
        response[..4].copy_from_slice(&[0x00, 0x52, 0x00, 0x00]);
        for (i, byte) in response[5..].iter_mut().enumerate() {
            *byte = (i as u8).wrapping_mul(7);
        }
        response[4] = checksum(&response[5..0x4f]);
        if self.faults.tamper_e0_checksum {
            response[4] ^= 0x01;
        }
        aes_cbc_encrypt(
            &self.key7,
            self.anchors.iv3.expose_secret(),
            &mut response[4..],
        )
        .unwrap();
        Ok(response)
    }

    fn vendor_command_e1(&mut self, cdb: &[u8; 8], payload: &[u8]) -> Result<(), TransportError> {
        self.log.push(Command::VendorE1 {
            cdb: *cdb,
            payload: payload.to_vec(),
        });
        if *cdb != self.expected_cdb(0x31, 0x50) || payload.len() != 80 {
            return Err(INVALID_FIELD.into());
        }
        let mut block = payload.to_vec();
        aes_cbc_decrypt(&self.key7, self.anchors.iv3.expose_secret(), &mut block).unwrap();
        let well_formed = block[..4] == 0x4Cu32.to_be_bytes()
            && block[4] == checksum(&block[5..])
            && block[16..] == self.anchors.challenge_payload.expose_secret()[..];
        if !well_formed {
            return Err(INVALID_FIELD.into());
        }
        Ok(())
    }

    fn ready_check(&mut self) -> Result<(), StatusCode> {
        self.log.push(Command::ReadyCheck);
        match self.faults.ready_status {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    fn prepare_key_exchange(&mut self) -> Result<(), TransportError> {
        self.log.push(Command::PrepareKeyExchange);
        Ok(())
    }
}
