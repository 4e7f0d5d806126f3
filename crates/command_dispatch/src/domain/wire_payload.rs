//! Wire format of commands sent to receivers.
//!
//! The payload travels as compact JSON with its fields in declaration order.
//! The checksum is the low 16 bits of the sum of every character code of that
//! JSON, computed with `checksum` set to 0. It is additive and
//! non-cryptographic: it catches transport corruption, not tampering. Receivers
//! verify it as-is, so the algorithm cannot change without a firmware update.

use crate::domain::OdorType;
use chrono::{DateTime, Utc};
use common::domain::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_INTENSITY: u8 = 100;
pub const MIN_DURATION_SECS: u16 = 1;
pub const MAX_DURATION_SECS: u16 = 300;
pub const PUMP_COUNT: usize = 5;

/// Message discriminators understood by receiver firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    OdorCommand = 1,
    StatusRequest = 2,
    RecipeUpdate = 3,
    SystemConfig = 4,
    EmergencyStop = 5,
}

impl TryFrom<u8> for MessageType {
    type Error = WireValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::OdorCommand),
            2 => Ok(MessageType::StatusRequest),
            3 => Ok(MessageType::RecipeUpdate),
            4 => Ok(MessageType::SystemConfig),
            5 => Ok(MessageType::EmergencyStop),
            other => Err(WireValidationError::UnknownMessageType(other)),
        }
    }
}

/// Why a receiver would reject a payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireValidationError {
    #[error("unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("unknown odor type {0}")]
    UnknownOdorType(u8),

    #[error("intensity {0} exceeds 100")]
    IntensityOutOfRange(u8),

    #[error("duration {0} exceeds 300")]
    DurationOutOfRange(u16),

    #[error("checksum mismatch: payload carries {actual}, expected {expected}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("payload could not be serialized: {0}")]
    Unserializable(String),
}

/// Command payload as published on `rots/command/<receiver_id>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCommandPayload {
    pub message_type: u8,
    pub odor_type: u8,
    pub intensity: u8,
    pub duration: u16,
    /// Filled by the receiver's recipe resolver; always zero here
    pub pump_config: [u8; PUMP_COUNT],
    /// Capture time in milliseconds since the epoch
    pub timestamp: i64,
    pub checksum: u16,
}

impl WireCommandPayload {
    pub fn to_json(&self) -> DomainResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| DomainError::EncodingError(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> DomainResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| DomainError::MalformedMessage(e.to_string()))
    }
}

/// Build the odor command payload for a request.
///
/// Names map case-insensitively to odor codes (unknown names become coffee),
/// intensity saturates to 0..=100 and duration to 1..=300.
pub fn encode(
    odor_type_name: &str,
    intensity: i64,
    duration: i64,
    timestamp: DateTime<Utc>,
) -> DomainResult<WireCommandPayload> {
    let mut payload = WireCommandPayload {
        message_type: MessageType::OdorCommand as u8,
        odor_type: OdorType::from_name(odor_type_name).code(),
        intensity: clamp_intensity(intensity),
        duration: clamp_duration(duration),
        pump_config: [0; PUMP_COUNT],
        timestamp: timestamp.timestamp_millis(),
        checksum: 0,
    };

    payload.checksum = compute_checksum(&payload)
        .map_err(|e| DomainError::EncodingError(e.to_string()))?;
    Ok(payload)
}

fn clamp_intensity(intensity: i64) -> u8 {
    intensity.clamp(0, i64::from(MAX_INTENSITY)) as u8
}

fn clamp_duration(duration: i64) -> u16 {
    duration.clamp(i64::from(MIN_DURATION_SECS), i64::from(MAX_DURATION_SECS)) as u16
}

/// Checksum of `payload` with its own checksum field treated as 0
pub fn compute_checksum(payload: &WireCommandPayload) -> Result<u16, WireValidationError> {
    let placeholder = WireCommandPayload {
        checksum: 0,
        ..payload.clone()
    };
    let json = serde_json::to_string(&placeholder)
        .map_err(|e| WireValidationError::Unserializable(e.to_string()))?;

    let sum = json
        .chars()
        .fold(0u32, |acc, c| acc.wrapping_add(u32::from(c)));
    Ok((sum & 0xFFFF) as u16)
}

/// Apply the checks a receiver runs before acting on a payload
pub fn verify(payload: &WireCommandPayload) -> Result<(), WireValidationError> {
    MessageType::try_from(payload.message_type)?;

    if OdorType::from_code(payload.odor_type).is_none() {
        return Err(WireValidationError::UnknownOdorType(payload.odor_type));
    }
    if payload.intensity > MAX_INTENSITY {
        return Err(WireValidationError::IntensityOutOfRange(payload.intensity));
    }
    if payload.duration > MAX_DURATION_SECS {
        return Err(WireValidationError::DurationOutOfRange(payload.duration));
    }

    let expected = compute_checksum(payload)?;
    if expected != payload.checksum {
        return Err(WireValidationError::ChecksumMismatch {
            expected,
            actual: payload.checksum,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_encode_serializes_fields_in_wire_order() {
        let payload = encode("mint", 70, 30, at(1_714_564_800_000)).unwrap();
        let json = String::from_utf8(payload.to_json().unwrap()).unwrap();

        assert_eq!(
            json,
            r#"{"message_type":1,"odor_type":4,"intensity":70,"duration":30,"pump_config":[0,0,0,0,0],"timestamp":1714564800000,"checksum":10147}"#
        );
    }

    #[test]
    fn test_checksum_matches_known_values() {
        assert_eq!(encode("mint", 70, 30, at(1_714_564_800_000)).unwrap().checksum, 10147);
        assert_eq!(encode("coffee", 0, 1, at(0)).unwrap().checksum, 9427);
    }

    #[test]
    fn test_encode_is_deterministic_for_fixed_timestamp() {
        let first = encode("lemon", 55, 12, at(1_700_000_000_123)).unwrap();
        let second = encode("lemon", 55, 12, at(1_700_000_000_123)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_checksum_ignores_its_own_field() {
        let payload = encode("alcohol", 20, 60, at(1_700_000_000_000)).unwrap();

        let mut tampered = payload.clone();
        tampered.checksum = 0xFFFF;
        assert_eq!(compute_checksum(&tampered).unwrap(), payload.checksum);
    }

    #[test]
    fn test_clamping() {
        let low = encode("coffee", -5, 0, at(0)).unwrap();
        assert_eq!(low.intensity, 0);
        assert_eq!(low.duration, 1);

        let high = encode("coffee", 150, 400, at(0)).unwrap();
        assert_eq!(high.intensity, 100);
        assert_eq!(high.duration, 300);

        let extreme = encode("coffee", i64::MAX, i64::MIN, at(0)).unwrap();
        assert_eq!(extreme.intensity, 100);
        assert_eq!(extreme.duration, 1);
    }

    #[test]
    fn test_odor_name_mapping() {
        let upper = encode("COFFEE", 10, 10, at(0)).unwrap();
        let lower = encode("coffee", 10, 10, at(0)).unwrap();
        assert_eq!(upper.odor_type, lower.odor_type);
        assert_eq!(upper, lower);

        assert_eq!(encode("unknown", 10, 10, at(0)).unwrap().odor_type, 1);
        assert_eq!(encode("Lavender", 10, 10, at(0)).unwrap().odor_type, 5);
    }

    #[test]
    fn test_pump_config_zero_filled() {
        let payload = encode("mixed", 10, 10, at(0)).unwrap();
        assert_eq!(payload.pump_config, [0; PUMP_COUNT]);
        assert_eq!(payload.message_type, MessageType::OdorCommand as u8);
    }

    #[test]
    fn test_verify_accepts_encoded_payload() {
        for name in ["coffee", "alcohol", "lemon", "mint", "lavender", "mixed", "???"] {
            let payload = encode(name, 42, 120, at(1_714_564_800_000)).unwrap();
            assert_eq!(verify(&payload), Ok(()), "payload for {}", name);
        }
    }

    #[test]
    fn test_verify_detects_modified_fields() {
        let payload = encode("mint", 70, 30, at(1_714_564_800_000)).unwrap();

        let mut changed = payload.clone();
        changed.intensity = 71;
        assert!(matches!(
            verify(&changed),
            Err(WireValidationError::ChecksumMismatch { .. })
        ));

        let mut changed = payload.clone();
        changed.timestamp += 1;
        assert!(matches!(
            verify(&changed),
            Err(WireValidationError::ChecksumMismatch { .. })
        ));

        let mut changed = payload.clone();
        changed.pump_config[2] = 9;
        assert!(matches!(
            verify(&changed),
            Err(WireValidationError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_verify_range_checks() {
        let payload = encode("mint", 70, 30, at(0)).unwrap();

        let mut bad = payload.clone();
        bad.message_type = 6;
        assert_eq!(verify(&bad), Err(WireValidationError::UnknownMessageType(6)));

        let mut bad = payload.clone();
        bad.odor_type = 0;
        assert_eq!(verify(&bad), Err(WireValidationError::UnknownOdorType(0)));

        let mut bad = payload.clone();
        bad.intensity = 101;
        assert_eq!(verify(&bad), Err(WireValidationError::IntensityOutOfRange(101)));

        let mut bad = payload;
        bad.duration = 301;
        assert_eq!(verify(&bad), Err(WireValidationError::DurationOutOfRange(301)));
    }

    #[test]
    fn test_from_json_round_trips_published_bytes() {
        let payload = encode("lemon", 33, 44, at(1_700_000_000_000)).unwrap();
        let decoded = WireCommandPayload::from_json(&payload.to_json().unwrap()).unwrap();
        assert_eq!(decoded, payload);

        assert!(matches!(
            WireCommandPayload::from_json(b"{\"message_type\":1}"),
            Err(DomainError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_message_type_table() {
        assert_eq!(MessageType::try_from(1), Ok(MessageType::OdorCommand));
        assert_eq!(MessageType::try_from(5), Ok(MessageType::EmergencyStop));
        assert_eq!(
            MessageType::try_from(0),
            Err(WireValidationError::UnknownMessageType(0))
        );
    }
}
