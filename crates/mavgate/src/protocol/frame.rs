// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame types: the raw on-wire PDU and its validated, decoded form.
//!
//! [`RawFrame`] keeps the original bytes so forwarding between endpoints is
//! verbatim; decoding into a typed [`Frame`] is a separate, fallible step
//! that needs a dialect.

use bytes::{BufMut, Bytes, BytesMut};

use super::{frame_checksum, FrameError, MavVersion, CHECKSUM_LEN, STX_V1, STX_V2};
use crate::dialect::{Dialect, DialectError, MavMessage, TargetingKind};

/// A complete MAVLink PDU as it appeared on the wire.
///
/// # Invariants
///
/// - `payload.len()` equals the payload-length byte of the header.
/// - `wire_bytes()` is exactly `header_len + payload_len + 2` bytes.
/// - For v2 frames, `incompat_flags` is zero; frames with other values are
///   rejected during extraction and never materialize as a `RawFrame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub version: MavVersion,
    pub incompat_flags: u8,
    pub compat_flags: u8,
    pub sequence: u8,
    pub system_id: u8,
    pub component_id: u8,
    pub message_id: u32,
    pub payload: Bytes,
    pub checksum: u16,
    raw: Bytes,
}

impl RawFrame {
    /// Full on-wire bytes, suitable for verbatim forwarding.
    pub fn wire_bytes(&self) -> &Bytes {
        &self.raw
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Bytes covered by the checksum: everything after the STX up to the
    /// trailer.
    fn checked_span(&self) -> &[u8] {
        &self.raw[1..self.version.header_len() + self.payload.len()]
    }

    /// Split an exact-length wire frame into its fields.
    ///
    /// `raw` must be `header_len + payload_len + 2` bytes starting at the
    /// STX; the codec guarantees this before calling.
    pub(super) fn from_wire(version: MavVersion, raw: Bytes) -> Result<Self, FrameError> {
        let len = raw[1] as usize;
        match version {
            MavVersion::V1 => Ok(Self {
                version,
                incompat_flags: 0,
                compat_flags: 0,
                sequence: raw[2],
                system_id: raw[3],
                component_id: raw[4],
                message_id: u32::from(raw[5]),
                payload: raw.slice(6..6 + len),
                checksum: u16::from_le_bytes([raw[6 + len], raw[7 + len]]),
                raw,
            }),
            MavVersion::V2 => {
                let incompat_flags = raw[2];
                if incompat_flags != 0 {
                    return Err(FrameError::IncompatibleFlags(incompat_flags));
                }
                Ok(Self {
                    version,
                    incompat_flags,
                    compat_flags: raw[3],
                    sequence: raw[4],
                    system_id: raw[5],
                    component_id: raw[6],
                    message_id: u32::from_le_bytes([raw[7], raw[8], raw[9], 0]),
                    payload: raw.slice(10..10 + len),
                    checksum: u16::from_le_bytes([raw[10 + len], raw[11 + len]]),
                    raw,
                })
            }
        }
    }
}

/// A validated frame with its decoded message and resolved target.
#[derive(Debug, Clone)]
pub struct Frame {
    pub raw: RawFrame,
    pub message: MavMessage,
    pub targeting: TargetingKind,
    pub target_system: u8,
    pub target_component: u8,
}

impl Frame {
    /// Validate `raw` against `dialect` and decode its payload.
    ///
    /// Checks the x25 checksum with the message's CRC_EXTRA, restores v2
    /// payload truncation by zero-padding to the expected length, decodes
    /// the typed message, and resolves the frame's target from the
    /// message's targeting kind.
    pub fn decode(raw: &RawFrame, dialect: &Dialect) -> Result<Self, FrameError> {
        let spec = dialect
            .spec(raw.message_id)
            .ok_or(FrameError::UnknownMessage(raw.message_id))?;

        let computed = frame_checksum(raw.checked_span(), spec.crc_extra);
        if computed != raw.checksum {
            return Err(FrameError::ChecksumInvalid {
                message_id: raw.message_id,
                computed,
                received: raw.checksum,
            });
        }

        let wire_len = spec.payload_len(raw.version) as usize;
        let message = if raw.version == MavVersion::V2 && raw.payload.len() < wire_len {
            let mut padded = BytesMut::with_capacity(wire_len);
            padded.extend_from_slice(&raw.payload);
            padded.resize(wire_len, 0);
            dialect.decode(raw.message_id, raw.version, &padded)
        } else {
            dialect.decode(raw.message_id, raw.version, &raw.payload)
        }
        .map_err(|e| match e {
            DialectError::UnknownMessage(id) => FrameError::UnknownMessage(id),
            DialectError::FailedToUnpack(id) => FrameError::FailedToUnpack(id),
        })?;

        let (target_system, target_component) = spec.targeting.resolve(&message);
        Ok(Self {
            raw: raw.clone(),
            message,
            targeting: spec.targeting,
            target_system,
            target_component,
        })
    }
}

/// Assemble a frame from a pre-serialized wire-order payload.
///
/// MAVLink v2 payloads are truncated at trailing zero bytes, never below
/// one byte; v1 payloads are emitted as given. The caller is responsible
/// for choosing a version able to carry `message_id` (ids above 255 do not
/// fit a v1 header and are masked here like any other u8 cast).
pub fn pack_frame(
    version: MavVersion,
    message_id: u32,
    crc_extra: u8,
    system_id: u8,
    component_id: u8,
    sequence: u8,
    payload: &[u8],
) -> RawFrame {
    let payload = match version {
        MavVersion::V1 => payload,
        MavVersion::V2 => {
            let mut len = payload.len();
            while len > 1 && payload[len - 1] == 0 {
                len -= 1;
            }
            &payload[..len]
        }
    };
    let payload_len = payload.len();

    let mut raw = BytesMut::with_capacity(version.header_len() + payload_len + CHECKSUM_LEN);
    match version {
        MavVersion::V1 => {
            raw.put_u8(STX_V1);
            raw.put_u8(payload_len as u8);
            raw.put_u8(sequence);
            raw.put_u8(system_id);
            raw.put_u8(component_id);
            raw.put_u8(message_id as u8);
        }
        MavVersion::V2 => {
            raw.put_u8(STX_V2);
            raw.put_u8(payload_len as u8);
            raw.put_u8(0); // incompatible flags; signing is not produced
            raw.put_u8(0); // compatible flags
            raw.put_u8(sequence);
            raw.put_u8(system_id);
            raw.put_u8(component_id);
            raw.put_slice(&message_id.to_le_bytes()[..3]);
        }
    }
    raw.put_slice(payload);
    let checksum = frame_checksum(&raw[1..], crc_extra);
    raw.put_u16_le(checksum);
    let raw = raw.freeze();

    RawFrame {
        version,
        incompat_flags: 0,
        compat_flags: 0,
        sequence,
        system_id,
        component_id,
        message_id: message_id & version.max_message_id(),
        payload: raw.slice(version.header_len()..version.header_len() + payload_len),
        checksum,
        raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{self, common};

    fn common_dialect() -> &'static Dialect {
        dialect::by_name("common").expect("common dialect")
    }

    fn heartbeat() -> MavMessage {
        MavMessage::Heartbeat(common::Heartbeat {
            custom_mode: 81,
            mavtype: 2,
            autopilot: 3,
            base_mode: 4,
            system_status: 5,
            mavlink_version: 3,
        })
    }

    fn packed(message: &MavMessage, version: MavVersion, seq: u8) -> RawFrame {
        let encoded = common_dialect().encode(message, version).expect("encode");
        pack_frame(
            version,
            encoded.message_id,
            encoded.crc_extra,
            0xFF,
            0xBE,
            seq,
            &encoded.payload,
        )
    }

    #[test]
    fn v1_pack_and_decode_round_trip() {
        let raw = packed(&heartbeat(), MavVersion::V1, 7);
        assert_eq!(raw.wire_bytes()[0], STX_V1);
        assert_eq!(raw.payload_len(), 9);

        let frame = Frame::decode(&raw, common_dialect()).expect("decode");
        assert_eq!(frame.message, heartbeat());
        assert_eq!(frame.targeting, TargetingKind::Broadcast);
        assert_eq!((frame.target_system, frame.target_component), (0, 0));
        assert_eq!(frame.raw.sequence, 7);
        assert_eq!(frame.raw.system_id, 0xFF);
        assert_eq!(frame.raw.component_id, 0xBE);
    }

    #[test]
    fn v2_truncates_trailing_zeros_and_restores_on_decode() {
        // COMMAND_ACK extends to 10 bytes on v2; everything after the first
        // three is zero here, so the wire payload shrinks to 3.
        let ack = MavMessage::CommandAck(common::CommandAck {
            command: 258,
            result: 1,
            ..Default::default()
        });
        let raw = packed(&ack, MavVersion::V2, 0);
        assert_eq!(raw.payload_len(), 3);

        let frame = Frame::decode(&raw, common_dialect()).expect("decode");
        assert_eq!(frame.message, ack);

        // Re-encoding reproduces the truncated wire payload.
        let again = packed(&frame.message, MavVersion::V2, 0);
        assert_eq!(again.wire_bytes(), raw.wire_bytes());
    }

    #[test]
    fn v2_all_zero_payload_keeps_one_byte() {
        let encoded = common_dialect()
            .encode(
                &MavMessage::Ping(common::Ping::default()),
                MavVersion::V2,
            )
            .expect("encode");
        let raw = pack_frame(MavVersion::V2, encoded.message_id, encoded.crc_extra, 1, 1, 0, &encoded.payload);
        assert_eq!(raw.payload_len(), 1);
        let frame = Frame::decode(&raw, common_dialect()).expect("decode");
        assert_eq!(frame.message, MavMessage::Ping(common::Ping::default()));
    }

    #[test]
    fn corrupted_byte_fails_checksum() {
        let raw = packed(&heartbeat(), MavVersion::V2, 0);
        let mut bytes = raw.wire_bytes().to_vec();
        let idx = bytes.len() - 4; // inside the payload
        bytes[idx] ^= 0x5A;
        let mut buf = bytes::BytesMut::from(&bytes[..]);
        let corrupted = crate::protocol::next_frame(&mut buf)
            .expect("extract")
            .expect("frame");
        assert!(matches!(
            Frame::decode(&corrupted, common_dialect()),
            Err(FrameError::ChecksumInvalid { message_id: 0, .. })
        ));
    }

    #[test]
    fn unknown_message_id_is_reported() {
        let raw = pack_frame(MavVersion::V2, 4242, 11, 1, 1, 0, &[1, 2, 3]);
        assert!(matches!(
            Frame::decode(&raw, common_dialect()),
            Err(FrameError::UnknownMessage(4242))
        ));
    }

    #[test]
    fn targeted_message_resolves_target() {
        let ping = MavMessage::Ping(common::Ping {
            time_usec: 123,
            seq: 9,
            target_system: 7,
            target_component: 1,
        });
        let raw = packed(&ping, MavVersion::V2, 0);
        let frame = Frame::decode(&raw, common_dialect()).expect("decode");
        assert_eq!(frame.targeting, TargetingKind::SystemComponent);
        assert_eq!((frame.target_system, frame.target_component), (7, 1));
    }
}
