// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming frame extraction.
//!
//! Stream transports (TCP, serial) keep a rolling receive buffer and call
//! [`next_frame`] until it reports that nothing further can be extracted.
//! Datagram transports treat every datagram as exactly one frame via
//! [`parse_datagram`].

use bytes::{Buf, BytesMut};
use tracing::debug;

use super::{FrameError, MavVersion, RawFrame, CHECKSUM_LEN, STX_V1, STX_V2};

/// Extract the next frame from `buf`, consuming what was used.
///
/// Scans for a start byte, skipping garbage one byte at a time
/// (resynchronization). Returns `Ok(None)` when the buffer is empty or a
/// candidate frame is still incomplete; in the latter case the buffer is
/// left intact from the start byte so more input can complete it. A v2
/// frame with non-zero incompatible flags is consumed from the buffer and
/// reported as an error; the remainder stays parseable.
pub fn next_frame(buf: &mut BytesMut) -> Result<Option<RawFrame>, FrameError> {
    let mut skipped = 0usize;
    let result = loop {
        let Some(&stx) = buf.first() else {
            break Ok(None);
        };
        let version = match stx {
            STX_V1 => MavVersion::V1,
            STX_V2 => MavVersion::V2,
            _ => {
                buf.advance(1);
                skipped += 1;
                continue;
            }
        };
        if buf.len() < 2 {
            break Ok(None);
        }
        let total = version.header_len() + buf[1] as usize + CHECKSUM_LEN;
        if buf.len() < total {
            break Ok(None);
        }
        let raw = buf.split_to(total).freeze();
        break RawFrame::from_wire(version, raw).map(Some);
    };
    if skipped > 0 {
        debug!(skipped, "resynchronized past garbage bytes");
    }
    result
}

/// Parse a datagram expected to carry exactly one frame.
///
/// Trailing bytes after the frame are ignored; a datagram with no start
/// byte is `NotAFrame`, one whose frame is cut short is `IncompleteFrame`.
pub fn parse_datagram(datagram: &[u8]) -> Result<RawFrame, FrameError> {
    let mut buf = BytesMut::from(datagram);
    match next_frame(&mut buf)? {
        Some(frame) => Ok(frame),
        None if buf.is_empty() => Err(FrameError::NotAFrame),
        None => Err(FrameError::IncompleteFrame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame_checksum;

    const HEARTBEAT_CRC_EXTRA: u8 = 50;

    /// Minimal v1 HEARTBEAT from source (0xFF, 0xBE), sequence 0.
    fn v1_heartbeat() -> Vec<u8> {
        let payload = [0x51, 0, 0, 0, 2, 3, 4, 5, 3];
        let mut frame = vec![STX_V1, 9, 0, 0xFF, 0xBE, 0];
        frame.extend_from_slice(&payload);
        let crc = frame_checksum(&frame[1..], HEARTBEAT_CRC_EXTRA);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    fn v2_heartbeat(incompat_flags: u8) -> Vec<u8> {
        let payload = [0x51, 0, 0, 0, 2, 3, 4, 5, 3];
        let mut frame = vec![STX_V2, 9, incompat_flags, 0, 0, 1, 1, 0, 0, 0];
        frame.extend_from_slice(&payload);
        let crc = frame_checksum(&frame[1..], HEARTBEAT_CRC_EXTRA);
        frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut buf = BytesMut::new();
        assert_eq!(next_frame(&mut buf), Ok(None));
    }

    #[test]
    fn garbage_only_is_consumed() {
        let mut buf = BytesMut::from(&[0x00u8, 0x13, 0x37][..]);
        assert_eq!(next_frame(&mut buf), Ok(None));
        assert!(buf.is_empty());
    }

    #[test]
    fn parses_minimal_v1_heartbeat() {
        let mut buf = BytesMut::from(&v1_heartbeat()[..]);
        let frame = next_frame(&mut buf).expect("extract").expect("frame");
        assert_eq!(frame.version, MavVersion::V1);
        assert_eq!(frame.message_id, 0);
        assert_eq!(frame.system_id, 0xFF);
        assert_eq!(frame.component_id, 0xBE);
        assert_eq!(frame.sequence, 0);
        assert_eq!(frame.payload_len(), 9);
        assert!(buf.is_empty());
    }

    #[test]
    fn resynchronizes_past_leading_garbage() {
        let clean = v1_heartbeat();
        let mut dirty = vec![0x00, 0x00];
        dirty.extend_from_slice(&clean);

        let mut buf = BytesMut::from(&dirty[..]);
        let frame = next_frame(&mut buf).expect("extract").expect("frame");
        assert_eq!(frame.wire_bytes().as_ref(), &clean[..]);
    }

    #[test]
    fn incomplete_frame_keeps_buffer_from_start_byte() {
        let full = v2_heartbeat(0);
        let mut buf = BytesMut::from(&full[..full.len() - 1]);
        assert_eq!(next_frame(&mut buf), Ok(None));
        assert_eq!(buf.len(), full.len() - 1);

        buf.extend_from_slice(&full[full.len() - 1..]);
        let frame = next_frame(&mut buf).expect("extract").expect("frame");
        assert_eq!(frame.wire_bytes().as_ref(), &full[..]);
    }

    #[test]
    fn lone_start_byte_waits_for_length() {
        let mut buf = BytesMut::from(&[STX_V2][..]);
        assert_eq!(next_frame(&mut buf), Ok(None));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn incompatible_flags_consume_frame_and_keep_remainder() {
        let mut input = v2_heartbeat(0x01);
        let clean = v1_heartbeat();
        input.extend_from_slice(&clean);

        let mut buf = BytesMut::from(&input[..]);
        assert_eq!(next_frame(&mut buf), Err(FrameError::IncompatibleFlags(0x01)));
        let frame = next_frame(&mut buf).expect("extract").expect("frame");
        assert_eq!(frame.wire_bytes().as_ref(), &clean[..]);
    }

    #[test]
    fn drains_multiple_frames() {
        let mut input = v1_heartbeat();
        input.extend_from_slice(&v2_heartbeat(0));

        let mut buf = BytesMut::from(&input[..]);
        let first = next_frame(&mut buf).expect("extract").expect("frame");
        let second = next_frame(&mut buf).expect("extract").expect("frame");
        assert_eq!(first.version, MavVersion::V1);
        assert_eq!(second.version, MavVersion::V2);
        assert_eq!(next_frame(&mut buf), Ok(None));
    }

    #[test]
    fn datagram_without_start_byte_is_not_a_frame() {
        assert_eq!(parse_datagram(&[1, 2, 3]), Err(FrameError::NotAFrame));
        assert_eq!(parse_datagram(&[]), Err(FrameError::NotAFrame));
    }

    #[test]
    fn truncated_datagram_is_incomplete() {
        let full = v1_heartbeat();
        assert_eq!(
            parse_datagram(&full[..full.len() - 2]),
            Err(FrameError::IncompleteFrame)
        );
    }

    #[test]
    fn datagram_round_trip() {
        let full = v1_heartbeat();
        let frame = parse_datagram(&full).expect("frame");
        assert_eq!(frame.wire_bytes().as_ref(), &full[..]);
    }
}
