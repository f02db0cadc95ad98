// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dialect tables: per-message metadata, typed decode/encode, and the
//! CRC_EXTRA seed algorithm of the generator contract.
//!
//! A [`Dialect`] is built once (the tables are `static`) and is safe to
//! share across tasks without synchronization.

pub mod common;

pub use common::MavMessage;

use crc_any::CRCu16;
use thiserror::Error;

use crate::protocol::MavVersion;

/// Dialect-level decode errors. Unknown ids are distinct from layout
/// mismatches so the router can forward the former opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialectError {
    #[error("message id {0} is not in the dialect")]
    UnknownMessage(u32),
    #[error("payload does not match the layout of message {0}")]
    FailedToUnpack(u32),
}

/// How a message addresses its recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetingKind {
    /// No target fields; addressed to everyone.
    Broadcast,
    /// Carries `target_system` only.
    System,
    /// Carries both `target_system` and `target_component`.
    SystemComponent,
    /// Carries `target_component` only.
    Component,
}

impl TargetingKind {
    /// Resolve the `(target_system, target_component)` pair of a decoded
    /// message under this kind.
    pub fn resolve(self, message: &MavMessage) -> (u8, u8) {
        let (system, component) = message.target();
        match self {
            Self::Broadcast => (0, 0),
            Self::System => (system, 0),
            Self::SystemComponent => (system, component),
            Self::Component => (0, component),
        }
    }
}

/// Wire primitive of a message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    I8,
    Char,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
}

impl FieldKind {
    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 | Self::Char => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Dialect-XML type name, exactly as fed to the CRC_EXTRA seed.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::U8 => "uint8_t",
            Self::I8 => "int8_t",
            Self::Char => "char",
            Self::U16 => "uint16_t",
            Self::I16 => "int16_t",
            Self::U32 => "uint32_t",
            Self::I32 => "int32_t",
            Self::U64 => "uint64_t",
            Self::I64 => "int64_t",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }
}

/// One field of a message, in wire order.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Array length; 1 for scalars.
    pub ordinality: u8,
}

impl FieldSpec {
    pub const fn wire_size(&self) -> usize {
        self.kind.size() * self.ordinality as usize
    }
}

/// Metadata for one message id. Immutable after construction.
#[derive(Debug, Clone, Copy)]
pub struct MessageSpec {
    pub id: u32,
    pub name: &'static str,
    pub crc_extra: u8,
    /// Full v2 payload length, extension fields included.
    pub wire_len: u8,
    /// v1 payload length (extensions are a v2-only construct).
    pub base_len: u8,
    pub targeting: TargetingKind,
    /// Fields in wire order: size-sorted non-extension fields first, then
    /// extensions in declaration order starting at `extension_start`.
    pub fields: &'static [FieldSpec],
    pub extension_start: usize,
}

impl MessageSpec {
    /// Expected payload length when fully expanded for `version`.
    pub fn payload_len(&self, version: MavVersion) -> u8 {
        match version {
            MavVersion::V1 => self.base_len,
            MavVersion::V2 => self.wire_len,
        }
    }

    /// Non-extension fields, as covered by the CRC_EXTRA seed.
    pub fn base_fields(&self) -> &'static [FieldSpec] {
        &self.fields[..self.extension_start]
    }
}

/// CRC_EXTRA seed for a message signature, per the MAVLink algorithm: x25
/// over the uppercased message name and a space, then for each
/// non-extension field its type name, a space, its name, a space, and for
/// arrays a single ordinality byte; the 16-bit result is folded to 8 bits.
pub fn crc_extra_seed(name: &str, fields: &[FieldSpec]) -> u8 {
    let mut crc = CRCu16::crc16mcrf4cc();
    crc.digest(name.as_bytes());
    crc.digest(b" ");
    for field in fields {
        crc.digest(field.kind.type_name().as_bytes());
        crc.digest(b" ");
        crc.digest(field.name.as_bytes());
        crc.digest(b" ");
        if field.ordinality > 1 {
            crc.digest(&[field.ordinality]);
        }
    }
    let crc = crc.get_crc();
    ((crc & 0xFF) ^ (crc >> 8)) as u8
}

/// Payload bytes and routing metadata produced by [`Dialect::encode`].
///
/// The payload is untruncated wire order; v2 trailing-zero truncation
/// happens at frame packing.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub message_id: u32,
    pub payload: Vec<u8>,
    pub crc_extra: u8,
    pub targeting: TargetingKind,
}

pub(crate) type UnpackFn = fn(&MessageSpec, MavVersion, &[u8]) -> Result<MavMessage, DialectError>;

/// An immutable message table: total over its known ids, undefined outside.
pub struct Dialect {
    name: &'static str,
    specs: &'static [MessageSpec],
    unpack: UnpackFn,
}

impl Dialect {
    pub(crate) const fn new(
        name: &'static str,
        specs: &'static [MessageSpec],
        unpack: UnpackFn,
    ) -> Self {
        Self { name, specs, unpack }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Metadata for `id`, or `None` outside the dialect.
    pub fn spec(&self, id: u32) -> Option<&'static MessageSpec> {
        self.specs
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.specs[i])
    }

    /// All message specs, ordered by id.
    pub fn specs(&self) -> &'static [MessageSpec] {
        self.specs
    }

    /// Decode a fully expanded payload into a typed message.
    ///
    /// The payload must already be padded to the expected length for
    /// `version` (the frame layer restores v2 truncation before calling).
    pub fn decode(
        &self,
        id: u32,
        version: MavVersion,
        payload: &[u8],
    ) -> Result<MavMessage, DialectError> {
        let spec = self.spec(id).ok_or(DialectError::UnknownMessage(id))?;
        if payload.len() < spec.payload_len(version) as usize {
            return Err(DialectError::FailedToUnpack(id));
        }
        (self.unpack)(spec, version, payload)
    }

    /// Serialize a message into wire-order payload bytes plus the metadata
    /// needed to frame and route it.
    pub fn encode(
        &self,
        message: &MavMessage,
        version: MavVersion,
    ) -> Result<Encoded, DialectError> {
        let id = message.id();
        let spec = self.spec(id).ok_or(DialectError::UnknownMessage(id))?;
        let mut payload = Vec::with_capacity(spec.payload_len(version) as usize);
        message.pack(version, &mut payload);
        Ok(Encoded {
            message_id: id,
            payload,
            crc_extra: spec.crc_extra,
            targeting: spec.targeting,
        })
    }
}

/// Look up a loaded dialect by name.
pub fn by_name(name: &str) -> Option<&'static Dialect> {
    match name {
        "common" => Some(&common::DIALECT),
        _ => None,
    }
}

/// Null-pad `s` into a fixed-length char-array field, truncating oversized
/// input.
pub fn fixed_str<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = s.as_bytes();
    let n = bytes.len().min(N);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_name_resolves_common_only() {
        assert!(by_name("common").is_some());
        assert!(by_name("ardupilotmega").is_none());
        assert_eq!(by_name("common").map(Dialect::name), Some("common"));
    }

    #[test]
    fn targeting_resolution_per_kind() {
        let ping = MavMessage::Ping(common::Ping {
            time_usec: 0,
            seq: 0,
            target_system: 9,
            target_component: 4,
        });
        assert_eq!(TargetingKind::Broadcast.resolve(&ping), (0, 0));
        assert_eq!(TargetingKind::System.resolve(&ping), (9, 0));
        assert_eq!(TargetingKind::SystemComponent.resolve(&ping), (9, 4));
        assert_eq!(TargetingKind::Component.resolve(&ping), (0, 4));
    }

    #[test]
    fn fixed_str_pads_and_truncates() {
        assert_eq!(fixed_str::<4>("ab"), [b'a', b'b', 0, 0]);
        assert_eq!(fixed_str::<2>("abc"), [b'a', b'b']);
    }
}
