// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message definitions for the `common` dialect subset carried by this
//! router. Emitted by the dialect table generator from the message XML; do
//! not edit field tables by hand. Field order is wire order: non-extension
//! fields size-sorted (stable within a size class), extensions appended in
//! declaration order.

use bytes::{Buf, BufMut};

use super::{
    Dialect, DialectError, FieldKind, FieldSpec, MessageSpec, TargetingKind,
};
use crate::protocol::MavVersion;

/// Protocol version byte emitted in `HEARTBEAT.mavlink_version`. Always
/// written as this constant; never taken from caller data.
pub const MAVLINK_VERSION: u8 = 3;

/// The `common` dialect subset.
pub static DIALECT: Dialect = Dialect::new("common", SPECS, unpack_message);

const fn scalar(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind, ordinality: 1 }
}

const fn array(name: &'static str, kind: FieldKind, ordinality: u8) -> FieldSpec {
    FieldSpec { name, kind, ordinality }
}

/// Message table, ordered by id.
pub static SPECS: &[MessageSpec] = &[
    MessageSpec {
        id: 0,
        name: "HEARTBEAT",
        crc_extra: 50,
        wire_len: 9,
        base_len: 9,
        targeting: TargetingKind::Broadcast,
        extension_start: 6,
        fields: &[
            scalar("custom_mode", FieldKind::U32),
            scalar("type", FieldKind::U8),
            scalar("autopilot", FieldKind::U8),
            scalar("base_mode", FieldKind::U8),
            scalar("system_status", FieldKind::U8),
            scalar("mavlink_version", FieldKind::U8),
        ],
    },
    MessageSpec {
        id: 1,
        name: "SYS_STATUS",
        crc_extra: 124,
        wire_len: 31,
        base_len: 31,
        targeting: TargetingKind::Broadcast,
        extension_start: 13,
        fields: &[
            scalar("onboard_control_sensors_present", FieldKind::U32),
            scalar("onboard_control_sensors_enabled", FieldKind::U32),
            scalar("onboard_control_sensors_health", FieldKind::U32),
            scalar("load", FieldKind::U16),
            scalar("voltage_battery", FieldKind::U16),
            scalar("current_battery", FieldKind::I16),
            scalar("drop_rate_comm", FieldKind::U16),
            scalar("errors_comm", FieldKind::U16),
            scalar("errors_count1", FieldKind::U16),
            scalar("errors_count2", FieldKind::U16),
            scalar("errors_count3", FieldKind::U16),
            scalar("errors_count4", FieldKind::U16),
            scalar("battery_remaining", FieldKind::I8),
        ],
    },
    MessageSpec {
        id: 4,
        name: "PING",
        crc_extra: 237,
        wire_len: 14,
        base_len: 14,
        targeting: TargetingKind::SystemComponent,
        extension_start: 4,
        fields: &[
            scalar("time_usec", FieldKind::U64),
            scalar("seq", FieldKind::U32),
            scalar("target_system", FieldKind::U8),
            scalar("target_component", FieldKind::U8),
        ],
    },
    MessageSpec {
        id: 5,
        name: "CHANGE_OPERATOR_CONTROL",
        crc_extra: 217,
        wire_len: 28,
        base_len: 28,
        targeting: TargetingKind::System,
        extension_start: 4,
        fields: &[
            scalar("target_system", FieldKind::U8),
            scalar("control_request", FieldKind::U8),
            scalar("version", FieldKind::U8),
            array("passkey", FieldKind::Char, 25),
        ],
    },
    MessageSpec {
        id: 20,
        name: "PARAM_REQUEST_READ",
        crc_extra: 214,
        wire_len: 20,
        base_len: 20,
        targeting: TargetingKind::SystemComponent,
        extension_start: 4,
        fields: &[
            scalar("param_index", FieldKind::I16),
            scalar("target_system", FieldKind::U8),
            scalar("target_component", FieldKind::U8),
            array("param_id", FieldKind::Char, 16),
        ],
    },
    MessageSpec {
        id: 21,
        name: "PARAM_REQUEST_LIST",
        crc_extra: 159,
        wire_len: 2,
        base_len: 2,
        targeting: TargetingKind::SystemComponent,
        extension_start: 2,
        fields: &[
            scalar("target_system", FieldKind::U8),
            scalar("target_component", FieldKind::U8),
        ],
    },
    MessageSpec {
        id: 22,
        name: "PARAM_VALUE",
        crc_extra: 220,
        wire_len: 25,
        base_len: 25,
        targeting: TargetingKind::Broadcast,
        extension_start: 5,
        fields: &[
            scalar("param_value", FieldKind::F32),
            scalar("param_count", FieldKind::U16),
            scalar("param_index", FieldKind::U16),
            array("param_id", FieldKind::Char, 16),
            scalar("param_type", FieldKind::U8),
        ],
    },
    MessageSpec {
        id: 30,
        name: "ATTITUDE",
        crc_extra: 39,
        wire_len: 28,
        base_len: 28,
        targeting: TargetingKind::Broadcast,
        extension_start: 7,
        fields: &[
            scalar("time_boot_ms", FieldKind::U32),
            scalar("roll", FieldKind::F32),
            scalar("pitch", FieldKind::F32),
            scalar("yaw", FieldKind::F32),
            scalar("rollspeed", FieldKind::F32),
            scalar("pitchspeed", FieldKind::F32),
            scalar("yawspeed", FieldKind::F32),
        ],
    },
    MessageSpec {
        id: 76,
        name: "COMMAND_LONG",
        crc_extra: 152,
        wire_len: 33,
        base_len: 33,
        targeting: TargetingKind::SystemComponent,
        extension_start: 11,
        fields: &[
            scalar("param1", FieldKind::F32),
            scalar("param2", FieldKind::F32),
            scalar("param3", FieldKind::F32),
            scalar("param4", FieldKind::F32),
            scalar("param5", FieldKind::F32),
            scalar("param6", FieldKind::F32),
            scalar("param7", FieldKind::F32),
            scalar("command", FieldKind::U16),
            scalar("target_system", FieldKind::U8),
            scalar("target_component", FieldKind::U8),
            scalar("confirmation", FieldKind::U8),
        ],
    },
    MessageSpec {
        id: 77,
        name: "COMMAND_ACK",
        crc_extra: 143,
        wire_len: 10,
        base_len: 3,
        targeting: TargetingKind::SystemComponent,
        extension_start: 2,
        fields: &[
            scalar("command", FieldKind::U16),
            scalar("result", FieldKind::U8),
            scalar("progress", FieldKind::U8),
            scalar("result_param2", FieldKind::I32),
            scalar("target_system", FieldKind::U8),
            scalar("target_component", FieldKind::U8),
        ],
    },
];

/// HEARTBEAT (0): vehicle type, autopilot, and mode flags.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Heartbeat {
    pub custom_mode: u32,
    pub mavtype: u8,
    pub autopilot: u8,
    pub base_mode: u8,
    pub system_status: u8,
    pub mavlink_version: u8,
}

/// SYS_STATUS (1): onboard sensor and battery state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SysStatus {
    pub onboard_control_sensors_present: u32,
    pub onboard_control_sensors_enabled: u32,
    pub onboard_control_sensors_health: u32,
    pub load: u16,
    pub voltage_battery: u16,
    pub current_battery: i16,
    pub drop_rate_comm: u16,
    pub errors_comm: u16,
    pub errors_count1: u16,
    pub errors_count2: u16,
    pub errors_count3: u16,
    pub errors_count4: u16,
    pub battery_remaining: i8,
}

/// PING (4): link round-trip probe.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ping {
    pub time_usec: u64,
    pub seq: u32,
    pub target_system: u8,
    pub target_component: u8,
}

/// CHANGE_OPERATOR_CONTROL (5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeOperatorControl {
    pub target_system: u8,
    pub control_request: u8,
    pub version: u8,
    pub passkey: [u8; 25],
}

/// PARAM_REQUEST_READ (20).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamRequestRead {
    pub param_index: i16,
    pub target_system: u8,
    pub target_component: u8,
    pub param_id: [u8; 16],
}

/// PARAM_REQUEST_LIST (21).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamRequestList {
    pub target_system: u8,
    pub target_component: u8,
}

/// PARAM_VALUE (22).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamValue {
    pub param_value: f32,
    pub param_count: u16,
    pub param_index: u16,
    pub param_id: [u8; 16],
    pub param_type: u8,
}

/// ATTITUDE (30).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attitude {
    pub time_boot_ms: u32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub rollspeed: f32,
    pub pitchspeed: f32,
    pub yawspeed: f32,
}

/// COMMAND_LONG (76).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandLong {
    pub param1: f32,
    pub param2: f32,
    pub param3: f32,
    pub param4: f32,
    pub param5: f32,
    pub param6: f32,
    pub param7: f32,
    pub command: u16,
    pub target_system: u8,
    pub target_component: u8,
    pub confirmation: u8,
}

/// COMMAND_ACK (77). `progress` through `target_component` are v2
/// extension fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandAck {
    pub command: u16,
    pub result: u8,
    pub progress: u8,
    pub result_param2: i32,
    pub target_system: u8,
    pub target_component: u8,
}

/// Sum of all messages in the loaded dialect.
#[derive(Debug, Clone, PartialEq)]
pub enum MavMessage {
    Heartbeat(Heartbeat),
    SysStatus(SysStatus),
    Ping(Ping),
    ChangeOperatorControl(ChangeOperatorControl),
    ParamRequestRead(ParamRequestRead),
    ParamRequestList(ParamRequestList),
    ParamValue(ParamValue),
    Attitude(Attitude),
    CommandLong(CommandLong),
    CommandAck(CommandAck),
}

impl MavMessage {
    /// Message id on the wire.
    pub fn id(&self) -> u32 {
        match self {
            Self::Heartbeat(_) => 0,
            Self::SysStatus(_) => 1,
            Self::Ping(_) => 4,
            Self::ChangeOperatorControl(_) => 5,
            Self::ParamRequestRead(_) => 20,
            Self::ParamRequestList(_) => 21,
            Self::ParamValue(_) => 22,
            Self::Attitude(_) => 30,
            Self::CommandLong(_) => 76,
            Self::CommandAck(_) => 77,
        }
    }

    /// Symbolic message name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heartbeat(_) => "HEARTBEAT",
            Self::SysStatus(_) => "SYS_STATUS",
            Self::Ping(_) => "PING",
            Self::ChangeOperatorControl(_) => "CHANGE_OPERATOR_CONTROL",
            Self::ParamRequestRead(_) => "PARAM_REQUEST_READ",
            Self::ParamRequestList(_) => "PARAM_REQUEST_LIST",
            Self::ParamValue(_) => "PARAM_VALUE",
            Self::Attitude(_) => "ATTITUDE",
            Self::CommandLong(_) => "COMMAND_LONG",
            Self::CommandAck(_) => "COMMAND_ACK",
        }
    }

    /// The message's `(target_system, target_component)` fields; zero for
    /// messages without them.
    pub fn target(&self) -> (u8, u8) {
        match self {
            Self::Ping(m) => (m.target_system, m.target_component),
            Self::ChangeOperatorControl(m) => (m.target_system, 0),
            Self::ParamRequestRead(m) => (m.target_system, m.target_component),
            Self::ParamRequestList(m) => (m.target_system, m.target_component),
            Self::CommandLong(m) => (m.target_system, m.target_component),
            Self::CommandAck(m) => (m.target_system, m.target_component),
            _ => (0, 0),
        }
    }

    /// Serialize into `out` in wire order, untruncated. Extension fields
    /// are emitted for v2 only.
    pub fn pack(&self, version: MavVersion, out: &mut Vec<u8>) {
        match self {
            Self::Heartbeat(m) => {
                out.put_u32_le(m.custom_mode);
                out.put_u8(m.mavtype);
                out.put_u8(m.autopilot);
                out.put_u8(m.base_mode);
                out.put_u8(m.system_status);
                out.put_u8(MAVLINK_VERSION);
            }
            Self::SysStatus(m) => {
                out.put_u32_le(m.onboard_control_sensors_present);
                out.put_u32_le(m.onboard_control_sensors_enabled);
                out.put_u32_le(m.onboard_control_sensors_health);
                out.put_u16_le(m.load);
                out.put_u16_le(m.voltage_battery);
                out.put_i16_le(m.current_battery);
                out.put_u16_le(m.drop_rate_comm);
                out.put_u16_le(m.errors_comm);
                out.put_u16_le(m.errors_count1);
                out.put_u16_le(m.errors_count2);
                out.put_u16_le(m.errors_count3);
                out.put_u16_le(m.errors_count4);
                out.put_i8(m.battery_remaining);
            }
            Self::Ping(m) => {
                out.put_u64_le(m.time_usec);
                out.put_u32_le(m.seq);
                out.put_u8(m.target_system);
                out.put_u8(m.target_component);
            }
            Self::ChangeOperatorControl(m) => {
                out.put_u8(m.target_system);
                out.put_u8(m.control_request);
                out.put_u8(m.version);
                out.put_slice(&m.passkey);
            }
            Self::ParamRequestRead(m) => {
                out.put_i16_le(m.param_index);
                out.put_u8(m.target_system);
                out.put_u8(m.target_component);
                out.put_slice(&m.param_id);
            }
            Self::ParamRequestList(m) => {
                out.put_u8(m.target_system);
                out.put_u8(m.target_component);
            }
            Self::ParamValue(m) => {
                out.put_f32_le(m.param_value);
                out.put_u16_le(m.param_count);
                out.put_u16_le(m.param_index);
                out.put_slice(&m.param_id);
                out.put_u8(m.param_type);
            }
            Self::Attitude(m) => {
                out.put_u32_le(m.time_boot_ms);
                out.put_f32_le(m.roll);
                out.put_f32_le(m.pitch);
                out.put_f32_le(m.yaw);
                out.put_f32_le(m.rollspeed);
                out.put_f32_le(m.pitchspeed);
                out.put_f32_le(m.yawspeed);
            }
            Self::CommandLong(m) => {
                out.put_f32_le(m.param1);
                out.put_f32_le(m.param2);
                out.put_f32_le(m.param3);
                out.put_f32_le(m.param4);
                out.put_f32_le(m.param5);
                out.put_f32_le(m.param6);
                out.put_f32_le(m.param7);
                out.put_u16_le(m.command);
                out.put_u8(m.target_system);
                out.put_u8(m.target_component);
                out.put_u8(m.confirmation);
            }
            Self::CommandAck(m) => {
                out.put_u16_le(m.command);
                out.put_u8(m.result);
                if version == MavVersion::V2 {
                    out.put_u8(m.progress);
                    out.put_i32_le(m.result_param2);
                    out.put_u8(m.target_system);
                    out.put_u8(m.target_component);
                }
            }
        }
    }
}

/// Decode dispatch for the table. The dialect layer has already checked
/// the payload length against the spec for `version`.
fn unpack_message(
    spec: &MessageSpec,
    version: MavVersion,
    payload: &[u8],
) -> Result<MavMessage, DialectError> {
    let mut p = payload;
    Ok(match spec.id {
        0 => MavMessage::Heartbeat(Heartbeat {
            custom_mode: p.get_u32_le(),
            mavtype: p.get_u8(),
            autopilot: p.get_u8(),
            base_mode: p.get_u8(),
            system_status: p.get_u8(),
            mavlink_version: p.get_u8(),
        }),
        1 => MavMessage::SysStatus(SysStatus {
            onboard_control_sensors_present: p.get_u32_le(),
            onboard_control_sensors_enabled: p.get_u32_le(),
            onboard_control_sensors_health: p.get_u32_le(),
            load: p.get_u16_le(),
            voltage_battery: p.get_u16_le(),
            current_battery: p.get_i16_le(),
            drop_rate_comm: p.get_u16_le(),
            errors_comm: p.get_u16_le(),
            errors_count1: p.get_u16_le(),
            errors_count2: p.get_u16_le(),
            errors_count3: p.get_u16_le(),
            errors_count4: p.get_u16_le(),
            battery_remaining: p.get_i8(),
        }),
        4 => MavMessage::Ping(Ping {
            time_usec: p.get_u64_le(),
            seq: p.get_u32_le(),
            target_system: p.get_u8(),
            target_component: p.get_u8(),
        }),
        5 => {
            let mut m = ChangeOperatorControl {
                target_system: p.get_u8(),
                control_request: p.get_u8(),
                version: p.get_u8(),
                passkey: [0; 25],
            };
            p.copy_to_slice(&mut m.passkey);
            MavMessage::ChangeOperatorControl(m)
        }
        20 => {
            let mut m = ParamRequestRead {
                param_index: p.get_i16_le(),
                target_system: p.get_u8(),
                target_component: p.get_u8(),
                param_id: [0; 16],
            };
            p.copy_to_slice(&mut m.param_id);
            MavMessage::ParamRequestRead(m)
        }
        21 => MavMessage::ParamRequestList(ParamRequestList {
            target_system: p.get_u8(),
            target_component: p.get_u8(),
        }),
        22 => {
            let param_value = p.get_f32_le();
            let param_count = p.get_u16_le();
            let param_index = p.get_u16_le();
            let mut param_id = [0u8; 16];
            p.copy_to_slice(&mut param_id);
            MavMessage::ParamValue(ParamValue {
                param_value,
                param_count,
                param_index,
                param_id,
                param_type: p.get_u8(),
            })
        }
        30 => MavMessage::Attitude(Attitude {
            time_boot_ms: p.get_u32_le(),
            roll: p.get_f32_le(),
            pitch: p.get_f32_le(),
            yaw: p.get_f32_le(),
            rollspeed: p.get_f32_le(),
            pitchspeed: p.get_f32_le(),
            yawspeed: p.get_f32_le(),
        }),
        76 => MavMessage::CommandLong(CommandLong {
            param1: p.get_f32_le(),
            param2: p.get_f32_le(),
            param3: p.get_f32_le(),
            param4: p.get_f32_le(),
            param5: p.get_f32_le(),
            param6: p.get_f32_le(),
            param7: p.get_f32_le(),
            command: p.get_u16_le(),
            target_system: p.get_u8(),
            target_component: p.get_u8(),
            confirmation: p.get_u8(),
        }),
        77 => {
            let mut m = CommandAck {
                command: p.get_u16_le(),
                result: p.get_u8(),
                ..Default::default()
            };
            if version == MavVersion::V2 {
                m.progress = p.get_u8();
                m.result_param2 = p.get_i32_le();
                m.target_system = p.get_u8();
                m.target_component = p.get_u8();
            }
            MavMessage::CommandAck(m)
        }
        id => return Err(DialectError::UnknownMessage(id)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{crc_extra_seed, fixed_str};

    #[test]
    fn specs_are_ordered_by_id() {
        assert!(SPECS.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn field_sizes_sum_to_declared_lengths() {
        for spec in SPECS {
            let base: usize = spec.base_fields().iter().map(FieldSpec::wire_size).sum();
            let full: usize = spec.fields.iter().map(FieldSpec::wire_size).sum();
            assert_eq!(base, spec.base_len as usize, "{}", spec.name);
            assert_eq!(full, spec.wire_len as usize, "{}", spec.name);
        }
    }

    #[test]
    fn crc_extra_matches_signature_seed_for_every_message() {
        for spec in SPECS {
            assert_eq!(
                crc_extra_seed(spec.name, spec.base_fields()),
                spec.crc_extra,
                "{}",
                spec.name
            );
        }
    }

    #[test]
    fn heartbeat_signature_seed_is_50() {
        let spec = DIALECT.spec(0).expect("HEARTBEAT");
        assert_eq!(crc_extra_seed("HEARTBEAT", spec.base_fields()), 50);
    }

    fn round_trip(message: MavMessage, version: MavVersion) {
        let encoded = DIALECT.encode(&message, version).expect("encode");
        let decoded = DIALECT
            .decode(encoded.message_id, version, &encoded.payload)
            .expect("decode");
        assert_eq!(decoded, message);
    }

    #[test]
    fn round_trips_both_versions() {
        let messages = [
            MavMessage::Heartbeat(Heartbeat {
                custom_mode: 0xDEAD_BEEF,
                mavtype: 10,
                autopilot: 3,
                base_mode: 81,
                system_status: 4,
                mavlink_version: MAVLINK_VERSION,
            }),
            MavMessage::SysStatus(SysStatus {
                onboard_control_sensors_present: 0x3F,
                voltage_battery: 11_800,
                current_battery: -1,
                battery_remaining: 87,
                ..Default::default()
            }),
            MavMessage::Ping(Ping {
                time_usec: u64::MAX - 5,
                seq: 77,
                target_system: 1,
                target_component: 1,
            }),
            MavMessage::ChangeOperatorControl(ChangeOperatorControl {
                target_system: 3,
                control_request: 0,
                version: 25,
                passkey: fixed_str("hunter2"),
            }),
            MavMessage::ParamRequestRead(ParamRequestRead {
                param_index: -1,
                target_system: 1,
                target_component: 1,
                param_id: fixed_str("SURFACE_DEPTH"),
            }),
            MavMessage::ParamRequestList(ParamRequestList {
                target_system: 1,
                target_component: 0,
            }),
            MavMessage::ParamValue(ParamValue {
                param_value: -3.5,
                param_count: 900,
                param_index: 17,
                param_id: fixed_str("RATE_PIT_P"),
                param_type: 9,
            }),
            MavMessage::Attitude(Attitude {
                time_boot_ms: 123_456,
                roll: 0.12,
                pitch: -0.5,
                yaw: 3.04,
                rollspeed: 0.0,
                pitchspeed: 0.01,
                yawspeed: -0.2,
            }),
            MavMessage::CommandLong(CommandLong {
                param1: 1.0,
                param7: -8.25,
                command: 400,
                target_system: 1,
                target_component: 1,
                confirmation: 0,
                ..Default::default()
            }),
        ];
        for message in messages {
            round_trip(message.clone(), MavVersion::V1);
            round_trip(message, MavVersion::V2);
        }
    }

    #[test]
    fn command_ack_extensions_are_v2_only() {
        let ack = CommandAck {
            command: 400,
            result: 0,
            progress: 55,
            result_param2: -7,
            target_system: 1,
            target_component: 90,
        };
        let message = MavMessage::CommandAck(ack.clone());

        let v2 = DIALECT.encode(&message, MavVersion::V2).expect("encode");
        assert_eq!(v2.payload.len(), 10);
        assert_eq!(
            DIALECT.decode(77, MavVersion::V2, &v2.payload).expect("decode"),
            message
        );

        // v1 drops the extensions entirely; they decode back as defaults.
        let v1 = DIALECT.encode(&message, MavVersion::V1).expect("encode");
        assert_eq!(v1.payload.len(), 3);
        assert_eq!(
            DIALECT.decode(77, MavVersion::V1, &v1.payload).expect("decode"),
            MavMessage::CommandAck(CommandAck {
                command: 400,
                result: 0,
                ..Default::default()
            })
        );
    }

    #[test]
    fn heartbeat_version_byte_is_forced_on_encode() {
        let message = MavMessage::Heartbeat(Heartbeat {
            mavlink_version: 0, // caller value is ignored
            ..Default::default()
        });
        let encoded = DIALECT.encode(&message, MavVersion::V2).expect("encode");
        assert_eq!(encoded.payload[8], MAVLINK_VERSION);
    }

    #[test]
    fn short_payload_fails_to_unpack() {
        assert_eq!(
            DIALECT.decode(0, MavVersion::V2, &[1, 2, 3]),
            Err(DialectError::FailedToUnpack(0))
        );
        assert_eq!(
            DIALECT.decode(9999, MavVersion::V2, &[0; 32]),
            Err(DialectError::UnknownMessage(9999))
        );
    }

    #[test]
    fn targeting_kinds_in_table() {
        assert_eq!(DIALECT.spec(0).unwrap().targeting, TargetingKind::Broadcast);
        assert_eq!(DIALECT.spec(5).unwrap().targeting, TargetingKind::System);
        assert_eq!(
            DIALECT.spec(76).unwrap().targeting,
            TargetingKind::SystemComponent
        );
    }
}
