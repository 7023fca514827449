//! Wire primitives and inbound packet decoding.
//!
//! Every outbound frame starts with a two-byte big-endian client-time delta
//! (milliseconds since the previous packet on that session) followed by the
//! packet type byte. Inbound frames carry the type byte first.

use crate::game::constants::{CHALLENGE_RESPONSE_LEN, MODERN_PROTOCOL_MIN_VERSION};
use crate::game::math::F_PI;

// Inbound packet type bytes.
pub const IN_START_LOGIN: u8 = b'c';
pub const IN_USERNAME_SKIN: u8 = b's';
pub const IN_PING: u8 = 251;
pub const IN_ROTATION: u8 = 252;
pub const IN_ROT_LEFT: u8 = 108;
pub const IN_ROT_RIGHT: u8 = 114;
pub const IN_START_ACC: u8 = 253;
pub const IN_STOP_ACC: u8 = 254;
pub const IN_VICTORY_MESSAGE: u8 = 255;

const MAX_NAME_BYTES: usize = 24;
const FP24_SCALE: f32 = ((1u32 << 24) - 1) as f32;

pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn write_u24(&mut self, value: u32) {
        let clamped = value.min(0x00ff_ffff);
        self.buffer.push((clamped >> 16) as u8);
        self.buffer.push((clamped >> 8) as u8);
        self.buffer.push(clamped as u8);
    }

    /// `round(v * 255)` in one byte.
    pub fn write_fp8(&mut self, value: f32) {
        self.write_u8((value * 255.0).round().clamp(0.0, 255.0) as u8);
    }

    /// `round(v * 10^K)` big-endian in two bytes.
    pub fn write_fp16<const K: u32>(&mut self, value: f32) {
        let scale = 10u32.pow(K) as f32;
        self.write_u16((value * scale).round().clamp(0.0, 65535.0) as u16);
    }

    /// `round(v * (2^24 - 1))` in three bytes.
    pub fn write_fp24(&mut self, value: f32) {
        self.write_u24((value * FP24_SCALE).round().clamp(0.0, FP24_SCALE) as u32);
    }

    /// `round(angle / 2pi * (2^24 - 1))` in three bytes.
    pub fn write_ang24(&mut self, angle: f32) {
        let turns = angle / (2.0 * F_PI);
        self.write_u24((turns * FP24_SCALE).round().clamp(0.0, FP24_SCALE) as u32);
    }

    /// One length byte, then up to 255 raw bytes.
    pub fn write_string(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let mut end = bytes.len().min(u8::MAX as usize);
        while !value.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        self.write_u8(end as u8);
        self.buffer.extend_from_slice(&bytes[..end]);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.offset)?;
        self.offset += 1;
        Some(value)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_array::<2>()?;
        Some(u16::from_be_bytes(bytes))
    }

    pub fn read_u24(&mut self) -> Option<u32> {
        let bytes = self.read_array::<3>()?;
        Some(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }

    pub fn read_fp16<const K: u32>(&mut self) -> Option<f32> {
        let raw = self.read_u16()?;
        Some(raw as f32 / 10u32.pow(K) as f32)
    }

    pub fn read_fp24(&mut self) -> Option<f32> {
        Some(self.read_u24()? as f32 / FP24_SCALE)
    }

    pub fn read_ang24(&mut self) -> Option<f32> {
        Some(self.read_u24()? as f32 / FP24_SCALE * 2.0 * F_PI)
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.offset + len > self.data.len() {
            return None;
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Some(slice)
    }

    pub fn read_to_end(&mut self) -> &'a [u8] {
        let slice = &self.data[self.offset..];
        self.offset = self.data.len();
        slice
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.offset + N > self.data.len() {
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.offset..self.offset + N]);
        self.offset += N;
        Some(out)
    }
}

/// Prepends the client-time delta and type byte to a packet body.
pub fn frame(client_time: u16, packet_type: u8, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + body.len());
    out.extend_from_slice(&client_time.to_be_bytes());
    out.push(packet_type);
    out.extend_from_slice(body);
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identify {
    pub protocol_version: u8,
    pub skin: u8,
    pub name: String,
    pub custom_skin_data: Vec<u8>,
}

impl Identify {
    pub fn is_modern(&self) -> bool {
        self.protocol_version >= MODERN_PROTOCOL_MIN_VERSION
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    StartLogin,
    /// Opaque 24-byte answer to the pre-init challenge; accepted unvalidated.
    ChallengeResponse,
    Identify(Identify),
    /// Steering bytes 0-250: wanted angle `pi * v / 125`.
    WantedAngle(f32),
    Ping,
    StartAcceleration,
    StopAcceleration,
    /// Legacy virtual-frame rotation inputs; accepted and logged only.
    Rotation { counter_clockwise: bool, vfr: u8 },
    VictoryMessage,
}

/// Decodes one inbound frame. `None` means a malformed or unknown packet;
/// the session survives and the frame is discarded.
pub fn decode_client_packet(data: &[u8]) -> Option<ClientPacket> {
    if data.is_empty() {
        return None;
    }

    // The raw challenge answer carries no type byte, only its length tells.
    if data.len() == CHALLENGE_RESPONSE_LEN {
        return Some(ClientPacket::ChallengeResponse);
    }

    let mut reader = Reader::new(data);
    let packet_type = reader.read_u8()?;

    if packet_type <= 250
        && data.len() == 1
        && packet_type != IN_START_LOGIN
        && packet_type != IN_USERNAME_SKIN
    {
        return Some(ClientPacket::WantedAngle(F_PI * packet_type as f32 / 125.0));
    }

    match packet_type {
        IN_START_LOGIN => Some(ClientPacket::StartLogin),
        IN_PING => Some(ClientPacket::Ping),
        IN_START_ACC => Some(ClientPacket::StartAcceleration),
        IN_STOP_ACC => Some(ClientPacket::StopAcceleration),
        IN_USERNAME_SKIN => decode_identify(&mut reader),
        IN_ROTATION => {
            let value = reader.read_u8()?;
            Some(ClientPacket::Rotation {
                counter_clockwise: value < 128,
                vfr: value & 127,
            })
        }
        IN_ROT_LEFT => Some(ClientPacket::Rotation {
            counter_clockwise: true,
            vfr: reader.read_u8()?,
        }),
        IN_ROT_RIGHT => Some(ClientPacket::Rotation {
            counter_clockwise: false,
            vfr: reader.read_u8()?,
        }),
        IN_VICTORY_MESSAGE => Some(ClientPacket::VictoryMessage),
        _ => None,
    }
}

/// Identify layout: protocol version, then for modern clients two skipped
/// bytes, skin, length-prefixed name (capped at 24 bytes), for modern clients
/// two padding bytes, and the remainder as raw custom-skin data.
fn decode_identify(reader: &mut Reader<'_>) -> Option<ClientPacket> {
    let protocol_version = reader.read_u8()?;
    let modern = protocol_version >= MODERN_PROTOCOL_MIN_VERSION;

    if modern {
        reader.read_bytes(2)?;
    }

    let skin = reader.read_u8()?;
    let name_len = reader.read_u8()? as usize;
    let name_len = name_len.min(reader.remaining()).min(MAX_NAME_BYTES);
    let name_bytes = reader.read_bytes(name_len)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();

    if modern && reader.remaining() >= 2 {
        reader.read_bytes(2)?;
    }

    let custom_skin_data = reader.read_to_end().to_vec();

    Some(ClientPacket::Identify(Identify {
        protocol_version,
        skin,
        name,
        custom_skin_data,
    }))
}
