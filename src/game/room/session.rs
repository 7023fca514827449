use crate::game::constants::MODERN_PROTOCOL_MIN_VERSION;
use crate::game::types::SnakeId;
use crate::packets::Packet;
use tokio::sync::mpsc;

/// Events pushed to a session's transport task.
#[derive(Debug)]
pub enum SessionEvent {
    Frame(Vec<u8>),
    Close,
}

/// Handed to the transport task for one accepted connection.
pub struct SessionIo {
    pub session_id: String,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Per-connection state. `snake_id == 0` means not in the world (menu or
/// handshake phase); every broadcast path skips such sessions.
#[derive(Debug)]
pub struct Session {
    outbound: mpsc::UnboundedSender<SessionEvent>,
    pub snake_id: SnakeId,
    pub protocol_version: u8,
    pub skin: u8,
    pub name: String,
    pub custom_skin_data: Vec<u8>,
    pub last_packet_time: i64,
    /// Non-zero while the player's death lingers before the socket closes.
    pub death_timestamp: i64,
}

impl Session {
    pub fn new(outbound: mpsc::UnboundedSender<SessionEvent>, now: i64) -> Self {
        Self {
            outbound,
            snake_id: 0,
            protocol_version: 0,
            skin: 0,
            name: String::new(),
            custom_skin_data: Vec::new(),
            last_packet_time: now,
            death_timestamp: 0,
        }
    }

    pub fn is_modern_protocol(&self) -> bool {
        self.protocol_version >= MODERN_PROTOCOL_MIN_VERSION
    }

    /// Stamps the inter-packet time delta and queues the frame. Returns false
    /// when the peer is gone and the session should be cleaned up.
    pub fn send(&mut self, now: i64, packet: &Packet) -> bool {
        let interval = (now - self.last_packet_time).clamp(0, u16::MAX as i64) as u16;
        self.last_packet_time = now;
        self.outbound
            .send(SessionEvent::Frame(packet.frame(interval)))
            .is_ok()
    }

    pub fn close(&self) {
        let _ = self.outbound.send(SessionEvent::Close);
    }
}
