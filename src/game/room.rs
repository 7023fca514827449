use super::constants::{
    DEATH_LINGER_MS, GAME_RADIUS, LEADERBOARD_INTERVAL_MS, LEADERBOARD_TOP_COUNT,
    MAX_INBOUND_PAYLOAD, MINIMAP_DIM_LEGACY, MINIMAP_DIM_MODERN, MINIMAP_INTERVAL_MS,
    MINIMAP_PART_STRIDE, SECTOR_SIZE, TICK_INTERVAL_MS,
};
use super::math::{normalize_angle, F_PI};
use super::types::{changed, Body, Food, SnakeId};
use super::world::World;
use crate::config::ServerConfig;
use crate::packets::{self, Packet};
use crate::protocol::{self, ClientPacket, Identify};
use crate::shared::names;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

mod session;

pub use session::{Session, SessionEvent, SessionIo};

/// The session and broadcast pipeline around one world. All game state is
/// behind a single lock contended by the tick timer and inbound handlers.
pub struct Room {
    state: Mutex<RoomState>,
    running: AtomicBool,
}

#[derive(Debug, Clone, Copy)]
pub struct RoomStats {
    pub sessions: usize,
    pub snakes: usize,
    pub bots: usize,
    pub frames: u64,
}

struct RoomState {
    world: World,
    sessions: HashMap<String, Session>,
    connections: HashMap<SnakeId, String>,
    init_packet: Packet,
    debug: bool,
    last_tick_time: i64,
    last_leaderboard_time: i64,
    last_minimap_time: i64,
}

impl Room {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            state: Mutex::new(RoomState::new(
                World::new(config.tuning.clone()),
                config.debug,
            )),
            running: AtomicBool::new(false),
        }
    }

    /// Spawns the 10 ms simulation timer. Safe to call once at startup;
    /// subsequent calls are no-ops.
    pub fn start(self: &Arc<Self>) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let room = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_millis(TICK_INTERVAL_MS));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let mut state = room.state.lock().await;
                let now = RoomState::now_millis();
                state.tick(now);
            }
        });
    }

    pub async fn add_session(&self) -> SessionIo {
        let session_id = Uuid::new_v4().to_string();
        let (outbound, events) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        let now = RoomState::now_millis();
        state
            .sessions
            .insert(session_id.clone(), Session::new(outbound, now));
        tracing::debug!(session_id = %session_id, "session opened");
        SessionIo { session_id, events }
    }

    pub async fn remove_session(&self, session_id: &str) {
        let mut state = self.state.lock().await;
        state.disconnect_session(session_id);
    }

    /// Handles one inbound frame. Returns false when the connection should be
    /// dropped; malformed frames are logged and discarded with the session
    /// kept alive.
    pub async fn handle_binary_message(&self, session_id: &str, data: &[u8]) -> bool {
        if data.len() > MAX_INBOUND_PAYLOAD {
            tracing::warn!(len = data.len(), "inbound packet too big, discarded");
            return true;
        }
        let Some(packet) = protocol::decode_client_packet(data) else {
            tracing::debug!(len = data.len(), "malformed packet discarded");
            return true;
        };
        let mut state = self.state.lock().await;
        state.handle_packet(session_id, packet);
        true
    }

    pub async fn stats(&self) -> RoomStats {
        let state = self.state.lock().await;
        RoomStats {
            sessions: state.sessions.len(),
            snakes: state.world.snakes().len(),
            bots: state.world.bot_count(),
            frames: state.world.frames(),
        }
    }
}

impl RoomState {
    fn new(world: World, debug: bool) -> Self {
        let now = Self::now_millis();
        Self {
            world,
            sessions: HashMap::new(),
            connections: HashMap::new(),
            init_packet: packets::init(),
            debug,
            last_tick_time: now,
            last_leaderboard_time: now,
            last_minimap_time: now,
        }
    }

    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }

    fn session_snake(&self, session_id: &str) -> Option<SnakeId> {
        self.sessions
            .get(session_id)
            .map(|session| session.snake_id)
            .filter(|snake_id| *snake_id != 0)
    }

    fn disconnect_session(&mut self, session_id: &str) {
        let Some(session) = self.sessions.remove(session_id) else {
            return;
        };
        tracing::debug!(session_id = %session_id, snake_id = session.snake_id, "session closed");
        if session.snake_id != 0 {
            self.connections.remove(&session.snake_id);
            self.world.remove_snake(session.snake_id);
            let packet = packets::remove_snake(session.snake_id, packets::STATUS_SNAKE_LEFT);
            let now = Self::now_millis();
            self.broadcast(now, &packet);
        }
    }

    fn handle_packet(&mut self, session_id: &str, packet: ClientPacket) {
        let now = Self::now_millis();
        match packet {
            ClientPacket::StartLogin => {
                let packet = packets::pre_init();
                self.send_to_session(now, session_id, &packet);
            }
            ClientPacket::ChallengeResponse => {
                tracing::debug!(session_id = %session_id, "challenge response accepted");
            }
            ClientPacket::Ping => {
                let packet = packets::pong();
                self.send_to_session(now, session_id, &packet);
            }
            ClientPacket::Identify(identify) => {
                self.handle_identify(session_id, identify, now);
            }
            ClientPacket::WantedAngle(angle) => {
                let Some(snake_id) = self.session_snake(session_id) else {
                    return;
                };
                if let Some(snake) = self.world.snake_mut(snake_id) {
                    snake.wangle = normalize_angle(angle);
                    snake.update |= changed::WANGLE;
                }
            }
            ClientPacket::StartAcceleration => {
                self.set_acceleration(session_id, true);
            }
            ClientPacket::StopAcceleration => {
                self.set_acceleration(session_id, false);
            }
            ClientPacket::Rotation {
                counter_clockwise,
                vfr,
            } => {
                tracing::debug!(counter_clockwise, vfr, "legacy rotation input ignored");
            }
            ClientPacket::VictoryMessage => {}
        }
    }

    fn set_acceleration(&mut self, session_id: &str, acceleration: bool) {
        let Some(snake_id) = self.session_snake(session_id) else {
            return;
        };
        if let Some(snake) = self.world.snake_mut(snake_id) {
            snake.acceleration = acceleration;
        }
    }

    /// Identify spawns a snake on the first 's' packet; a repeat on a live
    /// session only refreshes the cosmetic fields.
    fn handle_identify(&mut self, session_id: &str, identify: Identify, now: i64) {
        let name = names::sanitize_player_name(&identify.name, "");
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        session.protocol_version = identify.protocol_version;
        session.skin = identify.skin;
        session.name = name.clone();
        session.custom_skin_data = identify.custom_skin_data.clone();
        let already_spawned = session.snake_id;

        tracing::info!(
            name = %name,
            skin = identify.skin,
            protocol_version = identify.protocol_version,
            modern = identify.is_modern(),
            "client identified"
        );

        if already_spawned != 0 {
            if let Some(snake) = self.world.snake_mut(already_spawned) {
                snake.name = name;
                snake.skin = identify.skin;
                snake.custom_skin_data = identify.custom_skin_data;
            }
            return;
        }

        // The session is the canonical store for identity; the snake copies
        // from it on spawn.
        let mut snake = self.world.create_human_snake(0);
        if let Some(session) = self.sessions.get(session_id) {
            snake.name = session.name.clone();
            snake.skin = session.skin;
            snake.custom_skin_data = session.custom_skin_data.clone();
        }
        let snake_id = snake.id;
        self.world.add_snake(snake);
        self.connections.insert(snake_id, session_id.to_string());
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.snake_id = snake_id;
        }

        let init = self.init_packet.clone();
        self.send_to_session(now, session_id, &init);

        if let Some(snake) = self.world.snake(snake_id) {
            let add = packets::add_snake(snake);
            let mov = packets::move_abs(snake_id, snake.head_x(), snake.head_y());
            self.broadcast(now, &add);
            self.broadcast(now, &mov);
        }

        // The newcomer gets a full picture of every other snake.
        let existing: Vec<(Packet, Packet)> = self
            .world
            .snakes()
            .values()
            .filter(|snake| snake.id != snake_id)
            .map(|snake| {
                (
                    packets::add_snake(snake),
                    packets::move_abs(snake.id, snake.head_x(), snake.head_y()),
                )
            })
            .collect();
        for (add, mov) in existing {
            self.send_to_session(now, session_id, &add);
            self.send_to_session(now, session_id, &mov);
        }

        self.send_pov_update(now, session_id, snake_id);
    }

    /// One pass of the fixed 10 ms timer.
    fn tick(&mut self, now: i64) {
        let dt = now - self.last_tick_time;
        self.last_tick_time = now;

        self.world.tick(dt);
        self.broadcast_updates(now);
        self.broadcast_fresh_food(now);
        self.remove_dead_snakes();
        self.ensure_bots(now);
        self.process_delayed_deaths(now);

        if now - self.last_leaderboard_time > LEADERBOARD_INTERVAL_MS {
            self.broadcast_leaderboard(now);
            self.last_leaderboard_time = now;
        }
        if now - self.last_minimap_time > MINIMAP_INTERVAL_MS {
            self.broadcast_minimap(now);
            self.last_minimap_time = now;
        }

        let step_time = Self::now_millis() - now;
        if step_time > TICK_INTERVAL_MS as i64 {
            tracing::warn!(step_time, "load is too high, tick overran its interval");
        }
    }

    /// Emits per-snake deltas in the strict order: rotation, position and
    /// growth, food, per-player viewport updates. Death transitions emit their
    /// food burst before the remove packet.
    fn broadcast_updates(&mut self, now: i64) {
        let changed_ids: Vec<SnakeId> = self.world.changes().to_vec();
        for id in changed_ids {
            let flags = match self.world.snake(id) {
                Some(snake) if snake.update & changed::DEAD == 0 => snake.update,
                _ => continue,
            };

            if flags & changed::DYING != 0 {
                self.handle_dying(now, id);
                continue;
            }
            if flags == 0 {
                continue;
            }

            if flags & (changed::ANGLE | changed::SPEED) != 0 {
                let (packet, clear) = {
                    let Some(snake) = self.world.snake(id) else {
                        continue;
                    };
                    let mut angle = None;
                    let mut wangle = None;
                    let mut speed = None;
                    let mut clear = 0u8;
                    if flags & changed::ANGLE != 0 {
                        angle = Some(snake.angle);
                        clear |= changed::ANGLE;
                        if flags & changed::WANGLE != 0 {
                            wangle = Some(snake.wangle);
                            clear |= changed::WANGLE;
                        }
                    }
                    if flags & changed::SPEED != 0 {
                        speed = Some(snake.speed);
                        clear |= changed::SPEED;
                    }
                    let delta = normalize_angle(snake.wangle - snake.angle);
                    (
                        packets::rotation(id, angle, wangle, speed, delta <= F_PI),
                        clear,
                    )
                };
                self.broadcast(now, &packet);
                if let Some(snake) = self.world.snake_mut(id) {
                    snake.update ^= clear;
                }
            }

            if flags & changed::POS != 0 {
                let mut queue: Vec<Packet> = Vec::new();
                {
                    let Some(snake) = self.world.snake_mut(id) else {
                        continue;
                    };
                    snake.update ^= changed::POS;

                    let head = snake.head();
                    let dx = (head.x - snake.client_head.x).round() as i32;
                    let dy = (head.y - snake.client_head.y).round() as i32;
                    let fits = (-128..=127).contains(&dx) && (-128..=127).contains(&dy);

                    if snake.client_parts_index < snake.parts.len() {
                        queue.push(if fits {
                            packets::grow_rel(id, dx, dy)
                        } else {
                            packets::grow_abs(id, head.x, head.y)
                        });
                        snake.client_parts_index += 1;
                    } else {
                        if snake.client_parts_index > snake.parts.len() {
                            queue.push(packets::remove_part(id));
                            snake.client_parts_index -= 1;
                        }
                        queue.push(if fits {
                            packets::move_rel(id, dx, dy)
                        } else {
                            packets::move_abs(id, head.x, head.y)
                        });
                    }

                    // Track what clients reconstructed, not the float truth,
                    // so relative deltas cannot drift.
                    if fits {
                        snake.client_head.x += dx as f32;
                        snake.client_head.y += dy as f32;
                    } else {
                        snake.client_head = Body {
                            x: head.x.max(0.0) as u16 as f32,
                            y: head.y.max(0.0) as u16 as f32,
                        };
                    }
                }
                for packet in &queue {
                    self.broadcast(now, packet);
                }

                self.send_food_update(now, id);

                if let Some(session_id) = self.connections.get(&id).cloned() {
                    let active = self
                        .sessions
                        .get(&session_id)
                        .map(|session| session.death_timestamp == 0)
                        .unwrap_or(false);
                    if active {
                        self.send_pov_update(now, &session_id, id);
                        if flags & changed::FULLNESS != 0 {
                            let packet = self
                                .world
                                .snake(id)
                                .map(|snake| packets::fullness(id, snake.fullness));
                            if let Some(packet) = packet {
                                self.send_to_session(now, &session_id, &packet);
                                if let Some(snake) = self.world.snake_mut(id) {
                                    snake.update ^= changed::FULLNESS;
                                }
                            }
                        }
                    }
                }
            }
        }
        self.world.flush_changes();
    }

    /// The death sequence: kill credit, food burst, burst transmission, the
    /// remove broadcast, the victim's game-over, then the dead flag.
    fn handle_dying(&mut self, now: i64, id: SnakeId) {
        tracing::info!(snake_id = id, "snake died");

        let killer = self.world.snake(id).and_then(|snake| snake.killed_by);
        if let Some(killer_id) = killer {
            let kills = self
                .world
                .snake(killer_id)
                .map(|snake| snake.kills)
                .unwrap_or(0);
            if let Some(killer_session) = self.connections.get(&killer_id).cloned() {
                let packet = packets::kill(killer_id, kills);
                self.send_to_session(now, &killer_session, &packet);
            }
        }

        self.world.burst_dead_food(id);
        self.send_food_update(now, id);

        let remove = packets::remove_snake(id, packets::STATUS_SNAKE_DIED);
        self.broadcast(now, &remove);

        if let Some(session_id) = self.connections.get(&id).cloned() {
            let end = packets::end(packets::END_STATUS_DEATH);
            self.send_to_session(now, &session_id, &end);
            if let Some(session) = self.sessions.get_mut(&session_id) {
                session.death_timestamp = now;
            }
        }

        if let Some(snake) = self.world.snake_mut(id) {
            snake.update |= changed::DEAD;
        }
        self.world.push_dead(id);
    }

    /// Drains the snake's eaten and spawned food buffers to every session
    /// whose viewport covers the pellet's sector.
    fn send_food_update(&mut self, now: i64, snake_id: SnakeId) {
        let (eaten, spawned) = match self.world.snake_mut(snake_id) {
            Some(snake) => (
                std::mem::take(&mut snake.eaten),
                std::mem::take(&mut snake.spawn),
            ),
            None => return,
        };

        for food in eaten {
            let legacy = packets::eat_food(snake_id, &food, false);
            let modern = packets::eat_food(snake_id, &food, true);
            self.broadcast_food_event(now, &food, &legacy, &modern);
        }
        for food in spawned {
            let legacy = packets::spawn_food(&food, false);
            let modern = packets::spawn_food(&food, true);
            self.broadcast_food_event(now, &food, &legacy, &modern);
        }
    }

    fn broadcast_fresh_food(&mut self, now: i64) {
        for food in self.world.drain_fresh_food() {
            let legacy = packets::add_food(&food, false);
            let modern = packets::add_food(&food, true);
            self.broadcast_food_event(now, &food, &legacy, &modern);
        }
    }

    fn broadcast_food_event(&mut self, now: i64, food: &Food, legacy: &Packet, modern: &Packet) {
        let sx = (food.x / SECTOR_SIZE) as u8;
        let sy = (food.y / SECTOR_SIZE) as u8;

        let mut dropped: Vec<String> = Vec::new();
        for (session_id, session) in self.sessions.iter_mut() {
            if session.snake_id == 0 || session.death_timestamp > 0 {
                continue;
            }
            let visible = self
                .world
                .snake(session.snake_id)
                .map(|snake| snake.vp.contains_sector(sx, sy))
                .unwrap_or(false);
            if !visible {
                continue;
            }
            let packet = if session.is_modern_protocol() {
                modern
            } else {
                legacy
            };
            if !session.send(now, packet) {
                dropped.push(session_id.clone());
            }
        }
        for session_id in dropped {
            self.disconnect_session(&session_id);
        }
    }

    /// Viewport maintenance: for each sector entering the player's view an
    /// add-sector plus the sector's food listing, for each receding sector a
    /// remove-sector. Clears the viewport deltas.
    fn send_pov_update(&mut self, now: i64, session_id: &str, snake_id: SnakeId) {
        let (new_sectors, old_sectors) = match self.world.snake_mut(snake_id) {
            Some(snake) => (
                std::mem::take(&mut snake.vp.new_sectors),
                std::mem::take(&mut snake.vp.old_sectors),
            ),
            None => return,
        };
        if new_sectors.is_empty() && old_sectors.is_empty() {
            return;
        }

        let modern = self
            .sessions
            .get(session_id)
            .map(|session| session.is_modern_protocol())
            .unwrap_or(false);

        let mut queue: Vec<Packet> = Vec::new();
        for (x, y) in new_sectors {
            queue.push(packets::add_sector(x, y));
            if let Some(sector) = self.world.sectors().get(x as i16, y as i16) {
                queue.push(packets::set_food(&sector.food, modern));
            }
        }
        for (x, y) in old_sectors {
            queue.push(packets::remove_sector(x, y));
        }
        for packet in &queue {
            self.send_to_session(now, session_id, packet);
        }
    }

    fn remove_dead_snakes(&mut self) {
        for id in self.world.drain_dead() {
            self.connections.remove(&id);
            self.world.remove_snake(id);
        }
    }

    /// Keeps the configured bot population when respawning is enabled.
    fn ensure_bots(&mut self, now: i64) {
        if !self.world.tuning().bot_respawn {
            return;
        }
        let desired = self.world.tuning().bots as usize;
        while self.world.bot_count() < desired {
            let bot = self.world.create_bot_snake();
            let id = bot.id;
            let head = bot.head();
            let add = packets::add_snake(&bot);
            self.world.add_snake(bot);
            self.broadcast(now, &add);
            self.broadcast(now, &packets::move_abs(id, head.x, head.y));
            tracing::debug!(snake_id = id, "bot respawned");
        }
    }

    /// Sessions whose death lingered past the grace period leave the world:
    /// the snake id is zeroed first so no further broadcast can reach them,
    /// then the transport closes normally.
    fn process_delayed_deaths(&mut self, now: i64) {
        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, session)| {
                session.death_timestamp > 0 && now - session.death_timestamp > DEATH_LINGER_MS
            })
            .map(|(session_id, _)| session_id.clone())
            .collect();

        for session_id in expired {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                let stale_snake = session.snake_id;
                session.snake_id = 0;
                session.death_timestamp = 0;
                session.close();
                self.connections.remove(&stale_snake);
                tracing::debug!(session_id = %session_id, "post-death session closed");
            }
        }
    }

    fn broadcast_leaderboard(&mut self, now: i64) {
        let (players, top, ranks) = {
            let ranked = self.world.ranked_snakes();
            let players = ranked.len().min(u16::MAX as usize) as u16;
            let top: Vec<packets::LeaderboardEntry> = ranked
                .iter()
                .take(LEADERBOARD_TOP_COUNT)
                .map(|snake| packets::LeaderboardEntry {
                    length: snake.parts.len() as u16,
                    fullness: snake.fullness,
                    skin: snake.skin,
                    name: snake.name.clone(),
                })
                .collect();
            let ranks: HashMap<SnakeId, u16> = ranked
                .iter()
                .enumerate()
                .map(|(index, snake)| (snake.id, (index + 1) as u16))
                .collect();
            (players, top, ranks)
        };

        let mut dropped: Vec<String> = Vec::new();
        for (session_id, session) in self.sessions.iter_mut() {
            if session.snake_id == 0 || session.death_timestamp > 0 {
                continue;
            }
            let local_rank = ranks.get(&session.snake_id).copied().unwrap_or(0);
            let own_rank_in_top = if (1..=LEADERBOARD_TOP_COUNT as u16).contains(&local_rank) {
                local_rank as u8
            } else {
                0
            };
            let packet = packets::leaderboard(own_rank_in_top, local_rank, players, &top);
            if !session.send(now, &packet) {
                dropped.push(session_id.clone());
            }
        }
        for session_id in dropped {
            self.disconnect_session(&session_id);
        }
    }

    fn build_minimap_grid(&self, dim: u16) -> Vec<u8> {
        let dim = dim as usize;
        let mut grid = vec![0u8; dim * dim];
        let scale = dim as f32 / (GAME_RADIUS as f32 * 2.0);

        for snake in self.world.snakes().values() {
            for part in snake.parts.iter().step_by(MINIMAP_PART_STRIDE) {
                let mx = (part.x * scale) as i32;
                let my = (part.y * scale) as i32;
                if mx >= 0 && (mx as usize) < dim && my >= 0 && (my as usize) < dim {
                    grid[my as usize * dim + mx as usize] = 1;
                }
            }
        }
        grid
    }

    fn broadcast_minimap(&mut self, now: i64) {
        let wants = |session: &Session, modern: bool| {
            session.snake_id != 0
                && session.death_timestamp == 0
                && session.is_modern_protocol() == modern
        };
        let modern_packet = self
            .sessions
            .values()
            .any(|session| wants(session, true))
            .then(|| {
                packets::minimap(
                    &self.build_minimap_grid(MINIMAP_DIM_MODERN),
                    MINIMAP_DIM_MODERN,
                    true,
                )
            });
        let legacy_packet = self
            .sessions
            .values()
            .any(|session| wants(session, false))
            .then(|| {
                packets::minimap(
                    &self.build_minimap_grid(MINIMAP_DIM_LEGACY),
                    MINIMAP_DIM_LEGACY,
                    false,
                )
            });

        let mut dropped: Vec<String> = Vec::new();
        for (session_id, session) in self.sessions.iter_mut() {
            if session.snake_id == 0 || session.death_timestamp > 0 {
                continue;
            }
            let packet = if session.is_modern_protocol() {
                modern_packet.as_ref()
            } else {
                legacy_packet.as_ref()
            };
            if let Some(packet) = packet {
                if !session.send(now, packet) {
                    dropped.push(session_id.clone());
                }
            }
        }
        for session_id in dropped {
            self.disconnect_session(&session_id);
        }
    }

    /// Sends to every spawned, living session; peers that went away are
    /// scheduled out.
    fn broadcast(&mut self, now: i64, packet: &Packet) {
        if self.debug {
            tracing::debug!(kind = packet.kind, len = packet.body.len(), "broadcast");
        }
        let mut dropped: Vec<String> = Vec::new();
        for (session_id, session) in self.sessions.iter_mut() {
            if session.snake_id == 0 || session.death_timestamp > 0 {
                continue;
            }
            if !session.send(now, packet) {
                dropped.push(session_id.clone());
            }
        }
        for session_id in dropped {
            self.disconnect_session(&session_id);
        }
    }

    fn send_to_session(&mut self, now: i64, session_id: &str, packet: &Packet) {
        let failed = match self.sessions.get_mut(session_id) {
            Some(session) => !session.send(now, packet),
            None => false,
        };
        if failed {
            self.disconnect_session(session_id);
        }
    }
}
