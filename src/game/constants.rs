// Arena geometry. The official grid is 480-unit sectors, 90 along each edge,
// covering the [0, 2 * GAME_RADIUS) coordinate square.
pub const GAME_RADIUS: u16 = 21600;
pub const MAX_SNAKE_PARTS: u16 = 411;
pub const SECTOR_SIZE: u16 = 480;
pub const SECTOR_COUNT_ALONG_EDGE: u16 = 90;
pub const DEATH_RADIUS: u16 = GAME_RADIUS - SECTOR_SIZE;
// sqrt(480^2 + 480^2)
pub const SECTOR_DIAG_SIZE: u16 = 680;

pub const MOVE_STEP_DISTANCE: u16 = 42;
pub const FRAME_TIME_MS: i64 = 8;
pub const PROTOCOL_VERSION: u8 = 14;

// Client physics constants mirrored by the init packet.
pub const SPANGDV: f32 = 4.8;
pub const NSP1: f32 = 5.39;
pub const NSP2: f32 = 0.4;
pub const NSP3: f32 = 14.0;

pub const BASE_MOVE_SPEED: u16 = 172;
pub const BOOST_SPEED: u16 = 448;
pub const SPEED_ACCELERATION: u16 = 1000;
pub const SNAKE_ANGULAR_SPEED: f32 = 4.125;
pub const PREY_ANGULAR_SPEED: f32 = 3.625;
pub const SNAKE_TAIL_K: f32 = 0.43;

pub const PARTS_SKIP_COUNT: usize = 3;
pub const PARTS_START_MOVE_COUNT: usize = 4;
pub const TAIL_STEP_DISTANCE: f32 = 24.0;

pub const ROT_STEP_ANGLE: f32 =
    MOVE_STEP_DISTANCE as f32 / BOOST_SPEED as f32 * SNAKE_ANGULAR_SPEED;
pub const ROT_STEP_INTERVAL_MS: i64 = (1000.0 * ROT_STEP_ANGLE / SNAKE_ANGULAR_SPEED) as i64;
pub const AI_STEP_INTERVAL_MS: i64 = 250;

// Session / broadcast cadence.
pub const TICK_INTERVAL_MS: u64 = 10;
pub const LEADERBOARD_INTERVAL_MS: i64 = 2000;
pub const MINIMAP_INTERVAL_MS: i64 = 1000;
pub const DEATH_LINGER_MS: i64 = 2000;
pub const LEADERBOARD_TOP_COUNT: usize = 10;

pub const MINIMAP_DIM_MODERN: u16 = 144;
pub const MINIMAP_DIM_LEGACY: u16 = 80;
pub const MINIMAP_PART_STRIDE: usize = 4;

pub const MODERN_PROTOCOL_MIN_VERSION: u8 = 25;
pub const MAX_INBOUND_PAYLOAD: usize = 255;
pub const CHALLENGE_RESPONSE_LEN: usize = 24;

// Spawn placement.
pub const SPAWN_ATTEMPTS: usize = 20;
pub const SPAWN_SAFETY_BUFFER: f32 = 500.0;
pub const SPAWN_EDGE_BUFFER: f32 = 1500.0;
pub const SPAWN_CENTER_BUFFER: f32 = 1000.0;
pub const SPAWN_HEADING_NOISE: f32 = 0.75;

// Food tuning.
pub const FOOD_EDGE_MARGIN: f32 = 500.0;
pub const FOOD_COLOR_COUNT: u8 = 29;
pub const INITIAL_FOOD_SIZE_MAX: u8 = 10;
pub const REGEN_FOOD_SIZE_MAX: u8 = 5;

// Bot AI tuning.
pub const BOT_WHISKER_BODY_FACTOR: f32 = 4.0;
pub const BOT_WHISKER_SPEED_FACTOR: f32 = 0.4;
pub const BOT_AVOID_BUFFER: f32 = 40.0;
pub const BOT_BOX_SLACK: f32 = 50.0;
pub const BOT_MIN_BOOST_FULLNESS: u16 = 30;
pub const BOT_MIN_BOOST_SCORE: f32 = 0.05;
