// Server configuration, loaded from environment variables.

use std::env;

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "on"))
        .unwrap_or(default)
}

/// World tuning surface.
///
/// Environment variables:
/// - `SLITHER_BOTS` - bots to spawn on startup (default: 0)
/// - `SLITHER_BOT_RESPAWN` - replace dead bots (default: true)
/// - `SLITHER_H_START_SCORE` - human start score (default: 10)
/// - `SLITHER_B_START_SCORE` - bot start score (default: 20)
/// - `SLITHER_MIN_LENGTH` - initial snake length (default: 2)
/// - `SLITHER_FOOD_RATE` - food items to spawn per tick (default: 2)
/// - `SLITHER_PROB_NEAR` - weight: sector neighboring a snake (default: 25)
/// - `SLITHER_PROB_ON` - weight: sector containing a snake (default: 25)
/// - `SLITHER_PROB_RANDOM` - weight: completely random sector (default: 50)
/// - `SLITHER_BOOST_COST` - fullness drained per boosted step (default: 5)
/// - `SLITHER_BOOST_DROP_SIZE` - size of dropped boost pellets (default: 2)
#[derive(Debug, Clone)]
pub struct WorldTuning {
    pub bots: u16,
    pub bot_respawn: bool,
    pub h_snake_start_score: u16,
    pub b_snake_start_score: u16,
    pub snake_min_length: u16,
    pub food_spawn_rate: u16,
    pub spawn_prob_near_snake: u32,
    pub spawn_prob_on_snake: u32,
    pub spawn_prob_random: u32,
    pub boost_cost: u16,
    pub boost_drop_size: u8,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            bots: 0,
            bot_respawn: true,
            h_snake_start_score: 10,
            b_snake_start_score: 20,
            snake_min_length: 2,
            food_spawn_rate: 2,
            spawn_prob_near_snake: 25,
            spawn_prob_on_snake: 25,
            spawn_prob_random: 50,
            boost_cost: 5,
            boost_drop_size: 2,
        }
    }
}

impl WorldTuning {
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            bots: env_parse("SLITHER_BOTS").unwrap_or(defaults.bots),
            bot_respawn: env_flag("SLITHER_BOT_RESPAWN", defaults.bot_respawn),
            h_snake_start_score: env_parse("SLITHER_H_START_SCORE")
                .unwrap_or(defaults.h_snake_start_score),
            b_snake_start_score: env_parse("SLITHER_B_START_SCORE")
                .unwrap_or(defaults.b_snake_start_score),
            snake_min_length: env_parse("SLITHER_MIN_LENGTH")
                .unwrap_or(defaults.snake_min_length)
                .max(2),
            food_spawn_rate: env_parse("SLITHER_FOOD_RATE").unwrap_or(defaults.food_spawn_rate),
            spawn_prob_near_snake: env_parse("SLITHER_PROB_NEAR")
                .unwrap_or(defaults.spawn_prob_near_snake),
            spawn_prob_on_snake: env_parse("SLITHER_PROB_ON")
                .unwrap_or(defaults.spawn_prob_on_snake),
            spawn_prob_random: env_parse("SLITHER_PROB_RANDOM")
                .unwrap_or(defaults.spawn_prob_random),
            boost_cost: env_parse("SLITHER_BOOST_COST").unwrap_or(defaults.boost_cost),
            boost_drop_size: env_parse("SLITHER_BOOST_DROP_SIZE")
                .unwrap_or(defaults.boost_drop_size),
        }
    }
}

/// Process-level configuration.
///
/// - `PORT` - bind port (default: 8080)
/// - `SLITHER_DEBUG` - verbose per-packet logging (default: false)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub debug: bool,
    pub tuning: WorldTuning,
}

impl ServerConfig {
    pub fn load() -> Self {
        Self {
            port: env_parse("PORT").unwrap_or(8080),
            debug: env_flag("SLITHER_DEBUG", false),
            tuning: WorldTuning::load(),
        }
    }
}
