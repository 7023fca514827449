use super::constants::{
    BOT_AVOID_BUFFER, BOT_BOX_SLACK, BOT_MIN_BOOST_FULLNESS, BOT_MIN_BOOST_SCORE, DEATH_RADIUS,
    GAME_RADIUS, SECTOR_SIZE, SNAKE_ANGULAR_SPEED, BOT_WHISKER_BODY_FACTOR,
    BOT_WHISKER_SPEED_FACTOR,
};
use super::math::{dist_sq, normalize_angle, F_PI};
use super::sector::SectorGrid;
use super::snake::Snake;
use super::types::{Body, SnakeId};
use std::collections::HashMap;

/// Outcome of one perceive/steer step, applied to the snake by the world.
#[derive(Debug, Clone, Copy)]
pub struct BotDecision {
    pub wangle: f32,
    pub acceleration: bool,
    pub food_target: Body,
}

/// One 250 ms bot decision: score food in the 5x5 neighborhood, gate the
/// boost, then let the whisker override the heading when a collision or the
/// arena boundary is ahead.
pub fn decide(snake: &Snake, snakes: &HashMap<SnakeId, Snake>, grid: &SectorGrid) -> BotDecision {
    let (food_target, best_score) = find_food_target(snake, grid);

    // Only boost when the meal is worth the fullness drain.
    let mut acceleration =
        snake.fullness > BOT_MIN_BOOST_FULLNESS && best_score > BOT_MIN_BOOST_SCORE;

    let mut target_angle = (food_target.y - snake.head_y()).atan2(food_target.x - snake.head_x());

    let look_ahead = snake.lsz * BOT_WHISKER_BODY_FACTOR + snake.speed as f32 * BOT_WHISKER_SPEED_FACTOR;
    if let Some(avoid_angle) = whisker_check(snake, snakes, grid, look_ahead) {
        target_angle = avoid_angle;
        acceleration = false;
    }

    BotDecision {
        wangle: normalize_angle(target_angle),
        acceleration,
        food_target,
    }
}

/// Highest `size^2 / (dist^2 + 1)` pellet in the 5x5 sector neighborhood.
/// Pellets inside the geometric minimum turn radius that would need more than
/// a 45 degree turn are ignored so the bot cannot orbit its own prey.
fn find_food_target(snake: &Snake, grid: &SectorGrid) -> (Body, f32) {
    let hx = snake.head_x();
    let hy = snake.head_y();

    let mut best = Body {
        x: GAME_RADIUS as f32,
        y: GAME_RADIUS as f32,
    };
    let mut max_score = -1.0f32;

    let center_sx = (hx / SECTOR_SIZE as f32) as i16;
    let center_sy = (hy / SECTOR_SIZE as f32) as i16;

    let turn_radius = (snake.speed as f32 * 0.033) / SNAKE_ANGULAR_SPEED;
    let min_safe_dist_sq = turn_radius * turn_radius;

    for sy in center_sy - 2..=center_sy + 2 {
        for sx in center_sx - 2..=center_sx + 2 {
            let Some(sector) = grid.get(sx, sy) else {
                continue;
            };
            for food in &sector.food {
                let fx = food.x as f32;
                let fy = food.y as f32;
                let food_dist_sq = dist_sq(hx, hy, fx, fy);

                if food_dist_sq < min_safe_dist_sq {
                    let angle_to_food = (fy - hy).atan2(fx - hx);
                    let mut angle_diff = normalize_angle(angle_to_food - snake.angle);
                    if angle_diff > F_PI {
                        angle_diff = 2.0 * F_PI - angle_diff;
                    }
                    if angle_diff > F_PI / 4.0 {
                        continue;
                    }
                }

                let score = (food.size as f32 * food.size as f32) / (food_dist_sq + 1.0);
                if score > max_score {
                    max_score = score;
                    best = Body { x: fx, y: fy };
                }
            }
        }
    }

    (best, max_score)
}

/// Projects a whisker point ahead of the head. Steers toward the arena center
/// when the point leaves the playable disk, or away from the nearest body when
/// another snake is within reach. Returns the avoidance heading on a hit.
fn whisker_check(
    snake: &Snake,
    snakes: &HashMap<SnakeId, Snake>,
    grid: &SectorGrid,
    look_ahead: f32,
) -> Option<f32> {
    let hx = snake.head_x();
    let hy = snake.head_y();
    let whisker_x = hx + snake.angle.cos() * look_ahead;
    let whisker_y = hy + snake.angle.sin() * look_ahead;

    let center = GAME_RADIUS as f32;
    if dist_sq(whisker_x, whisker_y, center, center)
        >= DEATH_RADIUS as f32 * DEATH_RADIUS as f32
    {
        return Some((center - hy).atan2(center - hx));
    }

    let sx = (whisker_x / SECTOR_SIZE as f32) as i16;
    let sy = (whisker_y / SECTOR_SIZE as f32) as i16;

    let mut seen: Vec<SnakeId> = Vec::new();
    for j in sy - 1..=sy + 1 {
        for i in sx - 1..=sx + 1 {
            let Some(sector) = grid.get(i, j) else {
                continue;
            };
            for &other_id in &sector.snakes {
                if other_id == snake.id || seen.contains(&other_id) {
                    continue;
                }
                seen.push(other_id);
                let Some(other) = snakes.get(&other_id) else {
                    continue;
                };

                if (whisker_x - other.sbb.x).abs() > other.sbb.r + BOT_BOX_SLACK {
                    continue;
                }
                if (whisker_y - other.sbb.y).abs() > other.sbb.r + BOT_BOX_SLACK {
                    continue;
                }

                let mut collision_dist = snake.sbpr + other.sbpr + BOT_AVOID_BUFFER;
                collision_dist *= collision_dist;

                for part in &other.parts {
                    if dist_sq(whisker_x, whisker_y, part.x, part.y) < collision_dist {
                        let angle_to_obstacle = (part.y - hy).atan2(part.x - hx);
                        let relative = normalize_angle(angle_to_obstacle - snake.angle);
                        // Obstacle to the left: turn right, and vice versa.
                        return Some(if relative > 0.0 && relative < F_PI {
                            snake.angle - F_PI / 1.5
                        } else {
                            snake.angle + F_PI / 1.5
                        });
                    }
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::snake::test_support::straight_snake;
    use crate::game::types::Food;

    #[test]
    fn bot_heads_for_the_best_pellet() {
        let grid_center = 10000.0f32;
        let mut grid = SectorGrid::new();
        let snake = straight_snake(1, 5, grid_center, grid_center, 0.0);
        let snakes = HashMap::new();

        let sx = (grid_center / SECTOR_SIZE as f32) as i16;
        let sector = grid.get_mut(sx, sx).expect("sector");
        sector.insert_food(Food {
            x: 10200,
            y: 10000,
            size: 1,
            color: 0,
        });
        sector.insert_food(Food {
            x: 10220,
            y: 10100,
            size: 10,
            color: 0,
        });

        let decision = decide(&snake, &snakes, &grid);
        assert!((decision.food_target.x - 10220.0).abs() < 1e-3);
        assert!((decision.food_target.y - 10100.0).abs() < 1e-3);
        assert!(decision.wangle > 0.0 && decision.wangle < F_PI / 2.0);
    }

    #[test]
    fn bot_steers_to_center_when_whisker_leaves_the_disk() {
        let grid = SectorGrid::new();
        let snakes = HashMap::new();
        // Just inside the death radius, pointing outward.
        let head_x = GAME_RADIUS as f32 + DEATH_RADIUS as f32 - 10.0;
        let snake = straight_snake(1, 5, head_x, GAME_RADIUS as f32, 0.0);

        let decision = decide(&snake, &snakes, &grid);
        // Heading back toward the arena center, roughly pi.
        assert!((decision.wangle - F_PI).abs() < 0.2);
        assert!(!decision.acceleration);
    }

    #[test]
    fn bot_turns_away_from_a_body_ahead() {
        let mut grid = SectorGrid::new();
        let mut snakes = HashMap::new();
        let bot = straight_snake(1, 5, 10000.0, 10000.0, 0.0);

        // A wall of snake directly ahead of the whisker.
        let look_ahead = bot.lsz * BOT_WHISKER_BODY_FACTOR + bot.speed as f32 * BOT_WHISKER_SPEED_FACTOR;
        let mut other = straight_snake(2, 8, 10000.0 + look_ahead, 10000.0, F_PI / 2.0);
        other.init_box_sectors(&mut grid);
        snakes.insert(2, other);

        let decision = decide(&bot, &snakes, &grid);
        assert!(!decision.acceleration);
        let diff = normalize_angle(decision.wangle - 0.0);
        // Turned away by roughly 2pi/3 one way or the other.
        assert!((diff - F_PI / 1.5).abs() < 0.3 || (diff - (2.0 * F_PI - F_PI / 1.5)).abs() < 0.3);
    }

    #[test]
    fn boost_gating_requires_fullness_and_a_worthwhile_pellet() {
        let mut grid = SectorGrid::new();
        let snakes = HashMap::new();
        let mut snake = straight_snake(1, 5, 10000.0, 10000.0, 0.0);

        let sx = (10000.0 / SECTOR_SIZE as f32) as i16;
        grid.get_mut(sx, sx).expect("sector").insert_food(Food {
            x: 10040,
            y: 10000,
            size: 10,
            color: 0,
        });

        // Rich pellet nearby, but an empty stomach: no boost.
        snake.fullness = 10;
        assert!(!decide(&snake, &snakes, &grid).acceleration);

        // Enough fullness and a worthwhile score: boost.
        snake.fullness = 60;
        assert!(decide(&snake, &snakes, &grid).acceleration);

        // Fullness without prey worth chasing: no boost.
        let empty_grid = SectorGrid::new();
        assert!(!decide(&snake, &snakes, &empty_grid).acceleration);
    }

    #[test]
    fn bot_ignores_orbit_bait_inside_turn_radius() {
        let mut grid = SectorGrid::new();
        let snakes = HashMap::new();
        let snake = straight_snake(1, 5, 10000.0, 10000.0, 0.0);

        let turn_radius = (snake.speed as f32 * 0.033) / SNAKE_ANGULAR_SPEED;
        // Close behind the head: inside the turn radius and > 45 degrees off.
        let bait_x = (10000.0 - turn_radius * 0.5) as u16;
        let sx = (10000.0 / SECTOR_SIZE as f32) as i16;
        grid.get_mut(sx, sx).expect("sector").insert_food(Food {
            x: bait_x,
            y: 10000,
            size: 10,
            color: 0,
        });

        let decision = decide(&snake, &snakes, &grid);
        // The bait is skipped; no pellet means the fallback center target.
        assert!((decision.food_target.x - GAME_RADIUS as f32).abs() < 1e-3);
    }
}
