use super::ai::{self, BotDecision};
use super::constants::{
    DEATH_RADIUS, FOOD_COLOR_COUNT, FOOD_EDGE_MARGIN, FRAME_TIME_MS, GAME_RADIUS,
    INITIAL_FOOD_SIZE_MAX, MOVE_STEP_DISTANCE, PARTS_SKIP_COUNT, PARTS_START_MOVE_COUNT,
    REGEN_FOOD_SIZE_MAX, SECTOR_COUNT_ALONG_EDGE, SECTOR_SIZE, SPAWN_ATTEMPTS,
    SPAWN_CENTER_BUFFER, SPAWN_EDGE_BUFFER, SPAWN_HEADING_NOISE, SPAWN_SAFETY_BUFFER,
    TAIL_STEP_DISTANCE,
};
use super::math::{check_intersection, dist_sq, normalize_angle, F_2PI};
use super::sector::SectorGrid;
use super::snake::Snake;
use super::types::{changed, Body, Food, SnakeId};
use crate::config::WorldTuning;
use crate::shared::names;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collision {
    None,
    Wall,
    Body(SnakeId),
}

/// The authoritative game state: the sector grid, every live snake, and the
/// fixed-timestep accumulator. All mutation happens under the room lock.
pub struct World {
    snakes: HashMap<SnakeId, Snake>,
    sectors: SectorGrid,
    changes: Vec<SnakeId>,
    dead: Vec<SnakeId>,
    /// Naturally regenerated pellets this tick, drained by the broadcast pass.
    fresh_food: Vec<Food>,
    last_snake_id: SnakeId,
    ticks: i64,
    frames: u64,
    rng: StdRng,
    tuning: WorldTuning,
}

impl World {
    pub fn new(tuning: WorldTuning) -> Self {
        Self::with_seed(tuning, rand::random())
    }

    pub fn with_seed(tuning: WorldTuning, seed: u64) -> Self {
        let mut world = Self {
            snakes: HashMap::new(),
            sectors: SectorGrid::new(),
            changes: Vec::new(),
            dead: Vec::new(),
            fresh_food: Vec::new(),
            last_snake_id: 0,
            ticks: 0,
            frames: 0,
            rng: StdRng::seed_from_u64(seed),
            tuning,
        };
        world.init_food();
        for _ in 0..world.tuning.bots {
            let bot = world.create_bot_snake();
            world.add_snake(bot);
        }
        world
    }

    /// Initial fill: density decreases with squared radial sector distance
    /// from the arena center; capacity is twice the density, floored at 20.
    fn init_food(&mut self) {
        let n = SECTOR_COUNT_ALONG_EDGE;
        let center = (n / 2) as i32;
        for sector in self.sectors.iter_mut() {
            let dx = sector.x as i32 - center;
            let dy = sector.y as i32 - center;
            let dist = (dx * dx + dy * dy) as f32;
            let dp = 1.0 - dist / (n as f32 * n as f32);
            let density = (dp * 10.0) as usize;
            sector.max_food_capacity = (density * 2).max(20);

            for _ in 0..density {
                let fx = sector.x as u16 * SECTOR_SIZE + self.rng.gen_range(0..SECTOR_SIZE);
                let fy = sector.y as u16 * SECTOR_SIZE + self.rng.gen_range(0..SECTOR_SIZE);
                sector.insert_food(Food {
                    x: fx,
                    y: fy,
                    size: self.rng.gen_range(1..=INITIAL_FOOD_SIZE_MAX),
                    color: self.rng.gen_range(0..FOOD_COLOR_COUNT),
                });
            }
        }
    }

    /// Advances the world by wall-clock `dt`, consuming whole 8 ms virtual
    /// frames from the accumulator. Missed time is absorbed by the next tick.
    pub fn tick(&mut self, dt: i64) {
        self.ticks += dt;
        let vfr = self.ticks / FRAME_TIME_MS;
        if vfr > 0 {
            let vfr_time = vfr * FRAME_TIME_MS;
            self.tick_snakes(vfr_time);
            self.regenerate_food();
            self.ticks -= vfr_time;
            self.frames += vfr as u64;
        }
    }

    fn tick_snakes(&mut self, dt: i64) {
        // Bot decisions run against an immutable world, then apply.
        let mut due: Vec<SnakeId> = Vec::new();
        for (id, snake) in self.snakes.iter_mut() {
            if snake.bot && !snake.is_dying_or_dead() && snake.accumulate_ai(dt) {
                due.push(*id);
            }
        }
        let mut decisions: Vec<(SnakeId, BotDecision)> = Vec::with_capacity(due.len());
        for id in due {
            if let Some(snake) = self.snakes.get(&id) {
                decisions.push((id, ai::decide(snake, &self.snakes, &self.sectors)));
            }
        }
        for (id, decision) in decisions {
            if let Some(snake) = self.snakes.get_mut(&id) {
                snake.wangle = decision.wangle;
                snake.acceleration = decision.acceleration;
                snake.update |= changed::WANGLE;
                if !self.changes.contains(&id) {
                    self.changes.push(id);
                }
            }
        }

        for (id, snake) in self.snakes.iter_mut() {
            if snake.tick(dt, &mut self.sectors, &self.tuning) && !self.changes.contains(id) {
                self.changes.push(*id);
            }
        }

        // Collision pass over every snake that moved this tick.
        let mut outcomes: Vec<(SnakeId, Option<SnakeId>)> = Vec::new();
        for &id in &self.changes {
            let Some(snake) = self.snakes.get(&id) else {
                continue;
            };
            if snake.update & changed::POS == 0 || snake.is_dying_or_dead() {
                continue;
            }
            match self.check_snake_bounds(snake) {
                Collision::None => {}
                Collision::Wall => outcomes.push((id, None)),
                Collision::Body(other) => outcomes.push((id, Some(other))),
            }
        }
        for (id, killer) in outcomes {
            if let Some(snake) = self.snakes.get_mut(&id) {
                snake.update |= changed::DYING;
                snake.killed_by = killer;
            }
            if let Some(killer_id) = killer {
                if let Some(killer_snake) = self.snakes.get_mut(&killer_id) {
                    killer_snake.kills += 1;
                }
            }
        }
    }

    /// Death checks for one moved snake: the forward tip against the death
    /// radius, then the head's swept segment and body-circle tests against
    /// every snake in the 3x3 neighborhood.
    fn check_snake_bounds(&self, snake: &Snake) -> Collision {
        let hx = snake.head_x();
        let hy = snake.head_y();

        let mut move_dist = snake.speed as f32 * FRAME_TIME_MS as f32 / 1000.0;
        if move_dist < 5.0 {
            move_dist = 5.0;
        }
        let prev_hx = hx - snake.angle.cos() * move_dist;
        let prev_hy = hy - snake.angle.sin() * move_dist;

        let body_radius = snake.lsz / 2.0;
        let tip_x = hx + snake.angle.cos() * body_radius;
        let tip_y = hy + snake.angle.sin() * body_radius;
        let center = GAME_RADIUS as f32;
        if dist_sq(tip_x, tip_y, center, center) >= DEATH_RADIUS as f32 * DEATH_RADIUS as f32 {
            return Collision::Wall;
        }

        let sx = (hx / SECTOR_SIZE as f32) as i16;
        let sy = (hy / SECTOR_SIZE as f32) as i16;

        let mut checked: Vec<SnakeId> = Vec::new();
        for j in sy - 1..=sy + 1 {
            for i in sx - 1..=sx + 1 {
                let Some(sector) = self.sectors.get(i, j) else {
                    continue;
                };
                for &other_id in &sector.snakes {
                    if other_id == snake.id || checked.contains(&other_id) {
                        continue;
                    }
                    checked.push(other_id);
                    let Some(other) = self.snakes.get(&other_id) else {
                        continue;
                    };
                    if other.is_dying_or_dead() {
                        continue;
                    }
                    if !snake.sbb.intersects(&other.sbb) {
                        continue;
                    }

                    let hit_r = snake.lsz / 2.0 + other.lsz / 2.0;
                    let hit_dist_sq = hit_r * hit_r;

                    let len = other.parts.len();
                    if len < 2 {
                        continue;
                    }
                    for k in 0..len - 1 {
                        let b1 = other.parts[k];
                        let b2 = other.parts[k + 1];
                        if b1.distance_squared(hx, hy) < hit_dist_sq {
                            return Collision::Body(other_id);
                        }
                        if check_intersection(prev_hx, prev_hy, hx, hy, b1.x, b1.y, b2.x, b2.y) {
                            return Collision::Body(other_id);
                        }
                    }
                    let tail = other.parts[len - 1];
                    if tail.distance_squared(hx, hy) < hit_dist_sq {
                        return Collision::Body(other_id);
                    }
                }
            }
        }

        Collision::None
    }

    /// Per tick, spawn up to `food_spawn_rate` pellets using the weighted
    /// near-snake / on-snake / random sector targeting.
    fn regenerate_food(&mut self) {
        let w_near = self.tuning.spawn_prob_near_snake;
        let w_on = self.tuning.spawn_prob_on_snake;
        let w_rand = self.tuning.spawn_prob_random;
        let mut total_weight = w_near + w_on + w_rand;
        if total_weight == 0 {
            total_weight = 1;
        }

        let edge = SECTOR_COUNT_ALONG_EDGE as i16;
        for _ in 0..self.tuning.food_spawn_rate {
            let roll = self.rng.gen_range(0..total_weight);

            let mut target: Option<(i16, i16)> = None;
            if roll < w_near + w_on && !self.snakes.is_empty() {
                let pick = self.rng.gen_range(0..self.snakes.len());
                if let Some(snake) = self.snakes.values().nth(pick) {
                    let mut sx = (snake.head_x() / SECTOR_SIZE as f32) as i16;
                    let mut sy = (snake.head_y() / SECTOR_SIZE as f32) as i16;
                    if roll < w_near {
                        sx += self.rng.gen_range(0i16..3) - 1;
                        sy += self.rng.gen_range(0i16..3) - 1;
                    }
                    if sx >= 0 && sx < edge && sy >= 0 && sy < edge {
                        target = Some((sx, sy));
                    }
                }
            }

            let (sx, sy) = match target {
                Some(cell) => cell,
                None => {
                    let index = self.rng.gen_range(0..self.sectors.len());
                    let sector = self.sectors.get_index_mut(index);
                    (sector.x as i16, sector.y as i16)
                }
            };

            match self.sectors.get(sx, sy) {
                Some(sector) if sector.food.len() < sector.max_food_capacity => {}
                _ => continue,
            }

            let fx = sx as u16 * SECTOR_SIZE + self.rng.gen_range(0..SECTOR_SIZE);
            let fy = sy as u16 * SECTOR_SIZE + self.rng.gen_range(0..SECTOR_SIZE);

            let center = GAME_RADIUS as f32;
            let margin = center - FOOD_EDGE_MARGIN;
            if dist_sq(fx as f32, fy as f32, center, center) > margin * margin {
                continue;
            }

            let food = Food {
                x: fx,
                y: fy,
                size: self.rng.gen_range(1..=REGEN_FOOD_SIZE_MAX),
                color: self.rng.gen_range(0..FOOD_COLOR_COUNT),
            };
            if let Some(sector) = self.sectors.get_mut(sx, sy) {
                sector.insert_food(food);
                self.fresh_food.push(food);
            }
        }
    }

    fn is_location_safe(
        sectors: &SectorGrid,
        snakes: &HashMap<SnakeId, Snake>,
        x: f32,
        y: f32,
        safety_radius: f32,
    ) -> bool {
        let sx = (x / SECTOR_SIZE as f32) as i16;
        let sy = (y / SECTOR_SIZE as f32) as i16;
        let safe_sq = safety_radius * safety_radius;

        for j in sy - 1..=sy + 1 {
            for i in sx - 1..=sx + 1 {
                let Some(sector) = sectors.get(i, j) else {
                    continue;
                };
                for other_id in &sector.snakes {
                    let Some(other) = snakes.get(other_id) else {
                        continue;
                    };
                    if dist_sq(x, y, other.head_x(), other.head_y()) < safe_sq {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Area-uniform placement in the spawn annulus, rejecting candidates near
    /// another snake's head; after 20 tries the last candidate is accepted.
    /// The body is walked backward from the head along the initial heading.
    fn create_snake(&mut self, start_score: u16, bot: bool) -> Snake {
        self.last_snake_id = self.last_snake_id.wrapping_add(1);
        if self.last_snake_id == 0 {
            self.last_snake_id = 1;
        }
        let id = self.last_snake_id;

        let center = GAME_RADIUS as f32;
        let max_spawn_radius = center - SPAWN_EDGE_BUFFER;
        let mut fx = center;
        let mut fy = center;
        for _ in 0..SPAWN_ATTEMPTS {
            let theta = F_2PI * self.rng.gen::<f32>();
            let radius = SPAWN_CENTER_BUFFER
                + self.rng.gen::<f32>().sqrt() * (max_spawn_radius - SPAWN_CENTER_BUFFER);
            fx = center + radius * theta.cos();
            fy = center + radius * theta.sin();
            if Self::is_location_safe(&self.sectors, &self.snakes, fx, fy, SPAWN_SAFETY_BUFFER) {
                break;
            }
        }

        // Face the arena center so fresh spawns do not drive into the wall.
        let to_center = (center - fy).atan2(center - fx);
        let noise = self.rng.gen::<f32>() * 2.0 * SPAWN_HEADING_NOISE - SPAWN_HEADING_NOISE;
        let angle = normalize_angle(to_center + noise);

        let len = self.tuning.snake_min_length.max(2) as usize;
        let target_score = start_score.max(len as u16);

        let mut parts = Vec::with_capacity(len);
        let mut px = fx;
        let mut py = fy;
        for index in 0..len {
            parts.push(Body { x: px, y: py });
            let spacing = if index < PARTS_SKIP_COUNT + PARTS_START_MOVE_COUNT {
                MOVE_STEP_DISTANCE as f32
            } else {
                TAIL_STEP_DISTANCE
            };
            px -= angle.cos() * spacing;
            py -= angle.sin() * spacing;
        }

        let mut snake = Snake::new(id, parts, angle, target_score, bot);
        snake.skin = 9 + self.rng.gen_range(0..13);
        snake.init_box_sectors(&mut self.sectors);
        snake
    }

    pub fn create_human_snake(&mut self, start_score: u16) -> Snake {
        let score = if start_score > 0 {
            start_score
        } else {
            self.tuning.h_snake_start_score
        };
        self.create_snake(score, false)
    }

    pub fn create_bot_snake(&mut self) -> Snake {
        let score = self.tuning.b_snake_start_score;
        let mut snake = self.create_snake(score, true);
        snake.name = names::random_bot_name(&mut self.rng);
        snake
    }

    pub fn add_snake(&mut self, snake: Snake) {
        self.snakes.insert(snake.id, snake);
    }

    pub fn remove_snake(&mut self, id: SnakeId) {
        self.changes.retain(|changed_id| *changed_id != id);
        if let Some(mut snake) = self.snakes.remove(&id) {
            snake.unlink_boxes(&mut self.sectors);
        }
    }

    pub fn burst_dead_food(&mut self, id: SnakeId) {
        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.dead_food_burst(&mut self.sectors, &mut self.rng);
        }
    }

    pub fn snake(&self, id: SnakeId) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    pub fn snake_mut(&mut self, id: SnakeId) -> Option<&mut Snake> {
        self.snakes.get_mut(&id)
    }

    pub fn snakes(&self) -> &HashMap<SnakeId, Snake> {
        &self.snakes
    }

    pub fn sectors(&self) -> &SectorGrid {
        &self.sectors
    }

    pub fn sectors_mut(&mut self) -> &mut SectorGrid {
        &mut self.sectors
    }

    pub fn changes(&self) -> &[SnakeId] {
        &self.changes
    }

    pub fn flush_changes(&mut self) {
        self.changes.clear();
    }

    pub fn push_dead(&mut self, id: SnakeId) {
        self.dead.push(id);
    }

    pub fn drain_dead(&mut self) -> Vec<SnakeId> {
        std::mem::take(&mut self.dead)
    }

    pub fn drain_fresh_food(&mut self) -> Vec<Food> {
        std::mem::take(&mut self.fresh_food)
    }

    pub fn bot_count(&self) -> usize {
        self.snakes.values().filter(|snake| snake.bot).count()
    }

    pub fn tuning(&self) -> &WorldTuning {
        &self.tuning
    }

    /// Total virtual frames consumed since startup.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// All snakes, best score first. Ties keep length order stable through
    /// the score formula itself (fullness breaks length ties).
    pub fn ranked_snakes(&self) -> Vec<&Snake> {
        let mut ranked: Vec<&Snake> = self.snakes.values().collect();
        ranked.sort_by(|a, b| b.score().cmp(&a.score()));
        ranked
    }

    #[cfg(test)]
    pub(crate) fn reindex_snake(&mut self, id: SnakeId) {
        if let Some(snake) = self.snakes.get_mut(&id) {
            snake.update_box_center();
            snake.update_box_radius();
            snake.init_box_sectors(&mut self.sectors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::BASE_MOVE_SPEED;
    use crate::game::snake::test_support::straight_snake;
    use std::f32::consts::PI;

    fn quiet_tuning() -> WorldTuning {
        WorldTuning {
            food_spawn_rate: 0,
            ..WorldTuning::default()
        }
    }

    fn empty_world() -> World {
        let mut world = World::with_seed(quiet_tuning(), 7);
        for sector in world.sectors.iter_mut() {
            sector.food.clear();
        }
        world
    }

    fn insert_straight_snake(world: &mut World, id: SnakeId, len: usize, x: f32, y: f32, angle: f32) {
        let mut snake = straight_snake(id, len, x, y, angle);
        snake.init_box_sectors(world.sectors_mut());
        world.add_snake(snake);
    }

    #[test]
    fn head_on_collision_marks_both_movers_dying() {
        let mut world = empty_world();
        insert_straight_snake(&mut world, 1, 5, 10000.0, 10000.0, 0.0);
        insert_straight_snake(&mut world, 2, 5, 10100.0, 10000.0, PI);

        // At most ceil(100 / 42) movement steps of 1000 * 42 / 172 ms each.
        let deadline = (100 / MOVE_STEP_DISTANCE as i64 + 1)
            * (1000 * MOVE_STEP_DISTANCE as i64 / BASE_MOVE_SPEED as i64)
            + 100;
        let mut elapsed = 0;
        while elapsed < deadline {
            world.tick(10);
            elapsed += 10;
            if world.snake(1).expect("snake 1").update & changed::DYING != 0 {
                break;
            }
        }

        let first = world.snake(1).expect("snake 1");
        assert!(first.update & changed::DYING != 0, "no death after {elapsed}ms");
        assert_eq!(first.killed_by, Some(2));
        assert!(world.snake(2).expect("snake 2").kills >= 1);
    }

    #[test]
    fn collision_marks_only_the_moving_head_snake() {
        let mut world = empty_world();
        // A drives into B's flank; B heads away to the north.
        insert_straight_snake(&mut world, 1, 5, 10000.0, 10000.0, 0.0);
        insert_straight_snake(&mut world, 2, 12, 10080.0, 10400.0, PI / 2.0);

        // Move B's body across A's path by hand: a vertical column ahead of A.
        {
            let snake = world.snake_mut(2).expect("snake 2");
            for (index, part) in snake.parts.iter_mut().enumerate() {
                part.x = 10080.0;
                part.y = 10200.0 - index as f32 * 42.0;
            }
        }
        world.reindex_snake(2);

        let mut a_dying = false;
        for _ in 0..120 {
            world.tick(10);
            if world.snake(1).expect("snake 1").update & changed::DYING != 0 {
                a_dying = true;
                break;
            }
        }
        assert!(a_dying);
        assert!(world.snake(2).expect("snake 2").update & changed::DYING == 0);
    }

    #[test]
    fn snake_dies_on_the_arena_boundary() {
        let mut world = empty_world();
        let head_x = GAME_RADIUS as f32 + DEATH_RADIUS as f32 - 10.0;
        insert_straight_snake(&mut world, 1, 5, head_x, GAME_RADIUS as f32, 0.0);

        world.tick(260);

        let snake = world.snake(1).expect("snake");
        assert!(snake.update & changed::DYING != 0);
        assert!(snake.killed_by.is_none());
    }

    #[test]
    fn sector_membership_matches_box_rect_after_ticks() {
        let mut world = empty_world();
        insert_straight_snake(&mut world, 1, 20, 9000.0, 9000.0, 0.3);
        insert_straight_snake(&mut world, 2, 8, 30000.0, 30000.0, 2.0);

        for _ in 0..100 {
            world.tick(10);
        }

        for snake in world.snakes().values() {
            let rect = snake.sbb.rect();
            for sector in world.sectors().iter() {
                let inside = rect.contains(sector.x as i16, sector.y as i16);
                assert_eq!(sector.snakes.contains(&snake.id), inside);
            }
        }
    }

    #[test]
    fn fullness_and_length_invariants_hold_after_ticks() {
        let mut world = World::with_seed(WorldTuning::default(), 11);
        insert_straight_snake(&mut world, 1, 2, 10000.0, 10000.0, 0.7);
        insert_straight_snake(&mut world, 2, 40, 14000.0, 14000.0, 1.9);
        world.snake_mut(2).expect("snake").acceleration = true;
        world.snake_mut(2).expect("snake").target_score = 10;

        for _ in 0..200 {
            world.tick(10);
        }
        for snake in world.snakes().values() {
            assert!(snake.fullness < 100);
            assert!(snake.parts.len() >= 2);
        }
    }

    #[test]
    fn regenerated_food_respects_capacity_and_the_playable_disk() {
        let tuning = WorldTuning {
            food_spawn_rate: 50,
            ..WorldTuning::default()
        };
        let mut world = World::with_seed(tuning, 3);

        for _ in 0..100 {
            world.tick(10);
        }

        let center = GAME_RADIUS as f32;
        let margin = center - FOOD_EDGE_MARGIN;
        for sector in world.sectors().iter() {
            assert!(sector.food.len() <= sector.max_food_capacity);
            for food in &sector.food {
                // Initial fill is bounded by the sector square; regenerated
                // food additionally stays inside the playable disk.
                assert!(food.x < GAME_RADIUS * 2);
                assert!(food.y < GAME_RADIUS * 2);
            }
        }
        let fresh = world.drain_fresh_food();
        for food in fresh {
            assert!(dist_sq(food.x as f32, food.y as f32, center, center) <= margin * margin);
        }
    }

    #[test]
    fn spawned_snakes_sit_inside_the_annulus_facing_center() {
        let mut world = World::with_seed(WorldTuning::default(), 23);
        for _ in 0..10 {
            let snake = world.create_human_snake(0);
            let center = GAME_RADIUS as f32;
            let dist = dist_sq(snake.head_x(), snake.head_y(), center, center).sqrt();
            assert!(dist >= SPAWN_CENTER_BUFFER - 1.0);
            assert!(dist <= center - SPAWN_EDGE_BUFFER + 1.0);

            let to_center = (center - snake.head_y()).atan2(center - snake.head_x());
            let mut diff = normalize_angle(snake.angle - to_center);
            if diff > PI {
                diff = F_2PI - diff;
            }
            assert!(diff <= SPAWN_HEADING_NOISE + 1e-3);
            world.add_snake(snake);
        }
    }

    #[test]
    fn spawn_placement_keeps_the_safety_buffer_when_space_allows() {
        let mut world = empty_world();
        insert_straight_snake(&mut world, 1, 5, 12240.0, 12240.0, 0.0);

        for _ in 0..10 {
            let snake = world.create_human_snake(0);
            let other = world.snake(1).expect("snake 1");
            let dist =
                dist_sq(snake.head_x(), snake.head_y(), other.head_x(), other.head_y()).sqrt();
            assert!(dist >= SPAWN_SAFETY_BUFFER);
        }
    }

    #[test]
    fn removed_snake_leaves_no_sector_membership() {
        let mut world = empty_world();
        insert_straight_snake(&mut world, 1, 15, 10000.0, 10000.0, 0.0);
        world.tick(250);

        world.remove_snake(1);
        assert!(world.snake(1).is_none());
        assert!(world
            .sectors()
            .iter()
            .all(|sector| !sector.snakes.contains(&1)));
    }

    #[test]
    fn dead_snakes_do_not_move() {
        let mut world = empty_world();
        insert_straight_snake(&mut world, 1, 5, 10000.0, 10000.0, 0.0);
        world
            .snake_mut(1)
            .expect("snake")
            .update |= changed::DYING;
        let head_before = world.snake(1).expect("snake").head();

        world.tick(500);

        assert_eq!(world.snake(1).expect("snake").head(), head_before);
    }

    #[test]
    fn leaderboard_ranks_length_then_fullness() {
        let mut world = empty_world();
        insert_straight_snake(&mut world, 1, 5, 9000.0, 9000.0, 0.0);
        insert_straight_snake(&mut world, 2, 5, 12000.0, 12000.0, 0.0);
        insert_straight_snake(&mut world, 3, 10, 15000.0, 15000.0, 0.0);
        world.snake_mut(2).expect("snake").fullness = 50;

        let ranked = world.ranked_snakes();
        let ids: Vec<SnakeId> = ranked.iter().map(|snake| snake.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
