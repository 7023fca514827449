use super::constants::{
    AI_STEP_INTERVAL_MS, BASE_MOVE_SPEED, BOOST_SPEED, FOOD_COLOR_COUNT, GAME_RADIUS,
    MAX_SNAKE_PARTS, MOVE_STEP_DISTANCE, PARTS_SKIP_COUNT, PARTS_START_MOVE_COUNT,
    ROT_STEP_INTERVAL_MS, SECTOR_DIAG_SIZE, SECTOR_SIZE, SNAKE_ANGULAR_SPEED, SNAKE_TAIL_K,
    SPANGDV, SPEED_ACCELERATION, TAIL_STEP_DISTANCE,
};
use super::math::{dist_sq, normalize_angle, F_2PI, F_PI};
use super::sector::{BoundBox, SectorGrid, ViewPort};
use super::types::{changed, Body, Food, SnakeId};
use crate::config::WorldTuning;
use rand::Rng;
use std::sync::OnceLock;

#[derive(Debug)]
pub struct Snake {
    pub id: SnakeId,
    pub name: String,
    pub skin: u8,
    pub custom_skin_data: Vec<u8>,
    pub bot: bool,

    /// Dirty-flag bitmask, consumed bit by bit by the broadcast pass.
    pub update: u8,
    pub acceleration: bool,
    pub speed: u16,
    pub angle: f32,
    pub wangle: f32,
    /// Food accumulated toward the next body segment, `[0, 99]`.
    pub fullness: u16,
    /// Length the snake is animating toward after spawn; also the boost and
    /// shrink floor.
    pub target_score: u16,
    pub kills: u32,
    pub killed_by: Option<SnakeId>,

    pub parts: Vec<Body>,
    /// Food consumed this tick, drained by the broadcast pass.
    pub eaten: Vec<Food>,
    /// Food emitted this tick by shrink or death, drained by the broadcast pass.
    pub spawn: Vec<Food>,
    /// The body length subscribed clients currently believe the snake has.
    pub client_parts_index: usize,
    /// The head position clients last reconstructed, base for relative moves.
    pub client_head: Body,

    pub sbb: BoundBox,
    pub vp: ViewPort,

    // Derived cache, recomputed on every length change.
    pub sc: f32,
    pub sc13: f32,
    pub lsz: f32,
    pub sbpr: f32,
    pub gsc: f32,
    pub scang: f32,
    pub ssp: f32,
    pub fsp: f32,

    mov_ticks: i64,
    rot_ticks: i64,
    ai_ticks: i64,
}

impl Snake {
    pub fn new(id: SnakeId, parts: Vec<Body>, angle: f32, target_score: u16, bot: bool) -> Self {
        let head = parts[0];
        let mut snake = Self {
            id,
            name: String::new(),
            skin: 0,
            custom_skin_data: Vec::new(),
            bot,
            update: 0,
            acceleration: false,
            speed: BASE_MOVE_SPEED,
            angle: normalize_angle(angle),
            wangle: normalize_angle(angle),
            fullness: 0,
            target_score,
            kills: 0,
            killed_by: None,
            client_parts_index: parts.len(),
            client_head: head,
            sbb: BoundBox::new(id, head.x, head.y, 0.0),
            vp: ViewPort::new(head.x, head.y, SECTOR_DIAG_SIZE as f32 * 3.0),
            parts,
            eaten: Vec::new(),
            spawn: Vec::new(),
            sc: 1.0,
            sc13: 1.0,
            lsz: 29.0,
            sbpr: 14.5,
            gsc: 0.0,
            scang: 0.0,
            ssp: 0.0,
            fsp: 0.0,
            mov_ticks: 0,
            rot_ticks: 0,
            ai_ticks: 0,
        };
        snake.update_box_center();
        snake.update_box_radius();
        snake.update_snake_consts();
        snake
    }

    pub fn head(&self) -> Body {
        self.parts[0]
    }

    pub fn head_x(&self) -> f32 {
        self.parts[0].x
    }

    pub fn head_y(&self) -> f32 {
        self.parts[0].y
    }

    pub fn is_dying_or_dead(&self) -> bool {
        self.update & (changed::DYING | changed::DEAD) != 0
    }

    /// Advances the per-snake accumulators by `dt` and applies any elapsed
    /// rotation and movement steps. Returns true when a dirty flag was newly
    /// raised.
    pub fn tick(&mut self, dt: i64, grid: &mut SectorGrid, tuning: &WorldTuning) -> bool {
        let mut changes = 0u8;

        if self.is_dying_or_dead() {
            return false;
        }

        if self.angle != self.wangle {
            self.rot_ticks += dt;
            if self.rot_ticks >= ROT_STEP_INTERVAL_MS {
                let frames = self.rot_ticks / ROT_STEP_INTERVAL_MS;
                let frames_ticks = frames * ROT_STEP_INTERVAL_MS;
                let rotation = SNAKE_ANGULAR_SPEED * frames_ticks as f32 / 1000.0;

                let mut d_angle = normalize_angle(self.wangle - self.angle);
                if d_angle > F_PI {
                    d_angle -= F_2PI;
                }

                if d_angle.abs() < rotation {
                    self.angle = self.wangle;
                } else {
                    self.angle += rotation * if d_angle > 0.0 { 1.0 } else { -1.0 };
                }
                self.angle = normalize_angle(self.angle);

                changes |= changed::ANGLE;
                self.rot_ticks -= frames_ticks;
            }
        }

        self.mov_ticks += dt;
        let mov_frame_interval = 1000 * MOVE_STEP_DISTANCE as i64 / self.speed as i64;
        if self.mov_ticks >= mov_frame_interval {
            let frames = self.mov_ticks / mov_frame_interval;
            let frames_ticks = frames * mov_frame_interval;
            let move_dist = self.speed as f32 * frames_ticks as f32 / 1000.0;

            self.advance_body(move_dist, grid);
            changes |= changed::POS;

            self.update_eaten_food(grid);

            if self.acceleration {
                let threshold = if self.target_score > 0 {
                    self.target_score as usize
                } else {
                    10
                };
                if self.parts.len() <= threshold && self.fullness == 0 {
                    self.acceleration = false;
                } else {
                    self.decrease(tuning.boost_cost, tuning.boost_drop_size, grid);
                    changes |= changed::FULLNESS;
                }
            }

            // Spawn animation: walk toward the intended start score one part
            // per movement step. The growth reaches clients through the
            // client_parts_index reconciliation.
            if (self.parts.len() as u16) < self.target_score
                && (self.parts.len() as u16) < MAX_SNAKE_PARTS
            {
                if let Some(&tail) = self.parts.last() {
                    self.parts.push(tail);
                    self.update_snake_consts();
                }
            }

            let wanted_speed = if self.acceleration {
                BOOST_SPEED
            } else {
                BASE_MOVE_SPEED
            };
            if self.speed != wanted_speed {
                let acc = SPEED_ACCELERATION as i64 * frames_ticks / 1000;
                let diff = wanted_speed as i64 - self.speed as i64;
                if diff.abs() <= acc {
                    self.speed = wanted_speed;
                } else {
                    self.speed = (self.speed as i64 + acc * diff.signum()) as u16;
                }
                changes |= changed::SPEED;
            }

            self.mov_ticks -= frames_ticks;
        }

        if changes > 0 && changes != self.update {
            self.update |= changes;
            return true;
        }
        false
    }

    /// Accumulates bot decision time; true when a decision step is due.
    pub fn accumulate_ai(&mut self, dt: i64) -> bool {
        self.ai_ticks += dt;
        if self.ai_ticks > AI_STEP_INTERVAL_MS {
            self.ai_ticks %= AI_STEP_INTERVAL_MS;
            true
        } else {
            false
        }
    }

    fn advance_body(&mut self, move_dist: f32, grid: &mut SectorGrid) {
        let len = self.parts.len();
        let mut prev = self.parts[0];

        self.parts[0].x += self.angle.cos() * move_dist;
        self.parts[0].y += self.angle.sin() * move_dist;
        let head = self.parts[0];

        let mut bbx = head.x;
        let mut bby = head.y;

        let mut i = 1;
        while i < len && i < PARTS_SKIP_COUNT {
            let old = self.parts[i];
            self.parts[i] = prev;
            bbx += prev.x;
            bby += prev.y;
            prev = old;
            i += 1;
        }

        let mut j = 0usize;
        while i < len && i < PARTS_SKIP_COUNT + PARTS_START_MOVE_COUNT {
            let last = self.parts[i - 1];
            let old = self.parts[i];
            let mut pt = prev;
            j += 1;
            let move_coeff = SNAKE_TAIL_K * j as f32 / PARTS_START_MOVE_COUNT as f32;
            pt.x += move_coeff * (last.x - pt.x);
            pt.y += move_coeff * (last.y - pt.y);
            self.parts[i] = pt;
            bbx += pt.x;
            bby += pt.y;
            prev = old;
            i += 1;
        }

        while i < len {
            let last = self.parts[i - 1];
            let old = self.parts[i];
            let mut pt = prev;
            pt.x += SNAKE_TAIL_K * (last.x - pt.x);
            pt.y += SNAKE_TAIL_K * (last.y - pt.y);
            self.parts[i] = pt;
            bbx += pt.x;
            bby += pt.y;
            prev = old;
            i += 1;
        }

        self.sbb.x = bbx / len as f32;
        self.sbb.y = bby / len as f32;
        self.vp.x = head.x;
        self.vp.y = head.y;
        self.update_box_radius();
        self.sbb.update_sectors(grid);
        if !self.bot {
            self.vp.update_sectors();
        }
    }

    /// Scans the 3x3 sector neighborhood around the projected mouth point and
    /// consumes every pellet within the eat radius. Eaten pellets leave their
    /// sector immediately and land in the `eaten` buffer.
    fn update_eaten_food(&mut self, grid: &mut SectorGrid) {
        let head = self.parts[0];

        let client_sp = self.speed as f32 / 32.0;
        let dist_offset = (0.36 * self.lsz + 31.0) * (client_sp / SPANGDV);
        let mouth_x = head.x + self.angle.cos() * dist_offset;
        let mouth_y = head.y + self.angle.sin() * dist_offset;

        let eat_dist_sq = 2000.0 * self.sc13;
        let search_r = eat_dist_sq.sqrt() + 40.0;

        let center_sx = (mouth_x / SECTOR_SIZE as f32) as i16;
        let center_sy = (mouth_y / SECTOR_SIZE as f32) as i16;

        for sy in center_sy - 1..=center_sy + 1 {
            for sx in center_sx - 1..=center_sx + 1 {
                let Some(sector) = grid.get_mut(sx, sy) else {
                    continue;
                };
                let mut index = 0;
                while index < sector.food.len() {
                    let food = sector.food[index];
                    let close = (food.x as f32 - mouth_x).abs() < search_r
                        && (food.y as f32 - mouth_y).abs() < search_r;
                    if close
                        && dist_sq(food.x as f32, food.y as f32, mouth_x, mouth_y) < eat_dist_sq
                    {
                        sector.food.swap_remove(index);
                        self.eaten.push(food);
                        self.increase(food.size as u16);
                        continue;
                    }
                    index += 1;
                }
            }
        }
    }

    pub fn increase(&mut self, volume: u16) {
        self.fullness += volume;
        while self.fullness >= 100 {
            self.fullness -= 100;
            if (self.parts.len() as u16) < MAX_SNAKE_PARTS {
                if let Some(&tail) = self.parts.last() {
                    self.parts.push(tail);
                }
            }
        }
        self.update |= changed::FULLNESS;
        self.update_snake_consts();
    }

    /// Consumes `volume` fullness, popping tail segments once fullness is
    /// exhausted and dropping a pellet of `drop_size` at each popped position.
    /// Never shrinks below `max(target_score, 10)` parts.
    pub fn decrease(&mut self, volume: u16, drop_size: u8, grid: &mut SectorGrid) {
        if volume > self.fullness {
            let volume = volume - self.fullness;
            let floor = self.target_score.max(10) as usize;
            let reduce = 1 + (volume / 100) as usize;
            for _ in 0..reduce {
                if self.parts.len() <= floor {
                    break;
                }
                if let Some(&last) = self.parts.last() {
                    if last.x.is_finite() && last.y.is_finite() && last.x >= 0.0 && last.y >= 0.0 {
                        self.spawn_food(
                            Food {
                                x: last.x as u16,
                                y: last.y as u16,
                                size: drop_size,
                                color: self.skin,
                            },
                            grid,
                        );
                    }
                }
                self.parts.pop();
            }
            self.fullness = (100 - volume % 100) % 100;
        } else {
            self.fullness -= volume;
        }
        self.update |= changed::FULLNESS;
        self.update_snake_consts();
    }

    fn spawn_food(&mut self, food: Food, grid: &mut SectorGrid) {
        let sx = (food.x / SECTOR_SIZE) as i16;
        let sy = (food.y / SECTOR_SIZE) as i16;
        if let Some(sector) = grid.get_mut(sx, sy) {
            sector.insert_food(food);
            self.spawn.push(food);
        }
    }

    /// Death burst: every body point emits `2 * sc` pellets of size
    /// `100 / count` scattered within `3 * sbpr`, skipping non-finite or
    /// negative coordinates.
    pub fn dead_food_burst(&mut self, grid: &mut SectorGrid, rng: &mut impl Rng) {
        let r = self.sbpr;
        let r2 = r * 3.0;
        let count = (self.sc * 2.0) as usize;
        if count == 0 {
            return;
        }
        let food_size = (100 / count).min(u8::MAX as usize) as u8;
        let bound = GAME_RADIUS as u32 * 2;

        let parts = std::mem::take(&mut self.parts);
        for part in &parts {
            if !part.x.is_finite() || !part.y.is_finite() || part.x < 0.0 || part.y < 0.0 {
                continue;
            }
            let sx = (part.x / SECTOR_SIZE as f32) as i16;
            let sy = (part.y / SECTOR_SIZE as f32) as i16;
            for _ in 0..count {
                let fx = part.x + r - rng.gen::<f32>() * r2;
                let fy = part.y + r - rng.gen::<f32>() * r2;
                if !fx.is_finite() || !fy.is_finite() || fx < 0.0 || fy < 0.0 {
                    continue;
                }
                let food = Food {
                    x: fx as u16,
                    y: fy as u16,
                    size: food_size,
                    color: rng.gen_range(0..FOOD_COLOR_COUNT),
                };
                if (food.x as u32) < bound && (food.y as u32) < bound {
                    if let Some(sector) = grid.get_mut(sx, sy) {
                        sector.insert_food(food);
                        self.spawn.push(food);
                    }
                }
            }
        }
        self.parts = parts;
    }

    pub fn update_box_center(&mut self) {
        let mut x = 0.0;
        let mut y = 0.0;
        for part in &self.parts {
            x += part.x;
            y += part.y;
        }
        self.sbb.x = x / self.parts.len() as f32;
        self.sbb.y = y / self.parts.len() as f32;
        self.vp.x = self.head_x();
        self.vp.y = self.head_y();
    }

    pub fn update_box_radius(&mut self) {
        // Closed-form chain length for step dist 42, k = 0.43: the first seven
        // inter-part distances settle to these values, the rest step by 24.
        let mut d = 42.0 + 42.0 + 42.0 + 37.7 + 37.7 + 33.0 + 28.5;
        if self.parts.len() > 8 {
            d += TAIL_STEP_DISTANCE * (self.parts.len() - 8) as f32;
        }
        // One movement step of lookahead.
        self.sbb.r = (d + MOVE_STEP_DISTANCE as f32) / 2.0;
        self.vp.r = SECTOR_DIAG_SIZE as f32 * 3.0;
    }

    pub fn update_snake_consts(&mut self) {
        let sct = self.parts.len() as f32;

        self.sc = (1.0 + (sct - 2.0) / 106.0).min(6.0);
        self.sc13 = self.sc.powf(1.3);
        self.lsz = 29.0 * self.sc;
        self.gsc = 0.5 + 0.4 / (1.0f32).max((sct + 16.0) / 36.0);

        let scang_x = (7.0 - self.sc) / 6.0;
        self.scang = 0.13 + 0.87 * scang_x * scang_x;

        self.ssp = super::constants::NSP1 + super::constants::NSP2 * self.sc;
        self.fsp = self.ssp + 0.1;

        self.sbpr = self.lsz * 0.5;
    }

    pub fn init_box_sectors(&mut self, grid: &mut SectorGrid) {
        self.sbb.update_sectors(grid);
        if !self.bot {
            self.vp.update_sectors();
        }
    }

    pub fn unlink_boxes(&mut self, grid: &mut SectorGrid) {
        self.sbb.unlink(grid);
    }

    /// Leaderboard score: `floor(15 * (fpsls[sct] + fam / fmlts[sct] - 1) - 5)`
    /// with `sct` floored at `target_score` during the spawn animation.
    pub fn score(&self) -> u16 {
        let (fmlts, fpsls) = score_tables();
        let mut sct = self.parts.len();
        if self.target_score > 0 && sct < self.target_score as usize {
            sct = self.target_score as usize;
        }
        if sct >= fmlts.len() {
            sct = fmlts.len() - 1;
        }
        let fam = self.fullness as f32 / 100.0;
        let raw = 15.0 * (fpsls[sct] + fam / fmlts[sct] - 1.0) - 5.0;
        raw.max(0.0) as u16
    }
}

fn score_tables() -> &'static (Vec<f32>, Vec<f32>) {
    static TABLES: OnceLock<(Vec<f32>, Vec<f32>)> = OnceLock::new();
    TABLES.get_or_init(|| {
        let n = MAX_SNAKE_PARTS as usize;
        let mut fmlts = vec![0.0f32; n];
        for (i, slot) in fmlts.iter_mut().enumerate() {
            *slot = (1.0 - i as f32 / n as f32).powf(2.25);
        }
        let mut fpsls = vec![0.0f32; n];
        for i in 1..n {
            fpsls[i] = fpsls[i - 1] + 1.0 / fmlts[i - 1];
        }
        (fmlts, fpsls)
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::straight_snake;
    use super::*;

    fn tuning() -> WorldTuning {
        WorldTuning::default()
    }

    fn move_interval(speed: u16) -> i64 {
        1000 * MOVE_STEP_DISTANCE as i64 / speed as i64
    }

    #[test]
    fn consts_for_minimal_snake() {
        let snake = straight_snake(1, 2, 10000.0, 10000.0, 0.0);
        assert!((snake.sc - 1.0).abs() < 1e-6);
        assert!((snake.sc13 - 1.0).abs() < 1e-6);
        assert!((snake.lsz - 29.0).abs() < 1e-6);
        assert!((snake.sbpr - 14.5).abs() < 1e-6);
        assert!((snake.gsc - 0.9).abs() < 1e-6);
        assert!((snake.scang - 1.0).abs() < 1e-6);
        assert!((snake.ssp - 5.79).abs() < 1e-5);
        assert!((snake.fsp - snake.ssp - 0.1).abs() < 1e-6);
    }

    #[test]
    fn movement_step_advances_head_by_move_distance() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 5, 10000.0, 10000.0, 0.0);
        let before = snake.head();

        let dt = move_interval(snake.speed);
        assert!(snake.tick(dt, &mut grid, &tuning()));
        assert!(snake.update & changed::POS != 0);

        let expected = snake.speed as f32 * dt as f32 / 1000.0;
        assert!((snake.head_x() - before.x - expected).abs() < 0.5);
        assert!((snake.head_y() - before.y).abs() < 1e-3);
    }

    #[test]
    fn straight_followers_take_predecessor_positions() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 6, 10000.0, 10000.0, 0.0);
        let before: Vec<Body> = snake.parts.clone();

        snake.tick(move_interval(snake.speed), &mut grid, &tuning());

        // Indices 1..parts_skip_count shift straight into the predecessor's
        // previous position.
        assert_eq!(snake.parts[1], before[0]);
        assert_eq!(snake.parts[2], before[1]);
    }

    #[test]
    fn rotation_steps_toward_wanted_angle_and_snaps() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 3, 10000.0, 10000.0, 0.0);
        snake.wangle = 0.2;

        assert!(snake.tick(ROT_STEP_INTERVAL_MS, &mut grid, &tuning()));
        let step = SNAKE_ANGULAR_SPEED * ROT_STEP_INTERVAL_MS as f32 / 1000.0;
        assert!(snake.angle > 0.0 && snake.angle <= step + 1e-4);

        // Enough accumulated time reaches the target exactly.
        for _ in 0..20 {
            snake.tick(ROT_STEP_INTERVAL_MS, &mut grid, &tuning());
        }
        assert!((snake.angle - 0.2).abs() < 1e-6);
    }

    #[test]
    fn rotation_takes_the_shortest_arc() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 3, 10000.0, 10000.0, 0.1);
        snake.wangle = normalize_angle(-0.1);

        snake.tick(ROT_STEP_INTERVAL_MS, &mut grid, &tuning());
        // Turning clockwise through zero, not the long way around.
        assert!(snake.angle < 0.1 || snake.angle > F_PI);
    }

    #[test]
    fn eat_scan_consumes_pellet_and_raises_fullness() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 2, 10000.0, 10000.0, 0.0);
        let food = Food {
            x: 10050,
            y: 10000,
            size: 5,
            color: 3,
        };
        let sector_x = (food.x / SECTOR_SIZE) as i16;
        let sector_y = (food.y / SECTOR_SIZE) as i16;
        grid.get_mut(sector_x, sector_y)
            .expect("sector")
            .insert_food(food);

        snake.tick(move_interval(snake.speed), &mut grid, &tuning());

        assert_eq!(snake.eaten, vec![food]);
        assert_eq!(snake.fullness, 5);
        assert!(grid
            .get(sector_x, sector_y)
            .expect("sector")
            .food
            .is_empty());
    }

    #[test]
    fn increase_grows_one_part_per_hundred_fullness() {
        let mut snake = straight_snake(1, 5, 10000.0, 10000.0, 0.0);
        snake.increase(99);
        assert_eq!(snake.parts.len(), 5);
        assert_eq!(snake.fullness, 99);

        snake.increase(1);
        assert_eq!(snake.parts.len(), 6);
        assert_eq!(snake.fullness, 0);
    }

    #[test]
    fn boost_pops_tail_and_drops_food_at_old_tail() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 50, 10000.0, 10000.0, 0.0);
        snake.target_score = 10;
        snake.acceleration = true;
        snake.init_box_sectors(&mut grid);
        let old_tail = *snake.parts.last().expect("tail");

        snake.tick(move_interval(snake.speed), &mut grid, &tuning());

        assert_eq!(snake.parts.len(), 49);
        assert_eq!(snake.spawn.len(), 1);
        let drop = snake.spawn[0];
        assert_eq!(drop.size, tuning().boost_drop_size);
        // The pellet lands where the popped tail segment sat after this
        // step's tail-follow, within a step of its pre-step position.
        assert!((drop.x as f32 - old_tail.x).abs() <= 2.0 * MOVE_STEP_DISTANCE as f32);
        assert!((drop.y as f32 - old_tail.y).abs() <= 1.0);
        assert_eq!(snake.fullness, 100 - tuning().boost_cost);
        assert!(snake.speed > BASE_MOVE_SPEED);
    }

    #[test]
    fn decrease_drops_pellets_at_the_popped_positions() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 20, 10000.0, 10000.0, 0.0);
        snake.target_score = 10;
        let tail = snake.parts[19];
        let next_tail = snake.parts[18];

        snake.decrease(150, 3, &mut grid);

        assert_eq!(snake.parts.len(), 18);
        assert_eq!(snake.spawn.len(), 2);
        assert_eq!(snake.spawn[0].x, tail.x as u16);
        assert_eq!(snake.spawn[0].y, tail.y as u16);
        assert_eq!(snake.spawn[1].x, next_tail.x as u16);
        assert!(snake.spawn.iter().all(|food| food.size == 3));
    }

    #[test]
    fn boost_cuts_out_at_the_shrink_floor() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 10, 10000.0, 10000.0, 0.0);
        snake.target_score = 10;
        snake.acceleration = true;

        snake.tick(move_interval(snake.speed), &mut grid, &tuning());

        assert!(!snake.acceleration);
        assert_eq!(snake.parts.len(), 10);
        assert!(snake.spawn.is_empty());
    }

    #[test]
    fn decrease_never_shrinks_below_floor() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 12, 10000.0, 10000.0, 0.0);
        snake.target_score = 10;

        snake.decrease(1000, 2, &mut grid);
        assert_eq!(snake.parts.len(), 10);
        assert!(snake.fullness < 100);
    }

    #[test]
    fn fullness_stays_in_range_after_shrink() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 20, 10000.0, 10000.0, 0.0);
        snake.target_score = 10;
        // volume % 100 == 0 must not refill to exactly 100.
        snake.decrease(100, 2, &mut grid);
        assert!(snake.fullness < 100);
    }

    #[test]
    fn spawn_animation_grows_toward_target_score() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 2, 10000.0, 10000.0, 0.0);
        snake.target_score = 6;

        for _ in 0..4 {
            snake.tick(move_interval(snake.speed), &mut grid, &tuning());
        }
        assert_eq!(snake.parts.len(), 6);

        snake.tick(move_interval(snake.speed), &mut grid, &tuning());
        assert_eq!(snake.parts.len(), 6);
    }

    #[test]
    fn dead_food_burst_emits_two_sc_pellets_per_part() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 8, 10000.0, 10000.0, 0.0);
        let mut rng = rand::thread_rng();

        snake.dead_food_burst(&mut grid, &mut rng);

        let per_part = (snake.sc * 2.0) as usize;
        assert_eq!(snake.spawn.len(), snake.parts.len() * per_part);
        let expected_size = (100 / per_part) as u8;
        assert!(snake.spawn.iter().all(|food| food.size == expected_size));
        assert!(snake.spawn.iter().all(|food| food.color < FOOD_COLOR_COUNT));

        let in_sectors: usize = grid.iter().map(|sector| sector.food.len()).sum();
        assert_eq!(in_sectors, snake.spawn.len());
    }

    #[test]
    fn score_orders_length_before_fullness() {
        let mut short = straight_snake(1, 5, 10000.0, 10000.0, 0.0);
        let mut fed = straight_snake(2, 5, 10000.0, 10000.0, 0.0);
        fed.fullness = 50;
        let long = straight_snake(3, 10, 10000.0, 10000.0, 0.0);
        short.fullness = 0;

        assert!(long.score() > fed.score());
        assert!(fed.score() > short.score());
    }

    #[test]
    fn fullness_invariant_holds_across_ticks() {
        let mut grid = SectorGrid::new();
        let mut snake = straight_snake(1, 30, 10000.0, 10000.0, 0.0);
        snake.target_score = 10;
        snake.acceleration = true;
        for _ in 0..50 {
            snake.tick(97, &mut grid, &tuning());
            assert!(snake.fullness < 100);
            assert!(snake.parts.len() >= 2);
        }
    }
}
