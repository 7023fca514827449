use super::constants::{SECTOR_COUNT_ALONG_EDGE, SECTOR_SIZE};
use super::math::dist_sq;
use super::types::{Food, SnakeId};

/// One fixed-size square cell of the spatial grid.
#[derive(Debug)]
pub struct Sector {
    pub x: u8,
    pub y: u8,
    pub food: Vec<Food>,
    /// Non-owning membership of every snake whose bounding box touches this
    /// sector. Unlinked explicitly when the box moves away or is destroyed.
    pub snakes: Vec<SnakeId>,
    pub max_food_capacity: usize,
}

impl Sector {
    fn new(x: u8, y: u8) -> Self {
        Self {
            x,
            y,
            food: Vec::new(),
            snakes: Vec::new(),
            max_food_capacity: 20,
        }
    }

    pub fn insert_food(&mut self, food: Food) {
        self.food.push(food);
    }

    pub fn add_snake(&mut self, id: SnakeId) {
        if !self.snakes.contains(&id) {
            self.snakes.push(id);
        }
    }

    pub fn remove_snake(&mut self, id: SnakeId) {
        self.snakes.retain(|member| *member != id);
    }
}

/// The uniform N x N grid covering the arena square.
#[derive(Debug)]
pub struct SectorGrid {
    sectors: Vec<Sector>,
}

impl SectorGrid {
    pub fn new() -> Self {
        let n = SECTOR_COUNT_ALONG_EDGE as usize;
        let mut sectors = Vec::with_capacity(n * n);
        for y in 0..n {
            for x in 0..n {
                sectors.push(Sector::new(x as u8, y as u8));
            }
        }
        Self { sectors }
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn get(&self, x: i16, y: i16) -> Option<&Sector> {
        let n = SECTOR_COUNT_ALONG_EDGE as i16;
        if x < 0 || x >= n || y < 0 || y >= n {
            return None;
        }
        self.sectors.get(y as usize * n as usize + x as usize)
    }

    pub fn get_mut(&mut self, x: i16, y: i16) -> Option<&mut Sector> {
        let n = SECTOR_COUNT_ALONG_EDGE as i16;
        if x < 0 || x >= n || y < 0 || y >= n {
            return None;
        }
        self.sectors.get_mut(y as usize * n as usize + x as usize)
    }

    pub fn get_index_mut(&mut self, index: usize) -> &mut Sector {
        &mut self.sectors[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sector> {
        self.sectors.iter_mut()
    }
}

impl Default for SectorGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive rectangle of sector indices, clipped to the grid. Empty when
/// `x0 > x1` (or `y0 > y1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRect {
    pub x0: i16,
    pub y0: i16,
    pub x1: i16,
    pub y1: i16,
}

impl SectorRect {
    pub const EMPTY: Self = Self {
        x0: 0,
        y0: 0,
        x1: -1,
        y1: -1,
    };

    /// The clipped sector range `[(c - r) / s, (c + r) / s]` on both axes.
    pub fn covering(cx: f32, cy: f32, r: f32) -> Self {
        let n = SECTOR_COUNT_ALONG_EDGE as i16;
        let s = SECTOR_SIZE as f32;
        let x0 = (((cx - r) / s).floor() as i16).max(0);
        let x1 = (((cx + r) / s).floor() as i16).min(n - 1);
        let y0 = (((cy - r) / s).floor() as i16).max(0);
        let y1 = (((cy + r) / s).floor() as i16).min(n - 1);
        if x0 > x1 || y0 > y1 {
            return Self::EMPTY;
        }
        Self { x0, y0, x1, y1 }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    pub fn contains(&self, x: i16, y: i16) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn cells(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        let rect = *self;
        (rect.y0.max(0)..=rect.y1)
            .flat_map(move |y| (rect.x0.max(0)..=rect.x1).map(move |x| (x as u8, y as u8)))
    }
}

/// A circle that maintains its own sector-grid membership. On every move the
/// covered sector rectangle is re-derived; sectors left behind are notified
/// of removal and newly touched sectors of insertion.
#[derive(Debug)]
pub struct BoundBox {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    snake_id: SnakeId,
    rect: SectorRect,
}

impl BoundBox {
    pub fn new(snake_id: SnakeId, x: f32, y: f32, r: f32) -> Self {
        Self {
            x,
            y,
            r,
            snake_id,
            rect: SectorRect::EMPTY,
        }
    }

    pub fn rect(&self) -> SectorRect {
        self.rect
    }

    pub fn intersects(&self, other: &BoundBox) -> bool {
        let reach = self.r + other.r;
        dist_sq(self.x, self.y, other.x, other.y) < reach * reach
    }

    pub fn update_sectors(&mut self, grid: &mut SectorGrid) {
        let next = SectorRect::covering(self.x, self.y, self.r);
        if next == self.rect {
            return;
        }
        for (x, y) in self.rect.cells() {
            if !next.contains(x as i16, y as i16) {
                if let Some(sector) = grid.get_mut(x as i16, y as i16) {
                    sector.remove_snake(self.snake_id);
                }
            }
        }
        for (x, y) in next.cells() {
            if !self.rect.contains(x as i16, y as i16) {
                if let Some(sector) = grid.get_mut(x as i16, y as i16) {
                    sector.add_snake(self.snake_id);
                }
            }
        }
        self.rect = next;
    }

    pub fn unlink(&mut self, grid: &mut SectorGrid) {
        for (x, y) in self.rect.cells() {
            if let Some(sector) = grid.get_mut(x as i16, y as i16) {
                sector.remove_snake(self.snake_id);
            }
        }
        self.rect = SectorRect::EMPTY;
    }
}

/// The larger per-player box. Does not register in sector membership lists;
/// instead it records which sectors entered and left the view this tick so
/// the session layer can send sector-add, food-set and sector-remove packets.
#[derive(Debug)]
pub struct ViewPort {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    rect: SectorRect,
    pub new_sectors: Vec<(u8, u8)>,
    pub old_sectors: Vec<(u8, u8)>,
}

impl ViewPort {
    pub fn new(x: f32, y: f32, r: f32) -> Self {
        Self {
            x,
            y,
            r,
            rect: SectorRect::EMPTY,
            new_sectors: Vec::new(),
            old_sectors: Vec::new(),
        }
    }

    pub fn rect(&self) -> SectorRect {
        self.rect
    }

    pub fn contains_sector(&self, x: u8, y: u8) -> bool {
        self.rect.contains(x as i16, y as i16)
    }

    pub fn update_sectors(&mut self) {
        let next = SectorRect::covering(self.x, self.y, self.r);
        if next == self.rect {
            return;
        }
        for (x, y) in self.rect.cells() {
            if !next.contains(x as i16, y as i16) {
                self.old_sectors.push((x, y));
            }
        }
        for (x, y) in next.cells() {
            if !self.rect.contains(x as i16, y as i16) {
                self.new_sectors.push((x, y));
            }
        }
        self.rect = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::SECTOR_DIAG_SIZE;

    #[test]
    fn covering_clips_to_grid_bounds() {
        let rect = SectorRect::covering(-100.0, 10.0, 600.0);
        assert_eq!(rect.x0, 0);
        assert_eq!(rect.y0, 0);
        assert_eq!(rect.x1, 1);

        let far = 2.0 * 21600.0;
        let rect = SectorRect::covering(far, far, 600.0);
        assert_eq!(rect.x1, SECTOR_COUNT_ALONG_EDGE as i16 - 1);
        assert_eq!(rect.y1, SECTOR_COUNT_ALONG_EDGE as i16 - 1);
    }

    #[test]
    fn empty_rect_iterates_no_cells() {
        assert_eq!(SectorRect::EMPTY.cells().count(), 0);
        assert!(SectorRect::EMPTY.is_empty());
    }

    #[test]
    fn box_membership_matches_covered_rect() {
        let mut grid = SectorGrid::new();
        let mut sbb = BoundBox::new(7, 5000.0, 5000.0, 600.0);
        sbb.update_sectors(&mut grid);

        let rect = sbb.rect();
        assert!(!rect.is_empty());
        for sector in grid.iter() {
            let inside = rect.contains(sector.x as i16, sector.y as i16);
            assert_eq!(
                sector.snakes.contains(&7),
                inside,
                "sector ({}, {})",
                sector.x,
                sector.y
            );
        }
    }

    #[test]
    fn box_move_relinks_entered_and_left_sectors() {
        let mut grid = SectorGrid::new();
        let mut sbb = BoundBox::new(3, 5000.0, 5000.0, 200.0);
        sbb.update_sectors(&mut grid);
        let before = sbb.rect();

        sbb.x += SECTOR_SIZE as f32 * 2.0;
        sbb.update_sectors(&mut grid);
        let after = sbb.rect();
        assert_ne!(before, after);

        for sector in grid.iter() {
            let inside = after.contains(sector.x as i16, sector.y as i16);
            assert_eq!(sector.snakes.contains(&3), inside);
        }
    }

    #[test]
    fn unlink_clears_all_membership() {
        let mut grid = SectorGrid::new();
        let mut sbb = BoundBox::new(9, 8000.0, 8000.0, 900.0);
        sbb.update_sectors(&mut grid);
        sbb.unlink(&mut grid);
        assert!(grid.iter().all(|sector| sector.snakes.is_empty()));
        assert!(sbb.rect().is_empty());
    }

    #[test]
    fn viewport_records_entered_and_receded_sectors_on_east_crossing() {
        let s = SECTOR_SIZE as f32;
        let mut vp = ViewPort::new(10.0 * s + 240.0, 10.0 * s + 240.0, SECTOR_DIAG_SIZE as f32 * 3.0);
        vp.update_sectors();
        vp.new_sectors.clear();
        vp.old_sectors.clear();
        let before = vp.rect();

        // Cross one sector to the east.
        vp.x += s;
        vp.update_sectors();
        let after = vp.rect();

        assert_eq!(after.x0, before.x0 + 1);
        assert_eq!(after.x1, before.x1 + 1);
        assert!(!vp.new_sectors.is_empty());
        assert!(!vp.old_sectors.is_empty());
        assert!(vp.new_sectors.iter().all(|(x, _)| *x as i16 == after.x1));
        assert!(vp.old_sectors.iter().all(|(x, _)| *x as i16 == before.x0));
    }

    #[test]
    fn viewport_is_quiet_without_rect_change() {
        let mut vp = ViewPort::new(9000.0, 9000.0, 2040.0);
        vp.update_sectors();
        vp.new_sectors.clear();
        vp.old_sectors.clear();

        vp.x += 1.0;
        vp.update_sectors();
        assert!(vp.new_sectors.is_empty());
        assert!(vp.old_sectors.is_empty());
    }
}
