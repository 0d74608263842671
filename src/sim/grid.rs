//! Grid geometry
//!
//! Cells are integer `(x, y)` pairs with `y` growing downward, matching the
//! pixel space clients render in. Pixel positions are always `cell * cell_size`.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::config::RoomConfig;

/// A grid cell in cell units
pub type Cell = IVec2;

/// Heading of a train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    #[default]
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// One-cell offset for this heading
    #[inline]
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::North => IVec2::new(0, -1),
            Direction::East => IVec2::new(1, 0),
            Direction::South => IVec2::new(0, 1),
            Direction::West => IVec2::new(-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    #[inline]
    pub fn is_opposite(self, other: Direction) -> bool {
        self.opposite() == other
    }

    /// Counter-clockwise quarter turn (screen space)
    pub fn turn_left(self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
            Direction::East => Direction::North,
        }
    }

    /// Clockwise quarter turn (screen space)
    pub fn turn_right(self) -> Self {
        self.turn_left().opposite()
    }
}

/// Static room geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    /// Width in cells
    pub width: i32,
    /// Height in cells
    pub height: i32,
    /// Pixel size of one cell
    pub cell_size: i32,
}

impl GridWorld {
    pub fn new(width: i32, height: i32, cell_size: i32) -> Self {
        Self {
            width,
            height,
            cell_size,
        }
    }

    /// Grid for a room seating `players` trains; grows one cell per player
    pub fn for_players(config: &RoomConfig, players: usize) -> Self {
        let side = config.base_grid_cells + config.grid_cells_per_player * players as i32;
        Self::new(side, side, config.cell_size)
    }

    /// Whether the cell lies inside the walls
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Cell one step away in the given direction (may be outside the walls)
    #[inline]
    pub fn step(&self, cell: Cell, direction: Direction) -> Cell {
        cell + direction.delta()
    }

    #[inline]
    pub fn to_pixels(&self, cell: Cell) -> IVec2 {
        cell * self.cell_size
    }

    pub fn center(&self) -> Cell {
        IVec2::new(self.width / 2, self.height / 2)
    }

    pub fn cell_count(&self) -> usize {
        (self.width.max(0) * self.height.max(0)) as usize
    }

    /// All cells, row by row
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| IVec2::new(x, y)))
    }

    /// Chebyshev distance from the cell to the nearest wall
    pub fn wall_distance(&self, cell: Cell) -> i32 {
        cell.x
            .min(cell.y)
            .min(self.width - 1 - cell.x)
            .min(self.height - 1 - cell.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turns_are_orthogonal() {
        for dir in Direction::ALL {
            assert_eq!(dir.turn_left().turn_right(), dir);
            assert!(!dir.turn_left().is_opposite(dir));
            assert!(!dir.turn_right().is_opposite(dir));
            assert_eq!(dir.delta().dot(dir.turn_left().delta()), 0);
            assert_eq!(dir.opposite().opposite(), dir);
        }
        assert_eq!(Direction::North.turn_left(), Direction::West);
        assert_eq!(Direction::North.turn_right(), Direction::East);
    }

    #[test]
    fn test_contains_and_step() {
        let grid = GridWorld::new(10, 8, 20);
        assert!(grid.contains(IVec2::new(0, 0)));
        assert!(grid.contains(IVec2::new(9, 7)));
        assert!(!grid.contains(IVec2::new(10, 7)));
        assert!(!grid.contains(IVec2::new(-1, 0)));
        assert_eq!(
            grid.step(IVec2::new(9, 0), Direction::East),
            IVec2::new(10, 0)
        );
        assert_eq!(grid.cells().count(), grid.cell_count());
    }

    #[test]
    fn test_to_pixels() {
        let grid = GridWorld::new(10, 10, 20);
        assert_eq!(grid.to_pixels(IVec2::new(3, 7)), IVec2::new(60, 140));
        assert_eq!(grid.to_pixels(IVec2::ZERO), IVec2::ZERO);
    }

    #[test]
    fn test_grid_grows_with_players() {
        let config = RoomConfig::default();
        let grid = GridWorld::for_players(&config, 4);
        assert_eq!(grid.width, 24);
        assert_eq!(grid.height, 24);
        assert_eq!(grid.cell_size, 20);
    }
}
