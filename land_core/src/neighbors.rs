//! Moore neighborhood of a grid location.
//!
//! Candidates outside the grid are clipped; the grid never wraps around.

use std::sync::Arc;

use crate::cell::LandCell;
use crate::grid::CellSource;
use crate::location::Location;

/// Compass direction, in ledger order (row above left to right, same row,
/// row below).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    UpLeft,
    Up,
    UpRight,
    Left,
    Right,
    DownLeft,
    Down,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::UpLeft,
        Direction::Up,
        Direction::UpRight,
        Direction::Left,
        Direction::Right,
        Direction::DownLeft,
        Direction::Down,
        Direction::DownRight,
    ];

    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::UpLeft => (-1, -1),
            Direction::Up => (0, -1),
            Direction::UpRight => (1, -1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::DownLeft => (-1, 1),
            Direction::Down => (0, 1),
            Direction::DownRight => (1, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    origin: Location,
    slots: [Option<Location>; 8],
}

impl Neighborhood {
    pub fn origin(&self) -> Location {
        self.origin
    }

    pub fn get(&self, direction: Direction) -> Option<Location> {
        self.slots[direction as usize]
    }

    pub fn up(&self) -> Option<Location> {
        self.get(Direction::Up)
    }

    pub fn down(&self) -> Option<Location> {
        self.get(Direction::Down)
    }

    pub fn left(&self) -> Option<Location> {
        self.get(Direction::Left)
    }

    pub fn right(&self) -> Option<Location> {
        self.get(Direction::Right)
    }

    /// In-bounds neighbor locations in ledger order.
    pub fn iter(&self) -> impl Iterator<Item = Location> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, location: Location) -> bool {
        self.iter().any(|candidate| candidate == location)
    }
}

/// Up to eight neighbors of `location` on a `side`-wide grid.
pub fn neighbors_of(location: Location, side: u32) -> Neighborhood {
    let mut slots = [None; 8];
    if location.in_bounds(side) {
        let (x, y) = location.coordinates(side);
        for direction in Direction::ALL {
            let (dx, dy) = direction.offset();
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            if (0..i64::from(side)).contains(&nx) && (0..i64::from(side)).contains(&ny) {
                slots[direction as usize] = Some(Location::from_xy(nx as u32, ny as u32, side));
            }
        }
    }
    Neighborhood {
        origin: location,
        slots,
    }
}

/// Neighbors currently holding an owned building or auction.
pub fn live_neighbors<S: CellSource + ?Sized>(
    location: Location,
    source: &S,
) -> Vec<Arc<LandCell>> {
    neighbors_of(location, source.side())
        .iter()
        .filter_map(|candidate| source.land(candidate))
        .filter(|cell| cell.is_live())
        .collect()
}

pub fn live_neighbor_count<S: CellSource + ?Sized>(location: Location, source: &S) -> usize {
    neighbors_of(location, source.side())
        .iter()
        .filter_map(|candidate| source.land(candidate))
        .filter(|cell| cell.is_live())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_edge_and_interior_counts() {
        let side = 64;
        assert_eq!(neighbors_of(Location(0), side).len(), 3);
        assert_eq!(neighbors_of(Location(side * side - 1), side).len(), 3);
        assert_eq!(neighbors_of(Location(5), side).len(), 5);
        assert_eq!(neighbors_of(Location::from_xy(0, 10, side), side).len(), 5);
        assert_eq!(neighbors_of(Location::from_xy(10, 10, side), side).len(), 8);
    }

    #[test]
    fn row_ends_do_not_wrap() {
        let side = 4;
        let right_edge = neighbors_of(Location::from_xy(3, 1, side), side);
        assert_eq!(right_edge.right(), None);
        assert!(!right_edge.contains(Location::from_xy(0, 2, side)));
        assert!(!right_edge.contains(Location::from_xy(0, 1, side)));
    }

    #[test]
    fn every_side_stays_in_range() {
        for side in [1u32, 2, 3, 7] {
            for index in 0..side * side {
                let hood = neighbors_of(Location(index), side);
                assert!(hood.len() <= 8);
                assert!(hood.iter().all(|n| n.in_bounds(side) && n != Location(index)));
            }
        }
    }

    #[test]
    fn ledger_order() {
        let hood = neighbors_of(Location::from_xy(1, 1, 3), 3);
        let order: Vec<u32> = hood.iter().map(|location| location.0).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(hood.up(), Some(Location(1)));
        assert_eq!(hood.get(Direction::DownRight), Some(Location(8)));
    }
}
