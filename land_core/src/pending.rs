use std::collections::HashMap;

use crate::cell::Stake;
use crate::location::Location;

/// Stakes that arrived before the building they belong to.
///
/// Holds at most one entry per location, so the buffer never grows past the
/// grid's cell count. A later stake for the same location overwrites the
/// earlier one.
#[derive(Debug, Default, Clone)]
pub struct PendingStakes {
    entries: HashMap<Location, Stake>,
}

impl PendingStakes {
    pub fn insert(&mut self, location: Location, stake: Stake) -> Option<Stake> {
        self.entries.insert(location, stake)
    }

    pub fn take(&mut self, location: Location) -> Option<Stake> {
        self.entries.remove(&location)
    }

    pub fn peek(&self, location: Location) -> Option<Stake> {
        self.entries.get(&location).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, Stake)> + '_ {
        self.entries.iter().map(|(location, stake)| (*location, *stake))
    }
}
