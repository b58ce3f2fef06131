use std::fmt;

use land_schema::{u128_from_value, ValueError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Linear grid index, `y * side + x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Location(pub u32);

impl Location {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn from_xy(x: u32, y: u32, side: u32) -> Self {
        Self(y * side + x)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn x(self, side: u32) -> u32 {
        self.0 % side
    }

    #[inline]
    pub fn y(self, side: u32) -> u32 {
        self.0 / side
    }

    pub fn coordinates(self, side: u32) -> (u32, u32) {
        (self.x(side), self.y(side))
    }

    pub fn in_bounds(self, side: u32) -> bool {
        u64::from(self.0) < u64::from(side) * u64::from(side)
    }

    /// Location key as the ledger stores it: `0x` followed by 64 hex digits.
    pub fn to_padded_hex(self) -> String {
        format!("0x{:064x}", self.0)
    }

    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        let wide = u128_from_value(value)?;
        u32::try_from(wide)
            .map(Location)
            .map_err(|_| ValueError::Overflow {
                value: value.to_string(),
                bits: 32,
            })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Location {
    fn from(index: u32) -> Self {
        Location(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coordinates_follow_row_major_layout() {
        let location = Location::from_xy(3, 2, 64);
        assert_eq!(location, Location(131));
        assert_eq!(location.coordinates(64), (3, 2));
        assert!(location.in_bounds(64));
        assert!(!Location(64 * 64).in_bounds(64));
    }

    #[test]
    fn decodes_every_key_shape() {
        assert_eq!(Location::from_value(&json!(129)).unwrap(), Location(129));
        assert_eq!(Location::from_value(&json!("129")).unwrap(), Location(129));
        assert_eq!(Location::from_value(&json!("0x81")).unwrap(), Location(129));
        let padded = Location(129).to_padded_hex();
        assert_eq!(padded.len(), 66);
        assert_eq!(Location::from_value(&json!(padded)).unwrap(), Location(129));
        assert!(matches!(
            Location::from_value(&json!("0x100000000")),
            Err(ValueError::Overflow { bits: 32, .. })
        ));
    }
}
