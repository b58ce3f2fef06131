//! Ledger scalar codecs.
//!
//! The indexer hands out numbers in whichever shape the ledger tooling
//! produced: JSON numbers, decimal strings, or `0x`-prefixed hex strings that
//! may be zero-padded to 64 digits. Everything here normalises those shapes.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use starknet_core::types::{Felt as StarkFelt, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected a number or numeric string, found {0}")]
    NotNumeric(String),
    #[error("hex value '{0}' is not valid")]
    InvalidHex(String),
    #[error("decimal value '{0}' is not valid")]
    InvalidDecimal(String),
    #[error("value '{value}' does not fit in {bits} bits")]
    Overflow { value: String, bits: u32 },
    #[error("value '{0}' is not below the field modulus")]
    OutOfField(String),
    #[error("expected a boolean, found {0}")]
    NotBoolean(String),
}

fn strip_hex_prefix(raw: &str) -> Option<&str> {
    raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))
}

/// Splits a hex literal of up to 256 bits into its `(high, low)` 128-bit words.
fn hex_words(raw: &str, digits: &str) -> Result<(u128, u128), ValueError> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValueError::InvalidHex(raw.to_string()));
    }
    let significant = digits.trim_start_matches('0');
    if significant.len() > 64 {
        return Err(ValueError::Overflow {
            value: raw.to_string(),
            bits: 256,
        });
    }
    let split = significant.len().saturating_sub(32);
    let (high, low) = significant.split_at(split);
    let word = |part: &str| {
        if part.is_empty() {
            Ok(0)
        } else {
            u128::from_str_radix(part, 16).map_err(|_| ValueError::InvalidHex(raw.to_string()))
        }
    };
    Ok((word(high)?, word(low)?))
}

fn words_from_bytes(bytes: &[u8; 32]) -> (u128, u128) {
    let mut high = [0u8; 16];
    let mut low = [0u8; 16];
    high.copy_from_slice(&bytes[..16]);
    low.copy_from_slice(&bytes[16..]);
    (u128::from_be_bytes(high), u128::from_be_bytes(low))
}

/// Parses a ledger integer of up to 256 bits. Decimal input wider than 128 bits
/// goes through the field parser and is bounded by the field modulus.
fn parse_u256_str(raw: &str) -> Result<U256, ValueError> {
    let trimmed = raw.trim();
    if let Some(digits) = strip_hex_prefix(trimmed) {
        let (high, low) = hex_words(raw, digits)?;
        Ok(U256::from_words(low, high))
    } else if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        match trimmed.parse::<u128>() {
            Ok(narrow) => Ok(U256::from_words(narrow, 0)),
            Err(_) => {
                let felt = Felt::from_decimal(raw, trimmed)?;
                let (high, low) = words_from_bytes(&felt.0.to_bytes_be());
                Ok(U256::from_words(low, high))
            }
        }
    } else {
        Err(ValueError::InvalidDecimal(raw.to_string()))
    }
}

fn parse_u128_str(raw: &str) -> Result<u128, ValueError> {
    let wide = parse_u256_str(raw)?;
    if wide.high() != 0 {
        return Err(ValueError::Overflow {
            value: raw.to_string(),
            bits: 128,
        });
    }
    Ok(wide.low())
}

/// Reads an unsigned integer of up to 128 bits from a JSON value.
pub fn u128_from_value(value: &Value) -> Result<u128, ValueError> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| ValueError::NotNumeric(number.to_string())),
        Value::String(text) => parse_u128_str(text),
        other => Err(ValueError::NotNumeric(other.to_string())),
    }
}

pub fn u64_from_value(value: &Value) -> Result<u64, ValueError> {
    let wide = u128_from_value(value)?;
    u64::try_from(wide).map_err(|_| ValueError::Overflow {
        value: value.to_string(),
        bits: 64,
    })
}

pub fn bool_from_value(value: &Value) -> Result<bool, ValueError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(ValueError::NotBoolean(number.to_string())),
        },
        other => Err(ValueError::NotBoolean(other.to_string())),
    }
}

/// A 252-bit ledger field element, used for contract and account addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Felt(StarkFelt);

impl Felt {
    pub const ZERO: Felt = Felt(StarkFelt::ZERO);

    pub fn from_u128(value: u128) -> Self {
        Self(StarkFelt::from(value))
    }

    /// Parses a `0x` literal, rejecting values at or above the field modulus.
    pub fn from_hex(raw: &str) -> Result<Self, ValueError> {
        let digits =
            strip_hex_prefix(raw.trim()).ok_or_else(|| ValueError::InvalidHex(raw.to_string()))?;
        let words = hex_words(raw, digits)?;
        if words > words_from_bytes(&StarkFelt::MAX.to_bytes_be()) {
            return Err(ValueError::OutOfField(raw.to_string()));
        }
        StarkFelt::from_hex(&format!("0x{digits}"))
            .map(Self)
            .map_err(|_| ValueError::InvalidHex(raw.to_string()))
    }

    fn from_decimal(raw: &str, digits: &str) -> Result<Self, ValueError> {
        let felt = StarkFelt::from_dec_str(digits)
            .map_err(|_| ValueError::InvalidDecimal(raw.to_string()))?;
        // The field parser reduces modulo the prime; a changed rendering means it wrapped.
        let canonical = match digits.trim_start_matches('0') {
            "" => "0",
            significant => significant,
        };
        if felt.to_string() != canonical {
            return Err(ValueError::OutOfField(raw.to_string()));
        }
        Ok(Self(felt))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == StarkFelt::ZERO
    }

    /// Abbreviated form for logs and maps, e.g. `0x0514...c9ff`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }

    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::String(text) => text.parse(),
            Value::Number(number) => number
                .as_u64()
                .map(|raw| Self::from_u128(u128::from(raw)))
                .ok_or_else(|| ValueError::NotNumeric(number.to_string())),
            other => Err(ValueError::NotNumeric(other.to_string())),
        }
    }
}

impl Default for Felt {
    fn default() -> Self {
        Felt::ZERO
    }
}

impl FromStr for Felt {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if strip_hex_prefix(trimmed).is_some() {
            Felt::from_hex(trimmed)
        } else if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            Felt::from_decimal(s, trimmed)
        } else {
            Err(ValueError::InvalidDecimal(s.to_string()))
        }
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0.to_bytes_be() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", self.short())
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Binary frames are not self-describing; they always carry the string form.
        if deserializer.is_human_readable() {
            let value = Value::deserialize(deserializer)?;
            Felt::from_value(&value).map_err(de::Error::custom)
        } else {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        }
    }
}

/// Raw (unscaled) token amount as stored on the ledger.
///
/// The ledger stores u256; amounts above `u128::MAX` saturate on the way in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn raw(self) -> u128 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// Lossy conversion used by the economic projections.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }

    pub fn from_f64(value: f64) -> Amount {
        if value.is_nan() || value <= 0.0 {
            Amount::ZERO
        } else if value >= u128::MAX as f64 {
            Amount(u128::MAX)
        } else {
            Amount(value.round() as u128)
        }
    }

    pub fn from_u256(wide: U256) -> Amount {
        if wide.high() == 0 {
            Amount(wide.low())
        } else {
            Amount(u128::MAX)
        }
    }

    /// The `(low, high)` words the contracts expect for a u256 argument.
    pub fn as_u256(self) -> U256 {
        U256::from_words(self.0, 0)
    }

    pub fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::String(text) => parse_u256_str(text).map(Amount::from_u256),
            other => u128_from_value(other).map(Amount),
        }
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Amount(value)
    }
}

impl FromStr for Amount {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_u256_str(s).map(Amount::from_u256)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let value = Value::deserialize(deserializer)?;
            Amount::from_value(&value).map_err(de::Error::custom)
        } else {
            let text = String::deserialize(deserializer)?;
            text.parse().map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amounts_accept_every_ledger_shape() {
        assert_eq!(Amount::from_value(&json!(500)).unwrap(), Amount(500));
        assert_eq!(Amount::from_value(&json!("500")).unwrap(), Amount(500));
        assert_eq!(Amount::from_value(&json!("0x1f4")).unwrap(), Amount(500));
        let padded = "0x000000000000000000000000000000000000000000000006f05b59d3b2000000";
        assert_eq!(
            Amount::from_value(&json!(padded)).unwrap(),
            Amount(128_000_000_000_000_000_000)
        );
        assert_eq!(Amount::from_value(&json!("0x0")).unwrap(), Amount::ZERO);
    }

    #[test]
    fn amount_rejects_garbage_and_overflow() {
        assert!(matches!(
            Amount::from_value(&json!("abc")),
            Err(ValueError::InvalidDecimal(_))
        ));
        assert!(matches!(
            Amount::from_value(&json!(true)),
            Err(ValueError::NotNumeric(_))
        ));
        let too_wide = format!("0x1{}", "0".repeat(64));
        assert!(matches!(
            Amount::from_value(&json!(too_wide)),
            Err(ValueError::Overflow { bits: 256, .. })
        ));
    }

    #[test]
    fn wide_amounts_saturate() {
        let two_pow_128 = format!("0x1{}", "0".repeat(32));
        assert_eq!(
            Amount::from_value(&json!(two_pow_128)).unwrap(),
            Amount(u128::MAX)
        );
        let decimal = "340282366920938463463374607431768211456";
        assert_eq!(decimal.parse::<Amount>().unwrap(), Amount(u128::MAX));
        let wide = Amount(u128::MAX).as_u256();
        assert_eq!((wide.low(), wide.high()), (u128::MAX, 0));
        assert!(matches!(
            u128_from_value(&json!(two_pow_128)),
            Err(ValueError::Overflow { bits: 128, .. })
        ));
    }

    #[test]
    fn felt_normalises_padding() {
        let short: Felt = "0xabc".parse().unwrap();
        let padded: Felt = format!("0x{:0>64}", "abc").parse().unwrap();
        assert_eq!(short, padded);
        assert_eq!(short.to_string(), format!("0x{:0>64}", "abc"));
        assert!(Felt::from_hex("0x0").unwrap().is_zero());
        assert!(Felt::from_hex(&format!("0x{}", "0".repeat(64))).unwrap().is_zero());
        assert!(!short.is_zero());
    }

    #[test]
    fn felt_rejects_values_outside_the_field() {
        let two_pow_252 = format!("0x1{}", "0".repeat(63));
        assert!(matches!(
            two_pow_252.parse::<Felt>(),
            Err(ValueError::OutOfField(_))
        ));
        let prime = "0x0800000000000011000000000000000000000000000000000000000000000001";
        assert!(matches!(prime.parse::<Felt>(), Err(ValueError::OutOfField(_))));
        let largest = "0x0800000000000011000000000000000000000000000000000000000000000000";
        assert_eq!(largest.parse::<Felt>().unwrap().to_string(), largest);
        let decimal_prime =
            "3618502788666131213697322783095070105623107215331596699973092056135872020481";
        assert!(decimal_prime.parse::<Felt>().is_err());
        assert_eq!("2748".parse::<Felt>().unwrap(), Felt::from_u128(0xabc));
    }

    #[test]
    fn felt_short_form() {
        let owner: Felt = "0x05144466224fde5d648d6295a2fb6e7cd45f2ca3ede06196728026f12c84c9ff"
            .parse()
            .unwrap();
        assert_eq!(owner.short(), "0x0514...c9ff");
    }

    #[test]
    fn u64_reports_overflow() {
        let big = json!(format!("0x{}", "f".repeat(20)));
        assert!(matches!(
            u64_from_value(&big),
            Err(ValueError::Overflow { bits: 64, .. })
        ));
        assert_eq!(u64_from_value(&json!("0x40")).unwrap(), 64);
    }

    #[test]
    fn booleans_accept_flags_and_bits() {
        assert!(bool_from_value(&json!(true)).unwrap());
        assert!(!bool_from_value(&json!(0)).unwrap());
        assert!(bool_from_value(&json!("true")).is_err());
    }
}
