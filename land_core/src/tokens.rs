//! Static table of the currencies a land can be listed in.

use std::{
    collections::HashMap,
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use land_schema::{Amount, Felt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_TOKENS: &str = include_str!("data/tokens.json");

pub const TOKENS_PATH_ENV: &str = "PONZILAND_TOKENS_PATH";

/// Symbol shown when a land references a token missing from the table.
pub const UNKNOWN_SYMBOL: &str = "???";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub address: Felt,
    pub decimals: u8,
    #[serde(default, rename = "lpAddress", skip_serializing_if = "Option::is_none")]
    pub lp_address: Option<Felt>,
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    #[serde(rename = "availableTokens")]
    available_tokens: Vec<Token>,
}

#[derive(Debug, Error)]
pub enum TokenTableError {
    #[error("failed to parse token table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read token table from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("token {address} is listed twice")]
    Duplicate { address: Felt },
}

#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: Vec<Arc<Token>>,
    by_address: HashMap<Felt, usize>,
}

impl TokenTable {
    pub fn builtin() -> Arc<Self> {
        Arc::new(TokenTable::from_json_str(BUILTIN_TOKENS).expect("builtin token table should parse"))
    }

    pub fn from_json_str(json: &str) -> Result<Self, TokenTableError> {
        let file: TokenFile = serde_json::from_str(json)?;
        TokenTable::from_tokens(file.available_tokens)
    }

    pub fn from_file(path: &Path) -> Result<Self, TokenTableError> {
        let contents = fs::read_to_string(path).map_err(|source| TokenTableError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        TokenTable::from_json_str(&contents)
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self, TokenTableError> {
        let mut table = TokenTable::default();
        for token in tokens {
            if table.by_address.contains_key(&token.address) {
                return Err(TokenTableError::Duplicate {
                    address: token.address,
                });
            }
            table.by_address.insert(token.address, table.tokens.len());
            table.tokens.push(Arc::new(token));
        }
        Ok(table)
    }

    pub fn get(&self, address: &Felt) -> Option<&Arc<Token>> {
        self.by_address
            .get(address)
            .and_then(|index| self.tokens.get(*index))
    }

    /// Resolves an address, keeping unknown addresses as a degraded reference.
    pub fn resolve(&self, address: Felt) -> TokenRef {
        match self.get(&address) {
            Some(token) => TokenRef::Known(Arc::clone(token)),
            None => TokenRef::Unknown(address),
        }
    }

    pub fn symbol_for(&self, address: &Felt) -> &str {
        self.get(address)
            .map(|token| token.symbol.as_str())
            .unwrap_or(UNKNOWN_SYMBOL)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Token>> {
        self.tokens.iter()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Currency descriptor attached to a land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRef {
    Known(Arc<Token>),
    Unknown(Felt),
}

impl TokenRef {
    pub fn address(&self) -> Felt {
        match self {
            TokenRef::Known(token) => token.address,
            TokenRef::Unknown(address) => *address,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, TokenRef::Known(_))
    }

    pub fn symbol(&self) -> &str {
        match self {
            TokenRef::Known(token) => &token.symbol,
            TokenRef::Unknown(_) => UNKNOWN_SYMBOL,
        }
    }

    pub fn decimals(&self) -> Option<u8> {
        match self {
            TokenRef::Known(token) => Some(token.decimals),
            TokenRef::Unknown(_) => None,
        }
    }

    /// Human-readable amount; unknown tokens fall back to the raw integer.
    pub fn display_amount(&self, amount: Amount) -> String {
        match self.decimals() {
            Some(decimals) => format!("{} {}", format_scaled(amount, decimals), self.symbol()),
            None => format!("{} {}", amount.raw(), UNKNOWN_SYMBOL),
        }
    }
}

/// Renders a raw amount scaled by `decimals`: values of at least one unit keep
/// up to two decimals, smaller values keep two significant digits.
pub fn format_scaled(amount: Amount, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }
    let unit = 10u128.checked_pow(u32::from(decimals)).unwrap_or(u128::MAX);
    let whole = amount.raw() / unit;
    let fraction = amount.raw() % unit;

    if whole > 0 {
        let cents = if unit >= 100 {
            fraction / (unit / 100)
        } else {
            fraction * (100 / unit)
        };
        return if cents == 0 {
            whole.to_string()
        } else {
            format!("{whole}.{cents:02}")
        };
    }

    let digits = format!("{:0>width$}", fraction, width = usize::from(decimals));
    let leading_zeros = digits.chars().take_while(|c| *c == '0').count();
    let significant: String = digits[leading_zeros..].chars().take(2).collect();
    let significant = significant.trim_end_matches('0');
    format!("0.{}{}", "0".repeat(leading_zeros), significant)
}

pub fn load_token_table_from_env() -> Arc<TokenTable> {
    let Some(path) = env::var(TOKENS_PATH_ENV).ok().map(PathBuf::from) else {
        tracing::info!(target: "ponziland::config", "token_table.loaded=builtin");
        return TokenTable::builtin();
    };

    match TokenTable::from_file(&path) {
        Ok(table) => {
            tracing::info!(
                target: "ponziland::config",
                path = %path.display(),
                tokens = table.len(),
                "token_table.loaded=file"
            );
            Arc::new(table)
        }
        Err(err) => {
            tracing::warn!(
                target: "ponziland::config",
                path = %path.display(),
                error = %err,
                "token_table.load_failed"
            );
            TokenTable::builtin()
        }
    }
}
