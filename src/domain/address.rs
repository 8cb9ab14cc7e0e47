use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An address on a user's watch list, with an optional human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRef {
    pub address: String,
    pub label: Option<String>,
}

impl AddressRef {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A stored watch-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedAddress {
    pub address: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WatchedAddress {
    pub fn new(address: impl Into<String>, label: Option<String>) -> Self {
        Self {
            address: address.into(),
            label,
            created_at: Utc::now(),
        }
    }

    pub fn address_ref(&self) -> AddressRef {
        AddressRef {
            address: self.address.clone(),
            label: self.label.clone(),
        }
    }
}

/// Address families recognized by [`is_valid_address`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    /// P2PKH / P2SH on mainnet (`1...`, `3...`)
    Legacy,
    /// Bech32 on mainnet (`bc1...`)
    Segwit,
    /// P2PKH / P2SH on testnet (`m...`, `n...`, `2...`)
    TestnetLegacy,
    /// Bech32 on testnet (`tb1...`)
    TestnetSegwit,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Legacy => "legacy",
            AddressKind::Segwit => "segwit",
            AddressKind::TestnetLegacy => "testnet_legacy",
            AddressKind::TestnetSegwit => "testnet_segwit",
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn is_base58(s: &str) -> bool {
    s.chars().all(|c| BASE58_ALPHABET.contains(c))
}

// Alphanumerics in a single case, prefix included (`bc1q...` or `BC1Q...`).
// The narrower bech32 data charset is not enforced.
fn is_bech32_like(s: &str) -> bool {
    let upper = s.chars().any(|c| c.is_ascii_uppercase());
    let lower = s.chars().any(|c| c.is_ascii_lowercase());
    s.chars().all(|c| c.is_ascii_alphanumeric()) && !(upper && lower)
}

/// Classify an address by its textual shape.
///
/// Only the prefix, character set and length are checked. Checksums are not
/// verified, so a string with a valid shape but a bad checksum is accepted.
/// Returns `None` for anything that does not fit one of the known families.
pub fn classify_address(address: &str) -> Option<AddressKind> {
    for (hrp, kind) in [("bc1", AddressKind::Segwit), ("tb1", AddressKind::TestnetSegwit)] {
        if address.get(..hrp.len()).is_some_and(|p| p.eq_ignore_ascii_case(hrp)) {
            // Body after the prefix: 39..=59 chars
            let rest = &address[hrp.len()..];
            return ((39..=59).contains(&rest.len()) && is_bech32_like(address)).then_some(kind);
        }
    }

    // Legacy forms: version char followed by a 25..=34 char base58 body
    let mut chars = address.chars();
    let kind = match chars.next()? {
        '1' | '3' => AddressKind::Legacy,
        '2' | 'm' | 'n' => AddressKind::TestnetLegacy,
        _ => return None,
    };
    let rest = chars.as_str();
    ((25..=34).contains(&rest.len()) && is_base58(rest)).then_some(kind)
}

/// Returns true when the string has the shape of a supported address.
pub fn is_valid_address(address: &str) -> bool {
    classify_address(address).is_some()
}
