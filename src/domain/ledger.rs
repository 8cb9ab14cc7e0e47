use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Satoshis, to_display_unit};

/// Balance summary for one address, in satoshis as reported upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub final_balance: Satoshis,
    pub total_received: Satoshis,
    pub total_sent: Satoshis,
    pub transaction_count: u64,
}

impl BalanceSnapshot {
    pub fn to_display(&self) -> DisplayBalance {
        DisplayBalance {
            final_balance: to_display_unit(self.final_balance),
            total_received: to_display_unit(self.total_received),
            total_sent: to_display_unit(self.total_sent),
            transaction_count: self.transaction_count,
        }
    }
}

/// [`BalanceSnapshot`] converted to BTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayBalance {
    pub final_balance: f64,
    pub total_received: f64,
    pub total_sent: f64,
    pub transaction_count: u64,
}

/// Best block known to the explorer at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTip {
    pub height: u64,
    pub hash: String,
    pub time: i64,
}

/// Number of blocks including and after the one at `block_height`.
///
/// Unconfirmed transactions and a missing tip both give 0, and so does a
/// tip that is behind the transaction's block.
pub fn confirmations(block_height: Option<u64>, tip_height: Option<u64>) -> u64 {
    match (block_height, tip_height) {
        (Some(height), Some(tip)) => (tip + 1).saturating_sub(height),
        _ => 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    /// Net effect on the queried addresses: zero or more counts as incoming.
    pub fn from_net(net_sats: i64) -> Self {
        if net_sats < 0 {
            Direction::Outgoing
        } else {
            Direction::Incoming
        }
    }
}

/// One spent previous output. Both fields are `None` for a coinbase input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    pub from_address: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub to_address: Option<String>,
    pub amount: f64,
}

/// A transaction as returned to callers. All amounts are in BTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub hash: String,
    pub block_height: Option<u64>,
    pub timestamp: i64,
    pub fee: f64,
    pub confirmations: u64,
    pub net_amount: f64,
    pub direction: Direction,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl TransactionView {
    pub fn is_confirmed(&self) -> bool {
        self.block_height.is_some()
    }
}

/// Balance and recent history for a single address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressView {
    pub address: String,
    pub balance: DisplayBalance,
    pub transactions: Vec<TransactionView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressBalance {
    pub address: String,
    pub balance: DisplayBalance,
}

/// Per-address balances plus one combined transaction feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiAddressView {
    pub addresses: Vec<AddressBalance>,
    pub transactions: Vec<TransactionView>,
}

/// Every requested address maps to its balance, or `None` when the
/// explorer had nothing for it.
pub type BalancesView = BTreeMap<String, Option<DisplayBalance>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusView {
    pub height: u64,
    pub hash: String,
    pub time: i64,
    /// `time` as RFC 3339 (UTC)
    pub timestamp: String,
}
