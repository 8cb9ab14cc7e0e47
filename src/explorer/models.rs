//! Wire shapes of the explorer's JSON responses.
//!
//! Only the fields the aggregator reads are declared; everything else in the
//! payload is ignored. Missing numeric fields default to zero.

use serde::Deserialize;

use crate::domain::{BalanceSnapshot, ChainTip, Satoshis};

/// `GET /rawaddr/{address}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressInfo {
    pub address: String,
    #[serde(default)]
    pub n_tx: u64,
    #[serde(default)]
    pub total_received: Satoshis,
    #[serde(default)]
    pub total_sent: Satoshis,
    #[serde(default)]
    pub final_balance: Satoshis,
    #[serde(default)]
    pub txs: Vec<RawTransaction>,
}

impl AddressInfo {
    pub fn balance(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            final_balance: self.final_balance,
            total_received: self.total_received,
            total_sent: self.total_sent,
            transaction_count: self.n_tx,
        }
    }
}

/// `GET /multiaddr`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiAddressInfo {
    #[serde(default)]
    pub addresses: Vec<AddressSummary>,
    #[serde(default)]
    pub txs: Vec<RawTransaction>,
}

/// Per-address entry of a multi-address response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressSummary {
    pub address: String,
    #[serde(default)]
    pub n_tx: u64,
    #[serde(default)]
    pub total_received: Satoshis,
    #[serde(default)]
    pub total_sent: Satoshis,
    #[serde(default)]
    pub final_balance: Satoshis,
}

impl AddressSummary {
    pub fn balance(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            final_balance: self.final_balance,
            total_received: self.total_received,
            total_sent: self.total_sent,
            transaction_count: self.n_tx,
        }
    }
}

/// Value of the `GET /balance` map, keyed by address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBalance {
    #[serde(default)]
    pub final_balance: Satoshis,
    #[serde(default)]
    pub n_tx: u64,
    #[serde(default)]
    pub total_received: Satoshis,
    /// Not sent by the balance endpoint; derived when absent.
    #[serde(default)]
    pub total_sent: Option<Satoshis>,
}

impl RawBalance {
    pub fn balance(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            final_balance: self.final_balance,
            total_received: self.total_received,
            total_sent: self
                .total_sent
                .unwrap_or_else(|| self.total_received.saturating_sub(self.final_balance)),
            transaction_count: self.n_tx,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    /// Absent or null while the transaction sits in the mempool.
    #[serde(default)]
    pub block_height: Option<u64>,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub fee: Satoshis,
    #[serde(default)]
    pub inputs: Vec<RawInput>,
    #[serde(default)]
    pub out: Vec<RawOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInput {
    /// `None` for coinbase inputs.
    #[serde(default)]
    pub prev_out: Option<RawOutput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOutput {
    /// `None` for scripts without a standard address (e.g. OP_RETURN).
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub value: Satoshis,
}

/// `GET /latestblock`
#[derive(Debug, Clone, Deserialize)]
pub struct LatestBlock {
    pub hash: String,
    pub height: u64,
    pub time: i64,
}

impl From<LatestBlock> for ChainTip {
    fn from(block: LatestBlock) -> Self {
        ChainTip {
            height: block.height,
            hash: block.hash,
            time: block.time,
        }
    }
}
