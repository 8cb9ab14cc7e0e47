use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use tracing::{debug, warn};

use crate::domain::{
    AddressBalance, AddressView, BalancesView, Direction, MultiAddressView, StatusView, TxInput,
    TxOutput, TransactionView, confirmations, signed_to_display_unit, to_display_unit,
};
use crate::explorer::{LedgerClient, MULTI_ADDRESS_TX_LIMIT, RawTransaction};

use super::AppError;

/// Turns explorer responses into the normalized views handed to callers.
///
/// Every call works on fresh data: nothing is cached between calls, and the
/// chain tip is read at most once per call.
pub struct Aggregator {
    client: Arc<dyn LedgerClient>,
}

impl Aggregator {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self { client }
    }

    /// Balance and up to `limit` transactions for one address.
    pub async fn address_view(
        &self,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<AddressView, AppError> {
        let info = self.client.fetch_address(address, limit, offset).await?;
        let tip_height = self.shared_tip_height(&info.txs).await;

        let watched = HashSet::from([address]);
        let transactions = info
            .txs
            .iter()
            .map(|tx| normalize_transaction(tx, tip_height, &watched))
            .collect();

        Ok(AddressView {
            address: address.to_string(),
            balance: info.balance().to_display(),
            transactions,
        })
    }

    /// Balances plus one combined feed for a set of addresses, fetched in a
    /// single explorer request.
    ///
    /// The explorer is asked for a full page and the feed is cut down to
    /// `limit` afterwards.
    pub async fn multi_address_view(
        &self,
        addresses: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<MultiAddressView, AppError> {
        if addresses.is_empty() {
            return Err(AppError::Validation(
                "at least one address is required".to_string(),
            ));
        }

        let info = self
            .client
            .fetch_multi_address(addresses, MULTI_ADDRESS_TX_LIMIT, offset)
            .await?;

        let mut txs = info.txs;
        txs.truncate(limit);
        let tip_height = self.shared_tip_height(&txs).await;

        let watched: HashSet<&str> = addresses.iter().map(String::as_str).collect();
        let transactions = txs
            .iter()
            .map(|tx| normalize_transaction(tx, tip_height, &watched))
            .collect();

        let addresses = info
            .addresses
            .iter()
            .map(|summary| AddressBalance {
                address: summary.address.clone(),
                balance: summary.balance().to_display(),
            })
            .collect();

        Ok(MultiAddressView {
            addresses,
            transactions,
        })
    }

    /// Balances only. Addresses the explorer returned nothing for map to `None`;
    /// an empty set gives an empty view without a request.
    pub async fn balances_view(&self, addresses: &[String]) -> Result<BalancesView, AppError> {
        if addresses.is_empty() {
            return Ok(BalancesView::new());
        }
        let mut found = self.client.fetch_balances(addresses).await?;

        Ok(addresses
            .iter()
            .map(|address| {
                let balance = found.remove(address).map(|b| b.to_display());
                (address.clone(), balance)
            })
            .collect())
    }

    /// Current chain tip.
    pub async fn status_view(&self) -> Result<StatusView, AppError> {
        let tip = self.client.fetch_chain_tip().await?;
        let timestamp = DateTime::from_timestamp(tip.time, 0)
            .ok_or_else(|| AppError::Internal(format!("block time out of range: {}", tip.time)))?
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        Ok(StatusView {
            height: tip.height,
            hash: tip.hash,
            time: tip.time,
            timestamp,
        })
    }

    /// Tip height shared by every transaction of one response.
    ///
    /// Skips the request when nothing is confirmed. A failed request is
    /// logged and yields `None`, which reports 0 confirmations.
    async fn shared_tip_height(&self, txs: &[RawTransaction]) -> Option<u64> {
        if !txs.iter().any(|tx| tx.block_height.is_some()) {
            return None;
        }

        match self.client.fetch_chain_tip().await {
            Ok(tip) => {
                debug!(height = tip.height, "chain tip for confirmations");
                Some(tip.height)
            }
            Err(e) => {
                warn!(error = %e, "chain tip unavailable, reporting 0 confirmations");
                None
            }
        }
    }
}

/// Convert one explorer transaction into a [`TransactionView`].
///
/// `watched` is the address set the transaction was queried for; it decides
/// the net amount and direction.
pub fn normalize_transaction(
    tx: &RawTransaction,
    tip_height: Option<u64>,
    watched: &HashSet<&str>,
) -> TransactionView {
    let is_watched = |addr: &Option<String>| addr.as_deref().is_some_and(|a| watched.contains(a));

    let mut net: i64 = 0;

    let inputs = tx
        .inputs
        .iter()
        .map(|input| match &input.prev_out {
            Some(prev) => {
                if is_watched(&prev.addr) {
                    net -= prev.value as i64;
                }
                TxInput {
                    from_address: prev.addr.clone(),
                    amount: Some(to_display_unit(prev.value)),
                }
            }
            None => TxInput {
                from_address: None,
                amount: None,
            },
        })
        .collect();

    let outputs = tx
        .out
        .iter()
        .map(|output| {
            if is_watched(&output.addr) {
                net += output.value as i64;
            }
            TxOutput {
                to_address: output.addr.clone(),
                amount: to_display_unit(output.value),
            }
        })
        .collect();

    TransactionView {
        hash: tx.hash.clone(),
        block_height: tx.block_height,
        timestamp: tx.time,
        fee: to_display_unit(tx.fee),
        confirmations: confirmations(tx.block_height, tip_height),
        net_amount: signed_to_display_unit(net),
        direction: Direction::from_net(net),
        inputs,
        outputs,
    }
}
