use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::WatchService;
use crate::domain::WatchedAddress;

/// Watch-list snapshot for JSON export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchListSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub addresses: Vec<WatchedAddress>,
}

/// Exporter for writing a user's watch list to various formats
pub struct Exporter<'a> {
    service: &'a WatchService,
    user_id: &'a str,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a WatchService, user_id: &'a str) -> Self {
        Self { service, user_id }
    }

    /// Export watched addresses to CSV format
    pub async fn export_addresses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let addresses = self.service.list_addresses(self.user_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["address", "label", "created_at"])?;

        let mut count = 0;
        for entry in &addresses {
            let created_at = entry.created_at.to_rfc3339();
            csv_writer.write_record([
                entry.address.as_str(),
                entry.label.as_deref().unwrap_or_default(),
                created_at.as_str(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export live balances to CSV format (one explorer request)
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let addresses = self.service.list_addresses(self.user_id).await?;
        let balances = self.service.balances_view(self.user_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "address",
            "label",
            "final_balance",
            "total_received",
            "total_sent",
            "tx_count",
        ])?;

        let mut count = 0;
        for entry in &addresses {
            let label = entry.label.as_deref().unwrap_or_default();
            // Unknown to the explorer: leave the numbers blank
            let row = match balances.get(&entry.address).copied().flatten() {
                Some(b) => [
                    entry.address.clone(),
                    label.to_string(),
                    b.final_balance.to_string(),
                    b.total_received.to_string(),
                    b.total_sent.to_string(),
                    b.transaction_count.to_string(),
                ],
                None => [
                    entry.address.clone(),
                    label.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ],
            };
            csv_writer.write_record(&row)?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the watch list as a JSON snapshot
    pub async fn export_json<W: Write>(&self, mut writer: W) -> Result<WatchListSnapshot> {
        let addresses = self.service.list_addresses(self.user_id).await?;

        let snapshot = WatchListSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            addresses,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
