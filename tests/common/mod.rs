// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use satwatch::application::WatchService;
use satwatch::domain::{BalanceSnapshot, ChainTip};
use satwatch::explorer::{
    AddressInfo, AddressSummary, ExplorerError, LedgerClient, MultiAddressInfo, RawInput,
    RawOutput, RawTransaction,
};
use tempfile::TempDir;
use tracing::subscriber::DefaultGuard;

pub const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
pub const P2SH: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";
pub const SEGWIT: &str = "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq";

/// In-memory [`LedgerClient`] with canned responses and call counters.
#[derive(Default)]
pub struct FakeLedgerClient {
    pub address_info: Mutex<Option<AddressInfo>>,
    pub multi_info: Mutex<Option<MultiAddressInfo>>,
    pub balances: Mutex<HashMap<String, BalanceSnapshot>>,
    pub tip: Mutex<Option<ChainTip>>,

    pub fail_primary: AtomicBool,

    pub address_calls: AtomicUsize,
    pub multi_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub tip_calls: AtomicUsize,

    /// (limit, offset) of the last multi-address call
    pub last_multi_page: Mutex<Option<(usize, usize)>>,
}

impl FakeLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tip(self, height: u64) -> Self {
        *self.tip.lock().unwrap() = Some(ChainTip {
            height,
            hash: format!("{:064x}", height),
            time: 1_700_000_000,
        });
        self
    }

    pub fn with_address(self, info: AddressInfo) -> Self {
        *self.address_info.lock().unwrap() = Some(info);
        self
    }

    pub fn with_multi(self, info: MultiAddressInfo) -> Self {
        *self.multi_info.lock().unwrap() = Some(info);
        self
    }

    pub fn with_balance(self, address: &str, snapshot: BalanceSnapshot) -> Self {
        self.balances
            .lock()
            .unwrap()
            .insert(address.to_string(), snapshot);
        self
    }

    pub fn failing_primary(self) -> Self {
        self.fail_primary.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn check_primary(&self) -> Result<(), ExplorerError> {
        if self.fail_primary.load(Ordering::SeqCst) {
            Err(ExplorerError::Upstream("503 Service Unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerClient for FakeLedgerClient {
    async fn fetch_address(
        &self,
        address: &str,
        _limit: usize,
        _offset: usize,
    ) -> Result<AddressInfo, ExplorerError> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        self.check_primary()?;
        self.address_info
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExplorerError::Upstream(format!("no canned data for {}", address)))
    }

    async fn fetch_multi_address(
        &self,
        addresses: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<MultiAddressInfo, ExplorerError> {
        self.multi_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_multi_page.lock().unwrap() = Some((limit, offset));
        if addresses.is_empty() {
            return Err(ExplorerError::InvalidArgument("empty".to_string()));
        }
        self.check_primary()?;
        Ok(self.multi_info.lock().unwrap().clone().unwrap_or_default())
    }

    async fn fetch_balances(
        &self,
        addresses: &[String],
    ) -> Result<HashMap<String, BalanceSnapshot>, ExplorerError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if addresses.is_empty() {
            return Ok(HashMap::new());
        }
        self.check_primary()?;
        let balances = self.balances.lock().unwrap();
        Ok(addresses
            .iter()
            .filter_map(|a| balances.get(a).map(|b| (a.clone(), *b)))
            .collect())
    }

    async fn fetch_chain_tip(&self) -> Result<ChainTip, ExplorerError> {
        self.tip_calls.fetch_add(1, Ordering::SeqCst);
        self.tip
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExplorerError::Upstream("request timed out".to_string()))
    }
}

/// Transaction paying `value` sats from `from` to `to`.
pub fn payment(
    hash: &str,
    height: Option<u64>,
    from: &str,
    to: &str,
    value: u64,
) -> RawTransaction {
    RawTransaction {
        hash: hash.to_string(),
        block_height: height,
        time: 1_700_000_000,
        fee: 1_000,
        inputs: vec![RawInput {
            prev_out: Some(RawOutput {
                addr: Some(from.to_string()),
                value: value + 1_000,
            }),
        }],
        out: vec![RawOutput {
            addr: Some(to.to_string()),
            value,
        }],
    }
}

pub fn summary(address: &str, final_balance: u64) -> AddressSummary {
    AddressSummary {
        address: address.to_string(),
        n_tx: 1,
        total_received: final_balance,
        total_sent: 0,
        final_balance,
    }
}

/// Helper to create a test service with a temporary database
pub async fn test_service(client: Arc<FakeLedgerClient>) -> Result<(WatchService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = WatchService::init(db_path.to_str().unwrap(), client).await?;
    Ok((service, temp_dir))
}

/// Log lines captured by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing events at info and above into a buffer.
/// Only works with the default current-thread `#[tokio::test]` runtime.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}
