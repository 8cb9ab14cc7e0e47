use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{BalanceSnapshot, ChainTip};

use super::{AddressInfo, ExplorerError, LatestBlock, MultiAddressInfo, RawBalance};

/// Most transactions `/rawaddr` returns per page.
pub const ADDRESS_TX_LIMIT: usize = 50;

/// Most transactions `/multiaddr` returns per page.
pub const MULTI_ADDRESS_TX_LIMIT: usize = 100;

/// Separator for address lists in the `active` parameter.
pub const ADDRESS_DELIMITER: &str = "|";

pub const DEFAULT_BASE_URL: &str = "https://blockchain.info";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only queries against a public ledger explorer.
///
/// Implementations never retry and never serve cached data; every failure
/// is returned to the caller as it happened.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance plus up to `limit` (capped at [`ADDRESS_TX_LIMIT`]) transactions.
    async fn fetch_address(
        &self,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<AddressInfo, ExplorerError>;

    /// Balances and a combined feed for a non-empty address set, in one request.
    async fn fetch_multi_address(
        &self,
        addresses: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<MultiAddressInfo, ExplorerError>;

    /// Balances keyed by address. Addresses the explorer does not know may be
    /// missing from the result.
    async fn fetch_balances(
        &self,
        addresses: &[String],
    ) -> Result<HashMap<String, BalanceSnapshot>, ExplorerError>;

    async fn fetch_chain_tip(&self) -> Result<ChainTip, ExplorerError>;
}

/// Connection settings for [`ExplorerClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Applied to every request, connect through body.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`LedgerClient`] over the blockchain.info-style HTTP API.
pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExplorerClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("satwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ExplorerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "explorer request");

        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("cors", "true")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body.trim().to_string(),
                Err(e) => format!("<body unreadable: {}>", e),
            };
            return Err(ExplorerError::Upstream(format!(
                "{} returned {}: {}",
                path, status, body
            )));
        }

        response.json::<T>().await.map_err(|e| {
            ExplorerError::Upstream(format!("unreadable response from {}: {}", path, e))
        })
    }
}

#[async_trait]
impl LedgerClient for ExplorerClient {
    async fn fetch_address(
        &self,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<AddressInfo, ExplorerError> {
        let path = format!("/rawaddr/{}", address);
        let params = page_params("limit", limit, ADDRESS_TX_LIMIT, offset);
        self.get_json(&path, &params).await
    }

    async fn fetch_multi_address(
        &self,
        addresses: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<MultiAddressInfo, ExplorerError> {
        if addresses.is_empty() {
            return Err(ExplorerError::InvalidArgument(
                "multi-address lookup needs at least one address".to_string(),
            ));
        }

        let mut params = vec![("active", join_addresses(addresses))];
        params.extend(page_params("n", limit, MULTI_ADDRESS_TX_LIMIT, offset));
        self.get_json("/multiaddr", &params).await
    }

    async fn fetch_balances(
        &self,
        addresses: &[String],
    ) -> Result<HashMap<String, BalanceSnapshot>, ExplorerError> {
        if addresses.is_empty() {
            return Ok(HashMap::new());
        }

        let params = [("active", join_addresses(addresses))];
        let raw: HashMap<String, RawBalance> = self.get_json("/balance", &params).await?;

        Ok(raw
            .into_iter()
            .map(|(address, balance)| (address, balance.balance()))
            .collect())
    }

    async fn fetch_chain_tip(&self) -> Result<ChainTip, ExplorerError> {
        let block: LatestBlock = self.get_json("/latestblock", &[]).await?;
        Ok(block.into())
    }
}

/// Join addresses for the `active` query parameter.
pub fn join_addresses(addresses: &[String]) -> String {
    addresses.join(ADDRESS_DELIMITER)
}

/// Pagination parameters with the limit capped at `max`.
fn page_params(
    limit_key: &'static str,
    limit: usize,
    max: usize,
    offset: usize,
) -> Vec<(&'static str, String)> {
    vec![
        (limit_key, limit.min(max).to_string()),
        ("offset", offset.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single canned HTTP response and report the request line.
    async fn one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        raw_server(format!(
            "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        ))
        .await
    }

    /// Write `response` verbatim to the first connection, then close it.
    async fn raw_server(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request_line = read_request_line(&mut socket).await;
            let _ = tx.send(request_line);
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });

        (base_url, rx)
    }

    async fn read_request_line(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        String::from_utf8_lossy(&buf)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn client_for(base_url: &str, timeout: Duration) -> ExplorerClient {
        ExplorerClient::new(ClientConfig {
            base_url: base_url.to_string(),
            timeout,
        })
        .unwrap()
    }

    #[test]
    fn test_page_params_clamps_limit() {
        let params = page_params("limit", 500, ADDRESS_TX_LIMIT, 20);
        assert_eq!(
            params,
            vec![("limit", "50".to_string()), ("offset", "20".to_string())]
        );

        let params = page_params("n", 10, MULTI_ADDRESS_TX_LIMIT, 0);
        assert_eq!(params[0], ("n", "10".to_string()));
    }

    #[test]
    fn test_join_addresses() {
        let addresses = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(join_addresses(&addresses), "A|B|C");
        assert_eq!(join_addresses(&addresses[..1]), "A");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ExplorerClient::new(ClientConfig {
            base_url: "https://example.org/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(client.base_url(), "https://example.org");
    }

    #[tokio::test]
    async fn test_empty_inputs_short_circuit() {
        // Unroutable base URL: any request would fail
        let client = ExplorerClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(200),
        })
        .unwrap();

        let balances = client.fetch_balances(&[]).await.unwrap();
        assert!(balances.is_empty());

        let err = client.fetch_multi_address(&[], 10, 0).await.unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_is_upstream_error() {
        let client = ExplorerClient::new(ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_millis(500),
        })
        .unwrap();

        let err = client.fetch_chain_tip().await.unwrap_err();
        assert!(matches!(err, ExplorerError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fetch_address_request_shape() {
        let body = r#"{"address":"X","n_tx":0,"total_received":0,"total_sent":0,"final_balance":0,"txs":[]}"#;
        let (base_url, request) = one_shot_server("200 OK", body).await;
        let client = client_for(&base_url, Duration::from_secs(5));

        let info = client.fetch_address("X", 500, 0).await.unwrap();
        assert_eq!(info.address, "X");
        assert_eq!(
            request.await.unwrap(),
            "GET /rawaddr/X?limit=50&offset=0&cors=true HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_fetch_multi_address_request_shape() {
        let (base_url, request) = one_shot_server("200 OK", r#"{"addresses":[],"txs":[]}"#).await;
        let client = client_for(&base_url, Duration::from_secs(5));

        let addresses = vec!["A".to_string(), "B".to_string()];
        client.fetch_multi_address(&addresses, 250, 3).await.unwrap();
        assert_eq!(
            request.await.unwrap(),
            "GET /multiaddr?active=A%7CB&n=100&offset=3&cors=true HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_fetch_balances_request_shape() {
        let body = r#"{"A":{"final_balance":7,"n_tx":1,"total_received":7}}"#;
        let (base_url, request) = one_shot_server("200 OK", body).await;
        let client = client_for(&base_url, Duration::from_secs(5));

        let addresses = vec!["A".to_string(), "B".to_string()];
        let balances = client.fetch_balances(&addresses).await.unwrap();
        assert_eq!(balances["A"].final_balance, 7);
        assert!(!balances.contains_key("B"));
        assert_eq!(
            request.await.unwrap(),
            "GET /balance?active=A%7CB&cors=true HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error_with_body() {
        let (base_url, request) = one_shot_server("429 Too Many Requests", "rate limited").await;
        let client = client_for(&base_url, Duration::from_secs(5));

        let err = client.fetch_chain_tip().await.unwrap_err();
        assert_eq!(
            err,
            ExplorerError::Upstream(
                "/latestblock returned 429 Too Many Requests: rate limited".to_string()
            )
        );
        assert_eq!(
            request.await.unwrap(),
            "GET /latestblock?cors=true HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_reported() {
        // Promises more bytes than it sends
        let (base_url, _request) = raw_server(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\nconnection: close\r\n\r\npartial"
                .to_string(),
        )
        .await;
        let client = client_for(&base_url, Duration::from_secs(5));

        let err = client.fetch_chain_tip().await.unwrap_err();
        match err {
            ExplorerError::Upstream(msg) => assert!(
                msg.starts_with("/latestblock returned 500 Internal Server Error: <body unreadable"),
                "{}",
                msg
            ),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_upstream_error() {
        let (base_url, _request) = one_shot_server("200 OK", "not json").await;
        let client = client_for(&base_url, Duration::from_secs(5));

        let err = client.fetch_chain_tip().await.unwrap_err();
        match err {
            ExplorerError::Upstream(msg) => {
                assert!(msg.starts_with("unreadable response from /latestblock"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request_line(&mut socket).await;
            // Hold the connection open without answering
            std::future::pending::<()>().await;
            drop(socket);
        });

        let client = client_for(&base_url, Duration::from_millis(300));
        let err = client.fetch_chain_tip().await.unwrap_err();
        match err {
            ExplorerError::Upstream(msg) => assert!(msg.starts_with("request timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
