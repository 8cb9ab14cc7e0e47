use std::sync::Arc;

use tracing::info;

use crate::domain::{
    AddressView, BalancesView, MultiAddressView, StatusView, WatchedAddress, is_valid_address,
};
use crate::explorer::LedgerClient;
use crate::storage::{AddressRepository, Repository};

use super::{AppError, Aggregator};

/// Application service providing per-user watch-list operations.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct WatchService {
    repo: Arc<dyn AddressRepository>,
    aggregator: Aggregator,
}

impl WatchService {
    /// Create a new service from explicit collaborators.
    pub fn new(repo: Arc<dyn AddressRepository>, client: Arc<dyn LedgerClient>) -> Self {
        Self {
            repo,
            aggregator: Aggregator::new(client),
        }
    }

    /// Initialize a new database at the given path.
    pub async fn init(
        database_path: &str,
        client: Arc<dyn LedgerClient>,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(Arc::new(repo), client))
    }

    /// Connect to an existing database.
    pub async fn connect(
        database_path: &str,
        client: Arc<dyn LedgerClient>,
    ) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(Arc::new(repo), client))
    }

    // ========================
    // Watch-list operations
    // ========================

    /// Add an address to a user's watch list.
    pub async fn register_address(
        &self,
        user_id: &str,
        address: &str,
        label: Option<String>,
    ) -> Result<WatchedAddress, AppError> {
        let address = validate_address(address)?;

        let entry = WatchedAddress::new(address, normalize_label(label));
        if !self.repo.save_address(user_id, &entry).await? {
            return Err(AppError::AlreadyWatched(address.to_string()));
        }
        info!(user = user_id, address, "address registered");
        Ok(entry)
    }

    /// Get one entry of a user's watch list.
    pub async fn get_address(
        &self,
        user_id: &str,
        address: &str,
    ) -> Result<WatchedAddress, AppError> {
        let address = validate_address(address)?;
        self.repo
            .get_address(user_id, address)
            .await?
            .ok_or_else(|| AppError::NotFound(address.to_string()))
    }

    /// List a user's watch list.
    pub async fn list_addresses(&self, user_id: &str) -> Result<Vec<WatchedAddress>, AppError> {
        Ok(self.repo.list_addresses(user_id).await?)
    }

    /// Set or clear the label of a watched address.
    pub async fn relabel_address(
        &self,
        user_id: &str,
        address: &str,
        label: Option<String>,
    ) -> Result<WatchedAddress, AppError> {
        let address = validate_address(address)?;
        let label = normalize_label(label);

        if !self
            .repo
            .update_label(user_id, address, label.as_deref())
            .await?
        {
            return Err(AppError::NotFound(address.to_string()));
        }
        info!(user = user_id, address, "address relabeled");
        self.get_address(user_id, address).await
    }

    /// Remove an address from a user's watch list.
    pub async fn remove_address(&self, user_id: &str, address: &str) -> Result<(), AppError> {
        let address = validate_address(address)?;
        if !self.repo.delete_address(user_id, address).await? {
            return Err(AppError::NotFound(address.to_string()));
        }
        info!(user = user_id, address, "address removed");
        Ok(())
    }

    // ========================
    // Explorer views
    // ========================

    /// Balance and transactions for one watched address.
    pub async fn address_view(
        &self,
        user_id: &str,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<AddressView, AppError> {
        let entry = self.get_address(user_id, address).await?;
        self.aggregator
            .address_view(&entry.address, limit, offset)
            .await
    }

    /// Combined view over all of a user's addresses.
    /// An empty watch list gives an empty view without contacting the explorer.
    pub async fn portfolio_view(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<MultiAddressView, AppError> {
        let addresses = self.watched_addresses(user_id).await?;
        if addresses.is_empty() {
            return Ok(MultiAddressView::default());
        }
        self.aggregator
            .multi_address_view(&addresses, limit, offset)
            .await
    }

    /// Balances for all of a user's addresses.
    pub async fn balances_view(&self, user_id: &str) -> Result<BalancesView, AppError> {
        let addresses = self.watched_addresses(user_id).await?;
        self.aggregator.balances_view(&addresses).await
    }

    /// Explorer chain tip.
    pub async fn status(&self) -> Result<StatusView, AppError> {
        self.aggregator.status_view().await
    }

    async fn watched_addresses(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .repo
            .list_addresses(user_id)
            .await?
            .into_iter()
            .map(|entry| entry.address)
            .collect())
    }
}

/// Trim and check the shape of a user-supplied address.
pub fn validate_address(address: &str) -> Result<&str, AppError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AppError::Validation("address is required".to_string()));
    }
    if !is_valid_address(address) {
        return Err(AppError::Validation(format!(
            "not a valid Bitcoin address: {}",
            address
        )));
    }
    Ok(address)
}

fn normalize_label(label: Option<String>) -> Option<String> {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
}
