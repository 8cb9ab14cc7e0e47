use anyhow::Result;
use std::io::Read;

use crate::application::{AppError, WatchService};
use crate::domain::AddressRef;
use crate::io::WatchListSnapshot;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
}

/// Importer for loading addresses into a user's watch list
pub struct Importer<'a> {
    service: &'a WatchService,
    user_id: &'a str,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a WatchService, user_id: &'a str) -> Self {
        Self { service, user_id }
    }

    /// Import addresses from CSV with `address` and optional `label` columns
    pub async fn import_addresses_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = Vec::new();
        let mut errors = Vec::new();

        for (line_num, result) in csv_reader.records().enumerate() {
            let line = line_num + 2; // +2 for header and 0-indexing

            match result {
                Ok(record) => {
                    let mut entry = AddressRef::new(record.get(0).unwrap_or(""));
                    if let Some(label) = record.get(1).filter(|s| !s.is_empty()) {
                        entry = entry.with_label(label);
                    }
                    rows.push((line, entry));
                }
                Err(e) => errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("CSV parse error: {}", e),
                }),
            }
        }

        let mut result = self.import_rows(rows, options).await?;
        errors.append(&mut result.errors);
        result.errors = errors;
        Ok(result)
    }

    /// Import addresses from a JSON snapshot produced by the exporter
    pub async fn import_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: WatchListSnapshot = serde_json::from_reader(reader)?;
        let rows = snapshot
            .addresses
            .into_iter()
            .enumerate()
            .map(|(i, entry)| (i + 1, entry.address_ref()))
            .collect();
        self.import_rows(rows, options).await
    }

    async fn import_rows(
        &self,
        rows: Vec<(usize, AddressRef)>,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut result = ImportResult::default();

        for (line, AddressRef { address, label }) in rows {
            if options.dry_run {
                match crate::application::validate_address(&address) {
                    Ok(_) => result.imported += 1,
                    Err(e) => result.errors.push(ImportError {
                        line,
                        field: Some("address".to_string()),
                        error: e.to_string(),
                    }),
                }
                continue;
            }

            match self
                .service
                .register_address(self.user_id, &address, label)
                .await
            {
                Ok(_) => result.imported += 1,
                Err(AppError::AlreadyWatched(_)) if options.skip_duplicates => {
                    result.skipped += 1;
                }
                Err(AppError::Database(e)) => return Err(e),
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: Some("address".to_string()),
                    error: e.to_string(),
                }),
            }
        }

        Ok(result)
    }
}
