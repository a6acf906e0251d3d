//! Bulk Catalog Import
//!
//! Imports many stars in one request, from a JSON array or an uploaded CSV
//! file. Rows are applied independently: a bad row is recorded as a
//! per-row failure and the rest proceed, so one typo does not void a
//! hundred-row upload. Backend failures are not per-row problems and abort
//! the whole import.

use starpick_core::{Star, StoreError};
use starpick_storage::AppStore;

use crate::error::{ApiError, ApiResult};
use crate::types::{BulkFailure, StarUpload};
use crate::validation::{validate_star_name, validate_tier};

/// Result of a bulk import: what went in and what bounced.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    pub created: Vec<Star>,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.failures.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.created.is_empty() && !self.failures.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.created.is_empty() && !self.failures.is_empty()
    }
}

/// Apply an upload batch row by row. Rows are 1-indexed in failure reports
/// to match how people read CSVs. An empty batch is a no-op, not an error.
pub async fn import_stars(store: &dyn AppStore, rows: Vec<StarUpload>) -> ApiResult<BulkOutcome> {
    let mut outcome = BulkOutcome::default();

    for (idx, upload) in rows.into_iter().enumerate() {
        let row = idx + 1;
        match import_row(store, &upload).await {
            Ok(star) => outcome.created.push(star),
            Err(RowError::Rejected(reason)) => {
                outcome.failures.push(BulkFailure {
                    row,
                    name: upload.name,
                    reason,
                });
            }
            Err(RowError::Fatal(err)) => return Err(err),
        }
    }

    tracing::info!(
        created = outcome.created.len(),
        failed = outcome.failures.len(),
        "Bulk import finished"
    );
    Ok(outcome)
}

enum RowError {
    /// This row is bad; the import continues.
    Rejected(String),
    /// Storage itself failed; the import stops.
    Fatal(ApiError),
}

async fn import_row(store: &dyn AppStore, upload: &StarUpload) -> Result<Star, RowError> {
    let name = validate_star_name(&upload.name).map_err(|e| RowError::Rejected(e.message))?;
    let tier = validate_tier(upload.tier).map_err(|e| RowError::Rejected(e.message))?;

    match store.star_create(name, tier).await {
        Ok(star) => Ok(star),
        Err(StoreError::DuplicateName { name }) => Err(RowError::Rejected(format!(
            "A star named '{name}' already exists"
        ))),
        Err(other) => Err(RowError::Fatal(other.into())),
    }
}

/// Parse an uploaded CSV file into upload rows.
///
/// Expects a header row with `name` and `tier` columns; cells are trimmed.
/// Rows missing either value are skipped outright; a non-numeric tier is
/// kept and bounces off range validation as a per-row failure.
pub fn parse_csv(data: &[u8]) -> ApiResult<Vec<StarUpload>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| {
            ApiError::invalid_format("file", "CSV with name,tier columns")
                .with_details(serde_json::json!({ "error": e.to_string() }))
        })?
        .clone();
    let name_col = headers.iter().position(|h| h.eq_ignore_ascii_case("name"));
    let tier_col = headers.iter().position(|h| h.eq_ignore_ascii_case("tier"));
    let (Some(name_col), Some(tier_col)) = (name_col, tier_col) else {
        return Err(ApiError::invalid_format("file", "CSV with name,tier columns"));
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            ApiError::invalid_format("file", "CSV with name,tier columns")
                .with_details(serde_json::json!({ "error": e.to_string() }))
        })?;
        let name = record.get(name_col).unwrap_or("");
        let tier_cell = record.get(tier_col).unwrap_or("");
        if name.is_empty() || tier_cell.is_empty() {
            continue;
        }
        rows.push(StarUpload {
            name: name.to_string(),
            // 0 is out of range, so an unparsable tier fails its row.
            tier: tier_cell.parse().unwrap_or(0),
        });
    }
    Ok(rows)
}
