//! Catalog request/response types

use serde::{Deserialize, Serialize};
use starpick_core::{Star, Tier};

use crate::error::{ApiError, ApiResult};

/// Request body for creating a star directly (admin path, no audit).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateStarRequest {
    pub name: String,
    /// Ranking tier, 1..=5.
    pub tier: i16,
}

/// Request body for overwriting a star's name and tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateStarRequest {
    pub name: String,
    pub tier: i16,
}

/// Response for catalog listings and searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StarListResponse {
    pub stars: Vec<Star>,
    pub total: usize,
}

impl StarListResponse {
    pub fn new(stars: Vec<Star>) -> Self {
        let total = stars.len();
        Self { stars, total }
    }
}

/// Query parameters for catalog search. At least one of `key` and `tier`
/// must be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct SearchParams {
    /// Case-insensitive name substring.
    pub key: Option<String>,
    /// Comma-separated tier values, e.g. `tier=1,3`.
    pub tier: Option<String>,
}

impl SearchParams {
    pub fn is_empty(&self) -> bool {
        self.key.as_deref().is_none_or(str::is_empty) && self.tier.is_none()
    }

    /// Parse the comma-separated tier list into validated tiers.
    pub fn tiers(&self) -> ApiResult<Vec<Tier>> {
        let Some(raw) = self.tier.as_deref() else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let value: i16 = s
                    .parse()
                    .map_err(|_| ApiError::invalid_format("tier", "comma-separated integers"))?;
                Tier::new(value)
                    .map_err(|_| ApiError::invalid_range("tier", Tier::MIN, Tier::MAX))
            })
            .collect()
    }
}

/// One row of a bulk upload, from a JSON array element or a CSV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StarUpload {
    pub name: String,
    pub tier: i16,
}

/// Why one upload row was not imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BulkFailure {
    /// 1-indexed position in the uploaded batch.
    pub row: usize,
    pub name: String,
    pub reason: String,
}

/// Response for bulk imports. `201` when everything landed, `207` when some
/// rows bounced, `400` when nothing did.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BulkUploadResponse {
    pub created: Vec<Star>,
    pub failures: Vec<BulkFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_parse_tier_list() {
        let params = SearchParams {
            key: None,
            tier: Some("1, 3,5".to_string()),
        };
        let tiers = params.tiers().unwrap();
        assert_eq!(
            tiers.iter().map(Tier::value).collect::<Vec<_>>(),
            vec![1, 3, 5]
        );
    }

    #[test]
    fn search_params_reject_bad_tiers() {
        let params = SearchParams {
            key: None,
            tier: Some("2,9".to_string()),
        };
        assert!(params.tiers().is_err());

        let params = SearchParams {
            key: None,
            tier: Some("two".to_string()),
        };
        assert!(params.tiers().is_err());
    }

    #[test]
    fn empty_search_is_detected() {
        assert!(SearchParams::default().is_empty());
        assert!(SearchParams {
            key: Some(String::new()),
            tier: None
        }
        .is_empty());
        assert!(!SearchParams {
            key: Some("ve".to_string()),
            tier: None
        }
        .is_empty());
    }
}
