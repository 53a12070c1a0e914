//! Client for the USDA FoodData Central API.

use std::time::Duration;

use failsafe::futures::CircuitBreaker;
use log::debug;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FoodRecord;
use crate::CircuitBreakerType;

const REQUEST_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum FoodApiError {
    #[error("request to food database failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("food database unavailable")]
    Unavailable,
}

/// One page of search results, as FoodData Central returns it. Also the
/// value stored in the search cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub food_search_criteria: SearchCriteria,
    #[serde(default)]
    pub total_hits: i64,
    #[serde(default)]
    pub current_page: i64,
    #[serde(default)]
    pub total_pages: i64,
    #[serde(default)]
    pub foods: Vec<FoodHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default)]
    pub general_search_input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodHit {
    pub fdc_id: i64,
    pub description: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub brand_owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodDetails {
    fdc_id: i64,
    description: String,
    #[serde(default)]
    ingredients: Option<String>,
}

impl From<FoodDetails> for FoodRecord {
    fn from(details: FoodDetails) -> Self {
        FoodRecord {
            ndbno: details.fdc_id,
            name: details.description,
            ingredients: details
                .ingredients
                .as_deref()
                .map(split_ingredients)
                .unwrap_or_default(),
        }
    }
}

pub struct FoodApi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    circuit_breaker: CircuitBreakerType,
}

impl FoodApi {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, FoodApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            circuit_breaker: crate::circuit_breaker(),
        })
    }

    pub async fn search(&self, term: &str, brand: Option<&str>) -> Result<SearchPage, FoodApiError> {
        let request = Box::pin(self.fetch_search(term, brand));
        match self.circuit_breaker.call(request).await {
            Ok(page) => Ok(page),
            Err(failsafe::Error::Rejected) => Err(FoodApiError::Unavailable),
            Err(failsafe::Error::Inner(e)) => Err(e),
        }
    }

    /// `None` when the food database has no food with this id.
    pub async fn food(&self, ndbno: i64) -> Result<Option<FoodRecord>, FoodApiError> {
        let request = Box::pin(self.fetch_food(ndbno));
        match self.circuit_breaker.call(request).await {
            Ok(details) => Ok(details.map(FoodRecord::from)),
            Err(failsafe::Error::Rejected) => Err(FoodApiError::Unavailable),
            Err(failsafe::Error::Inner(e)) => Err(e),
        }
    }

    async fn fetch_search(&self, term: &str, brand: Option<&str>) -> Result<SearchPage, FoodApiError> {
        let url = format!("{}/foods/search", self.base_url);
        let mut query = vec![("query", term), ("api_key", self.api_key.as_str())];
        if let Some(brand) = brand {
            query.push(("brandOwner", brand));
        }
        debug!("searching food database for '{}'", term);

        let page = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<SearchPage>()
            .await?;
        Ok(page)
    }

    async fn fetch_food(&self, ndbno: i64) -> Result<Option<FoodDetails>, FoodApiError> {
        let url = format!("{}/food/{}", self.base_url, ndbno);
        debug!("fetching food {} from food database", ndbno);

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;
        // the API answers 400 for ids it cannot parse and 404 for unknown ones
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json::<FoodDetails>().await?))
    }
}

/// Splits an ingredient statement such as
/// `"ENRICHED FLOUR (WHEAT FLOUR, NIACIN), SUGAR."` into its top-level
/// ingredients. Commas inside parentheses or brackets do not split.
pub fn split_ingredients(statement: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in statement.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);

    parts
        .iter()
        .map(|part| part.trim().trim_end_matches('.').trim())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
