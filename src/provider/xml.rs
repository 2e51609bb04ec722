//! Serde model of the provider's XML catalog.
//!
//! Shape: `planList` → `output` → `base_plan*` → `plan*` → `zone*`, with
//! the interesting data in attributes. Unknown elements and attributes are
//! ignored so upstream schema drift does not break decoding. Fields are
//! optional and zone values stay text: a record missing its title or
//! carrying a malformed price is a per-record data-quality drop in the
//! mapper, not a document-level decode failure.

use serde::Deserialize;

use crate::error::MarketplaceError;

/// Root element `planList`.
#[derive(Debug, Deserialize)]
pub struct PlanList {
    #[serde(rename = "output")]
    pub output: Option<Output>,
}

/// Wrapper element `output` holding the base plans.
#[derive(Debug, Default, Deserialize)]
pub struct Output {
    #[serde(rename = "base_plan", default)]
    pub base_plans: Vec<BasePlan>,
}

/// A sellable plan family; `sell_mode` decides whether it is online.
#[derive(Debug, Deserialize)]
pub struct BasePlan {
    #[serde(rename = "@sell_mode")]
    pub sell_mode: Option<String>,
    #[serde(rename = "@title")]
    pub title: Option<String>,
    #[serde(rename = "plan", default)]
    pub plans: Vec<Plan>,
}

/// One scheduled occurrence of a base plan.
#[derive(Debug, Deserialize)]
pub struct Plan {
    #[serde(rename = "@plan_start_date")]
    pub plan_start_date: Option<String>,
    #[serde(rename = "@plan_end_date")]
    pub plan_end_date: Option<String>,
    #[serde(rename = "zone", default)]
    pub zones: Vec<Zone>,
}

/// A priced seating zone within a plan.
#[derive(Debug, Deserialize)]
pub struct Zone {
    #[serde(rename = "@capacity")]
    pub capacity: Option<String>,
    #[serde(rename = "@price")]
    pub price: Option<String>,
}

/// Decodes the raw catalog document.
///
/// # Errors
///
/// Returns [`MarketplaceError::Decode`] when the document is not a
/// well-formed `planList`.
pub fn decode_catalog(raw: &str) -> Result<PlanList, MarketplaceError> {
    quick_xml::de::from_str(raw).map_err(|e| MarketplaceError::Decode(e.to_string()))
}
