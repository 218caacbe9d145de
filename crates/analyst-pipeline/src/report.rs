//! Financial-data document returned by the upstream data service
//!
//! Every field is optional on the wire: missing or `null` strings decode as
//! empty, missing or `null` numbers as `0.0`, and a missing risk list as empty.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialReport {
    #[serde(deserialize_with = "nullable")]
    pub code: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub basic_info: BasicInfo,
    #[serde(deserialize_with = "nullable")]
    pub price: PriceInfo,
    #[serde(deserialize_with = "nullable")]
    pub financial_metrics: FinancialMetrics,
    #[serde(deserialize_with = "nullable")]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    #[serde(deserialize_with = "nullable")]
    pub industry: String,
    /// Market capitalisation, in 100 million CNY
    #[serde(deserialize_with = "nullable")]
    pub market_cap: f64,
    #[serde(deserialize_with = "nullable")]
    pub pe_ttm: f64,
    #[serde(deserialize_with = "nullable")]
    pub pb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceInfo {
    #[serde(deserialize_with = "nullable")]
    pub latest_price: f64,
    #[serde(deserialize_with = "nullable")]
    pub price_change_pct: f64,
    #[serde(deserialize_with = "nullable")]
    pub date: String,
}

/// Ratios are percentages (15.2 means 15.2%)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialMetrics {
    #[serde(deserialize_with = "nullable")]
    pub roe: f64,
    #[serde(deserialize_with = "nullable")]
    pub roa: f64,
    #[serde(deserialize_with = "nullable")]
    pub gross_margin: f64,
    #[serde(deserialize_with = "nullable")]
    pub net_margin: f64,
    #[serde(deserialize_with = "nullable")]
    pub debt_ratio: f64,
    #[serde(deserialize_with = "nullable")]
    pub current_ratio: f64,
    #[serde(deserialize_with = "nullable")]
    pub revenue_growth: f64,
    #[serde(deserialize_with = "nullable")]
    pub profit_growth: f64,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
