// core/src/models/admin.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id: i64,
  pub name: String,
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  pub order_count: u32,
  #[serde(default)]
  pub total_spent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsOverview {
  pub total_revenue: f64,
  pub total_orders: u32,
  pub pending_orders: u32,
  pub paid_orders: u32,
  pub completed_orders: u32,
  pub cancelled_orders: u32,
  pub total_customers: u32,
  pub low_stock_products: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPoint {
  pub date: NaiveDate,
  pub revenue: f64,
  pub orders: u32,
}
