//! # Sales Statistics
//!
//! Aggregates for the dashboard's sales overview. Callers load the
//! completed sales of the current and the preceding window; everything
//! else happens here.
//!
//! ```text
//!        previous window              current window
//! ├──────────────────────────┼──────────────────────────┤
//! start − (now − start)     start                      now
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{PaymentMethod, Sale};

/// Number of products listed in `topProducts`.
pub const TOP_PRODUCTS: usize = 5;

// =============================================================================
// Periods
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    #[default]
    Today,
    Week,
    Month,
    Year,
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The window of equal length immediately before this one.
    pub fn previous(&self) -> Window {
        let length = self.end - self.start;
        Window {
            start: self.start - length,
            end: self.start,
        }
    }
}

/// Midnight (UTC) of the day containing `now`.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

impl StatsPeriod {
    /// The window ending at `now` covered by this period.
    pub fn window(&self, now: DateTime<Utc>) -> Window {
        let start = match self {
            StatsPeriod::Today => start_of_day(now),
            StatsPeriod::Week => now - Duration::days(7),
            StatsPeriod::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
            StatsPeriod::Year => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(now - Duration::days(365)),
        };
        Window { start, end: now }
    }
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Number of sales per payment method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct PaymentMethodCounts {
    pub cash: i64,
    pub card: i64,
    pub mobile_money: i64,
    pub debt: i64,
}

impl PaymentMethodCounts {
    fn record(&mut self, method: PaymentMethod) {
        match method {
            PaymentMethod::Cash => self.cash += 1,
            PaymentMethod::Card => self.card += 1,
            PaymentMethod::MobileMoney => self.mobile_money += 1,
            PaymentMethod::Debt => self.debt += 1,
        }
    }
}

/// Response of `GET /api/sales/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub period: StatsPeriod,
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub total_items_sold: i64,
    pub average_transaction_cents: f64,

    /// Percent change of total sales against the previous window.
    pub sales_trend: f64,

    pub top_products: Vec<TopProduct>,
    pub payment_methods: PaymentMethodCounts,
}

/// Response of `GET /api/sales/daily`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub total_sales_cents: i64,
    pub total_transactions: i64,
    pub items_sold: i64,
    pub average_transaction_cents: f64,
    pub sales_trend: f64,
}

// =============================================================================
// Computation
// =============================================================================

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn total_cents(sales: &[Sale]) -> i64 {
    sales
        .iter()
        .fold(0, |acc: i64, s| acc.saturating_add(s.total_amount_cents))
}

fn average(total: i64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(total as f64 / count as f64)
    }
}

/// Percent change from `previous` to `current`, 0 when there is no
/// baseline.
pub fn trend(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    round2((current - previous) as f64 / previous as f64 * 100.0)
}

/// Top products by revenue, ties broken by name for stable output.
pub fn top_products(sales: &[Sale], limit: usize) -> Vec<TopProduct> {
    let mut by_product: HashMap<&str, TopProduct> = HashMap::new();
    for item in sales.iter().flat_map(|s| &s.items) {
        let entry = by_product
            .entry(item.product_id.as_str())
            .or_insert_with(|| TopProduct {
                id: item.product_id.clone(),
                name: item.product_name.clone(),
                quantity: 0,
                revenue_cents: 0,
            });
        entry.quantity += item.quantity;
        entry.revenue_cents += item.total_price_cents;
    }

    let mut ranked: Vec<TopProduct> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue_cents
            .cmp(&a.revenue_cents)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(limit);
    ranked
}

/// Builds period statistics from the completed sales of the current and the
/// previous window.
pub fn sales_stats(period: StatsPeriod, current: &[Sale], previous: &[Sale]) -> SalesStats {
    let total = total_cents(current);
    let mut payment_methods = PaymentMethodCounts::default();
    for sale in current {
        payment_methods.record(sale.payment_method);
    }

    SalesStats {
        period,
        total_sales_cents: total,
        total_transactions: current.len() as i64,
        total_items_sold: current.iter().map(Sale::items_sold).sum(),
        average_transaction_cents: average(total, current.len()),
        sales_trend: trend(total, total_cents(previous)),
        top_products: top_products(current, TOP_PRODUCTS),
        payment_methods,
    }
}

/// Builds today-versus-yesterday statistics.
///
/// Unlike [`trend`], a day with sales after a day without any reports
/// +100%.
pub fn daily_stats(today: &[Sale], yesterday: &[Sale]) -> DailyStats {
    let total = total_cents(today);
    let previous = total_cents(yesterday);
    let sales_trend = match (previous, total) {
        (0, t) if t > 0 => 100.0,
        (0, _) => 0.0,
        _ => trend(total, previous),
    };

    DailyStats {
        total_sales_cents: total,
        total_transactions: today.len() as i64,
        items_sold: today.iter().map(Sale::items_sold).sum(),
        average_transaction_cents: average(total, today.len()),
        sales_trend,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SaleItem, SalePaymentStatus};
    use chrono::TimeZone;

    fn sale(total: i64, method: PaymentMethod, items: &[(&str, i64, i64)]) -> Sale {
        let now = Utc::now();
        Sale {
            id: uuid::Uuid::new_v4().to_string(),
            sale_number: "SALE-20240601-0001".into(),
            items: items
                .iter()
                .map(|(id, qty, revenue)| SaleItem {
                    product_id: id.to_string(),
                    product_name: format!("Product {id}"),
                    quantity: *qty,
                    unit_price_cents: revenue / qty,
                    total_price_cents: *revenue,
                })
                .collect(),
            subtotal_cents: total,
            discount_cents: 0,
            total_amount_cents: total,
            payment_method: method,
            payment_status: SalePaymentStatus::Completed,
            cashier_id: "u1".into(),
            cashier_name: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_windows() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 15, 30, 0).unwrap();

        let today = StatsPeriod::Today.window(now);
        assert_eq!(today.start, Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap());
        assert_eq!(
            today.previous().start,
            Utc.with_ymd_and_hms(2024, 3, 30, 8, 30, 0).unwrap()
        );

        let week = StatsPeriod::Week.window(now);
        assert_eq!(week.start, Utc.with_ymd_and_hms(2024, 3, 24, 15, 30, 0).unwrap());

        // Month arithmetic clamps to the end of February.
        let month = StatsPeriod::Month.window(now);
        assert_eq!(month.start, Utc.with_ymd_and_hms(2024, 2, 29, 15, 30, 0).unwrap());

        let year = StatsPeriod::Year.window(now);
        assert_eq!(year.start, Utc.with_ymd_and_hms(2023, 3, 31, 15, 30, 0).unwrap());
    }

    #[test]
    fn test_trend() {
        assert_eq!(trend(150, 100), 50.0);
        assert_eq!(trend(50, 150), -66.67);
        assert_eq!(trend(500, 0), 0.0);
    }

    #[test]
    fn test_sales_stats() {
        let current = vec![
            sale(1000, PaymentMethod::Cash, &[("a", 2, 600), ("b", 1, 400)]),
            sale(500, PaymentMethod::MobileMoney, &[("b", 1, 500)]),
            sale(250, PaymentMethod::Cash, &[("c", 5, 250)]),
        ];
        let previous = vec![sale(1000, PaymentMethod::Card, &[("a", 1, 1000)])];

        let stats = sales_stats(StatsPeriod::Week, &current, &previous);
        assert_eq!(stats.total_sales_cents, 1750);
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.total_items_sold, 9);
        assert_eq!(stats.average_transaction_cents, 583.33);
        assert_eq!(stats.sales_trend, 75.0);
        assert_eq!(stats.payment_methods.cash, 2);
        assert_eq!(stats.payment_methods.mobile_money, 1);

        let top: Vec<_> = stats
            .top_products
            .iter()
            .map(|p| (p.id.as_str(), p.revenue_cents))
            .collect();
        assert_eq!(top, vec![("b", 900), ("a", 600), ("c", 250)]);
    }

    #[test]
    fn test_top_products_limit() {
        let sales: Vec<Sale> = (0..8)
            .map(|i| {
                let id = format!("p{i}");
                sale(100 * (i + 1), PaymentMethod::Cash, &[(id.as_str(), 1, 100 * (i + 1))])
            })
            .collect();
        let top = top_products(&sales, TOP_PRODUCTS);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].id, "p7");
    }

    #[test]
    fn test_empty_stats() {
        let stats = sales_stats(StatsPeriod::Today, &[], &[]);
        assert_eq!(stats.total_sales_cents, 0);
        assert_eq!(stats.average_transaction_cents, 0.0);
        assert!(stats.top_products.is_empty());
    }

    #[test]
    fn test_daily_trend_without_baseline() {
        let today = vec![sale(300, PaymentMethod::Cash, &[("a", 3, 300)])];

        let daily = daily_stats(&today, &[]);
        assert_eq!(daily.sales_trend, 100.0);
        assert_eq!(daily.items_sold, 3);
        assert_eq!(daily.average_transaction_cents, 300.0);

        assert_eq!(daily_stats(&[], &[]).sales_trend, 0.0);

        let yesterday = vec![sale(600, PaymentMethod::Cash, &[("a", 6, 600)])];
        assert_eq!(daily_stats(&today, &yesterday).sales_trend, -50.0);
    }
}
