//! Lab analytics: revenue, quotes, order volume, top services

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{own_lab, require_role, Deny};
use crate::auth::SessionClaims;
use crate::http::ApiError;
use crate::models::{OrderFact, OrderStatus, UserRole};
use crate::state::AppState;

const MONTHS: i32 = 12;
const TOP_SERVICES: usize = 10;

/// GET /api/analytics query string
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub timeframe: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[default]
    Last30Days,
    Last90Days,
    ThisYear,
    AllTime,
}

impl Timeframe {
    /// Unknown or missing values mean the last 30 days.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("last90days") => Self::Last90Days,
            Some("thisYear") => Self::ThisYear,
            Some("allTime") => Self::AllTime,
            _ => Self::Last30Days,
        }
    }

    pub fn window(self, now: DateTime<Utc>) -> Window {
        let rolling = |days: i64| {
            let start = now - Duration::days(days);
            Window {
                start,
                previous: Some((start - Duration::days(days), start)),
            }
        };
        match self {
            Self::Last30Days => rolling(30),
            Self::Last90Days => rolling(90),
            // compared against the whole previous calendar year
            Self::ThisYear => {
                let start = year_start(now.year());
                Window {
                    start,
                    previous: Some((year_start(now.year() - 1), start)),
                }
            }
            Self::AllTime => Window {
                start: year_start(2020),
                previous: None,
            },
        }
    }
}

fn year_start(year: i32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Current period start and the previous equal-length period `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub previous: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Window {
    /// Earliest timestamp the computation needs.
    pub fn earliest(&self) -> DateTime<Utc> {
        self.previous.map_or(self.start, |(start, _)| start.min(self.start))
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabAnalytics {
    pub revenue: RevenueStats,
    pub quotes: QuoteStats,
    pub orders: OrderVolume,
    pub top_services: Vec<TopService>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueStats {
    pub total: f64,
    pub monthly_breakdown: Vec<MonthlyRevenue>,
    /// Percent change versus the previous period
    pub growth: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
    pub order_count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteStats {
    pub total_quotes: i64,
    pub accepted_quotes: i64,
    pub acceptance_rate: f64,
    pub avg_quote_price: f64,
    pub pending_quotes: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderVolume {
    pub total_orders: i64,
    pub completed_orders: i64,
    pub in_progress_orders: i64,
    pub monthly_volume: Vec<MonthlyVolume>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyVolume {
    pub month: String,
    pub order_count: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopService {
    pub service_id: Uuid,
    pub service_name: String,
    pub revenue: f64,
    pub order_count: i64,
}

pub async fn get(
    state: &AppState,
    claims: &SessionClaims,
    query: AnalyticsQuery,
) -> Result<LabAnalytics, ApiError> {
    require_role(claims, UserRole::LabAdmin, Deny::Forbidden("Forbidden"))?;
    let lab = own_lab(state, claims)
        .await?
        .ok_or_else(|| ApiError::not_found("Lab not found"))?;

    let timeframe = Timeframe::parse(query.timeframe.as_deref());
    let now = Utc::now();
    let window = timeframe.window(now);
    let facts = state.store.order_facts(lab.id, Some(window.earliest())).await?;

    tracing::debug!(lab_id = %lab.id, ?timeframe, orders = facts.len(), "computing analytics");
    Ok(compute(&facts, &window, now))
}

fn month_key(year: i32, month0: i32) -> String {
    format!("{:04}-{:02}", year, month0 + 1)
}

/// The last twelve `YYYY-MM` keys ending with `now`'s month, oldest first.
fn month_keys(now: DateTime<Utc>) -> Vec<String> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..MONTHS)
        .rev()
        .map(|back| {
            let idx = current - back;
            month_key(idx.div_euclid(12), idx.rem_euclid(12))
        })
        .collect()
}

fn fact_month(fact: &OrderFact) -> String {
    month_key(fact.created_at.year(), fact.created_at.month0() as i32)
}

fn price(fact: &OrderFact) -> f64 {
    fact.quoted_price.unwrap_or(0.0)
}

pub fn compute(facts: &[OrderFact], window: &Window, now: DateTime<Utc>) -> LabAnalytics {
    let current: Vec<&OrderFact> = facts.iter().filter(|f| f.created_at >= window.start).collect();
    let completed: Vec<&OrderFact> = current
        .iter()
        .copied()
        .filter(|f| f.status == OrderStatus::Completed)
        .collect();

    let total: f64 = completed.iter().map(|f| price(f)).sum();
    let growth = match window.previous {
        None => 0.0,
        Some((start, end)) => {
            let previous: f64 = facts
                .iter()
                .filter(|f| f.status == OrderStatus::Completed)
                .filter(|f| f.created_at >= start && f.created_at < end)
                .map(price)
                .sum();
            if previous > 0.0 {
                (total - previous) / previous * 100.0
            } else if total > 0.0 {
                100.0
            } else {
                0.0
            }
        }
    };

    // monthly buckets, zero-filled
    let keys = month_keys(now);
    let mut revenue_by_month: BTreeMap<&str, (f64, i64)> =
        keys.iter().map(|k| (k.as_str(), (0.0, 0))).collect();
    let mut volume_by_month: BTreeMap<&str, i64> = keys.iter().map(|k| (k.as_str(), 0)).collect();
    for fact in &current {
        let key = fact_month(fact);
        if let Some(count) = volume_by_month.get_mut(key.as_str()) {
            *count += 1;
        }
        if fact.status == OrderStatus::Completed {
            if let Some((revenue, count)) = revenue_by_month.get_mut(key.as_str()) {
                *revenue += price(fact);
                *count += 1;
            }
        }
    }

    // quotes
    let quoted: Vec<&OrderFact> = current
        .iter()
        .copied()
        .filter(|f| f.quoted_price.is_some())
        .collect();
    let accepted: Vec<&OrderFact> = quoted
        .iter()
        .copied()
        .filter(|f| OrderStatus::ACCEPTED.contains(&f.status))
        .collect();
    let acceptance_rate = if quoted.is_empty() {
        0.0
    } else {
        accepted.len() as f64 / quoted.len() as f64 * 100.0
    };
    let avg_quote_price = if accepted.is_empty() {
        0.0
    } else {
        accepted.iter().map(|f| price(f)).sum::<f64>() / accepted.len() as f64
    };
    let count_status = |status: OrderStatus| current.iter().filter(|f| f.status == status).count() as i64;

    // top services by completed revenue
    let mut by_service: HashMap<Uuid, TopService> = HashMap::new();
    for fact in &completed {
        let entry = by_service.entry(fact.service_id).or_insert_with(|| TopService {
            service_id: fact.service_id,
            service_name: fact.service_name.clone(),
            revenue: 0.0,
            order_count: 0,
        });
        entry.revenue += price(fact);
        entry.order_count += 1;
    }
    let mut top_services: Vec<TopService> = by_service.into_values().collect();
    top_services.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.service_name.cmp(&b.service_name))
    });
    top_services.truncate(TOP_SERVICES);

    LabAnalytics {
        revenue: RevenueStats {
            total,
            monthly_breakdown: revenue_by_month
                .into_iter()
                .map(|(month, (revenue, order_count))| MonthlyRevenue {
                    month: month.to_owned(),
                    revenue,
                    order_count,
                })
                .collect(),
            growth,
        },
        quotes: QuoteStats {
            total_quotes: quoted.len() as i64,
            accepted_quotes: accepted.len() as i64,
            acceptance_rate,
            avg_quote_price,
            pending_quotes: count_status(OrderStatus::QuoteProvided),
        },
        orders: OrderVolume {
            total_orders: current.len() as i64,
            completed_orders: completed.len() as i64,
            in_progress_orders: count_status(OrderStatus::InProgress),
            monthly_volume: volume_by_month
                .into_iter()
                .map(|(month, order_count)| MonthlyVolume {
                    month: month.to_owned(),
                    order_count,
                })
                .collect(),
        },
        top_services,
    }
}
