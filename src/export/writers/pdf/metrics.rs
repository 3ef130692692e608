//! Report aggregation
//!
//! Reduces records to the bounded series the report draws: the last N
//! months of volume, the top N status counts and the top N collaborators. Charts never
//! see raw rows.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::config::ReportConfig;
use crate::model::DomainRecord;
use crate::projector::format::{value_as_date, value_as_f64, value_as_text};
use crate::theme::StatusPalette;

use super::charts::ChartSeriesPoint;

const COMPLETED: &str = "completed";
const IN_PROGRESS: [&str; 2] = ["pending", "processing"];
const FAILED: &str = "error";
/// Label of the bucket holding statuses beyond the top N
const OTHER_STATUS: &str = "other";

/// Figures and series shown in the report
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetrics {
    pub total_volume: f64,
    pub transaction_count: usize,
    pub average_ticket: f64,
    /// Month-over-month volume growth, in percent
    pub growth: f64,
    /// Volume per month, oldest first
    pub monthly: Vec<ChartSeriesPoint>,
    /// Record count per status, largest first, the top N plus an "other" bucket
    pub status: Vec<ChartSeriesPoint>,
    /// Volume per collaborator, largest first
    pub collaborators: Vec<ChartSeriesPoint>,
    pub completion_rate: f64,
    pub in_progress_rate: f64,
    pub error_rate: f64,
}

/// Growth between the last two values, in percent
///
/// # Returns
/// * `f64` - `(last - previous) / previous * 100`, or 0 when there are fewer
///   than two values or the previous value is zero
pub fn growth_percentage(values: &[f64]) -> f64 {
    match values {
        [.., previous, last] if *previous != 0.0 => (last - previous) / previous * 100.0,
        _ => 0.0,
    }
}

fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// `(year, month)` of `date` shifted back by `months`
fn months_before(date: NaiveDate, months: usize) -> (i32, u32) {
    let index = date.year() * 12 + date.month0() as i32 - months as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%b %y").to_string())
        .unwrap_or_else(|| format!("{month:02}/{year}"))
}

/// Aggregate records into report metrics
///
/// # Arguments
/// * `records` - Rows in the export
/// * `config` - Record keys and series bounds
/// * `palette` - Colours for the status series
pub fn aggregate(records: &[DomainRecord], config: &ReportConfig, palette: &StatusPalette) -> ReportMetrics {
    let keys = &config.keys;
    let amount_of = |record: &DomainRecord| {
        record
            .get(&keys.amount)
            .and_then(value_as_f64)
            .unwrap_or(0.0)
    };
    let text_of = |record: &DomainRecord, key: &str| {
        record
            .get(key)
            .filter(|v| !v.is_null())
            .map(value_as_text)
            .unwrap_or_default()
    };

    let total_volume: f64 = records.iter().map(amount_of).sum();
    let transaction_count = records.len();
    let average_ticket = if transaction_count == 0 {
        0.0
    } else {
        total_volume / transaction_count as f64
    };

    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    let mut latest: Option<NaiveDate> = None;
    for record in records {
        if let Some(date) = record.get(&keys.date).and_then(value_as_date) {
            *by_month.entry((date.year(), date.month())).or_default() += amount_of(record);
            latest = latest.max(Some(date));
        }
    }
    let monthly: Vec<ChartSeriesPoint> = latest
        .map(|latest| {
            (0..config.months)
                .rev()
                .map(|back| {
                    let (year, month) = months_before(latest, back);
                    let volume = by_month.get(&(year, month)).copied().unwrap_or(0.0);
                    ChartSeriesPoint::new(month_label(year, month), volume)
                })
                .collect()
        })
        .unwrap_or_default();
    let growth = growth_percentage(&monthly.iter().map(|p| p.value).collect::<Vec<_>>());

    let mut status_counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        let status = text_of(record, &keys.status).trim().to_lowercase();
        let status = if status.is_empty() { "unknown".to_string() } else { status };
        *status_counts.entry(status).or_default() += 1;
    }
    let mut statuses: Vec<(String, usize)> = status_counts.into_iter().collect();
    statuses.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let count_of = |names: &[&str]| {
        statuses
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(_, count)| count)
            .sum::<usize>()
    };
    let completion_rate = share(count_of(&[COMPLETED]), transaction_count);
    let in_progress_rate = share(count_of(&IN_PROGRESS), transaction_count);
    let error_rate = share(count_of(&[FAILED]), transaction_count);

    let mut status: Vec<ChartSeriesPoint> = statuses
        .iter()
        .take(config.top_n)
        .map(|(name, count)| {
            ChartSeriesPoint::new(name.clone(), *count as f64).with_color(palette.color_for(name))
        })
        .collect();
    let rest: usize = statuses.iter().skip(config.top_n).map(|(_, count)| count).sum();
    if rest > 0 {
        let color = palette.color_for(OTHER_STATUS);
        status.push(ChartSeriesPoint::new(OTHER_STATUS, rest as f64).with_color(color));
    }

    let mut by_collaborator: HashMap<String, f64> = HashMap::new();
    for record in records {
        let name = text_of(record, &keys.collaborator);
        if !name.trim().is_empty() {
            *by_collaborator.entry(name.trim().to_string()).or_default() += amount_of(record);
        }
    }
    let mut collaborators: Vec<(String, f64)> = by_collaborator.into_iter().collect();
    collaborators.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let collaborators = collaborators
        .into_iter()
        .take(config.top_n)
        .map(|(name, volume)| ChartSeriesPoint::new(name, volume))
        .collect();

    ReportMetrics {
        total_volume,
        transaction_count,
        average_ticket,
        growth,
        monthly,
        status,
        collaborators,
        completion_rate,
        in_progress_rate,
        error_rate,
    }
}
