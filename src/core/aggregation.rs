//! Dashboard aggregation - Pure functions that turn grant and disbursement rows
//! into KPIs and chart series.
//!
//! Unless noted otherwise every figure is computed over the *active scope*:
//! grants whose status is `approved` or `ongoing`. All functions accept empty
//! input and return zero values or fully populated empty series.

use crate::{
    core::grant::GrantWithRelations,
    entities::{GrantStatus, disbursement},
};
use chrono::Datelike;
use serde::Serialize;
use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
};

/// Label used when a grant has no resolvable fund source.
pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Number of entries in the "top remaining" chart.
pub const DEFAULT_TOP_N: usize = 5;

/// Palette for fund-source series.
pub const FUND_SOURCE_PALETTE: [&str; 10] = [
    "#1e3a8a", "#0ea5e9", "#059669", "#f59e0b", "#7c3aed", "#ef4444", "#14b8a6", "#e11d48",
    "#84cc16", "#f97316",
];

/// Palette for the top-remaining chart.
pub const TOP_REMAINING_PALETTE: [&str; 5] = ["#1e3a8a", "#0ea5e9", "#7c3aed", "#059669", "#f59e0b"];

const FALLBACK_COLOR: &str = "#1e3a8a";

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Headline dashboard figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiTotals {
    /// Sum of approved amounts
    pub total_approved: f64,
    /// Sum of disbursements against active grants
    pub total_disbursed: f64,
    /// Approved minus disbursed; negative signals an upstream overshoot
    pub remaining_balance: f64,
}

/// One calendar month of the budget-vs-disbursed chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyBucket {
    /// Month number, 1-12
    pub month: u32,
    /// Short month label
    pub label: &'static str,
    /// Approved amounts of grants created this month
    pub budget_added: f64,
    /// Disbursements paid this month
    pub disbursed: f64,
}

/// Grant counts per status, over all grants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Grants in `approved`
    pub approved: usize,
    /// Grants in `ongoing`
    pub ongoing: usize,
    /// Grants in `completed`
    pub completed: usize,
}

impl StatusCounts {
    /// Counts in the fixed order approved, ongoing, completed.
    #[must_use]
    pub const fn series(&self) -> [(GrantStatus, usize); 3] {
        [
            (GrantStatus::Approved, self.approved),
            (GrantStatus::Ongoing, self.ongoing),
            (GrantStatus::Completed, self.completed),
        ]
    }

    /// Total number of grants counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.approved + self.ongoing + self.completed
    }
}

/// A grant ranked by what is left to disburse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemainingEntry {
    /// Grant id
    pub grant_id: i64,
    /// Project name
    pub project_name: String,
    /// Approved minus disbursed
    pub remaining: f64,
}

/// Iterates the grants that count towards the KPIs.
pub fn active_scope(grants: &[GrantWithRelations]) -> impl Iterator<Item = &GrantWithRelations> {
    grants
        .iter()
        .filter(|row| row.grant.status.is_active_scope())
}

fn active_ids(grants: &[GrantWithRelations]) -> HashSet<i64> {
    active_scope(grants).map(|row| row.grant.id).collect()
}

/// Sum of `amount_approved` over the active scope.
#[must_use]
pub fn total_approved(grants: &[GrantWithRelations]) -> f64 {
    active_scope(grants).map(|row| row.grant.amount_approved).sum()
}

/// Disbursed amount per active grant. Disbursements of grants outside the
/// active scope are ignored.
#[must_use]
pub fn disbursed_by_grant(
    grants: &[GrantWithRelations],
    disbursements: &[disbursement::Model],
) -> HashMap<i64, f64> {
    let active = active_ids(grants);
    let mut by_grant = HashMap::new();
    for d in disbursements.iter().filter(|d| active.contains(&d.grant_id)) {
        *by_grant.entry(d.grant_id).or_insert(0.0) += d.amount;
    }
    by_grant
}

/// Sum of all per-grant disbursed amounts.
#[must_use]
pub fn total_disbursed(by_grant: &HashMap<i64, f64>) -> f64 {
    by_grant.values().sum()
}

/// `Σ(amount_approved − disbursed)` over the active scope. Never clamped.
#[must_use]
pub fn remaining_balance(grants: &[GrantWithRelations], by_grant: &HashMap<i64, f64>) -> f64 {
    active_scope(grants)
        .map(|row| row.grant.amount_approved - by_grant.get(&row.grant.id).copied().unwrap_or(0.0))
        .sum()
}

/// All three headline figures at once.
#[must_use]
pub fn kpi_totals(grants: &[GrantWithRelations], disbursements: &[disbursement::Model]) -> KpiTotals {
    let by_grant = disbursed_by_grant(grants, disbursements);
    KpiTotals {
        total_approved: total_approved(grants),
        total_disbursed: total_disbursed(&by_grant),
        remaining_balance: remaining_balance(grants, &by_grant),
    }
}

/// Twelve Jan-Dec buckets for `year`: approved amounts by grant creation month
/// and disbursements by payment month. Empty months stay at zero.
#[must_use]
pub fn monthly_budget_vs_disbursed(
    year: i32,
    grants: &[GrantWithRelations],
    disbursements: &[disbursement::Model],
) -> [MonthlyBucket; 12] {
    let mut buckets: [MonthlyBucket; 12] = std::array::from_fn(|index| MonthlyBucket {
        month: u32::try_from(index + 1).unwrap_or_default(),
        label: MONTH_LABELS[index],
        budget_added: 0.0,
        disbursed: 0.0,
    });

    for row in active_scope(grants) {
        let created = row.grant.created_at;
        if created.year() == year {
            buckets[created.month0() as usize].budget_added += row.grant.amount_approved;
        }
    }

    let active = active_ids(grants);
    for d in disbursements.iter().filter(|d| active.contains(&d.grant_id)) {
        if d.payment_date.year() == year {
            buckets[d.payment_date.month0() as usize].disbursed += d.amount;
        }
    }

    buckets
}

/// Distinct years present in grant creation or payment dates of the active
/// scope, plus `current_year`, most recent first.
#[must_use]
pub fn available_years(
    grants: &[GrantWithRelations],
    disbursements: &[disbursement::Model],
    current_year: i32,
) -> Vec<i32> {
    let active = active_ids(grants);
    let mut years: BTreeSet<i32> = active_scope(grants)
        .map(|row| row.grant.created_at.year())
        .collect();
    years.extend(
        disbursements
            .iter()
            .filter(|d| active.contains(&d.grant_id))
            .map(|d| d.payment_date.year()),
    );
    years.insert(current_year);
    years.into_iter().rev().collect()
}

/// Year to show: the previous selection if still available, else the most
/// recent available year, else `current_year`.
#[must_use]
pub fn select_year(available: &[i32], previous: Option<i32>, current_year: i32) -> i32 {
    match previous {
        Some(year) if available.contains(&year) => year,
        _ => available.first().copied().unwrap_or(current_year),
    }
}

/// Status distribution over *all* grants, completed included.
#[must_use]
pub fn counts_by_status(grants: &[GrantWithRelations]) -> StatusCounts {
    grants
        .iter()
        .fold(StatusCounts::default(), |mut counts, row| {
            match row.grant.status {
                GrantStatus::Approved => counts.approved += 1,
                GrantStatus::Ongoing => counts.ongoing += 1,
                GrantStatus::Completed => counts.completed += 1,
            }
            counts
        })
}

/// Approved budget per fund-source name over the active scope, largest first.
/// Grants without a fund source are grouped under [`UNKNOWN_SOURCE`].
#[must_use]
pub fn budget_by_fund_source(grants: &[GrantWithRelations]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for row in active_scope(grants) {
        let name = row
            .fund_source_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(UNKNOWN_SOURCE);
        match totals.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, amount)) => *amount += row.grant.amount_approved,
            None => totals.push((name.to_string(), row.grant.amount_approved)),
        }
    }
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    totals
}

/// The `n` active grants with the most left to disburse. Ties keep the input
/// order.
#[must_use]
pub fn top_n_by_remaining(
    grants: &[GrantWithRelations],
    disbursements: &[disbursement::Model],
    n: usize,
) -> Vec<RemainingEntry> {
    let by_grant = disbursed_by_grant(grants, disbursements);
    let mut entries: Vec<RemainingEntry> = active_scope(grants)
        .map(|row| RemainingEntry {
            grant_id: row.grant.id,
            project_name: row.grant.project_name.clone(),
            remaining: row.grant.amount_approved
                - by_grant.get(&row.grant.id).copied().unwrap_or(0.0),
        })
        .collect();
    entries.sort_by(|a, b| {
        b.remaining
            .partial_cmp(&a.remaining)
            .unwrap_or(Ordering::Equal)
    });
    entries.truncate(n);
    entries
}

/// Picks a palette color for a category by hashing its trimmed name, so the
/// same name always gets the same color for a given palette.
#[must_use]
pub fn category_color<'a>(name: &str, palette: &[&'a str]) -> &'a str {
    if palette.is_empty() {
        return FALLBACK_COLOR;
    }
    // 32-bit FNV-1a
    let hash = name.trim().bytes().fold(0x811c_9dc5_u32, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193)
    });
    palette[hash as usize % palette.len()]
}

/// Color for the bar at `rank` in the top-remaining chart, cycling through
/// [`TOP_REMAINING_PALETTE`].
#[must_use]
pub const fn rank_color(rank: usize) -> &'static str {
    TOP_REMAINING_PALETTE[rank % TOP_REMAINING_PALETTE.len()]
}

/// Series colors for the dashboard charts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartColors {
    /// One color per status, in `StatusCounts::series` order
    pub status: Vec<(GrantStatus, &'static str)>,
    /// One color per fund-source series, keyed by name
    pub fund_sources: Vec<(String, &'static str)>,
    /// One color per top-remaining bar, by rank
    pub top_remaining: Vec<&'static str>,
}

impl ChartColors {
    /// Assigns colors to already-computed chart series.
    #[must_use]
    pub fn for_series(budget_by_source: &[(String, f64)], top_remaining: &[RemainingEntry]) -> Self {
        Self {
            status: StatusCounts::default()
                .series()
                .iter()
                .map(|&(status, _)| (status, status_color(status)))
                .collect(),
            fund_sources: budget_by_source
                .iter()
                .map(|(name, _)| (name.clone(), category_color(name, &FUND_SOURCE_PALETTE)))
                .collect(),
            top_remaining: (0..top_remaining.len()).map(rank_color).collect(),
        }
    }
}

/// Fixed color per status.
#[must_use]
pub const fn status_color(status: GrantStatus) -> &'static str {
    match status {
        GrantStatus::Approved => "#059669",
        GrantStatus::Ongoing => "#f59e0b",
        GrantStatus::Completed => "#1e3a8a",
    }
}
