//! Dashboard loading.
//!
//! Each section is fetched on its own; a failed read degrades only that
//! section to its empty default and is logged, the rest of the dashboard still
//! renders.

use crate::{
    core::{
        aggregation::{self, ChartColors, KpiTotals, MonthlyBucket, RemainingEntry, StatusCounts},
        grant::{self, GrantWithRelations},
    },
    entities::{Disbursement, FundSource, Grant, GrantYear, disbursement, grant as grant_entity},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::fmt::Display;
use tracing::{debug, warn};

/// Number of rows in each "recent" list.
pub const RECENT_LIMIT: u64 = 5;

/// A recent payment with the project it was paid to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentDisbursement {
    /// The payment
    pub disbursement: disbursement::Model,
    /// Parent project name, if the grant still resolves
    pub project_name: Option<String>,
}

/// Everything the dashboard shows, computed from one fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Headline figures over the active scope
    pub kpis: KpiTotals,
    /// Status distribution over all grants
    pub status_counts: StatusCounts,
    /// Approved budget per fund source, largest first
    pub budget_by_source: Vec<(String, f64)>,
    /// Active grants with the most left to disburse
    pub top_remaining: Vec<RemainingEntry>,
    /// Years offered by the monthly chart, most recent first
    pub available_years: Vec<i32>,
    /// Year the monthly chart shows
    pub selected_year: i32,
    /// Jan-Dec series for `selected_year`
    pub monthly: [MonthlyBucket; 12],
    /// Newest grants
    pub recent_grants: Vec<GrantWithRelations>,
    /// Latest payments
    pub recent_disbursements: Vec<RecentDisbursement>,
    /// Series colors for the charts above
    pub colors: ChartColors,
    #[serde(skip)]
    grants: Vec<GrantWithRelations>,
    #[serde(skip)]
    disbursements: Vec<disbursement::Model>,
}

impl DashboardSnapshot {
    /// Builds the snapshot from already-fetched rows.
    #[must_use]
    pub fn compute(
        grants: Vec<GrantWithRelations>,
        disbursements: Vec<disbursement::Model>,
        recent_grants: Vec<GrantWithRelations>,
        recent_disbursements: Vec<RecentDisbursement>,
        previous_year: Option<i32>,
        current_year: i32,
    ) -> Self {
        let available_years = aggregation::available_years(&grants, &disbursements, current_year);
        let selected_year = aggregation::select_year(&available_years, previous_year, current_year);

        let budget_by_source = aggregation::budget_by_fund_source(&grants);
        let top_remaining =
            aggregation::top_n_by_remaining(&grants, &disbursements, aggregation::DEFAULT_TOP_N);

        Self {
            kpis: aggregation::kpi_totals(&grants, &disbursements),
            status_counts: aggregation::counts_by_status(&grants),
            colors: ChartColors::for_series(&budget_by_source, &top_remaining),
            budget_by_source,
            top_remaining,
            monthly: aggregation::monthly_budget_vs_disbursed(
                selected_year,
                &grants,
                &disbursements,
            ),
            available_years,
            selected_year,
            recent_grants,
            recent_disbursements,
            grants,
            disbursements,
        }
    }

    /// Monthly series for another year, without refetching.
    #[must_use]
    pub fn monthly_series(&self, year: i32) -> [MonthlyBucket; 12] {
        aggregation::monthly_budget_vs_disbursed(year, &self.grants, &self.disbursements)
    }
}

fn or_default<T: Default, E: Display>(section: &str, result: std::result::Result<T, E>) -> T {
    result.unwrap_or_else(|e| {
        warn!(section, "Dashboard section unavailable: {e}");
        T::default()
    })
}

async fn all_disbursements(db: &DatabaseConnection) -> Result<Vec<disbursement::Model>> {
    Disbursement::find().all(db).await.map_err(Into::into)
}

/// Newest grants with their relations.
pub async fn recent_grants(db: &DatabaseConnection, limit: u64) -> Result<Vec<GrantWithRelations>> {
    let grants = Grant::find()
        .order_by_desc(grant_entity::Column::CreatedAt)
        .order_by_desc(grant_entity::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    let sources = FundSource::find().all(db).await?;
    let years = GrantYear::find().all(db).await?;
    Ok(GrantWithRelations::assemble(grants, &sources, &years))
}

/// Latest payments with their project names.
pub async fn recent_disbursements(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<RecentDisbursement>> {
    let rows = Disbursement::find()
        .find_also_related(Grant)
        .order_by_desc(disbursement::Column::PaymentDate)
        .order_by_desc(disbursement::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(disbursement, grant)| RecentDisbursement {
            disbursement,
            project_name: grant.map(|g| g.project_name),
        })
        .collect())
}

/// Loads every dashboard section concurrently and computes the snapshot.
///
/// `previous_year` is the year selected before this refresh, kept when it is
/// still available.
pub async fn load_dashboard(
    db: &DatabaseConnection,
    previous_year: Option<i32>,
    current_year: i32,
) -> DashboardSnapshot {
    let (grants, disbursements, latest_grants, latest_disbursements) = tokio::join!(
        grant::list_grants(db),
        all_disbursements(db),
        recent_grants(db, RECENT_LIMIT),
        recent_disbursements(db, RECENT_LIMIT),
    );

    let grants = or_default("grants", grants);
    let disbursements = or_default("disbursements", disbursements);
    debug!(
        grants = grants.len(),
        disbursements = disbursements.len(),
        "Dashboard data loaded"
    );

    DashboardSnapshot::compute(
        grants,
        disbursements,
        or_default("recent grants", latest_grants),
        or_default("recent disbursements", latest_disbursements),
        previous_year,
        current_year,
    )
}
