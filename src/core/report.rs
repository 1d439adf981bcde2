//! Report generation and presentation formatting.
//!
//! Amounts are accumulated unrounded everywhere else; this module is the only
//! place they are rounded to two decimals.

use crate::{
    core::{
        disbursement::list_for_grant,
        grant::{GrantWithRelations, get_grant},
        ledger::GrantLedger,
    },
    entities::disbursement,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Header row of the grant CSV export.
pub const CSV_HEADERS: [&str; 5] = [
    "Project Name",
    "Amount Approved (RM)",
    "Year",
    "Fund Source",
    "Status",
];

const MISSING: &str = "N/A";

/// A grant with its ledger and latest payments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantReport {
    /// The grant and its relations
    pub grant: GrantWithRelations,
    /// Disbursed and remaining amounts
    pub ledger: GrantLedger,
    /// Share of the approved amount already disbursed (0-100, may exceed 100)
    pub utilization_percent: f64,
    /// Latest disbursements, most recent payment first
    pub recent_disbursements: Vec<disbursement::Model>,
}

/// Builds the report for one grant.
///
/// The ledger always covers every disbursement; `disbursement_limit` (default
/// 10) only trims the listed history.
pub async fn generate_grant_report(
    db: &DatabaseConnection,
    grant_id: i64,
    disbursement_limit: Option<usize>,
) -> Result<GrantReport> {
    let grant = get_grant(db, grant_id).await?;
    let disbursements = list_for_grant(db, grant_id).await?;
    let ledger = GrantLedger::new(grant.grant.amount_approved, &disbursements);

    Ok(GrantReport {
        utilization_percent: calculate_utilization(ledger.total_disbursed, ledger.amount_approved),
        ledger,
        recent_disbursements: disbursements
            .into_iter()
            .take(disbursement_limit.unwrap_or(10))
            .collect(),
        grant,
    })
}

/// Percentage of `approved` that has been disbursed. Zero when nothing was approved.
#[must_use]
pub fn calculate_utilization(disbursed: f64, approved: f64) -> f64 {
    if approved <= 0.0 {
        return 0.0;
    }
    (disbursed / approved) * 100.0
}

/// Text progress bar, e.g. `[█████░░░░░] 50.0%`.
#[must_use]
pub fn format_progress_bar(percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percent.clamp(0.0, 100.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = ((clamped / 100.0) * length as f64).round() as usize;
    let filled = filled.min(length);
    format!(
        "[{}{}] {percent:.1}%",
        "█".repeat(filled),
        "░".repeat(length - filled)
    )
}

/// Formats an amount as Malaysian ringgit, e.g. `RM1,234.56` or `-RM1,234.56`.
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // -0.001 rounds to 0.00 and should not carry a sign
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}RM{grouped}.{cents}")
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// One CSV row per grant, in the given order.
///
/// The header row is plain; every data cell is double-quoted. Missing years or
/// fund sources are written as `N/A`.
#[must_use]
pub fn export_grants_csv<'a>(rows: impl IntoIterator<Item = &'a GrantWithRelations>) -> String {
    let mut lines = vec![CSV_HEADERS.join(",")];
    for row in rows {
        let cells = [
            row.grant.project_name.clone(),
            format!("{:.2}", row.grant.amount_approved),
            row.year_value()
                .map_or_else(|| MISSING.to_string(), |year| year.to_string()),
            row.fund_source_name().unwrap_or(MISSING).to_string(),
            row.grant.status.as_str().to_string(),
        ];
        lines.push(cells.iter().map(|c| quote(c)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

/// Download name for an export made on `date`.
#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("grants_export_{}.csv", date.format("%Y-%m-%d"))
}
