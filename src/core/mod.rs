//! Core business logic - framework-agnostic grant, ledger, team and dashboard
//! operations. Functions take a `DatabaseConnection` and, where a role check
//! applies, the caller's [`AuthContext`](crate::auth::AuthContext).

pub mod aggregation;
pub mod audit;
pub mod dashboard;
pub mod disbursement;
pub mod fund_source;
pub mod grant;
pub mod grant_year;
pub mod ledger;
pub mod report;
pub mod team;
