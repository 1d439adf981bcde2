//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod deletion_log;
pub mod disbursement;
pub mod fund_source;
pub mod grant;
pub mod grant_year;
pub mod profile;

// Re-export specific types to avoid conflicts
pub use deletion_log::{
    Column as DeletionLogColumn, Entity as DeletionLog, Model as DeletionLogModel,
};
pub use disbursement::{
    Column as DisbursementColumn, Entity as Disbursement, Model as DisbursementModel,
};
pub use fund_source::{Column as FundSourceColumn, Entity as FundSource, Model as FundSourceModel};
pub use grant::{Column as GrantColumn, Entity as Grant, GrantStatus, Model as GrantModel};
pub use grant_year::{Column as GrantYearColumn, Entity as GrantYear, Model as GrantYearModel};
pub use profile::{
    Column as ProfileColumn, Entity as Profile, Model as ProfileModel, ProfileStatus, Role,
};
