//! Database configuration module for the grant ledger.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, which also emits the foreign keys declared by
//! `belongs_to` relations: grants reference grant years and fund sources (restricting
//! deletion), and disbursements cascade with their grant.

use crate::entities::{DeletionLog, Disbursement, FundSource, Grant, GrantYear, Profile};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::debug;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/grant_ledger.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables, parents before children so foreign keys resolve.
///
/// Uses `IF NOT EXISTS`, so it is safe to call on every start-up.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Profile),
        schema.create_table_from_entity(FundSource),
        schema.create_table_from_entity(GrantYear),
        schema.create_table_from_entity(Grant),
        schema.create_table_from_entity(Disbursement),
        schema.create_table_from_entity(DeletionLog),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        DeletionLogModel, DisbursementModel, FundSourceModel, GrantModel, GrantYearModel,
        ProfileModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<ProfileModel> = Profile::find().limit(1).all(&db).await?;
        let _: Vec<FundSourceModel> = FundSource::find().limit(1).all(&db).await?;
        let _: Vec<GrantYearModel> = GrantYear::find().limit(1).all(&db).await?;
        let _: Vec<GrantModel> = Grant::find().limit(1).all(&db).await?;
        let _: Vec<DisbursementModel> = Disbursement::find().limit(1).all(&db).await?;
        let _: Vec<DeletionLogModel> = DeletionLog::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
