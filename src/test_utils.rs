//! Shared test utilities for the grant ledger.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test entities with sensible defaults, and fake remote services.

#![allow(clippy::unwrap_used)]

use crate::{
    auth::AuthContext,
    core::{
        grant::GrantWithRelations,
        team::{AdminFunctions, DeleteUserRequest, InviteRequest, ResetLinkRequest},
    },
    entities::{
        GrantStatus, ProfileStatus, Role, disbursement, fund_source, grant, grant_year, profile,
    },
    errors::{Error, Result},
    identity::{GeneratedLink, IdentityAdmin, IdentityUser, LinkKind, LinkRequest},
};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::{collections::HashMap, sync::Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

fn context(user_id: &str, role: Role) -> AuthContext {
    AuthContext {
        user_id: user_id.to_string(),
        email: format!("{user_id}@example.com"),
        full_name: None,
        role,
    }
}

/// Context for a `user` with no stored profile.
pub fn user_context() -> AuthContext {
    context("staff-user", Role::User)
}

/// Context for an `admin` with no stored profile.
pub fn admin_context() -> AuthContext {
    context("admin-user", Role::Admin)
}

/// Context for a `super_admin` with no stored profile.
pub fn super_admin_context() -> AuthContext {
    context("super-user", Role::SuperAdmin)
}

async fn insert_profile(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
    status: ProfileStatus,
) -> Result<profile::Model> {
    let local = email.split('@').next().unwrap_or(email);
    let row = profile::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(email.to_string()),
        role: Set(role),
        full_name: Set(Some(format!("Test {local}"))),
        status: Set(status),
        created_at: Set(Utc::now()),
    };
    Ok(row.insert(db).await?)
}

/// Creates an active profile with a random id and full name `Test <local-part>`.
pub async fn create_test_profile(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<profile::Model> {
    insert_profile(db, email, role, ProfileStatus::Active).await
}

/// Creates an invited placeholder profile.
pub async fn create_invited_profile(
    db: &DatabaseConnection,
    email: &str,
    role: Role,
) -> Result<profile::Model> {
    insert_profile(db, email, role, ProfileStatus::Invited).await
}

/// Creates a fund source with no description.
pub async fn create_test_fund_source(
    db: &DatabaseConnection,
    name: &str,
) -> Result<fund_source::Model> {
    let row = fund_source::ActiveModel {
        source_name: Set(name.to_string()),
        description: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Creates a grant year.
pub async fn create_test_year(db: &DatabaseConnection, year: i32) -> Result<grant_year::Model> {
    let row = grant_year::ActiveModel {
        year_value: Set(year),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Creates a grant directly, bypassing role checks.
pub async fn create_test_grant(
    db: &DatabaseConnection,
    name: &str,
    amount: f64,
    status: GrantStatus,
    year_id: i64,
    fund_source_id: i64,
) -> Result<grant::Model> {
    let row = grant::ActiveModel {
        project_name: Set(name.to_string()),
        amount_approved: Set(amount),
        status: Set(status),
        year_id: Set(year_id),
        fund_source_id: Set(fund_source_id),
        created_at: Set(Utc::now()),
        user_id: Set(None),
        document_url: Set(None),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Creates a disbursement paid on 2024-06-15, bypassing the balance check.
pub async fn create_test_disbursement(
    db: &DatabaseConnection,
    grant_id: i64,
    amount: f64,
) -> Result<disbursement::Model> {
    let row = disbursement::ActiveModel {
        grant_id: Set(grant_id),
        amount: Set(amount),
        payment_date: Set(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(row.insert(db).await?)
}

/// Sets up a database holding one approved grant, "Test Grant", filed under
/// 2024 and fund source "Test Source".
pub async fn setup_with_grant(amount: f64) -> Result<(DatabaseConnection, grant::Model)> {
    let db = setup_test_db().await?;
    let year = create_test_year(&db, 2024).await?;
    let source = create_test_fund_source(&db, "Test Source").await?;
    let grant = create_test_grant(
        &db,
        "Test Grant",
        amount,
        GrantStatus::Approved,
        year.id,
        source.id,
    )
    .await?;
    Ok((db, grant))
}

/// In-memory grant row for pure aggregation tests.
///
/// Fund source ids are derived from the name so equal names share an id;
/// the year relation follows the creation date.
pub fn grant_row(
    id: i64,
    project_name: &str,
    amount: f64,
    status: GrantStatus,
    source_name: &str,
    created: (i32, u32, u32),
) -> GrantWithRelations {
    let (y, m, d) = created;
    let created_at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
    let fund_source_id = source_name.bytes().map(i64::from).sum::<i64>();
    let year_id = i64::from(y);

    GrantWithRelations {
        grant: grant::Model {
            id,
            project_name: project_name.to_string(),
            amount_approved: amount,
            status,
            year_id,
            fund_source_id,
            created_at,
            user_id: None,
            document_url: None,
        },
        fund_source: Some(fund_source::Model {
            id: fund_source_id,
            source_name: source_name.to_string(),
            description: None,
            created_at,
        }),
        year: Some(grant_year::Model {
            id: year_id,
            year_value: y,
            created_at,
        }),
    }
}

/// In-memory disbursement for pure aggregation tests.
pub fn payment(grant_id: i64, amount: f64, paid: (i32, u32, u32)) -> disbursement::Model {
    let (y, m, d) = paid;
    disbursement::Model {
        id: 0,
        grant_id,
        amount,
        payment_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
        created_at: Utc::now(),
    }
}

/// Records privileged function calls and answers with predictable links.
#[derive(Default)]
pub struct FakeFunctions {
    invites: Mutex<Vec<InviteRequest>>,
    resets: Mutex<Vec<ResetLinkRequest>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeFunctions {
    /// Invitations received so far.
    pub fn invites(&self) -> Vec<InviteRequest> {
        self.invites.lock().unwrap().clone()
    }

    /// Reset requests received so far.
    pub fn resets(&self) -> Vec<ResetLinkRequest> {
        self.resets.lock().unwrap().clone()
    }

    /// User ids deleted so far.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminFunctions for FakeFunctions {
    async fn invite_user(&self, request: &InviteRequest) -> Result<String> {
        self.invites.lock().unwrap().push(request.clone());
        Ok(format!("https://links.example/invite/{}", request.email))
    }

    async fn generate_reset_link(&self, request: &ResetLinkRequest) -> Result<String> {
        self.resets.lock().unwrap().push(request.clone());
        Ok(format!("https://links.example/recovery/{}", request.email))
    }

    async fn delete_user(&self, request: &DeleteUserRequest) -> Result<()> {
        self.deleted.lock().unwrap().push(request.user_id.clone());
        Ok(())
    }
}

/// Identity provider double with a fixed token table.
#[derive(Default)]
pub struct FakeIdentity {
    tokens: Mutex<HashMap<String, String>>,
    links: Mutex<Vec<LinkRequest>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeIdentity {
    /// Makes `token` resolve to `user_id`.
    pub fn accept_token(&self, token: &str, user_id: &str) {
        self.tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), user_id.to_string());
    }

    /// Link requests received so far.
    pub fn links(&self) -> Vec<LinkRequest> {
        self.links.lock().unwrap().clone()
    }

    /// Accounts deleted so far.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityAdmin for FakeIdentity {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<IdentityUser>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .get(access_token)
            .map(|id| IdentityUser {
                id: id.clone(),
                email: None,
            }))
    }

    async fn generate_link(&self, request: &LinkRequest) -> Result<GeneratedLink> {
        if request.email.is_empty() {
            return Err(Error::Identity("email required".to_string()));
        }
        self.links.lock().unwrap().push(request.clone());
        let kind = match request.kind {
            LinkKind::Invite => "invite",
            LinkKind::Recovery => "recovery",
        };
        Ok(GeneratedLink {
            user_id: format!("id-{}", request.email),
            action_link: format!("https://id.example/{kind}/{}", request.email),
        })
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}
