//! User accounts: creation, role changes, removal.

use chrono::Utc;
use entity::{company, individual_contact, opportunity, user, user_group, user_secret};
use platform_api::{ApiError, ApiResult, ValidationErrors};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::hash_password;
use crate::db_error;
use crate::membership::{reconcile_role_membership, Reconciliation};
use crate::roles::{require_administrator, require_manager, Principal};
use crate::validation::{check_unique, optional_text, require_text, validate_email};

const PASSWORD_MIN: usize = 8;

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: user::Role,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Administrators only.
pub async fn create_user(
    db: &DatabaseConnection,
    principal: &Principal,
    input: NewUser,
) -> ApiResult<(user::Model, Reconciliation)> {
    require_administrator(principal)?;
    register_user(db, input).await
}

/// Store a user with its password hash and group membership. No tier gate:
/// used by the admin path above and by seeding.
pub async fn register_user(
    db: &DatabaseConnection,
    input: NewUser,
) -> ApiResult<(user::Model, Reconciliation)> {
    let mut errors = ValidationErrors::default();
    let username = require_text(&mut errors, "username", &input.username, 150);
    let first_name = input.first_name.trim().to_string();
    let last_name = input.last_name.trim().to_string();
    let email = optional_text(&mut errors, "email", input.email.as_deref(), 254)
        .map(|e| validate_email(&mut errors, "email", &e));
    if input.password.chars().count() < PASSWORD_MIN {
        errors.add(
            "password",
            format!("This password is too short. It must contain at least {PASSWORD_MIN} characters."),
        );
    }
    check_unique::<user::Entity, _>(
        db,
        &mut errors,
        "username",
        user::Column::Username,
        user::Column::Id,
        &username,
        None,
    )
    .await?;
    errors.into_result()?;

    let password_hash = hash_password(&input.password)?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let txn = db.begin().await.map_err(db_error)?;
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        first_name: Set(first_name),
        last_name: Set(last_name),
        email: Set(email),
        role: Set(input.role),
        is_superuser: Set(input.is_superuser),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(db_error)?;
    let secret = user_secret::ActiveModel {
        user_id: Set(model.id),
        password_hash: Set(password_hash),
        updated_at: Set(now),
    };
    user_secret::Entity::insert(secret)
        .exec_without_returning(&txn)
        .await
        .map_err(db_error)?;
    let outcome = reconcile_role_membership(&txn, &model).await?;
    txn.commit().await.map_err(db_error)?;
    info!(user_id = %model.id, role = ?model.role, "user created");
    Ok((model, outcome))
}

/// Change a user's role and resync its group. Administrators only.
pub async fn set_user_role(
    db: &DatabaseConnection,
    principal: &Principal,
    user_id: Uuid,
    role: user::Role,
) -> ApiResult<(user::Model, Reconciliation)> {
    require_administrator(principal)?;
    let existing = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("user"))?;
    let txn = db.begin().await.map_err(db_error)?;
    let mut active: user::ActiveModel = existing.into();
    active.role = Set(role);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await.map_err(db_error)?;
    let outcome = reconcile_role_membership(&txn, &updated).await?;
    txn.commit().await.map_err(db_error)?;
    info!(user_id = %updated.id, role = ?updated.role, ?outcome, "user role changed");
    Ok((updated, outcome))
}

/// Remove a user. Records it owned stay, without an owner.
pub async fn delete_user(
    db: &DatabaseConnection,
    principal: &Principal,
    user_id: Uuid,
) -> ApiResult<()> {
    let current = require_administrator(principal)?;
    if current.user_id == user_id {
        return Err(ApiError::form("You cannot delete your own account."));
    }
    user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(db_error)?
        .ok_or(ApiError::NotFound("user"))?;
    let txn = db.begin().await.map_err(db_error)?;
    let no_owner = Expr::value(Option::<Uuid>::None);
    individual_contact::Entity::update_many()
        .col_expr(individual_contact::Column::OwnerId, no_owner.clone())
        .filter(individual_contact::Column::OwnerId.eq(user_id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    company::Entity::update_many()
        .col_expr(company::Column::OwnerId, no_owner.clone())
        .filter(company::Column::OwnerId.eq(user_id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    opportunity::Entity::update_many()
        .col_expr(opportunity::Column::OwnerId, no_owner)
        .filter(opportunity::Column::OwnerId.eq(user_id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    user_group::Entity::delete_many()
        .filter(user_group::Column::UserId.eq(user_id))
        .exec(&txn)
        .await
        .map_err(db_error)?;
    user_secret::Entity::delete_by_id(user_id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    user::Entity::delete_by_id(user_id)
        .exec(&txn)
        .await
        .map_err(db_error)?;
    txn.commit().await.map_err(db_error)?;
    info!(user_id = %user_id, "user deleted");
    Ok(())
}

/// Active users, for owner pickers. Managers and above.
pub async fn list_users<C>(db: &C, principal: &Principal) -> ApiResult<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    require_manager(principal)?;
    user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Username)
        .all(db)
        .await
        .map_err(db_error)
}
