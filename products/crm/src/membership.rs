//! Role-group membership.
//!
//! A user's group membership mirrors its `role` column. It is recomputed by
//! an explicit reconcile call after each role change, replacing whatever
//! memberships were there before.

use entity::{role_group, user, user_group};
use platform_api::ApiResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db_error;
use crate::roles::Tier;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Reconciliation {
    Synced(Tier),
    /// The group backing this tier does not exist; the user was left
    /// without any group.
    GroupMissing(Tier),
}

/// Create any missing role group. Returns how many were created.
pub async fn ensure_role_groups<C>(db: &C) -> ApiResult<usize>
where
    C: ConnectionTrait,
{
    let mut created = 0;
    for tier in Tier::ALL {
        let exists = role_group::Entity::find()
            .filter(role_group::Column::Name.eq(tier.group_name()))
            .one(db)
            .await
            .map_err(db_error)?
            .is_some();
        if !exists {
            role_group::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(tier.group_name().to_string()),
            }
            .insert(db)
            .await
            .map_err(db_error)?;
            created += 1;
        }
    }
    if created > 0 {
        debug!(created, "role groups created");
    }
    Ok(created)
}

/// Replace `user`'s memberships with the single group matching its role.
/// Idempotent. A missing group is logged and reported, never an error.
pub async fn reconcile_role_membership<C>(db: &C, user: &user::Model) -> ApiResult<Reconciliation>
where
    C: ConnectionTrait,
{
    let tier = Tier::from(user.role);
    user_group::Entity::delete_many()
        .filter(user_group::Column::UserId.eq(user.id))
        .exec(db)
        .await
        .map_err(db_error)?;

    let group = role_group::Entity::find()
        .filter(role_group::Column::Name.eq(tier.group_name()))
        .one(db)
        .await
        .map_err(db_error)?;
    let Some(group) = group else {
        warn!(
            user_id = %user.id,
            group = tier.group_name(),
            "role group missing; user saved without group"
        );
        return Ok(Reconciliation::GroupMissing(tier));
    };

    let membership = user_group::ActiveModel {
        user_id: Set(user.id),
        group_id: Set(group.id),
    };
    user_group::Entity::insert(membership)
        .exec_without_returning(db)
        .await
        .map_err(db_error)?;
    Ok(Reconciliation::Synced(tier))
}
