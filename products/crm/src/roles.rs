//! Principal classification.
//!
//! A principal's tier is the highest role group it belongs to, or
//! [`Tier::Administrator`] for superusers. Group membership is read from the
//! store on every request so a role change applies on the next call.

use entity::{role_group, user, user_group};
use platform_api::{ApiError, ApiResult};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, RelationTrait};
use sea_orm::sea_query::JoinType;
use serde::Serialize;
use uuid::Uuid;

use crate::db_error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Commercial,
    Manager,
    Administrator,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Commercial, Tier::Manager, Tier::Administrator];

    /// Name of the role group backing this tier.
    pub fn group_name(self) -> &'static str {
        match self {
            Tier::Commercial => "Commercial",
            Tier::Manager => "Manager",
            Tier::Administrator => "Administrator",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Self> {
        Tier::ALL.into_iter().find(|tier| tier.group_name() == name)
    }
}

impl From<user::Role> for Tier {
    fn from(role: user::Role) -> Self {
        match role {
            user::Role::Commercial => Tier::Commercial,
            user::Role::Manager => Tier::Manager,
            user::Role::Administrator => Tier::Administrator,
        }
    }
}

impl From<Tier> for user::Role {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Commercial => user::Role::Commercial,
            Tier::Manager => user::Role::Manager,
            Tier::Administrator => user::Role::Administrator,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
    pub is_superuser: bool,
    pub groups: Vec<Tier>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Principal {
    #[default]
    Anonymous,
    User(CurrentUser),
}

impl Principal {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user().map(|u| u.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::User(_))
    }
}

pub fn tier_of(principal: &Principal) -> Option<Tier> {
    let user = principal.user()?;
    if user.is_superuser {
        return Some(Tier::Administrator);
    }
    user.groups.iter().copied().max()
}

// `None < Some(_)`, so anonymous and group-less principals fail every check.
pub fn is_administrator(principal: &Principal) -> bool {
    tier_of(principal) >= Some(Tier::Administrator)
}

pub fn is_manager_or_above(principal: &Principal) -> bool {
    tier_of(principal) >= Some(Tier::Manager)
}

pub fn is_commercial_or_above(principal: &Principal) -> bool {
    tier_of(principal) >= Some(Tier::Commercial)
}

pub fn require_authenticated(principal: &Principal) -> ApiResult<&CurrentUser> {
    principal.user().ok_or(ApiError::Unauthenticated)
}

pub fn require_tier(principal: &Principal, tier: Tier) -> ApiResult<&CurrentUser> {
    let user = require_authenticated(principal)?;
    if tier_of(principal) >= Some(tier) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn require_commercial(principal: &Principal) -> ApiResult<&CurrentUser> {
    require_tier(principal, Tier::Commercial)
}

pub fn require_manager(principal: &Principal) -> ApiResult<&CurrentUser> {
    require_tier(principal, Tier::Manager)
}

pub fn require_administrator(principal: &Principal) -> ApiResult<&CurrentUser> {
    require_tier(principal, Tier::Administrator)
}

/// Load the user and its group memberships. Unknown or inactive users
/// resolve to [`Principal::Anonymous`].
pub async fn resolve_principal<C>(db: &C, user_id: Uuid) -> ApiResult<Principal>
where
    C: ConnectionTrait,
{
    let Some(user) = user::Entity::find_by_id(user_id)
        .one(db)
        .await
        .map_err(db_error)?
    else {
        return Ok(Principal::Anonymous);
    };
    if !user.is_active {
        return Ok(Principal::Anonymous);
    }
    let groups = role_group::Entity::find()
        .join(JoinType::InnerJoin, role_group::Relation::Membership.def())
        .filter(user_group::Column::UserId.eq(user_id))
        .all(db)
        .await
        .map_err(db_error)?
        .into_iter()
        .filter_map(|group| Tier::from_group_name(&group.name))
        .collect();
    Ok(Principal::User(CurrentUser {
        user_id: user.id,
        username: user.username,
        is_superuser: user.is_superuser,
        groups,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(groups: &[Tier], is_superuser: bool) -> Principal {
        Principal::User(CurrentUser {
            user_id: Uuid::new_v4(),
            username: "someone".into(),
            is_superuser,
            groups: groups.to_vec(),
        })
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(Tier::Commercial < Tier::Manager);
        assert!(Tier::Manager < Tier::Administrator);
    }

    #[test]
    fn anonymous_fails_every_predicate() {
        let anon = Principal::Anonymous;
        assert!(!is_administrator(&anon));
        assert!(!is_manager_or_above(&anon));
        assert!(!is_commercial_or_above(&anon));
        assert!(matches!(
            require_commercial(&anon),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn superuser_counts_as_administrator_without_groups() {
        let root = principal(&[], true);
        assert_eq!(tier_of(&root), Some(Tier::Administrator));
        assert!(is_administrator(&root));
        assert!(is_commercial_or_above(&root));
    }

    #[test]
    fn highest_group_wins() {
        let p = principal(&[Tier::Commercial, Tier::Manager], false);
        assert_eq!(tier_of(&p), Some(Tier::Manager));
        assert!(is_manager_or_above(&p));
        assert!(!is_administrator(&p));
    }

    #[test]
    fn group_less_user_is_authenticated_but_forbidden() {
        let p = principal(&[], false);
        assert!(p.is_authenticated());
        assert_eq!(tier_of(&p), None);
        assert!(!is_commercial_or_above(&p));
        assert!(matches!(require_commercial(&p), Err(ApiError::Forbidden)));
        assert!(require_authenticated(&p).is_ok());
    }

    #[test]
    fn commercial_cannot_pass_manager_gate() {
        let p = principal(&[Tier::Commercial], false);
        assert!(require_commercial(&p).is_ok());
        assert!(matches!(require_manager(&p), Err(ApiError::Forbidden)));
        assert!(matches!(require_administrator(&p), Err(ApiError::Forbidden)));
    }

    #[test]
    fn group_names_round_trip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_group_name(tier.group_name()), Some(tier));
        }
        assert_eq!(Tier::from_group_name("Viewer"), None);
    }
}
