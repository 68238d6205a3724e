//! Opportunity save rules.
//!
//! Every save recomputes the amount from the linked service, then, when the
//! opportunity is won, re-derives the client's relation tier from its current
//! won-count. Status itself is a flat enum: any value may follow any other.

use chrono::Utc;
use entity::{company, individual_contact, opportunity, service, RelationTier};
use platform_api::{ApiError, ApiResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::db_error;
use crate::records::OpportunityDraft;
use crate::validation::Validated;

/// Whether a won opportunity without a linked service still refreshes its
/// client's tier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LifecyclePolicy {
    pub refresh_tier_without_service: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            refresh_tier_without_service: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ClientRef {
    Individual(Uuid),
    Company(Uuid),
}

impl ClientRef {
    pub fn of(opportunity: &opportunity::Model) -> Vec<ClientRef> {
        opportunity
            .individual_id
            .map(ClientRef::Individual)
            .into_iter()
            .chain(opportunity.company_id.map(ClientRef::Company))
            .collect()
    }
}

pub fn relation_tier_for(won_count: u64) -> RelationTier {
    if won_count >= 1 {
        RelationTier::Client
    } else {
        RelationTier::Prospect
    }
}

/// Amount in cents a linked service imposes on an opportunity.
pub fn price_from_service(service: Option<&service::Model>) -> Option<i64> {
    service.map(|s| s.price_cents)
}

/// Re-derive and persist a client's tier from its won opportunities.
pub async fn refresh_relation_tier<C>(db: &C, client: ClientRef) -> ApiResult<RelationTier>
where
    C: ConnectionTrait,
{
    let won = opportunity::Entity::find()
        .filter(opportunity::Column::Status.eq(opportunity::Status::Won));
    let now: DateTimeWithTimeZone = Utc::now().into();
    let (won_count, rows) = match client {
        ClientRef::Individual(id) => {
            let count = won
                .filter(opportunity::Column::IndividualId.eq(id))
                .count(db)
                .await
                .map_err(db_error)?;
            let tier = relation_tier_for(count);
            let result = individual_contact::Entity::update_many()
                .col_expr(individual_contact::Column::RelationTier, Expr::value(tier))
                .col_expr(individual_contact::Column::UpdatedAt, Expr::value(now))
                .filter(individual_contact::Column::Id.eq(id))
                .exec(db)
                .await
                .map_err(db_error)?;
            (count, result.rows_affected)
        }
        ClientRef::Company(id) => {
            let count = won
                .filter(opportunity::Column::CompanyId.eq(id))
                .count(db)
                .await
                .map_err(db_error)?;
            let tier = relation_tier_for(count);
            let result = company::Entity::update_many()
                .col_expr(company::Column::AccountTier, Expr::value(tier))
                .col_expr(company::Column::UpdatedAt, Expr::value(now))
                .filter(company::Column::Id.eq(id))
                .exec(db)
                .await
                .map_err(db_error)?;
            (count, result.rows_affected)
        }
    };
    if rows == 0 {
        return Err(ApiError::NotFound("client"));
    }
    let tier = relation_tier_for(won_count);
    debug!(?client, won_count, ?tier, "relation tier refreshed");
    Ok(tier)
}

/// Persist a validated opportunity and apply the pricing and tier rules in
/// one transaction. `existing` is the stored row when updating; `owner` is
/// used only when inserting.
pub async fn save_opportunity(
    db: &DatabaseConnection,
    policy: LifecyclePolicy,
    draft: Validated<OpportunityDraft>,
    existing: Option<opportunity::Model>,
    owner: Option<Uuid>,
) -> ApiResult<opportunity::Model> {
    let draft = draft.into_inner();
    let span = info_span!(
        "crm.opportunities.save",
        status = ?draft.status,
        has_service = draft.service_id.is_some(),
        update = existing.is_some()
    );
    async move {
        let txn = db.begin().await.map_err(db_error)?;

        let linked_service = match draft.service_id {
            Some(id) => service::Entity::find_by_id(id)
                .one(&txn)
                .await
                .map_err(db_error)?,
            None => None,
        };
        let amount_cents = price_from_service(linked_service.as_ref()).or(draft.amount_cents());

        let now: DateTimeWithTimeZone = Utc::now().into();
        let is_update = existing.is_some();
        let mut active: opportunity::ActiveModel = match existing {
            Some(model) => model.into(),
            None => opportunity::ActiveModel {
                id: Set(Uuid::new_v4()),
                owner_id: Set(owner),
                created_at: Set(now),
                ..Default::default()
            },
        };
        active.name = Set(draft.name);
        active.description = Set(draft.description);
        active.status = Set(draft.status);
        active.amount_cents = Set(amount_cents);
        active.individual_id = Set(draft.individual_id);
        active.company_id = Set(draft.company_id);
        active.service_id = Set(draft.service_id);
        active.updated_at = Set(now);
        let saved = if is_update {
            active.update(&txn).await
        } else {
            active.insert(&txn).await
        }
        .map_err(db_error)?;

        if saved.status == opportunity::Status::Won
            && (linked_service.is_some() || policy.refresh_tier_without_service)
        {
            for client in ClientRef::of(&saved) {
                refresh_relation_tier(&txn, client).await?;
            }
        }

        txn.commit().await.map_err(db_error)?;
        Ok(saved)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_follows_won_count() {
        assert_eq!(relation_tier_for(0), RelationTier::Prospect);
        assert_eq!(relation_tier_for(1), RelationTier::Client);
        assert_eq!(relation_tier_for(7), RelationTier::Client);
    }

    #[test]
    fn service_price_overrides_amount() {
        let now: DateTimeWithTimeZone = Utc::now().into();
        let svc = service::Model {
            id: Uuid::new_v4(),
            name: "Création de Site Vitrine".into(),
            description: None,
            price_cents: 100_000,
            tariff_type: service::TariffType::OneTime,
            category_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(price_from_service(Some(&svc)), Some(100_000));
        assert_eq!(price_from_service(None), None);
    }

    #[test]
    fn default_policy_refreshes_without_service() {
        assert!(LifecyclePolicy::default().refresh_tier_without_service);
    }
}
