//! Pipeline dashboard.
//!
//! [`summarize`] reduces a visibility-scoped opportunity set in one pass.
//! List-page filters never apply here. Managers and above additionally get
//! the client count over every client and won-sale counts grouped by service
//! and by category.

use std::collections::BTreeMap;

use entity::{category, company, individual_contact, opportunity, service};
use platform_api::ApiResult;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, JoinType};
use sea_orm::{
    ActiveEnum, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QuerySelect, RelationTrait,
};
use tracing::{info_span, Instrument};

use crate::db_error;
use crate::money::{from_cents, percentage};
use crate::roles::{is_administrator, is_manager_or_above, require_authenticated, Principal};
use crate::scope::scoped;

pub const RECENT_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusCount {
    pub status: opportunity::Status,
    pub count: u64,
    pub color: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSummary {
    pub total_count: u64,
    /// Sum over opportunities still open (neither won nor lost).
    pub pipeline_total: Decimal,
    pub revenue_total: Decimal,
    /// Percentage of won opportunities, two decimals; zero on an empty set.
    pub conversion_rate: Decimal,
    pub status_breakdown: Vec<StatusCount>,
    pub recent: Vec<opportunity::Model>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SalesCount {
    /// Service or category name; `None` groups services without category.
    pub label: Option<String>,
    pub sale_count: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dashboard {
    pub summary: PipelineSummary,
    pub client_count: u64,
    pub manager_view: bool,
    pub is_administrator: bool,
    pub services_sold: Vec<SalesCount>,
    pub services_sold_by_category: Vec<SalesCount>,
}

pub fn status_color(status: opportunity::Status) -> &'static str {
    color_for_key(&status.to_value())
}

/// Display colour for a stored status value; unknown values are grey.
pub fn color_for_key(key: &str) -> &'static str {
    match key {
        "won" => "#28a745",
        "lost" => "#dc3545",
        "qualification" => "#36a2eb",
        "negotiation" => "#ffc107",
        _ => "#6c757d",
    }
}

fn status_rank(status: opportunity::Status) -> u8 {
    match status {
        opportunity::Status::Qualification => 0,
        opportunity::Status::Negotiation => 1,
        opportunity::Status::Won => 2,
        opportunity::Status::Lost => 3,
    }
}

pub fn summarize(opportunities: &[opportunity::Model]) -> PipelineSummary {
    let mut pipeline_cents: i64 = 0;
    let mut revenue_cents: i64 = 0;
    let mut won: u64 = 0;
    let mut by_status: BTreeMap<u8, (opportunity::Status, u64)> = BTreeMap::new();

    for opp in opportunities {
        let amount = opp.amount_cents.unwrap_or(0);
        if opp.status == opportunity::Status::Won {
            revenue_cents += amount;
            won += 1;
        } else if opp.status.is_open() {
            pipeline_cents += amount;
        }
        by_status
            .entry(status_rank(opp.status))
            .or_insert((opp.status, 0))
            .1 += 1;
    }

    let total_count = opportunities.len() as u64;
    let mut recent: Vec<_> = opportunities.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    recent.truncate(RECENT_LIMIT);

    PipelineSummary {
        total_count,
        pipeline_total: from_cents(pipeline_cents),
        revenue_total: from_cents(revenue_cents),
        conversion_rate: percentage(won, total_count),
        status_breakdown: by_status
            .into_values()
            .map(|(status, count)| StatusCount {
                status,
                count,
                color: status_color(status),
            })
            .collect(),
        recent,
    }
}

#[derive(Debug, FromQueryResult)]
struct LabelCountRow {
    label: Option<String>,
    sale_count: i64,
}

fn sorted(rows: Vec<LabelCountRow>) -> Vec<SalesCount> {
    let mut out: Vec<SalesCount> = rows
        .into_iter()
        .map(|row| SalesCount {
            label: row.label,
            sale_count: row.sale_count.max(0) as u64,
        })
        .collect();
    out.sort_by(|a, b| b.sale_count.cmp(&a.sale_count).then_with(|| a.label.cmp(&b.label)));
    out
}

async fn services_sold<C: ConnectionTrait>(db: &C) -> ApiResult<Vec<SalesCount>> {
    let rows = opportunity::Entity::find()
        .select_only()
        .column_as(Expr::col((service::Entity, service::Column::Name)), "label")
        .column_as(
            Expr::col((opportunity::Entity, opportunity::Column::Id)).count(),
            "sale_count",
        )
        .join(JoinType::InnerJoin, opportunity::Relation::Service.def())
        .filter(opportunity::Column::Status.eq(opportunity::Status::Won))
        .group_by(Expr::col((service::Entity, service::Column::Name)))
        .into_model::<LabelCountRow>()
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(sorted(rows))
}

async fn services_sold_by_category<C: ConnectionTrait>(db: &C) -> ApiResult<Vec<SalesCount>> {
    let rows = opportunity::Entity::find()
        .select_only()
        .column_as(Expr::col((category::Entity, category::Column::Name)), "label")
        .column_as(
            Expr::col((opportunity::Entity, opportunity::Column::Id)).count(),
            "sale_count",
        )
        .join(JoinType::InnerJoin, opportunity::Relation::Service.def())
        .join(JoinType::LeftJoin, service::Relation::Category.def())
        .filter(opportunity::Column::Status.eq(opportunity::Status::Won))
        .group_by(Expr::col((category::Entity, category::Column::Name)))
        .into_model::<LabelCountRow>()
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(sorted(rows))
}

/// Individuals plus companies in the principal's scope: every client for
/// managers and above, otherwise the ones they own.
async fn client_count<C: ConnectionTrait>(db: &C, principal: &Principal) -> ApiResult<u64> {
    let individuals = scoped::<individual_contact::Entity>(principal)
        .count(db)
        .await
        .map_err(db_error)?;
    let companies = scoped::<company::Entity>(principal)
        .count(db)
        .await
        .map_err(db_error)?;
    Ok(individuals + companies)
}

/// Dashboard for any signed-in principal, branching on tier.
pub async fn build_dashboard<C>(db: &C, principal: &Principal) -> ApiResult<Dashboard>
where
    C: ConnectionTrait,
{
    require_authenticated(principal)?;
    let manager_view = is_manager_or_above(principal);
    let span = info_span!("crm.dashboard", manager_view);
    async move {
        let opportunities = scoped::<opportunity::Entity>(principal)
            .all(db)
            .await
            .map_err(db_error)?;
        let summary = summarize(&opportunities);
        let client_count = client_count(db, principal).await?;
        let (sold, sold_by_category) = if manager_view {
            (services_sold(db).await?, services_sold_by_category(db).await?)
        } else {
            (Vec::new(), Vec::new())
        };
        Ok(Dashboard {
            summary,
            client_count,
            manager_view,
            is_administrator: is_administrator(principal),
            services_sold: sold,
            services_sold_by_category: sold_by_category,
        })
    }
    .instrument(span)
    .await
}
