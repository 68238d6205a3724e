//! GraphQL surface.
//!
//! Every resolver reads the request's [`Principal`] from context data (the
//! server inserts it per request) and delegates to the service functions,
//! which own all tier and visibility checks.

use std::future::Future;
use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Error, ErrorExtensions, Object, Schema, ID};
use platform_api::{ApiError, ApiResult};
use sea_orm::DatabaseConnection;
use tracing::{info_span, Instrument};

use crate::auth::{self, AuthConfig};
use crate::dashboard::build_dashboard;
use crate::filters::{
    filter_vocabulary, CategoryFilter, CompanyFilter, ContactFilter, OpportunityFilter, ServiceFilter,
};
use crate::lifecycle::{ClientRef, LifecyclePolicy};
use crate::membership::Reconciliation;
use crate::records::{self, CompanyDraft, OpportunityDraft, ServiceDraft};
use crate::roles::{require_authenticated, tier_of, Principal};
use crate::scope::{self, Page};
use crate::users;

pub mod types;

use types::{
    parse_uuid, CategoryFilterInput, CategoryInput, CategoryNode, ClientKind, CompanyFilterInput,
    CompanyInput, CompanyNode, ContactFilterInput, ContactInput, ContactNode, DashboardNode,
    EntityKind, FilterFieldNode, LoginPayload, MeNode, NewUserInput, OpportunityFilterInput,
    OpportunityInput, OpportunityNode, OwnedRecordKind, PageNode, RelationTier,
    ServiceFilterInput, ServiceInput, ServiceNode, UserNode, UserPayload, UserRole,
};

pub type CrmSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub struct AppSchema(pub CrmSchema);

pub fn build_schema(
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthConfig>,
    policy: LifecyclePolicy,
) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .data(policy)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

#[Object]
impl QueryRoot {
    async fn crm(&self) -> CrmQuery {
        CrmQuery
    }
}

#[Object]
impl MutationRoot {
    async fn crm(&self) -> CrmMutation {
        CrmMutation
    }
}

pub struct CrmQuery;
pub struct CrmMutation;

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing database connection")).extend())
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| ApiError::internal(anyhow::anyhow!("missing auth configuration")).extend())
}

fn policy(ctx: &Context<'_>) -> LifecyclePolicy {
    ctx.data_opt::<LifecyclePolicy>().copied().unwrap_or_default()
}

/// Requests without a resolved session run as anonymous.
fn principal(ctx: &Context<'_>) -> Principal {
    ctx.data_opt::<Principal>().cloned().unwrap_or_default()
}

/// Run one resolver body inside its span and map service errors onto
/// GraphQL error extensions.
async fn resolve<T, F>(op: &'static str, fut: F) -> Result<T, Error>
where
    F: Future<Output = ApiResult<T>>,
{
    fut.instrument(info_span!("graphql.resolve", op))
        .await
        .map_err(|err| err.extend())
}

fn page(first: Option<i32>, offset: Option<i32>) -> Page {
    Page {
        limit: first.map(|n| n.max(0) as u64),
        offset: offset.map(|n| n.max(0) as u64),
    }
}

fn user_payload((user, outcome): (entity::user::Model, Reconciliation)) -> UserPayload {
    UserPayload {
        user: user.into(),
        group_synced: matches!(outcome, Reconciliation::Synced(_)),
    }
}

#[Object]
impl CrmQuery {
    /// The signed-in user with its resolved tier.
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<MeNode> {
        let principal = principal(ctx);
        resolve("me", async {
            let user = require_authenticated(&principal)?;
            Ok(MeNode::new(user, tier_of(&principal)))
        })
        .await
    }

    /// Filter fields the caller may use on the given entity's list.
    async fn filter_fields(
        &self,
        ctx: &Context<'_>,
        entity: EntityKind,
    ) -> async_graphql::Result<Vec<FilterFieldNode>> {
        let principal = principal(ctx);
        resolve("filterFields", async {
            require_authenticated(&principal)?;
            Ok(filter_vocabulary(entity.into(), tier_of(&principal))
                .into_iter()
                .map(Into::into)
                .collect())
        })
        .await
    }

    async fn categories(
        &self,
        ctx: &Context<'_>,
        filter: Option<CategoryFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<PageNode<CategoryNode>> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("categories", async {
            let filter: CategoryFilter = filter.unwrap_or_default().into();
            let listing =
                scope::list_categories(db.as_ref(), &principal, &filter, page(first, offset))
                    .await?;
            Ok(listing.into())
        })
        .await
    }

    async fn services(
        &self,
        ctx: &Context<'_>,
        filter: Option<ServiceFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<PageNode<ServiceNode>> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("services", async {
            let filter: ServiceFilter = filter.unwrap_or_default().try_into()?;
            let listing =
                scope::list_services(db.as_ref(), &principal, &filter, page(first, offset)).await?;
            Ok(listing.into())
        })
        .await
    }

    async fn contacts(
        &self,
        ctx: &Context<'_>,
        filter: Option<ContactFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<PageNode<ContactNode>> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("contacts", async {
            let filter: ContactFilter = filter.unwrap_or_default().try_into()?;
            let listing =
                scope::list_contacts(db.as_ref(), &principal, &filter, page(first, offset)).await?;
            Ok(listing.into())
        })
        .await
    }

    async fn companies(
        &self,
        ctx: &Context<'_>,
        filter: Option<CompanyFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<PageNode<CompanyNode>> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("companies", async {
            let filter: CompanyFilter = filter.unwrap_or_default().try_into()?;
            let listing =
                scope::list_companies(db.as_ref(), &principal, &filter, page(first, offset))
                    .await?;
            Ok(listing.into())
        })
        .await
    }

    async fn opportunities(
        &self,
        ctx: &Context<'_>,
        filter: Option<OpportunityFilterInput>,
        first: Option<i32>,
        offset: Option<i32>,
    ) -> async_graphql::Result<PageNode<OpportunityNode>> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("opportunities", async {
            let filter: OpportunityFilter = filter.unwrap_or_default().try_into()?;
            let listing =
                scope::list_opportunities(db.as_ref(), &principal, &filter, page(first, offset))
                    .await?;
            Ok(listing.into())
        })
        .await
    }

    async fn opportunity(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<OpportunityNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("opportunity", async {
            let id = parse_uuid(&id, "opportunity")?;
            Ok(scope::get_opportunity(db.as_ref(), &principal, id).await?.into())
        })
        .await
    }

    async fn contact(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<ContactNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("contact", async {
            let id = parse_uuid(&id, "contact")?;
            Ok(scope::get_contact(db.as_ref(), &principal, id).await?.into())
        })
        .await
    }

    async fn company(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CompanyNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("company", async {
            let id = parse_uuid(&id, "company")?;
            Ok(scope::get_company(db.as_ref(), &principal, id).await?.into())
        })
        .await
    }

    async fn dashboard(&self, ctx: &Context<'_>) -> async_graphql::Result<DashboardNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("dashboard", async {
            Ok(build_dashboard(db.as_ref(), &principal).await?.into())
        })
        .await
    }

    /// Active users, for owner pickers.
    async fn users(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<UserNode>> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("users", async {
            let users = users::list_users(db.as_ref(), &principal).await?;
            Ok(users.into_iter().map(Into::into).collect())
        })
        .await
    }
}

#[Object]
impl CrmMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> async_graphql::Result<LoginPayload> {
        let db = database(ctx)?;
        let config = auth_config(ctx)?;
        let payload = resolve("login", async {
            let user = auth::authenticate(db.as_ref(), &username, &password).await?;
            let token = auth::issue_token(user.id, &config)
                .map_err(|err| ApiError::internal(anyhow::anyhow!("token error: {err}")))?;
            Ok(LoginPayload {
                token,
                user: user.into(),
            })
        })
        .await?;
        ctx.append_http_header(
            "Set-Cookie",
            auth::session_cookie(payload.token.clone(), config.session_ttl_minutes).to_string(),
        );
        Ok(payload)
    }

    async fn logout(&self, ctx: &Context<'_>) -> bool {
        ctx.append_http_header("Set-Cookie", auth::expired_session_cookie().to_string());
        true
    }

    #[graphql(name = "createUser")]
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserPayload> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("createUser", async {
            let created = users::create_user(db.as_ref(), &principal, input.into()).await?;
            Ok(user_payload(created))
        })
        .await
    }

    #[graphql(name = "setUserRole")]
    async fn set_user_role(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "userId")] user_id: ID,
        role: UserRole,
    ) -> async_graphql::Result<UserPayload> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("setUserRole", async {
            let user_id = parse_uuid(&user_id, "user")?;
            let updated =
                users::set_user_role(db.as_ref(), &principal, user_id, role.into()).await?;
            Ok(user_payload(updated))
        })
        .await
    }

    #[graphql(name = "deleteUser")]
    async fn delete_user(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "userId")] user_id: ID,
    ) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("deleteUser", async {
            let user_id = parse_uuid(&user_id, "user")?;
            users::delete_user(db.as_ref(), &principal, user_id).await?;
            Ok(true)
        })
        .await
    }

    #[graphql(name = "createCategory")]
    async fn create_category(
        &self,
        ctx: &Context<'_>,
        input: CategoryInput,
    ) -> async_graphql::Result<CategoryNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("createCategory", async {
            Ok(records::create_category(db.as_ref(), &principal, input.into())
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "updateCategory")]
    async fn update_category(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: CategoryInput,
    ) -> async_graphql::Result<CategoryNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("updateCategory", async {
            let id = parse_uuid(&id, "category")?;
            Ok(records::update_category(db.as_ref(), &principal, id, input.into())
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "deleteCategory")]
    async fn delete_category(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("deleteCategory", async {
            let id = parse_uuid(&id, "category")?;
            records::delete_category(db.as_ref(), &principal, id).await?;
            Ok(true)
        })
        .await
    }

    #[graphql(name = "createService")]
    async fn create_service(
        &self,
        ctx: &Context<'_>,
        input: ServiceInput,
    ) -> async_graphql::Result<ServiceNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("createService", async {
            let draft: ServiceDraft = input.try_into()?;
            Ok(records::create_service(db.as_ref(), &principal, draft).await?.into())
        })
        .await
    }

    #[graphql(name = "updateService")]
    async fn update_service(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: ServiceInput,
    ) -> async_graphql::Result<ServiceNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("updateService", async {
            let id = parse_uuid(&id, "service")?;
            let draft: ServiceDraft = input.try_into()?;
            Ok(records::update_service(db.as_ref(), &principal, id, draft)
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "deleteService")]
    async fn delete_service(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("deleteService", async {
            let id = parse_uuid(&id, "service")?;
            records::delete_service(db.as_ref(), &principal, id).await?;
            Ok(true)
        })
        .await
    }

    #[graphql(name = "createContact")]
    async fn create_contact(
        &self,
        ctx: &Context<'_>,
        input: ContactInput,
    ) -> async_graphql::Result<ContactNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("createContact", async {
            Ok(records::create_contact(db.as_ref(), &principal, input.into())
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "updateContact")]
    async fn update_contact(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: ContactInput,
    ) -> async_graphql::Result<ContactNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("updateContact", async {
            let id = parse_uuid(&id, "contact")?;
            Ok(records::update_contact(db.as_ref(), &principal, id, input.into())
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "deleteContact")]
    async fn delete_contact(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("deleteContact", async {
            let id = parse_uuid(&id, "contact")?;
            records::delete_contact(db.as_ref(), &principal, id).await?;
            Ok(true)
        })
        .await
    }

    #[graphql(name = "createCompany")]
    async fn create_company(
        &self,
        ctx: &Context<'_>,
        input: CompanyInput,
    ) -> async_graphql::Result<CompanyNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("createCompany", async {
            let draft: CompanyDraft = input.try_into()?;
            Ok(records::create_company(db.as_ref(), &principal, draft).await?.into())
        })
        .await
    }

    #[graphql(name = "updateCompany")]
    async fn update_company(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: CompanyInput,
    ) -> async_graphql::Result<CompanyNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("updateCompany", async {
            let id = parse_uuid(&id, "company")?;
            let draft: CompanyDraft = input.try_into()?;
            Ok(records::update_company(db.as_ref(), &principal, id, draft)
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "deleteCompany")]
    async fn delete_company(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("deleteCompany", async {
            let id = parse_uuid(&id, "company")?;
            records::delete_company(db.as_ref(), &principal, id).await?;
            Ok(true)
        })
        .await
    }

    #[graphql(name = "createOpportunity")]
    async fn create_opportunity(
        &self,
        ctx: &Context<'_>,
        input: OpportunityInput,
    ) -> async_graphql::Result<OpportunityNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        let policy = policy(ctx);
        resolve("createOpportunity", async {
            let draft: OpportunityDraft = input.try_into()?;
            Ok(records::create_opportunity(db.as_ref(), policy, &principal, draft)
                .await?
                .into())
        })
        .await
    }

    #[graphql(name = "updateOpportunity")]
    async fn update_opportunity(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: OpportunityInput,
    ) -> async_graphql::Result<OpportunityNode> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        let policy = policy(ctx);
        resolve("updateOpportunity", async {
            let id = parse_uuid(&id, "opportunity")?;
            let draft: OpportunityDraft = input.try_into()?;
            Ok(
                records::update_opportunity(db.as_ref(), policy, &principal, id, draft)
                    .await?
                    .into(),
            )
        })
        .await
    }

    #[graphql(name = "deleteOpportunity")]
    async fn delete_opportunity(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("deleteOpportunity", async {
            let id = parse_uuid(&id, "opportunity")?;
            records::delete_opportunity(db.as_ref(), &principal, id).await?;
            Ok(true)
        })
        .await
    }

    /// Hand a record to another user; a null owner clears it.
    #[graphql(name = "reassignOwner")]
    async fn reassign_owner(
        &self,
        ctx: &Context<'_>,
        record: OwnedRecordKind,
        id: ID,
        #[graphql(name = "userId")] user_id: Option<ID>,
    ) -> async_graphql::Result<bool> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("reassignOwner", async {
            let id = parse_uuid(&id, "record")?;
            let owner = user_id
                .map(|uid| {
                    uuid::Uuid::parse_str(uid.as_str())
                        .map_err(|_| ApiError::field("owner", "Select a valid choice."))
                })
                .transpose()?;
            records::reassign_owner(db.as_ref(), &principal, record.into(), id, owner).await?;
            Ok(true)
        })
        .await
    }

    #[graphql(name = "refreshRelationTier")]
    async fn refresh_relation_tier(
        &self,
        ctx: &Context<'_>,
        client: ClientKind,
        id: ID,
    ) -> async_graphql::Result<RelationTier> {
        let db = database(ctx)?;
        let principal = principal(ctx);
        resolve("refreshRelationTier", async {
            let client = match client {
                ClientKind::Individual => ClientRef::Individual(parse_uuid(&id, "contact")?),
                ClientKind::Company => ClientRef::Company(parse_uuid(&id, "company")?),
            };
            let tier = records::refresh_client_tier(db.as_ref(), &principal, client).await?;
            Ok(tier.into())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_paging_is_clamped_to_zero() {
        let window = page(Some(-3), Some(-1));
        assert_eq!(window.limit, Some(0));
        assert_eq!(window.offset, Some(0));
        assert_eq!(page(None, None).limit, None);
    }
}
