#![allow(dead_code)]

use std::sync::Arc;

use async_graphql::{Request, Response, Variables};
use migration::{Migrator, MigratorTrait};
use platform_db::{connect, DatabaseSettings};
use products_crm::auth::AuthConfig;
use products_crm::lifecycle::LifecyclePolicy;
use products_crm::roles::{resolve_principal, Principal};
use products_crm::schema::{build_schema, AppSchema, CrmSchema};
use products_crm::seed::{seed_crm_demo, SeededCrmRecords};
use sea_orm::DatabaseConnection;
use serde_json::Value;

pub struct CrmTestContext {
    pub db: Arc<DatabaseConnection>,
    pub schema: CrmSchema,
    pub seeded: SeededCrmRecords,
}

pub async fn empty_db() -> DatabaseConnection {
    let db = connect(&DatabaseSettings::new("sqlite::memory:"))
        .await
        .expect("sqlite connect");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

pub fn test_auth() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".into(),
        session_ttl_minutes: 30,
    }
}

impl CrmTestContext {
    pub async fn new_seeded() -> Self {
        Self::with_policy(LifecyclePolicy::default()).await
    }

    pub async fn with_policy(policy: LifecyclePolicy) -> Self {
        let conn = empty_db().await;
        let seeded = seed_crm_demo(&conn).await.expect("seed");
        let db = Arc::new(conn);
        let AppSchema(schema) = build_schema(db.clone(), Arc::new(test_auth()), policy);
        Self { db, schema, seeded }
    }

    pub async fn principal(&self, username: &str) -> Principal {
        let user = self
            .seeded
            .user_named(username)
            .unwrap_or_else(|| panic!("seeded user {username}"));
        resolve_principal(self.db.as_ref(), user.id)
            .await
            .expect("resolve principal")
    }

    pub async fn execute(&self, principal: Principal, query: &str, vars: Value) -> Response {
        let request = Request::new(query)
            .variables(Variables::from_json(vars))
            .data(principal);
        self.schema.execute(request).await
    }

    /// Runs a request that must succeed and returns its `data` as JSON.
    pub async fn data(&self, principal: Principal, query: &str, vars: Value) -> Value {
        let resp = self.execute(principal, query, vars).await;
        assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
        resp.data.into_json().expect("json data")
    }
}

/// The `code` extension of the first GraphQL error.
pub fn first_error_code(resp: &Response) -> Option<String> {
    let err = resp.errors.first()?;
    let ext = err.extensions.as_ref()?;
    match ext.get("code")? {
        async_graphql::Value::String(code) => Some(code.clone()),
        _ => None,
    }
}
