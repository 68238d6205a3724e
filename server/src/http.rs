use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Form, Json, Router,
    extract::{FromRequestParts, OriginalUri, Query, State, rejection::QueryRejection},
    http::{
        self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri,
        header::AUTHORIZATION,
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use platform_api::{ApiError, ValidationErrors};
use platform_db::DbPool;
use products_crm::{
    auth::{self, LOGIN_FAILED, SESSION_COOKIE},
    dashboard::build_dashboard,
    filters::{CategoryFilter, CompanyFilter, ContactFilter, OpportunityFilter, ServiceFilter},
    roles::{Principal, resolve_principal},
    schema::{
        AppSchema, CrmSchema, build_schema,
        types::{CategoryNode, CompanyNode, ContactNode, DashboardNode, OpportunityNode, PageNode, ServiceNode},
    },
    scope::{self, Page},
};
use sea_orm::{ConnectionTrait, Statement};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub schema: CrmSchema,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: DbPool, config: Arc<AppConfig>) -> Self {
        let db = Arc::new(db);
        let AppSchema(schema) = build_schema(
            db.clone(),
            Arc::new(config.auth.clone()),
            config.lifecycle,
        );
        Self { db, schema, config }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "crm server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    let cors = CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin);
    // Credentialed CORS cannot be combined with a wildcard origin.
    if origins.is_empty() {
        cors
    } else {
        cors.allow_credentials(true)
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route("/health", get(health_handler))
        .route("/login", get(login_prompt_handler).post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/categories", get(categories_handler))
        .route("/services", get(services_handler))
        .route("/contacts", get(contacts_handler))
        .route("/companies", get(companies_handler))
        .route("/opportunities", get(opportunities_handler))
        .route("/graphql", post(graphql_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Principal behind the request: a bearer token wins over the session
/// cookie. Missing, expired or forged tokens yield an anonymous principal.
pub struct Session(pub Principal);

impl FromRequestParts<AppState> for Session {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(Session(Principal::Anonymous));
        };
        let claims = match auth::decode_token(&token, &state.config.auth) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "discarding unusable session token");
                return Ok(Session(Principal::Anonymous));
            }
        };
        let principal = resolve_principal(state.db.as_ref(), claims.sub).await?;
        Ok(Session(principal))
    }
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
    })
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|path| path.starts_with('/') && !path.starts_with("//"))
}

#[derive(Deserialize)]
struct NextQuery {
    next: Option<String>,
}

#[derive(Serialize)]
struct LoginPrompt {
    action: String,
    next: Option<String>,
}

async fn login_prompt_handler(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Json<LoginPrompt> {
    Json(LoginPrompt {
        action: state.config.login_path.clone(),
        next: safe_next(query.next.as_deref()).map(String::from),
    })
}

#[derive(Deserialize)]
struct LoginForm {
    username: String,
    password: String,
    next: Option<String>,
}

async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> HttpResult<Response> {
    let user = match auth::authenticate(state.db.as_ref(), &form.username, &form.password).await {
        Ok(user) => user,
        Err(ApiError::Validation(_)) => {
            info!(username = %form.username, "login refused");
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::message("LOGIN_FAILED", LOGIN_FAILED)),
            )
                .into_response());
        }
        Err(err) => return Err(err.into()),
    };
    let token = auth::issue_token(user.id, &state.config.auth)
        .map_err(|err| HttpError::from(ApiError::internal(err.into())))?;
    let jar = jar.add(auth::session_cookie(token, state.config.auth.session_ttl_minutes));
    let target = safe_next(form.next.as_deref()).unwrap_or("/");
    info!(user_id = %user.id, "login succeeded");
    Ok((jar, Redirect::to(target)).into_response())
}

async fn logout_handler(jar: CookieJar) -> (CookieJar, StatusCode) {
    (jar.add(auth::expired_session_cookie()), StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    limit: Option<u64>,
    offset: Option<u64>,
}

impl From<PageQuery> for Page {
    fn from(value: PageQuery) -> Self {
        Page {
            limit: value.limit,
            offset: value.offset,
        }
    }
}

/// Query-string values are only parsed for signed-in callers; anonymous ones
/// go to the login form whatever they sent.
fn page_query<T>(
    state: &AppState,
    uri: &Uri,
    principal: &Principal,
    query: Result<Query<T>, QueryRejection>,
) -> HttpResult<T> {
    match query {
        Ok(Query(value)) => Ok(value),
        Err(_) if !principal.is_authenticated() => {
            Err(HttpError::for_page(state, uri, ApiError::Unauthenticated))
        }
        Err(rejection) => Err(HttpError::BadQuery(rejection)),
    }
}

async fn dashboard_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Session(principal): Session,
) -> HttpResult<Json<DashboardNode>> {
    let dashboard = build_dashboard(state.db.as_ref(), &principal)
        .await
        .map_err(|err| HttpError::for_page(&state, &uri, err))?;
    Ok(Json(dashboard.into()))
}

async fn categories_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Session(principal): Session,
    filter: Result<Query<CategoryFilter>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<PageNode<CategoryNode>>> {
    let filter = page_query(&state, &uri, &principal, filter)?;
    let page = page_query(&state, &uri, &principal, page)?;
    let listing = scope::list_categories(state.db.as_ref(), &principal, &filter, page.into())
        .await
        .map_err(|err| HttpError::for_page(&state, &uri, err))?;
    Ok(Json(listing.into()))
}

async fn services_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Session(principal): Session,
    filter: Result<Query<ServiceFilter>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<PageNode<ServiceNode>>> {
    let filter = page_query(&state, &uri, &principal, filter)?;
    let page = page_query(&state, &uri, &principal, page)?;
    let listing = scope::list_services(state.db.as_ref(), &principal, &filter, page.into())
        .await
        .map_err(|err| HttpError::for_page(&state, &uri, err))?;
    Ok(Json(listing.into()))
}

async fn contacts_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Session(principal): Session,
    filter: Result<Query<ContactFilter>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<PageNode<ContactNode>>> {
    let filter = page_query(&state, &uri, &principal, filter)?;
    let page = page_query(&state, &uri, &principal, page)?;
    let listing = scope::list_contacts(state.db.as_ref(), &principal, &filter, page.into())
        .await
        .map_err(|err| HttpError::for_page(&state, &uri, err))?;
    Ok(Json(listing.into()))
}

async fn companies_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Session(principal): Session,
    filter: Result<Query<CompanyFilter>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<PageNode<CompanyNode>>> {
    let filter = page_query(&state, &uri, &principal, filter)?;
    let page = page_query(&state, &uri, &principal, page)?;
    let listing = scope::list_companies(state.db.as_ref(), &principal, &filter, page.into())
        .await
        .map_err(|err| HttpError::for_page(&state, &uri, err))?;
    Ok(Json(listing.into()))
}

async fn opportunities_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Session(principal): Session,
    filter: Result<Query<OpportunityFilter>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> HttpResult<Json<PageNode<OpportunityNode>>> {
    let filter = page_query(&state, &uri, &principal, filter)?;
    let page = page_query(&state, &uri, &principal, page)?;
    let listing = scope::list_opportunities(state.db.as_ref(), &principal, &filter, page.into())
        .await
        .map_err(|err| HttpError::for_page(&state, &uri, err))?;
    Ok(Json(listing.into()))
}

async fn graphql_handler(
    State(state): State<AppState>,
    Session(principal): Session,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let req = request.into_inner().data(principal);
    state.schema.execute(req).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.db.get_database_backend();
    let db_ok = state
        .db
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<ValidationErrors>,
}

impl ErrorBody {
    fn message(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: None,
        }
    }
}

#[derive(Debug)]
pub enum HttpError {
    Api(ApiError),
    /// Anonymous access to a page: send the browser to the login form and
    /// bring it back afterwards.
    LoginRequired { location: String },
    BadQuery(QueryRejection),
}

impl HttpError {
    fn for_page(state: &AppState, uri: &Uri, err: ApiError) -> Self {
        match err {
            ApiError::Unauthenticated => {
                let next = uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or_else(|| uri.path());
                Self::LoginRequired {
                    location: format!(
                        "{}?next={}",
                        state.config.login_path,
                        urlencoding::encode(next)
                    ),
                }
            }
            other => Self::Api(other),
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let err = match self {
            HttpError::LoginRequired { location } => {
                return Redirect::to(&location).into_response();
            }
            HttpError::BadQuery(rejection) => return rejection.into_response(),
            HttpError::Api(err) => err,
        };
        let status = match &err {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(inner) => {
                error!(error = ?inner, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let fields = match &err {
            ApiError::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorBody {
            code: err.code(),
            message: err.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use entity::user_group;
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use platform_db::{DatabaseSettings, connect};
    use products_crm::auth::AuthConfig;
    use products_crm::lifecycle::LifecyclePolicy;
    use products_crm::seed::{SeededCrmRecords, seed_crm_demo};
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    struct TestApp {
        state: AppState,
        seeded: SeededCrmRecords,
    }

    impl TestApp {
        async fn new() -> Self {
            let db = connect(&DatabaseSettings::new("sqlite::memory:")).await.unwrap();
            Migrator::up(&db, None).await.unwrap();
            let seeded = seed_crm_demo(&db).await.unwrap();
            let config = AppConfig {
                auth: AuthConfig {
                    jwt_secret: "http-test-secret-http-test-secret".into(),
                    session_ttl_minutes: 60,
                },
                cors_allowed_origins: Vec::new(),
                login_path: "/login".into(),
                lifecycle: LifecyclePolicy::default(),
            };
            Self {
                state: AppState::new(db, Arc::new(config)),
                seeded,
            }
        }

        fn bearer(&self, username: &str) -> String {
            let user = self.seeded.user_named(username).unwrap();
            let token = auth::issue_token(user.id, &self.state.config.auth).unwrap();
            format!("Bearer {token}")
        }

        async fn send(&self, request: Request<Body>) -> Response {
            build_router(self.state.clone()).oneshot(request).await.unwrap()
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn header<'a>(response: &'a Response, name: &str) -> &'a str {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    fn login_request(username: &str, password: &str, next: &str) -> Request<Body> {
        Request::post("/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "username={username}&password={password}&next={}",
                urlencoding::encode(next)
            )))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_database() {
        let app = TestApp::new().await;
        let response = app
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!header(&response, "x-request-id").is_empty());
        let body = json_body(response).await;
        assert_eq!(body["db_ok"], true);
    }

    #[tokio::test]
    async fn anonymous_pages_redirect_to_login_with_next() {
        let app = TestApp::new().await;
        let response = app
            .send(Request::get("/contacts?last_name=alaoui").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            header(&response, "location"),
            "/login?next=%2Fcontacts%3Flast_name%3Dalaoui"
        );
    }

    #[tokio::test]
    async fn malformed_filters_still_send_anonymous_callers_to_login() {
        let app = TestApp::new().await;
        let response = app
            .send(Request::get("/opportunities?status=bogus").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            header(&response, "location"),
            "/login?next=%2Fopportunities%3Fstatus%3Dbogus"
        );

        let response = app
            .send(
                Request::get("/opportunities?status=bogus")
                    .header("authorization", app.bearer("commercial"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn failed_login_is_unauthorized() {
        let app = TestApp::new().await;
        let response = app.send(login_request("commercial", "wrong", "/")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("set-cookie").is_none());
        let body = json_body(response).await;
        assert_eq!(body["message"], LOGIN_FAILED);
    }

    #[tokio::test]
    async fn login_cookie_opens_the_pipeline() {
        let app = TestApp::new().await;
        let response = app
            .send(login_request("commercial", "commercialpass", "/opportunities"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header(&response, "location"), "/opportunities");
        let set_cookie = header(&response, "set-cookie").to_string();
        assert!(set_cookie.starts_with("crm_session="));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let response = app
            .send(
                Request::get("/opportunities")
                    .header("cookie", cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 3);
        assert_eq!(body["canSeeOwner"], false);
    }

    #[tokio::test]
    async fn external_next_is_not_followed() {
        let app = TestApp::new().await;
        let response = app
            .send(login_request("manager", "managerpass", "//evil.test/"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(header(&response, "location"), "/");
    }

    #[tokio::test]
    async fn groupless_users_are_forbidden() {
        let app = TestApp::new().await;
        let target = app.seeded.user_named("commercial2").unwrap().id;
        user_group::Entity::delete_many()
            .filter(user_group::Column::UserId.eq(target))
            .exec(app.state.db.as_ref())
            .await
            .unwrap();
        let response = app
            .send(
                Request::get("/contacts")
                    .header("authorization", app.bearer("commercial2"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn service_filters_come_from_the_query_string() {
        let app = TestApp::new().await;
        let response = app
            .send(
                Request::get("/services?name=vitrine&tariff_type=&limit=10")
                    .header("authorization", app.bearer("commercial"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["items"][0]["price"], "1000.00");
    }

    #[tokio::test]
    async fn dashboard_is_scoped_to_the_caller() {
        let app = TestApp::new().await;
        let response = app
            .send(
                Request::get("/dashboard")
                    .header("authorization", app.bearer("manager"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["totalCount"], 4);
        assert_eq!(body["managerView"], true);
    }

    #[tokio::test]
    async fn graphql_sees_the_session_principal() {
        let app = TestApp::new().await;
        let response = app
            .send(
                Request::post("/graphql")
                    .header("authorization", app.bearer("manager"))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"{ crm { me { username tier } } }"}"#))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["crm"]["me"]["username"], "manager");
        assert_eq!(body["data"]["crm"]["me"]["tier"], "MANAGER");
    }

    #[tokio::test]
    async fn logout_expires_the_cookie() {
        let app = TestApp::new().await;
        let response = app
            .send(Request::post("/logout").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(header(&response, "set-cookie").contains("Max-Age=0"));
    }
}
