mod common;

use common::{first_error_code, CrmTestContext};
use entity::{opportunity, service, user_group};
use platform_api::ApiError;
use products_crm::dashboard::build_dashboard;
use products_crm::lifecycle::LifecyclePolicy;
use products_crm::records::{self, OpportunityDraft, ServiceDraft};
use products_crm::roles::{tier_of, Principal};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use products_crm::seed::{MOBILE_SERVICE, SHOWCASE_SERVICE};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn commercial_dashboard_covers_own_pipeline() {
    let ctx = CrmTestContext::new_seeded().await;
    let commercial = ctx.principal("commercial").await;
    let dashboard = build_dashboard(ctx.db.as_ref(), &commercial).await.unwrap();

    let summary = &dashboard.summary;
    assert_eq!(summary.total_count, 3);
    assert_eq!(summary.revenue_total.to_string(), "1000.00");
    assert_eq!(summary.pipeline_total.to_string(), "1000.00");
    assert_eq!(summary.conversion_rate.to_string(), "33.33");
    assert_eq!(summary.recent.len(), 3);
    assert!(!dashboard.manager_view);
    assert!(!dashboard.is_administrator);
    assert!(dashboard.services_sold.is_empty());
    assert!(dashboard.services_sold_by_category.is_empty());
    // Two contacts plus Atlas Digital.
    assert_eq!(dashboard.client_count, 3);
}

#[tokio::test]
async fn manager_dashboard_covers_every_opportunity() {
    let ctx = CrmTestContext::new_seeded().await;
    let manager = ctx.principal("manager").await;
    let dashboard = build_dashboard(ctx.db.as_ref(), &manager).await.unwrap();

    let summary = &dashboard.summary;
    assert_eq!(summary.total_count, 4);
    assert_eq!(summary.revenue_total.to_string(), "6000.00");
    assert_eq!(summary.pipeline_total.to_string(), "1000.00");
    assert_eq!(summary.conversion_rate.to_string(), "50.00");
    assert!(dashboard.manager_view);
    assert!(!dashboard.is_administrator);
    assert_eq!(dashboard.client_count, 4);

    let sold: Vec<_> = dashboard
        .services_sold
        .iter()
        .map(|s| (s.label.as_deref(), s.sale_count))
        .collect();
    assert_eq!(sold, vec![(Some(MOBILE_SERVICE), 1), (Some(SHOWCASE_SERVICE), 1)]);

    let by_category: Vec<_> = dashboard
        .services_sold_by_category
        .iter()
        .map(|s| (s.label.as_deref(), s.sale_count))
        .collect();
    assert_eq!(
        by_category,
        vec![(Some("Développement Mobile"), 1), (Some("Développement Web"), 1)]
    );
}

#[tokio::test]
async fn services_sold_group_by_service_name() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let twin = records::create_service(
        db,
        &admin,
        ServiceDraft {
            name: MOBILE_SERVICE.into(),
            description: None,
            price: Decimal::new(250_000, 2),
            tariff_type: service::TariffType::OneTime,
            category_id: None,
            is_active: true,
        },
    )
    .await
    .unwrap();

    let manager = ctx.principal("manager").await;
    records::create_opportunity(
        db,
        LifecyclePolicy::default(),
        &manager,
        OpportunityDraft {
            name: "Application Alaoui".into(),
            description: None,
            status: opportunity::Status::Won,
            amount: None,
            individual_id: ctx.seeded.contact_email("nadia.alaoui@mail.test").map(|c| c.id),
            company_id: None,
            service_id: Some(twin.id),
        },
    )
    .await
    .unwrap();

    let dashboard = build_dashboard(db, &manager).await.unwrap();
    let sold: Vec<_> = dashboard
        .services_sold
        .iter()
        .map(|s| (s.label.as_deref(), s.sale_count))
        .collect();
    assert_eq!(sold, vec![(Some(MOBILE_SERVICE), 2), (Some(SHOWCASE_SERVICE), 1)]);
}

#[tokio::test]
async fn administrator_flag_is_reported() {
    let ctx = CrmTestContext::new_seeded().await;
    let admin = ctx.principal("admin").await;
    let dashboard = build_dashboard(ctx.db.as_ref(), &admin).await.unwrap();
    assert!(dashboard.is_administrator);
    assert!(dashboard.manager_view);
}

#[tokio::test]
async fn groupless_owner_sees_an_empty_dashboard() {
    let ctx = CrmTestContext::new_seeded().await;
    let commercial = ctx.seeded.user_named("commercial").unwrap().id;
    user_group::Entity::delete_many()
        .filter(user_group::Column::UserId.eq(commercial))
        .exec(ctx.db.as_ref())
        .await
        .unwrap();

    let principal = ctx.principal("commercial").await;
    assert!(principal.is_authenticated());
    assert_eq!(tier_of(&principal), None);

    let dashboard = build_dashboard(ctx.db.as_ref(), &principal).await.unwrap();
    assert_eq!(dashboard.summary.total_count, 0);
    assert_eq!(dashboard.summary.revenue_total.to_string(), "0.00");
    assert!(dashboard.summary.conversion_rate.is_zero());
    assert!(dashboard.summary.recent.is_empty());
    assert_eq!(dashboard.client_count, 0);
    assert!(!dashboard.manager_view);
}

#[tokio::test]
async fn anonymous_dashboard_requires_login() {
    let ctx = CrmTestContext::new_seeded().await;
    let err = build_dashboard(ctx.db.as_ref(), &Principal::Anonymous)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));
}

#[tokio::test]
async fn dashboard_over_graphql() {
    let ctx = CrmTestContext::new_seeded().await;
    let query = r#"
        query {
            crm {
                dashboard {
                    totalCount
                    revenueTotal
                    pipelineTotal
                    conversionRate
                    statusBreakdown { status count color }
                    managerView
                }
            }
        }
    "#;
    let data = ctx
        .data(ctx.principal("commercial").await, query, json!({}))
        .await;
    let dashboard = &data["crm"]["dashboard"];
    assert_eq!(dashboard["totalCount"], 3);
    assert_eq!(dashboard["conversionRate"], "33.33");
    assert_eq!(dashboard["revenueTotal"], "1000.00");
    assert_eq!(dashboard["managerView"], false);
    assert_eq!(
        dashboard["statusBreakdown"],
        json!([
            { "status": "QUALIFICATION", "count": 1, "color": "#36a2eb" },
            { "status": "WON", "count": 1, "color": "#28a745" },
            { "status": "LOST", "count": 1, "color": "#dc3545" },
        ])
    );

    let resp = ctx.execute(Principal::Anonymous, query, json!({})).await;
    assert_eq!(first_error_code(&resp).as_deref(), Some("UNAUTHENTICATED"));
}
