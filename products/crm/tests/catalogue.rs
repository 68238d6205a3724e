mod common;

use std::str::FromStr;

use chrono::{Duration, Utc};
use common::CrmTestContext;
use entity::{opportunity, service};
use platform_api::ApiError;
use products_crm::filters::{CategoryFilter, ServiceFilter};
use products_crm::records::{self, ServiceDraft};
use products_crm::scope::{self, Page};
use products_crm::seed::SHOWCASE_SERVICE;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;

#[tokio::test]
async fn name_filter_is_case_insensitive_substring() {
    let ctx = CrmTestContext::new_seeded().await;
    let commercial = ctx.principal("commercial").await;
    let filter = ServiceFilter {
        name: Some("vitrine".into()),
        ..Default::default()
    };
    let listing = scope::list_services(ctx.db.as_ref(), &commercial, &filter, Page::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 1);
    assert_eq!(listing.items[0].name, SHOWCASE_SERVICE);
}

#[tokio::test]
async fn like_wildcards_in_the_name_filter_match_literally() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let names = |filter: &str| ServiceFilter {
        name: Some(filter.into()),
        ..Default::default()
    };

    for wildcard in ["_", "%", "\\"] {
        let listing = scope::list_services(db, &admin, &names(wildcard), Page::default())
            .await
            .unwrap();
        assert_eq!(listing.total, 0, "{wildcard}");
    }

    records::create_service(
        db,
        &admin,
        ServiceDraft {
            name: "Remise 10%_fidélité".into(),
            description: None,
            price: Decimal::from_str("90.00").unwrap(),
            tariff_type: service::TariffType::OneTime,
            category_id: None,
            is_active: true,
        },
    )
    .await
    .unwrap();
    for literal in ["10%", "%_f", "_"] {
        let listing = scope::list_services(db, &admin, &names(literal), Page::default())
            .await
            .unwrap();
        assert_eq!(listing.total, 1, "{literal}");
        assert_eq!(listing.items[0].name, "Remise 10%_fidélité");
    }
}

#[tokio::test]
async fn active_flag_filters_services() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let hosting = ctx.seeded.service_named("Hébergement").unwrap().clone();
    records::update_service(
        db,
        &admin,
        hosting.id,
        ServiceDraft {
            name: hosting.name.clone(),
            description: None,
            price: Decimal::new(hosting.price_cents, 2),
            tariff_type: hosting.tariff_type,
            category_id: None,
            is_active: false,
        },
    )
    .await
    .unwrap();

    let inactive = ServiceFilter {
        active: Some(false),
        ..Default::default()
    };
    let listing = scope::list_services(db, &admin, &inactive, Page::default()).await.unwrap();
    assert_eq!(listing.total, 1);
    assert_eq!(listing.items[0].id, hosting.id);

    let active = ServiceFilter {
        active: Some(true),
        ..Default::default()
    };
    let listing = scope::list_services(db, &admin, &active, Page::default()).await.unwrap();
    assert_eq!(listing.total, 2);
}

#[tokio::test]
async fn date_filters_apply_to_administrators_only() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let tomorrow = Utc::now().date_naive() + Duration::days(1);
    let filter = CategoryFilter {
        created_from: Some(tomorrow),
        ..Default::default()
    };

    let commercial = ctx.principal("commercial").await;
    let listing = scope::list_categories(db, &commercial, &filter, Page::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 2, "commercial date filter must be ignored");
    assert!(listing.filters.iter().all(|f| f.key != "created"));

    let admin = ctx.principal("admin").await;
    let listing = scope::list_categories(db, &admin, &filter, Page::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 0);

    let today = Utc::now().date_naive();
    let inclusive = CategoryFilter {
        created_to: Some(today),
        ..Default::default()
    };
    let listing = scope::list_categories(db, &admin, &inclusive, Page::default())
        .await
        .unwrap();
    assert_eq!(listing.total, 2);
}

#[tokio::test]
async fn catalogue_writes_need_an_administrator() {
    let ctx = CrmTestContext::new_seeded().await;
    let manager = ctx.principal("manager").await;
    let draft = ServiceDraft {
        name: "Audit SEO".into(),
        description: None,
        price: Decimal::from_str("450.00").unwrap(),
        tariff_type: service::TariffType::OneTime,
        category_id: None,
        is_active: true,
    };
    let err = records::create_service(ctx.db.as_ref(), &manager, draft.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let admin = ctx.principal("admin").await;
    let created = records::create_service(ctx.db.as_ref(), &admin, draft)
        .await
        .unwrap();
    assert_eq!(created.price_cents, 45_000);
}

#[tokio::test]
async fn negative_or_fractional_cent_prices_are_rejected() {
    let ctx = CrmTestContext::new_seeded().await;
    let admin = ctx.principal("admin").await;
    for price in ["-1.00", "10.005"] {
        let err = records::create_service(
            ctx.db.as_ref(),
            &admin,
            ServiceDraft {
                name: format!("Offre {price}"),
                description: None,
                price: Decimal::from_str(price).unwrap(),
                tariff_type: service::TariffType::MonthlySubscription,
                category_id: None,
                is_active: true,
            },
        )
        .await
        .unwrap_err();
        match err {
            ApiError::Validation(errors) => assert_eq!(errors.for_field("price").count(), 1),
            other => panic!("unexpected error {other:?}"),
        }
    }
}

#[tokio::test]
async fn deleting_a_service_detaches_its_opportunities() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let showcase = ctx.seeded.service_named(SHOWCASE_SERVICE).unwrap().id;

    records::delete_service(db, &admin, showcase).await.unwrap();

    let won = ctx.seeded.opportunity_named("Site vitrine Alaoui").unwrap().id;
    let row = opportunity::Entity::find_by_id(won).one(db).await.unwrap().unwrap();
    assert_eq!(row.service_id, None);
    assert_eq!(row.amount_cents, Some(100_000));
    assert!(service::Entity::find_by_id(showcase).one(db).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_a_category_keeps_its_services() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let web = ctx.seeded.categories.iter().find(|c| c.name == "Développement Web").unwrap();
    let showcase = ctx.seeded.service_named(SHOWCASE_SERVICE).unwrap().id;

    records::delete_category(db, &admin, web.id).await.unwrap();

    let row = service::Entity::find_by_id(showcase).one(db).await.unwrap().unwrap();
    assert_eq!(row.category_id, None);
}
