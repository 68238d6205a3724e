//! Demo data: one user per tier plus a second commercial user, a small
//! catalogue, a few clients and a pipeline split between the two commercial
//! users.

use chrono::{NaiveDate, Utc};
use entity::{
    category, company, individual_contact, opportunity, service, user, LeadSource, RelationTier,
};
use platform_api::ApiResult;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use uuid::Uuid;

use crate::db_error;
use crate::lifecycle::{save_opportunity, LifecyclePolicy};
use crate::membership::ensure_role_groups;
use crate::money;
use crate::records::OpportunityDraft;
use crate::users::{register_user, NewUser};
use crate::validation::Validated;

pub const SHOWCASE_SERVICE: &str = "Création de Site Vitrine";
pub const MOBILE_SERVICE: &str = "Application Mobile";

#[derive(Debug, Default)]
pub struct SeededCrmRecords {
    pub users: Vec<user::Model>,
    pub categories: Vec<category::Model>,
    pub services: Vec<service::Model>,
    pub contacts: Vec<individual_contact::Model>,
    pub companies: Vec<company::Model>,
    pub opportunities: Vec<opportunity::Model>,
}

impl SeededCrmRecords {
    pub fn user_named(&self, username: &str) -> Option<&user::Model> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn service_named(&self, name: &str) -> Option<&service::Model> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn contact_email(&self, email: &str) -> Option<&individual_contact::Model> {
        self.contacts.iter().find(|c| c.email == email)
    }

    pub fn company_named(&self, legal_name: &str) -> Option<&company::Model> {
        self.companies.iter().find(|c| c.legal_name == legal_name)
    }

    pub fn opportunity_named(&self, name: &str) -> Option<&opportunity::Model> {
        self.opportunities.iter().find(|o| o.name == name)
    }
}

async fn seed_user(
    db: &DatabaseConnection,
    username: &str,
    first_name: &str,
    last_name: &str,
    role: user::Role,
    password: &str,
) -> ApiResult<user::Model> {
    let (model, _) = register_user(
        db,
        NewUser {
            username: username.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: Some(format!("{username}@crm.test")),
            role,
            is_superuser: false,
        },
    )
    .await?;
    Ok(model)
}

async fn seed_category(
    db: &DatabaseConnection,
    name: &str,
    now: DateTimeWithTimeZone,
) -> ApiResult<category::Model> {
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

async fn seed_service(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
    tariff_type: service::TariffType,
    category_id: Option<Uuid>,
    now: DateTimeWithTimeZone,
) -> ApiResult<service::Model> {
    service::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(None),
        price_cents: Set(price_cents),
        tariff_type: Set(tariff_type),
        category_id: Set(category_id),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

async fn seed_contact(
    db: &DatabaseConnection,
    (first_name, last_name): (&str, &str),
    email: &str,
    phone: &str,
    owner: &user::Model,
    now: DateTimeWithTimeZone,
) -> ApiResult<individual_contact::Model> {
    individual_contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        civility: Set(individual_contact::Civility::Mrs),
        last_name: Set(last_name.into()),
        first_name: Set(first_name.into()),
        birth_date: Set(NaiveDate::from_ymd_opt(1988, 6, 14).unwrap_or_default()),
        email: Set(email.into()),
        phone: Set(phone.into()),
        source: Set(Some(LeadSource::Referral)),
        notes: Set(None),
        address: Set("12 rue des Orangers".into()),
        city: Set("Casablanca".into()),
        postal_code: Set("20000".into()),
        country: Set("Maroc".into()),
        owner_id: Set(Some(owner.id)),
        relation_tier: Set(RelationTier::Prospect),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

async fn seed_company(
    db: &DatabaseConnection,
    legal_name: &str,
    registration_id: &str,
    slug: &str,
    owner: &user::Model,
    now: DateTimeWithTimeZone,
) -> ApiResult<company::Model> {
    company::ActiveModel {
        id: Set(Uuid::new_v4()),
        legal_name: Set(legal_name.into()),
        registration_id: Set(registration_id.into()),
        legal_form: Set(company::LegalForm::Sarl),
        sector: Set(company::Sector::J),
        email: Set(format!("contact@{slug}.test")),
        phone: Set(format!("+212 5 22 {}", &registration_id[9..])),
        website: Set(Some(format!("https://{slug}.test"))),
        address: Set("Boulevard Zerktouni".into()),
        city: Set("Casablanca".into()),
        postal_code: Set("20250".into()),
        country: Set("Maroc".into()),
        primary_contact_id: Set(None),
        headcount: Set(Some(company::Headcount::Small)),
        source: Set(Some(LeadSource::Web)),
        notes: Set(None),
        owner_id: Set(Some(owner.id)),
        account_tier: Set(RelationTier::Prospect),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(db_error)
}

struct SeedOpportunity<'a> {
    name: &'a str,
    status: opportunity::Status,
    service: &'a service::Model,
    individual: Option<Uuid>,
    company: Option<Uuid>,
    owner: &'a user::Model,
}

async fn seed_opportunity(
    db: &DatabaseConnection,
    entry: SeedOpportunity<'_>,
) -> ApiResult<opportunity::Model> {
    let draft = OpportunityDraft {
        name: entry.name.into(),
        description: None,
        status: entry.status,
        amount: Some(money::from_cents(entry.service.price_cents)),
        individual_id: entry.individual,
        company_id: entry.company,
        service_id: Some(entry.service.id),
    };
    save_opportunity(
        db,
        LifecyclePolicy::default(),
        Validated::new(draft),
        None,
        Some(entry.owner.id),
    )
    .await
}

/// Populate an empty database with demo records.
///
/// `commercial` owns three opportunities (won, lost, qualification) and
/// `commercial2` owns one more won deal, so a commercial dashboard and a
/// manager dashboard disagree in a predictable way.
pub async fn seed_crm_demo(db: &DatabaseConnection) -> ApiResult<SeededCrmRecords> {
    ensure_role_groups(db).await?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut seeded = SeededCrmRecords::default();

    let admin = seed_user(db, "admin", "Amina", "Benali", user::Role::Administrator, "adminpass").await?;
    let manager = seed_user(db, "manager", "Karim", "Idrissi", user::Role::Manager, "managerpass").await?;
    let commercial = seed_user(db, "commercial", "Salma", "Tazi", user::Role::Commercial, "commercialpass").await?;
    let commercial2 =
        seed_user(db, "commercial2", "Youssef", "Amrani", user::Role::Commercial, "commercialpass").await?;

    let web = seed_category(db, "Développement Web", now).await?;
    let mobile = seed_category(db, "Développement Mobile", now).await?;
    let showcase = seed_service(
        db,
        SHOWCASE_SERVICE,
        100_000,
        service::TariffType::OneTime,
        Some(web.id),
        now,
    )
    .await?;
    let app = seed_service(
        db,
        MOBILE_SERVICE,
        500_000,
        service::TariffType::OneTime,
        Some(mobile.id),
        now,
    )
    .await?;
    let hosting = seed_service(
        db,
        "Hébergement",
        120_000,
        service::TariffType::AnnualSubscription,
        None,
        now,
    )
    .await?;

    let nadia = seed_contact(db, ("Nadia", "Alaoui"), "nadia.alaoui@mail.test", "+212 6 11 22 33 44", &commercial, now).await?;
    let omar = seed_contact(db, ("Omar", "Chraibi"), "omar.chraibi@mail.test", "+212 6 55 66 77 88", &commercial, now).await?;
    let atlas = seed_company(db, "Atlas Digital", "000000000000001", "atlas", &commercial, now).await?;
    let sahara = seed_company(db, "Sahara Logistique", "000000000000002", "sahara", &commercial2, now).await?;

    for entry in [
        SeedOpportunity {
            name: "Site vitrine Alaoui",
            status: opportunity::Status::Won,
            service: &showcase,
            individual: Some(nadia.id),
            company: None,
            owner: &commercial,
        },
        SeedOpportunity {
            name: "Application Atlas",
            status: opportunity::Status::Lost,
            service: &app,
            individual: None,
            company: Some(atlas.id),
            owner: &commercial,
        },
        SeedOpportunity {
            name: "Site vitrine Chraibi",
            status: opportunity::Status::Qualification,
            service: &showcase,
            individual: Some(omar.id),
            company: None,
            owner: &commercial,
        },
        SeedOpportunity {
            name: "Application Sahara",
            status: opportunity::Status::Won,
            service: &app,
            individual: None,
            company: Some(sahara.id),
            owner: &commercial2,
        },
    ] {
        seeded.opportunities.push(seed_opportunity(db, entry).await?);
    }

    seeded.users = vec![admin, manager, commercial, commercial2];
    seeded.categories = vec![web, mobile];
    seeded.services = vec![showcase, app, hosting];
    // Won opportunities above refreshed some tiers; reload the clients.
    seeded.contacts = individual_contact::Entity::find()
        .filter(individual_contact::Column::Id.is_in([nadia.id, omar.id]))
        .order_by_asc(individual_contact::Column::LastName)
        .all(db)
        .await
        .map_err(db_error)?;
    seeded.companies = company::Entity::find()
        .filter(company::Column::Id.is_in([atlas.id, sahara.id]))
        .order_by_asc(company::Column::LegalName)
        .all(db)
        .await
        .map_err(db_error)?;
    info!(
        users = seeded.users.len(),
        services = seeded.services.len(),
        opportunities = seeded.opportunities.len(),
        "demo data seeded"
    );
    Ok(seeded)
}
