mod common;

use common::CrmTestContext;
use entity::{company, role_group, user, user_group};
use platform_api::ApiError;
use products_crm::auth::{authenticate, LOGIN_FAILED};
use products_crm::membership::Reconciliation;
use products_crm::records::{self, OwnedRecord};
use products_crm::roles::{tier_of, Tier};
use products_crm::users::{self, NewUser};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn new_user(username: &str, role: user::Role) -> NewUser {
    NewUser {
        username: username.into(),
        password: "longenough".into(),
        first_name: "Leila".into(),
        last_name: "Fassi".into(),
        email: Some(format!("{username}@crm.test")),
        role,
        is_superuser: false,
    }
}

#[tokio::test]
async fn role_change_replaces_group_membership() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let target = ctx.seeded.user_named("commercial2").unwrap().id;

    let (updated, outcome) = users::set_user_role(db, &admin, target, user::Role::Manager)
        .await
        .unwrap();
    assert_eq!(updated.role, user::Role::Manager);
    assert_eq!(outcome, Reconciliation::Synced(Tier::Manager));

    let memberships = user_group::Entity::find()
        .filter(user_group::Column::UserId.eq(target))
        .count(db)
        .await
        .unwrap();
    assert_eq!(memberships, 1);
    let principal = ctx.principal("commercial2").await;
    assert_eq!(tier_of(&principal), Some(Tier::Manager));
}

#[tokio::test]
async fn missing_role_group_leaves_user_without_group() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    role_group::Entity::delete_many()
        .filter(role_group::Column::Name.eq(Tier::Manager.group_name()))
        .exec(db)
        .await
        .unwrap();

    let (created, outcome) = users::create_user(db, &admin, new_user("leila", user::Role::Manager))
        .await
        .unwrap();
    assert_eq!(outcome, Reconciliation::GroupMissing(Tier::Manager));
    let principal = products_crm::roles::resolve_principal(db, created.id).await.unwrap();
    assert!(principal.is_authenticated());
    assert_eq!(tier_of(&principal), None);
}

#[tokio::test]
async fn only_administrators_manage_users() {
    let ctx = CrmTestContext::new_seeded().await;
    let manager = ctx.principal("manager").await;
    let err = users::create_user(ctx.db.as_ref(), &manager, new_user("yassine", user::Role::Commercial))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));
}

#[tokio::test]
async fn user_input_is_validated() {
    let ctx = CrmTestContext::new_seeded().await;
    let admin = ctx.principal("admin").await;
    let mut input = new_user("manager", user::Role::Commercial);
    input.password = "short".into();
    let err = users::create_user(ctx.db.as_ref(), &admin, input).await.unwrap_err();
    let ApiError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.for_field("username").count(), 1);
    assert_eq!(errors.for_field("password").count(), 1);
}

#[tokio::test]
async fn deleting_a_user_orphans_its_records() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let admin = ctx.principal("admin").await;
    let commercial2 = ctx.seeded.user_named("commercial2").unwrap().id;
    let sahara = ctx.seeded.company_named("Sahara Logistique").unwrap().id;

    users::delete_user(db, &admin, commercial2).await.unwrap();

    let row = company::Entity::find_by_id(sahara).one(db).await.unwrap().unwrap();
    assert_eq!(row.owner_id, None);

    let own_id = ctx.seeded.user_named("admin").unwrap().id;
    let err = users::delete_user(db, &admin, own_id).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn credentials_are_checked_against_the_hash() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let user = authenticate(db, "manager", "managerpass").await.unwrap();
    assert_eq!(user.username, "manager");

    for (username, password) in [("manager", "wrong"), ("ghost", "managerpass")] {
        let err = authenticate(db, username, password).await.unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.iter().next().map(|e| e.message.as_str()), Some(LOGIN_FAILED));
    }
}

#[tokio::test]
async fn managers_reassign_owners() {
    let ctx = CrmTestContext::new_seeded().await;
    let db = ctx.db.as_ref();
    let atlas = ctx.seeded.company_named("Atlas Digital").unwrap().id;
    let commercial2 = ctx.seeded.user_named("commercial2").unwrap().id;

    let commercial = ctx.principal("commercial").await;
    let err = records::reassign_owner(db, &commercial, OwnedRecord::Company, atlas, Some(commercial2))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden));

    let manager = ctx.principal("manager").await;
    records::reassign_owner(db, &manager, OwnedRecord::Company, atlas, Some(commercial2))
        .await
        .unwrap();
    let row = company::Entity::find_by_id(atlas).one(db).await.unwrap().unwrap();
    assert_eq!(row.owner_id, Some(commercial2));

    let err = records::reassign_owner(db, &manager, OwnedRecord::Company, atlas, Some(uuid::Uuid::new_v4()))
        .await
        .unwrap_err();
    let ApiError::Validation(errors) = err else {
        panic!("expected validation error");
    };
    assert_eq!(errors.for_field("owner").count(), 1);
}
