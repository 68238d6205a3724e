mod common;

use common::{first_error_code, CrmTestContext};
use products_crm::roles::Principal;
use serde_json::json;

const CREATE_COMPANY: &str = r#"
    mutation CreateCompany($input: CompanyInput!) {
        crm {
            createCompany(input: $input) { id legalName ownerId accountTier }
        }
    }
"#;

fn company_input(registration_id: &str) -> serde_json::Value {
    json!({
        "input": {
            "legalName": "Oasis Conseil",
            "registrationId": registration_id,
            "legalForm": "SARL",
            "sector": "M",
            "email": "contact@oasis.test",
            "phone": "+212 5 37 00 11 22",
            "address": "Avenue Mohammed V",
            "city": "Rabat",
            "postalCode": "10010",
            "country": "Maroc"
        }
    })
}

#[tokio::test]
async fn malformed_registration_id_is_a_field_error() {
    let ctx = CrmTestContext::new_seeded().await;
    let commercial = ctx.principal("commercial").await;

    let resp = ctx
        .execute(commercial.clone(), CREATE_COMPANY, company_input("12345"))
        .await;
    assert_eq!(first_error_code(&resp).as_deref(), Some("VALIDATION"));
    let fields = resp.errors[0]
        .extensions
        .as_ref()
        .and_then(|ext| ext.get("fields"))
        .cloned()
        .map(|v| v.into_json().unwrap())
        .unwrap();
    assert_eq!(
        fields,
        json!([{
            "field": "registration_id",
            "message": "The registration id must contain exactly 15 digits."
        }])
    );

    let data = ctx
        .data(commercial, CREATE_COMPANY, company_input("123456789012345"))
        .await;
    let created = &data["crm"]["createCompany"];
    assert_eq!(created["legalName"], "Oasis Conseil");
    assert_eq!(created["accountTier"], "PROSPECT");
    assert_eq!(
        created["ownerId"],
        ctx.seeded.user_named("commercial").unwrap().id.to_string()
    );
}

#[tokio::test]
async fn error_codes_follow_the_failure() {
    let ctx = CrmTestContext::new_seeded().await;
    let create_service = r#"
        mutation {
            crm {
                createService(input: { name: "Audit", price: "100.00", tariffType: ONE_TIME }) { id }
            }
        }
    "#;
    let resp = ctx
        .execute(ctx.principal("commercial").await, create_service, json!({}))
        .await;
    assert_eq!(first_error_code(&resp).as_deref(), Some("FORBIDDEN"));

    let resp = ctx.execute(Principal::Anonymous, create_service, json!({})).await;
    assert_eq!(first_error_code(&resp).as_deref(), Some("UNAUTHENTICATED"));

    let foreign = ctx.seeded.opportunity_named("Application Sahara").unwrap().id;
    let resp = ctx
        .execute(
            ctx.principal("commercial").await,
            "query($id: ID!) { crm { opportunity(id: $id) { name } } }",
            json!({ "id": foreign.to_string() }),
        )
        .await;
    assert_eq!(first_error_code(&resp).as_deref(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn service_list_filters_by_name() {
    let ctx = CrmTestContext::new_seeded().await;
    let data = ctx
        .data(
            ctx.principal("commercial").await,
            r#"
            query {
                crm {
                    services(filter: { name: "vitrine" }) {
                        total
                        items { name price tariffType }
                        filters { key kind minTier }
                    }
                }
            }
            "#,
            json!({}),
        )
        .await;
    let page = &data["crm"]["services"];
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Création de Site Vitrine");
    assert_eq!(page["items"][0]["price"], "1000.00");
    let keys: Vec<_> = page["filters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["name", "category", "tariff_type", "active"]);
}

#[tokio::test]
async fn filter_fields_depend_on_tier() {
    let ctx = CrmTestContext::new_seeded().await;
    let query = "query { crm { filterFields(entity: OPPORTUNITY) { key minTier } } }";
    let keys = |data: serde_json::Value| -> Vec<String> {
        data["crm"]["filterFields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["key"].as_str().unwrap().to_string())
            .collect()
    };
    let commercial = keys(ctx.data(ctx.principal("commercial").await, query, json!({})).await);
    let manager = keys(ctx.data(ctx.principal("manager").await, query, json!({})).await);
    assert!(!commercial.contains(&"owner".to_string()));
    assert!(manager.contains(&"owner".to_string()));
}

#[tokio::test]
async fn login_sets_the_session_cookie() {
    let ctx = CrmTestContext::new_seeded().await;
    let login = r#"
        mutation($u: String!, $p: String!) {
            crm { login(username: $u, password: $p) { token user { username role } } }
        }
    "#;
    let resp = ctx
        .execute(
            Principal::Anonymous,
            login,
            json!({ "u": "commercial", "p": "commercialpass" }),
        )
        .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let cookie = resp
        .http_headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(cookie.starts_with("crm_session="));
    assert!(cookie.contains("HttpOnly"));
    let data = resp.data.into_json().unwrap();
    assert_eq!(data["crm"]["login"]["user"]["role"], "COMMERCIAL");

    let resp = ctx
        .execute(
            Principal::Anonymous,
            login,
            json!({ "u": "commercial", "p": "nope" }),
        )
        .await;
    assert_eq!(first_error_code(&resp).as_deref(), Some("VALIDATION"));
    assert!(resp.http_headers.get("set-cookie").is_none());
}

#[tokio::test]
async fn me_reports_tier() {
    let ctx = CrmTestContext::new_seeded().await;
    let data = ctx
        .data(
            ctx.principal("admin").await,
            "query { crm { me { username tier groups } } }",
            json!({}),
        )
        .await;
    assert_eq!(data["crm"]["me"]["username"], "admin");
    assert_eq!(data["crm"]["me"]["tier"], "ADMINISTRATOR");
    assert_eq!(data["crm"]["me"]["groups"], json!(["ADMINISTRATOR"]));
}
