//! End-to-end course lifecycle over HTTP with in-memory repositories.
//!
//! Covers category administration, authoring, publication, public discovery
//! and soft deletion through the same routing the server mounts.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use actix_web::{App, web};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use course_service::Trace;
use course_service::domain::ports::{
    CategoryCommand, CategoryQuery, CourseCommand, CourseQuery, FixtureIdentityDirectory,
};
use course_service::domain::{
    CatalogueConfig, CategoryService, CircuitBreakerConfig, CourseService, IdentityResolver,
};
use course_service::inbound::http::auth::{EXPECTED_ISSUER, TokenVerifier};
use course_service::inbound::http::state::{HttpState, HttpStatePorts};
use course_service::inbound::http::validation::json_config;
use course_service::inbound::http::{categories, courses};
use course_service::test_support::{
    InMemoryCategoryRepository, InMemoryCourseRepository, MutableClock,
};

const SECRET: &str = "bGlmZWN5Y2xlLXRlc3Qtc2lnbmluZy1rZXktMDEyMzQ1Njc4OWFiY2RlZg==";

fn token(user_id: &str, role: &str) -> String {
    let claims = json!({
        "iss": EXPECTED_ISSUER,
        "sub": user_id,
        "user_id": user_id,
        "email": format!("{user_id}@example.com"),
        "role": role,
    });
    let key = EncodingKey::from_base64_secret(SECRET).expect("valid secret");
    encode(&Header::new(Algorithm::HS256), &claims, &key).expect("token encodes")
}

fn bearer(user_id: &str, role: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id, role)))
}

#[fixture]
fn state() -> web::Data<HttpState> {
    let clock: Arc<dyn Clock> = Arc::new(MutableClock::new(Utc::now()));
    let categories = Arc::new(CategoryService::new(
        Arc::new(InMemoryCategoryRepository::new()),
        Arc::clone(&clock),
    ));
    let identity = Arc::new(IdentityResolver::new(
        Arc::new(FixtureIdentityDirectory::default()),
        Arc::clone(&clock),
        CircuitBreakerConfig::default(),
    ));
    let courses = Arc::new(CourseService::new(
        Arc::new(InMemoryCourseRepository::new()),
        Arc::clone(&categories),
        identity,
        clock,
        CatalogueConfig::default(),
    ));
    let tokens = TokenVerifier::from_base64_secret(SECRET).expect("valid secret");
    web::Data::new(HttpState::new(
        HttpStatePorts {
            courses: Arc::clone(&courses) as Arc<dyn CourseCommand>,
            courses_query: courses as Arc<dyn CourseQuery>,
            categories: Arc::clone(&categories) as Arc<dyn CategoryCommand>,
            categories_query: categories as Arc<dyn CategoryQuery>,
        },
        Arc::new(tokens),
    ))
}

macro_rules! app {
    ($state:expr) => {
        actix_test::init_service(
            App::new()
                .app_data($state.clone())
                .app_data(json_config())
                .wrap(Trace)
                .service(
                    web::scope("/v1/course")
                        .service(web::scope("/category").configure(categories::configure))
                        .configure(courses::configure),
                ),
        )
        .await
    };
}

#[rstest]
#[actix_rt::test]
async fn course_moves_from_draft_to_public_to_deleted(state: web::Data<HttpState>) {
    let app = app!(state);
    let admin = bearer("admin-1", "ADMIN");
    let owner = bearer("inst-1", "INSTRUCTOR");
    let rival = bearer("inst-2", "INSTRUCTOR");

    // Category starts inactive and cannot be used yet.
    let req = actix_test::TestRequest::post()
        .uri("/v1/course/category")
        .insert_header(admin.clone())
        .set_json(json!({ "name": "Programming" }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let category: Value = actix_test::read_body_json(res).await;
    let category_id = category["id"].as_str().expect("category id").to_owned();

    let course_body = json!({
        "title": "Rust for Backend Engineers",
        "description": "Ownership, async and actix-web",
        "price": 49.99,
        "categories": [category_id.as_str()],
    });
    let req = actix_test::TestRequest::post()
        .uri("/v1/course/instructor/create-course")
        .insert_header(owner.clone())
        .set_json(&course_body)
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert!(res.status().is_client_error());

    let req = actix_test::TestRequest::patch()
        .uri(&format!("/v1/course/category/{category_id}/activate"))
        .insert_header(admin.clone())
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    // Authoring.
    let req = actix_test::TestRequest::post()
        .uri("/v1/course/instructor/create-course")
        .insert_header(owner.clone())
        .set_json(&course_body)
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = actix_test::read_body_json(res).await;
    let course_id = created["id"].as_str().expect("course id").to_owned();
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["price"], 49.99);
    assert_eq!(created["ratingCount"], 0);
    assert_eq!(created["categories"][0]["name"], "Programming");

    let req = actix_test::TestRequest::get()
        .uri("/v1/course/all-courses")
        .to_request();
    let listed: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed, json!([]));

    let req = actix_test::TestRequest::get()
        .uri("/v1/course/instructor/my-courses")
        .insert_header(owner.clone())
        .to_request();
    let mine: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));

    // Publication by someone else is refused.
    let req = actix_test::TestRequest::patch()
        .uri(&format!("/v1/course/instructor/publish-course/{course_id}"))
        .insert_header(rival.clone())
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = actix_test::TestRequest::patch()
        .uri(&format!("/v1/course/instructor/publish-course/{course_id}"))
        .insert_header(owner.clone())
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    // Public discovery.
    for uri in [
        "/v1/course/all-courses".to_owned(),
        format!("/v1/course/{category_id}/courses"),
        "/v1/course/search?keyword=RUST".to_owned(),
        "/v1/course/new".to_owned(),
    ] {
        let req = actix_test::TestRequest::get().uri(&uri).to_request();
        let found: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(found[0]["id"], course_id.as_str(), "{uri}");
    }

    let req = actix_test::TestRequest::get()
        .uri("/v1/course/popular")
        .to_request();
    let popular: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(popular, json!([]));

    let req = actix_test::TestRequest::get()
        .uri(&format!("/v1/course/is-exist/{course_id}"))
        .to_request();
    let exists: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(exists, json!(true));

    for (caller, expected) in [(owner.clone(), true), (rival.clone(), false)] {
        let req = actix_test::TestRequest::get()
            .uri(&format!("/v1/course/owner-check/{course_id}"))
            .insert_header(caller)
            .to_request();
        let owned: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(owned, json!(expected));
    }

    // Soft deletion.
    let req = actix_test::TestRequest::delete()
        .uri(&format!("/v1/course/instructor/delete-course/{course_id}"))
        .insert_header(rival)
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let req = actix_test::TestRequest::delete()
        .uri(&format!("/v1/course/instructor/delete-course/{course_id}"))
        .insert_header(owner)
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let req = actix_test::TestRequest::get()
        .uri(&format!("/v1/course/is-exist/{course_id}"))
        .to_request();
    let exists: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(exists, json!(false));
}

#[rstest]
#[actix_rt::test]
async fn category_tree_is_nested_root_last(state: web::Data<HttpState>) {
    let app = app!(state);
    let admin = bearer("admin-1", "ADMIN");

    let mut parent_id: Option<String> = None;
    for name in ["Engineering", "Software", "Rust"] {
        let req = actix_test::TestRequest::post()
            .uri("/v1/course/category")
            .insert_header(admin.clone())
            .set_json(json!({ "name": name, "parentCategoryId": parent_id }))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::CREATED, "{name}");
        let created: Value = actix_test::read_body_json(res).await;
        let id = created["id"].as_str().expect("id").to_owned();

        let req = actix_test::TestRequest::patch()
            .uri(&format!("/v1/course/category/{id}/activate"))
            .insert_header(admin.clone())
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        parent_id = Some(id);
    }

    let leaf = parent_id.expect("leaf id");
    let req = actix_test::TestRequest::get()
        .uri(&format!("/v1/course/category/{leaf}"))
        .to_request();
    let tree: Value = actix_test::call_and_read_body_json(&app, req).await;
    assert_eq!(tree["name"], "Rust");
    assert_eq!(tree["parentCategory"]["name"], "Software");
    assert_eq!(tree["parentCategory"]["parentCategory"]["name"], "Engineering");
    assert!(tree["parentCategory"]["parentCategory"]
        .get("parentCategory")
        .is_none());

    let req = actix_test::TestRequest::post()
        .uri("/v1/course/category")
        .insert_header(bearer("inst-1", "INSTRUCTOR"))
        .set_json(json!({ "name": "Forbidden" }))
        .to_request();
    let res = actix_test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
