//! Tests for the course lifecycle and catalogue queries.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use rust_decimal::Decimal;

use super::*;
use crate::domain::circuit_breaker::CircuitBreakerConfig;
use crate::domain::ports::{FixtureIdentityDirectory, MockCourseRepository};
use crate::domain::{
    Category, ErrorCode, ForwardedCredential, InstructorProfile, Principal, RatingSummary, UserId,
};
use crate::test_support::{
    InMemoryCategoryRepository, InMemoryCourseRepository, MutableClock, active_category,
};

struct Harness {
    courses: InMemoryCourseRepository,
    categories: InMemoryCategoryRepository,
    clock: Arc<MutableClock>,
    service: CourseService,
    category: Category,
}

fn build_service(
    courses: Arc<dyn CourseRepository>,
    categories: &InMemoryCategoryRepository,
    clock: Arc<MutableClock>,
) -> CourseService {
    let category_service = Arc::new(CategoryService::new(
        Arc::new(categories.clone()),
        clock.clone(),
    ));
    let identity = Arc::new(IdentityResolver::new(
        Arc::new(FixtureIdentityDirectory::new(InstructorProfile::with_id(
            "profile-of-caller",
        ))),
        clock.clone(),
        CircuitBreakerConfig::default(),
    ));
    CourseService::new(
        courses,
        category_service,
        identity,
        clock,
        CatalogueConfig::default(),
    )
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let courses = InMemoryCourseRepository::new();
    let categories = InMemoryCategoryRepository::new();
    let category = active_category("Programming", None);
    categories.seed(category.clone());
    let service = build_service(Arc::new(courses.clone()), &categories, clock.clone());
    Harness {
        courses,
        categories,
        clock,
        service,
        category,
    }
}

fn caller(id: &str, role: Role) -> RequestContext {
    RequestContext::authenticated(
        Principal::new(UserId::new(id).expect("id"), id, "", role),
        ForwardedCredential::from_bearer_token("jwt"),
    )
}

fn create_request(category: &Category) -> CreateCourseRequest {
    CreateCourseRequest {
        title: "Rust for Pythonistas".to_owned(),
        description: "Traits, lifetimes and cargo".to_owned(),
        price: Decimal::new(4900, 2),
        category_ids: vec![category.id.to_string()],
    }
}

async fn create_as(h: &Harness, ctx: &RequestContext) -> CourseView {
    h.service
        .create(ctx, create_request(&h.category))
        .await
        .expect("course created")
}

async fn published_course(h: &Harness, owner: &RequestContext) -> CourseView {
    let view = create_as(h, owner).await;
    h.service
        .publish(owner, &view.id.to_string())
        .await
        .expect("published");
    view
}

#[rstest]
#[tokio::test]
async fn create_builds_pending_course_owned_by_caller(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let view = create_as(&harness, &owner).await;

    assert_eq!(view.status, CourseStatus::Pending);
    assert_eq!(view.instructor.id.as_deref(), Some("profile-of-caller"));
    assert_eq!(view.categories.len(), 1);
    let stored = harness.courses.get(&view.id).expect("stored");
    assert_eq!(stored.instructor_id.as_str(), "inst-1");
    assert_eq!(stored.rating, RatingSummary::default());
    assert_eq!(stored.version, 0);
}

#[rstest]
#[tokio::test]
async fn create_rejects_inactive_categories(harness: Harness) {
    let mut inactive = active_category("Soon", None);
    inactive.status = crate::domain::CategoryStatus::Inactive;
    harness.categories.seed(inactive.clone());

    let err = harness
        .service
        .create(&caller("inst-1", Role::Instructor), create_request(&inactive))
        .await
        .expect_err("inactive category");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case::anonymous(RequestContext::anonymous(), ErrorCode::Unauthenticated)]
#[case::learner(caller("learner", Role::User), ErrorCode::Unauthorized)]
#[tokio::test]
async fn create_requires_an_author(
    harness: Harness,
    #[case] ctx: RequestContext,
    #[case] expected: ErrorCode,
) {
    let err = harness
        .service
        .create(&ctx, create_request(&harness.category))
        .await
        .expect_err("not an author");
    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn validation_runs_before_lookup(harness: Harness) {
    let mut request = create_request(&harness.category);
    request.title = "bad/title".to_owned();
    let err = harness
        .service
        .create(&caller("inst-1", Role::Instructor), request)
        .await
        .expect_err("invalid");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn publish_then_delete_follows_the_lifecycle(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let view = create_as(&harness, &owner).await;
    let id = view.id.to_string();

    let err = harness.service.delete(&owner, &id).await.expect_err("pending");
    assert_eq!(err.code(), ErrorCode::NotFound);

    harness.service.publish(&owner, &id).await.expect("publish");
    let err = harness.service.publish(&owner, &id).await.expect_err("already published");
    assert_eq!(err.code(), ErrorCode::NotFound);

    harness.service.delete(&owner, &id).await.expect("delete");
    let stored = harness.courses.get(&view.id).expect("still stored");
    assert_eq!(stored.status, CourseStatus::Deleted);
    assert_eq!(stored.version, 2);

    let err = harness
        .service
        .update(&owner, &id, UpdateCourseRequest::default())
        .await
        .expect_err("deleted");
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case::stranger(caller("inst-2", Role::Instructor), Some(ErrorCode::Unauthorized))]
#[case::admin(caller("root", Role::Admin), None)]
#[tokio::test]
async fn publish_checks_ownership(
    harness: Harness,
    #[case] actor: RequestContext,
    #[case] expected: Option<ErrorCode>,
) {
    let owner = caller("inst-1", Role::Instructor);
    let view = create_as(&harness, &owner).await;

    let outcome = harness.service.publish(&actor, &view.id.to_string()).await;
    assert_eq!(outcome.err().map(|e| e.code()), expected);
}

#[rstest]
#[case::stranger(caller("inst-2", Role::Instructor), Some(ErrorCode::Unauthorized))]
#[case::admin(caller("root", Role::Admin), None)]
#[tokio::test]
async fn update_checks_ownership(
    harness: Harness,
    #[case] actor: RequestContext,
    #[case] expected: Option<ErrorCode>,
) {
    let owner = caller("inst-1", Role::Instructor);
    let view = create_as(&harness, &owner).await;

    let outcome = harness
        .service
        .update(
            &actor,
            &view.id.to_string(),
            UpdateCourseRequest {
                title: Some("Rust for Everyone".to_owned()),
                ..UpdateCourseRequest::default()
            },
        )
        .await;
    assert_eq!(outcome.as_ref().err().map(Error::code), expected);

    let stored = harness.courses.get(&view.id).expect("stored");
    assert_eq!(stored.instructor_id.as_str(), "inst-1");
    if expected.is_none() {
        assert_eq!(stored.title, "Rust for Everyone");
        assert_eq!(stored.version, 1);
    } else {
        assert_eq!(stored.title, "Rust for Pythonistas");
        assert_eq!(stored.version, 0);
    }
}

#[rstest]
#[case::stranger(caller("inst-2", Role::Instructor), Some(ErrorCode::Unauthorized))]
#[case::learner(caller("learner", Role::User), Some(ErrorCode::Unauthorized))]
#[case::admin(caller("root", Role::Admin), None)]
#[tokio::test]
async fn delete_checks_ownership(
    harness: Harness,
    #[case] actor: RequestContext,
    #[case] expected: Option<ErrorCode>,
) {
    let owner = caller("inst-1", Role::Instructor);
    let view = published_course(&harness, &owner).await;

    let outcome = harness.service.delete(&actor, &view.id.to_string()).await;
    assert_eq!(outcome.err().map(|e| e.code()), expected);

    let expected_status = if expected.is_none() {
        CourseStatus::Deleted
    } else {
        CourseStatus::Published
    };
    let stored = harness.courses.get(&view.id).expect("stored");
    assert_eq!(stored.status, expected_status);
}

#[rstest]
#[tokio::test]
async fn update_applies_present_fields_only(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let view = create_as(&harness, &owner).await;
    let second = active_category("Systems", Some(harness.category.id));
    harness.categories.seed(second.clone());

    let updated = harness
        .service
        .update(
            &owner,
            &view.id.to_string(),
            UpdateCourseRequest {
                title: Some("  ".to_owned()),
                description: Some("Now with async".to_owned()),
                price: Some(Decimal::ZERO),
                category_ids: Some(vec![second.id.to_string()]),
            },
        )
        .await
        .expect("updated");

    assert_eq!(updated.title, "Rust for Pythonistas");
    assert_eq!(updated.description, "Now with async");
    assert_eq!(updated.price, Decimal::ZERO);
    let tree = updated.categories.first().expect("one category");
    assert_eq!(tree.id, second.id);
    assert_eq!(
        tree.parent_category.as_ref().map(|p| p.id),
        Some(harness.category.id)
    );
    assert_eq!(harness.courses.get(&view.id).expect("stored").version, 1);
}

#[rstest]
#[tokio::test]
async fn update_surfaces_version_conflicts(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let view = create_as(&harness, &owner).await;
    let stored = harness.courses.get(&view.id).expect("stored");

    let mut repo = MockCourseRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(move |_, _| Ok(Some(stored)));
    repo.expect_update()
        .times(1)
        .return_once(|_, _| Err(CourseRepositoryError::version_conflict(0_u32, 1_u32)));
    let service = build_service(Arc::new(repo), &harness.categories, harness.clock.clone());

    let err = service
        .update(
            &owner,
            &view.id.to_string(),
            UpdateCourseRequest {
                title: Some("Renamed".to_owned()),
                ..UpdateCourseRequest::default()
            },
        )
        .await
        .expect_err("conflict");
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn mine_by_id_requires_published_and_owner(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let pending = create_as(&harness, &owner).await;
    let err = harness
        .service
        .mine_by_id(&owner, &pending.id.to_string())
        .await
        .expect_err("pending");
    assert_eq!(err.code(), ErrorCode::NotFound);

    let published = published_course(&harness, &owner).await;
    let id = published.id.to_string();
    assert!(harness.service.mine_by_id(&owner, &id).await.is_ok());
    let err = harness
        .service
        .mine_by_id(&caller("inst-2", Role::Instructor), &id)
        .await
        .expect_err("stranger");
    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn mine_lists_only_the_callers_live_courses(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    create_as(&harness, &owner).await;
    let gone = published_course(&harness, &owner).await;
    harness
        .service
        .delete(&owner, &gone.id.to_string())
        .await
        .expect("deleted");
    create_as(&harness, &caller("inst-2", Role::Instructor)).await;

    let mine = harness.service.mine(&owner).await.expect("listed");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, CourseStatus::Pending);
}

#[rstest]
#[tokio::test]
async fn public_listings_only_show_published(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    create_as(&harness, &owner).await;
    let live = published_course(&harness, &owner).await;
    let anonymous = RequestContext::anonymous();

    let all = harness.service.published(&anonymous).await.expect("listed");
    assert_eq!(all.iter().map(|v| v.id).collect::<Vec<_>>(), [live.id]);
    assert!(all[0].instructor.is_placeholder());

    let by_category = harness
        .service
        .by_category(&anonymous, &harness.category.id.to_string())
        .await
        .expect("listed");
    assert_eq!(by_category.len(), 1);
}

#[rstest]
#[case::title("pythonistas", 1)]
#[case::description("CARGO", 1)]
#[case::blank("   ", 1)]
#[case::absent("haskell", 0)]
#[tokio::test]
async fn search_is_case_insensitive(
    harness: Harness,
    #[case] keyword: &str,
    #[case] expected: usize,
) {
    published_course(&harness, &caller("inst-1", Role::Instructor)).await;
    let hits = harness
        .service
        .search(&RequestContext::anonymous(), keyword)
        .await
        .expect("searched");
    assert_eq!(hits.len(), expected);
}

#[rstest]
#[tokio::test]
async fn popular_uses_a_strict_threshold(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let borderline = published_course(&harness, &owner).await;
    let star = published_course(&harness, &owner).await;
    for (view, mean) in [(&borderline, 4.5), (&star, 4.8)] {
        let mut stored = harness.courses.get(&view.id).expect("stored");
        stored.rating = RatingSummary { mean, count: 10 };
        harness.courses.seed(stored);
    }

    let popular = harness
        .service
        .popular(&RequestContext::anonymous())
        .await
        .expect("listed");
    assert_eq!(popular.iter().map(|v| v.id).collect::<Vec<_>>(), [star.id]);
}

#[rstest]
#[tokio::test]
async fn recent_uses_the_configured_window(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let old = published_course(&harness, &owner).await;
    harness.clock.advance(std::time::Duration::from_secs(11 * 24 * 3600));
    let fresh = published_course(&harness, &owner).await;

    let recent = harness
        .service
        .recent(&RequestContext::anonymous())
        .await
        .expect("listed");
    let ids: Vec<_> = recent.iter().map(|v| v.id).collect();
    assert_eq!(ids, [fresh.id]);
    assert!(!ids.contains(&old.id));
}

#[rstest]
#[tokio::test]
async fn existence_and_ownership_checks(harness: Harness) {
    let owner = caller("inst-1", Role::Instructor);
    let pending = create_as(&harness, &owner).await;
    let live = published_course(&harness, &owner).await;

    assert!(!harness.service.exists_published("  ").await.expect("blank"));
    assert!(!harness.service.exists_published("garbage").await.expect("garbage"));
    assert!(!harness
        .service
        .exists_published(&pending.id.to_string())
        .await
        .expect("pending"));
    assert!(harness
        .service
        .exists_published(&live.id.to_string())
        .await
        .expect("published"));

    let id = pending.id.to_string();
    assert!(harness.service.is_owner(&owner, &id).await.expect("owner"));
    assert!(!harness
        .service
        .is_owner(&caller("inst-2", Role::Instructor), &id)
        .await
        .expect("stranger"));
    let err = harness
        .service
        .is_owner(&owner, &CourseId::random().to_string())
        .await
        .expect_err("missing");
    assert_eq!(err.code(), ErrorCode::NotFound);
}
