//! Course HTTP handlers.
//!
//! ```text
//! GET    /v1/course/all-courses
//! GET    /v1/course/instructor/my-courses
//! GET    /v1/course/instructor/my-course/{id}
//! POST   /v1/course/instructor/create-course
//! PUT    /v1/course/instructor/update-course/{id}
//! PATCH  /v1/course/instructor/publish-course/{id}
//! DELETE /v1/course/instructor/delete-course/{id}
//! GET    /v1/course/{categoryId}/courses
//! GET    /v1/course/search?keyword=
//! GET    /v1/course/popular
//! GET    /v1/course/new
//! GET    /v1/course/owner-check/{courseId}
//! GET    /v1/course/is-exist/{courseId}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ports::{CourseView, CreateCourseRequest, UpdateCourseRequest};
use crate::domain::{CategoryTree, CourseStatus, InstructorProfile};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, require};

/// Request payload for creating a course.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub categories: Option<Vec<String>>,
}

impl CreateCourseBody {
    fn into_request(self) -> ApiResult<CreateCourseRequest> {
        Ok(CreateCourseRequest {
            title: require(self.title, FieldName::new("title"))?,
            description: require(self.description, FieldName::new("description"))?,
            price: require(self.price, FieldName::new("price"))?,
            category_ids: require(self.categories, FieldName::new("categories"))?,
        })
    }
}

/// Request payload for a partial course update; absent and `null` fields are
/// left untouched.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub categories: Option<Vec<String>>,
}

impl From<UpdateCourseBody> for UpdateCourseRequest {
    fn from(value: UpdateCourseBody) -> Self {
        Self {
            title: value.title,
            description: value.description,
            price: value.price,
            category_ids: value.categories,
        }
    }
}

/// Course representation returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub instructor: InstructorProfile,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub status: CourseStatus,
    pub rating: f64,
    pub rating_count: u32,
    pub categories: Vec<CategoryTree>,
    pub created_at: String,
}

impl From<CourseView> for CourseResponse {
    fn from(value: CourseView) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            description: value.description,
            instructor: value.instructor,
            price: value.price,
            status: value.status,
            rating: value.rating,
            rating_count: value.rating_count,
            categories: value.categories,
            created_at: value.created_at.to_rfc3339(),
        }
    }
}

fn respond_many(views: Vec<CourseView>) -> web::Json<Vec<CourseResponse>> {
    web::Json(views.into_iter().map(CourseResponse::from).collect())
}

/// Keyword filter for `/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub keyword: String,
}

/// List every published course.
#[get("/all-courses")]
pub async fn all_courses(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<CourseResponse>>> {
    let views = state.courses_query.published(caller.context()).await?;
    Ok(respond_many(views))
}

/// List the caller's pending and published courses.
#[get("/instructor/my-courses")]
pub async fn my_courses(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<CourseResponse>>> {
    let views = state.courses_query.mine(caller.context()).await?;
    Ok(respond_many(views))
}

/// Fetch one of the caller's published courses.
#[get("/instructor/my-course/{id}")]
pub async fn my_course(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<CourseResponse>> {
    let view = state
        .courses_query
        .mine_by_id(caller.context(), &path.into_inner())
        .await?;
    Ok(web::Json(view.into()))
}

/// Create a pending course owned by the caller.
#[post("/instructor/create-course")]
pub async fn create_course(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<CreateCourseBody>,
) -> ApiResult<HttpResponse> {
    let request = payload.into_inner().into_request()?;
    let view = state.courses.create(caller.context(), request).await?;
    Ok(HttpResponse::Created().json(CourseResponse::from(view)))
}

/// Partially update a pending or published course.
#[put("/instructor/update-course/{id}")]
pub async fn update_course(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<UpdateCourseBody>,
) -> ApiResult<web::Json<CourseResponse>> {
    let view = state
        .courses
        .update(caller.context(), &path.into_inner(), payload.into_inner().into())
        .await?;
    Ok(web::Json(view.into()))
}

/// Publish a pending course.
#[patch("/instructor/publish-course/{id}")]
pub async fn publish_course(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .courses
        .publish(caller.context(), &path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().finish())
}

/// Soft-delete a published course.
#[delete("/instructor/delete-course/{id}")]
pub async fn delete_course(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .courses
        .delete(caller.context(), &path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[get("/search")]
pub async fn search_courses(
    state: web::Data<HttpState>,
    caller: Caller,
    params: web::Query<SearchParams>,
) -> ApiResult<web::Json<Vec<CourseResponse>>> {
    let views = state
        .courses_query
        .search(caller.context(), &params.keyword)
        .await?;
    Ok(respond_many(views))
}

#[get("/popular")]
pub async fn popular_courses(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<CourseResponse>>> {
    let views = state.courses_query.popular(caller.context()).await?;
    Ok(respond_many(views))
}

#[get("/new")]
pub async fn new_courses(
    state: web::Data<HttpState>,
    caller: Caller,
) -> ApiResult<web::Json<Vec<CourseResponse>>> {
    let views = state.courses_query.recent(caller.context()).await?;
    Ok(respond_many(views))
}

/// Whether the caller owns the course (admins always do).
#[get("/owner-check/{course_id}")]
pub async fn owner_check(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<bool>> {
    let owned = state
        .courses_query
        .is_owner(caller.context(), &path.into_inner())
        .await?;
    Ok(web::Json(owned))
}

/// Whether a published course with this id exists.
#[get("/is-exist/{course_id}")]
pub async fn is_exist(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<bool>> {
    let exists = state
        .courses_query
        .exists_published(&path.into_inner())
        .await?;
    Ok(web::Json(exists))
}

/// Published courses in an active category.
///
/// Must stay registered after the literal routes, which it would shadow.
#[get("/{category_id}/courses")]
pub async fn courses_by_category(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<CourseResponse>>> {
    let views = state
        .courses_query
        .by_category(caller.context(), &path.into_inner())
        .await?;
    Ok(respond_many(views))
}

/// Register course routes on a `/v1/course` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(all_courses)
        .service(my_courses)
        .service(my_course)
        .service(create_course)
        .service(update_course)
        .service(publish_course)
        .service(delete_course)
        .service(search_courses)
        .service(popular_courses)
        .service(new_courses)
        .service(owner_check)
        .service(is_exist)
        .service(courses_by_category);
}

#[cfg(test)]
#[path = "courses_tests.rs"]
mod tests;
