//! Category HTTP handlers.
//!
//! ```text
//! GET    /v1/course/category
//! GET    /v1/course/category/{id}
//! POST   /v1/course/category
//! PUT    /v1/course/category/{id}
//! PATCH  /v1/course/category/{id}/activate
//! PATCH  /v1/course/category/{id}/deactivate
//! DELETE /v1/course/category/{id}
//! ```
//!
//! Reads are public; mutations require an administrator.

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};

use crate::domain::CategoryTree;
use crate::domain::ports::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::auth::Caller;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, require};

/// Request payload for creating a category.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryBody {
    pub name: Option<String>,
    pub parent_category_id: Option<String>,
}

/// Request payload for updating a category.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryBody {
    pub name: Option<String>,
    pub parent_category_id: Option<String>,
}

#[get("")]
pub async fn list_categories(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<CategoryTree>>> {
    Ok(web::Json(state.categories_query.list_active().await?))
}

/// Fetch an active category with its nested parent chain.
#[get("/{id}")]
pub async fn get_category(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<CategoryTree>> {
    Ok(web::Json(
        state.categories_query.get_active(&path.into_inner()).await?,
    ))
}

/// Create an inactive category.
#[post("")]
pub async fn create_category(
    state: web::Data<HttpState>,
    caller: Caller,
    payload: web::Json<CreateCategoryBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let request = CreateCategoryRequest {
        name: require(body.name, FieldName::new("name"))?,
        parent_id: body.parent_category_id,
    };
    let tree = state.categories.create(caller.context(), request).await?;
    Ok(HttpResponse::Created().json(tree))
}

#[put("/{id}")]
pub async fn update_category(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
    payload: web::Json<UpdateCategoryBody>,
) -> ApiResult<web::Json<CategoryTree>> {
    let body = payload.into_inner();
    let request = UpdateCategoryRequest {
        name: body.name,
        parent_id: body.parent_category_id,
    };
    let tree = state
        .categories
        .update(caller.context(), &path.into_inner(), request)
        .await?;
    Ok(web::Json(tree))
}

#[patch("/{id}/activate")]
pub async fn activate_category(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .categories
        .activate(caller.context(), &path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[patch("/{id}/deactivate")]
pub async fn deactivate_category(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .categories
        .deactivate(caller.context(), &path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Soft-delete a category.
#[delete("/{id}")]
pub async fn delete_category(
    state: web::Data<HttpState>,
    caller: Caller,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    state
        .categories
        .delete(caller.context(), &path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register category routes on a `/category` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_categories)
        .service(get_category)
        .service(create_category)
        .service(update_category)
        .service(activate_category)
        .service(deactivate_category)
        .service(delete_category);
}
