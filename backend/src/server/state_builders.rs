//! Builders wiring repositories into the domain services and HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use course_service::domain::ports::{
    CategoryCommand, CategoryQuery, CourseCommand, CourseQuery, RatingEventHandler,
};
use course_service::domain::{
    CategoryService, CourseService, IdentityResolver, RatingAggregator,
};
use course_service::inbound::http::state::{HttpState, HttpStatePorts};

use super::ServerConfig;

/// Everything the inbound adapters drive.
pub struct ServiceGraph {
    pub http_state: web::Data<HttpState>,
    pub ratings: Arc<dyn RatingEventHandler>,
}

fn build_with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> ServiceGraph {
    let repositories = config.repositories.clone();
    let categories = Arc::new(CategoryService::new(
        repositories.categories,
        Arc::clone(&clock),
    ));
    let identity = Arc::new(IdentityResolver::new(
        Arc::clone(&config.identity),
        Arc::clone(&clock),
        config.breaker,
    ));
    let courses = Arc::new(CourseService::new(
        Arc::clone(&repositories.courses),
        Arc::clone(&categories),
        identity,
        Arc::clone(&clock),
        config.catalogue,
    ));
    let ratings = Arc::new(RatingAggregator::new(
        repositories.courses,
        clock,
        config.retry,
    ));

    let http_state = HttpState::new(
        HttpStatePorts {
            courses: Arc::clone(&courses) as Arc<dyn CourseCommand>,
            courses_query: courses as Arc<dyn CourseQuery>,
            categories: Arc::clone(&categories) as Arc<dyn CategoryCommand>,
            categories_query: categories as Arc<dyn CategoryQuery>,
        },
        Arc::clone(&config.tokens),
    );

    ServiceGraph {
        http_state: web::Data::new(http_state),
        ratings,
    }
}

/// Build the services over the configured repositories using the system clock.
pub fn build_services(config: &ServerConfig) -> ServiceGraph {
    build_with_clock(config, Arc::new(DefaultClock))
}
