//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{Repositories, ServerConfig};
pub use state_builders::build_services;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use course_service::Trace;
use course_service::inbound::http::health::{HealthState, live, ready};
use course_service::inbound::http::state::HttpState;
use course_service::inbound::http::validation::json_config;
use course_service::inbound::http::{categories, courses};

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    // The category scope must be registered ahead of `/{categoryId}/courses`.
    let api = web::scope("/v1/course")
        .service(web::scope("/category").configure(categories::configure))
        .configure(courses::configure);

    App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .wrap(Trace)
        .service(api)
        .service(ready)
        .service(live)
}

/// Construct an Actix HTTP server using the provided health state and
/// prepared HTTP state.
///
/// The server is returned unstarted; await it to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    config: &ServerConfig,
) -> std::io::Result<Server> {
    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(config.bind_addr())?
    .run();
    Ok(server)
}
