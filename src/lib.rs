use actix_web::{
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web::{self, Data},
    App,
};
use sqlx::SqlitePool;

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod routes;
pub mod structs;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

use auth::TokenKeys;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: TokenKeys,
}

/// The REST application without middleware; `main` wraps it with logging and compression.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(Data::new(state))
        .configure(routes::configure)
        .default_service(web::to(routes::default_handler))
}
