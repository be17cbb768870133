use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, error, info};
use r2d2_sqlite::SqliteConnectionManager;
use std::sync::RwLock;
// I think we have to add crate here because
// of the other crate named "config" that we
// use as a dependency.
use crate::config::Config;
use crate::db::{self, Pool};
use rate_limiter::BasicRateLimiter;
mod handlers;
mod dtos;
mod error;
mod helpers;
mod permissions;
mod rate_limiter;

// Declare app state struct:
pub struct AppState {
  pub pool: Pool,
  pub rate_limiter: RwLock<BasicRateLimiter>
}

impl AppState {

  // Counts the current request against the limiter and
  // says whether it should be refused.
  pub fn check_rate_limit(&self) -> bool {
    match self.rate_limiter.write() {
      Ok(mut rl) => rl.update(),
      Err(e) => {
        error!("Could not get a write handle on the \
        rate limiter, SHOULD NEVER HAPPEN - {}", e);
        false
      }
    }
  }

}

// Function to start the server.
// Has to be async because there's a .await at the end, the
// #[actix_web::main] decorator thingy lives in main.rs.
pub async fn run() -> Result<()> {
  let config = Config::from_env()
    .expect("Configuration (environment or .env file) is missing");
  debug!("Current config: {:?}", config);
  // The pledge cascade relies on foreign keys being ON,
  // which SQLite makes you ask for on every connection:
  let manager = SqliteConnectionManager::file(&config.db_path)
    .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
  let pool = Pool::new(manager)
    .expect("Database connection failed");
  db::create_schema(&pool)
    .expect("Could not create the database schema");

  // Got to save the bind_address for later because we'll
  // be destroying "config" by moving pieces of it into
  // the app state.
  let bind_address = config.bind_address.clone();

  let app_state = web::Data::new(
    AppState {
      pool,
      rate_limiter: RwLock::new(
        BasicRateLimiter::new(
          config.rl_max_requests,
          config.rl_max_requests_time,
          config.rl_block_duration
        )
      )
    }
  );

  info!("Starting server on {}", bind_address);
  HttpServer::new(move|| {
    App::new()
      .app_data(app_state.clone())
      .app_data(web::PathConfig::default().error_handler(|_, _| {
        error::Error::BadRequest(String::from("Invalid path arguments")).into()
      }))
      .app_data(web::JsonConfig::default().error_handler(|_, _| {
        error::Error::BadRequest(String::from("Invalid or missing JSON body")).into()
      }))
      .wrap(middleware::Logger::default())
      // The API is meant to be called from browser apps
      // hosted anywhere:
      .wrap(Cors::permissive())
      .configure(base_endpoints_config)
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(bind_address)?
  .run()
  .await
  .context("Start Actix web server")

}

// Route configuration:
fn base_endpoints_config(cfg: &mut web::ServiceConfig) {
  cfg.route("/", web::get().to(handlers::index))
    .route("/fundraisers/", web::get().to(handlers::fundraisers))
    .route("/fundraisers/", web::post().to(handlers::create_fundraiser))
    .route("/fundraisers/{id}/", web::get().to(handlers::fundraiser))
    .route("/fundraisers/{id}/", web::put().to(handlers::update_fundraiser))
    .route("/fundraisers/{id}/", web::delete().to(handlers::delete_fundraiser))
    .route("/pledges/", web::get().to(handlers::pledges))
    .route("/pledges/", web::post().to(handlers::create_pledge))
    .route("/pledges/{id}/", web::get().to(handlers::pledge))
    .route("/pledges/{id}/", web::put().to(handlers::update_pledge))
    .route("/users/", web::get().to(handlers::users))
    .route("/users/", web::post().to(handlers::register))
    .route("/users/{id}/", web::get().to(handlers::user))
    .route("/api-token-auth/", web::post().to(handlers::token_auth));
}
