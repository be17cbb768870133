mod app;
mod config;
mod db;
mod utils;
use color_eyre::Result;
use dotenv::dotenv;
use log::info;

#[actix_web::main]
async fn main() -> Result<()> {
  dotenv().ok();
  // Provide a default log level when RUST_LOG is absent:
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info,actix_web=info");
  }
  env_logger::init();
  info!("Starting the crowdfunding backend...");

  app::run().await
}
