// Adding the context method to errors:
use eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
  pub db_path: String,
  pub bind_address: String,
  // Rate limiter settings:
  pub rl_max_requests: u32,
  pub rl_max_requests_time: u32,
  pub rl_block_duration: u32
}

impl Config {

  pub fn from_env() -> Result<Config> {
    let mut c = config::Config::new();
    // Default values. You have to use lowercase when
    // compared to what's in the .env file.
    c.set_default("db_path", "./crowdfunding.db")?;
    c.set_default("bind_address", "127.0.0.1:8080")?;
    // Settings for the basic rate limiter guarding the
    // endpoints that write:
    c.set_default("rl_max_requests", 120)?;
    c.set_default("rl_max_requests_time", 60)?;
    c.set_default("rl_block_duration", 60)?;

    c.merge(config::Environment::default())?;
    // The error has to be given a context for color_eyre
    // to work here:
    c.try_into()
      .context("Loading configuration from env")
  }

}
