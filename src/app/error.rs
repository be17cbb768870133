use actix_web::{
  error::ResponseError,
  HttpResponse
};
use derive_more::Display;
use log::error;
use serde::Serialize;
use std::collections::HashMap;

// Full error messages should only ever appear in logs, which
// is why most Display implementations here hide the details
// from random internet people.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "Internal Server Error")]
  InternalServerError(String),
  #[display(fmt = "Database Error")]
  DatabaseError(String),
  #[display(fmt = "Unauthorized: {}", _0)]
  Unauthorized(String),
  // 403 and 404 bodies stay empty, the reason string is
  // only there for the Debug output:
  #[display(fmt = "Forbidden")]
  Forbidden(String),
  #[display(fmt = "Not Found")]
  NotFound(String),
  #[display(fmt = "Bad Request (check request params)")]
  BadRequest(String),
  #[display(fmt = "Validation Failed")]
  Validation(ValidationErrors),
  #[display(fmt = "Too Many Requests")]
  TooManyRequests
}

// Field name to list of messages, serialized as-is in 400
// response bodies so clients know which field to fix. Same
// shape the old API was sending.
#[derive(Debug, Serialize, Default)]
pub struct ValidationErrors(pub HashMap<String, Vec<String>>);

impl ValidationErrors {

  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&mut self, field: &str, message: &str) {
    self.0
      .entry(field.to_string())
      .or_insert_with(Vec::new)
      .push(message.to_string());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  // Most validation sites want to either proceed or bail
  // with everything that was collected:
  pub fn into_result(self) -> Result<(), Error> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(self))
    }
  }

}

impl ResponseError for Error {
  fn error_response(&self) -> HttpResponse {
    match self {
      Error::InternalServerError(_) | Error::DatabaseError(_) =>
        HttpResponse::InternalServerError().body(self.to_string()),
      Error::Unauthorized(_) => HttpResponse::Unauthorized().body(self.to_string()),
      Error::Forbidden(_) => HttpResponse::Forbidden().finish(),
      Error::NotFound(_) => HttpResponse::NotFound().finish(),
      Error::BadRequest(_) => HttpResponse::BadRequest().body(self.to_string()),
      Error::Validation(errors) => HttpResponse::BadRequest().json(&errors.0),
      Error::TooManyRequests => HttpResponse::TooManyRequests().body(self.to_string())
    }
  }
}

// The db layer reports eyre errors, handlers shove them
// through this so the message lands in the logs and the
// client gets a bland 500.
pub fn map_db_error<E: std::fmt::Display>(e: E) -> Error {
  error!("Database error - {}", e);
  Error::DatabaseError(e.to_string())
}
