use serde::{Deserialize, Serialize};

// Ultra simple datatypes that fit naturally into SQLite.
// Booleans are i32 columns, timestamps are epoch seconds.
// These are not meant to be serialized to clients directly,
// the DTO module does the JSON-facing conversions.

#[derive(Debug, Serialize, Deserialize)]
pub struct User {
  pub id: i32,
  pub username: String,
  pub password_hash: String,
  pub salt: String,
  pub date_joined: i64
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken {
  pub key: String,
  pub user_id: i32,
  pub created: i64
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Fundraiser {
  pub id: i32,
  pub title: String,
  pub description: String,
  pub goal: i64,
  pub image: String,
  pub is_open: i32,
  pub is_active: i32,
  pub date_created: i64,
  pub owner_id: i32
}

// Object I use to fit the "update only what's in the
// request body" agenda. The owner is deliberately absent:
// it's assigned by the system at creation and the update
// path never touches it.
#[derive(Debug)]
pub struct FundraiserUpdate {
  pub id: i32,
  pub title: Option<String>,
  pub description: Option<String>,
  pub goal: Option<i64>,
  pub image: Option<String>,
  pub is_open: Option<i32>,
  pub is_active: Option<i32>,
  pub date_created: Option<i64>
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pledge {
  pub id: i32,
  pub amount: i64,
  pub comment: String,
  pub anonymous: i32,
  pub fundraiser_id: i32,
  pub supporter_id: i32
}

// Same partial-update story as FundraiserUpdate. The
// fundraiser and supporter relations are absent on purpose,
// they're immutable once the pledge exists.
#[derive(Debug)]
pub struct PledgeUpdate {
  pub id: i32,
  pub amount: Option<i64>,
  pub comment: Option<String>,
  pub anonymous: Option<i32>
}
