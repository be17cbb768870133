use rusqlite::{params, OptionalExtension, Row, ToSql, NO_PARAMS};
pub mod entities;
mod helpers;
mod mappers;
use color_eyre::Result;
use eyre::WrapErr;
use entities::*;
use mappers::{map_fundraiser, map_pledge, map_user};

// Type alias to make function signatures much clearer:
pub type Pool = r2d2::Pool<r2d2_sqlite::SqliteConnectionManager>;

// All the DB stuff is non-async, SQLite doesn't really care.

// The pledge -> fundraiser cascade lives in the schema, which
// only works if the connections run with foreign_keys ON (see
// the pool init in app::run).
const SCHEMA: &'static str = "
BEGIN;
CREATE TABLE IF NOT EXISTS users (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  username TEXT NOT NULL UNIQUE,
  password_hash TEXT NOT NULL,
  salt TEXT NOT NULL,
  date_joined INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS auth_tokens (
  key TEXT PRIMARY KEY,
  user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
  created INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS fundraisers (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT NOT NULL,
  description TEXT NOT NULL,
  goal INTEGER NOT NULL,
  image TEXT NOT NULL,
  is_open INTEGER NOT NULL,
  is_active INTEGER NOT NULL DEFAULT 1,
  date_created INTEGER NOT NULL,
  owner_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS pledges (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  amount INTEGER NOT NULL,
  comment TEXT NOT NULL,
  anonymous INTEGER NOT NULL,
  fundraiser_id INTEGER NOT NULL REFERENCES fundraisers (id) ON DELETE CASCADE,
  supporter_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE
);
COMMIT;
";

pub fn create_schema(pool: &Pool) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute_batch(SCHEMA)
    .context("Creating database schema")
}

// Stole most of the signature from the rusqlite doc.
// Careful to use a later version of the crate, Google takes
// you to old versions of the doc.
fn select_many<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Vec<T>>
  where
    P: IntoIterator,
    P::Item: ToSql,
    F: FnMut(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  // Do the reference counting thing and get a connection
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(query)?;
  stmt.query_map(params, mapper)
    .and_then(Iterator::collect)
    .context("Generic select_many query")
}

fn select_one<T, P, F>(
  pool: &Pool,
  query: &str,
  params: P,
  mapper: F
) -> Result<Option<T>>
  where
    P: IntoIterator,
    P::Item: ToSql,
    F: FnOnce(&Row<'_>) -> Result<T, rusqlite::Error>,
{
  let conn = pool.clone().get()?;
  let mut stmt = conn.prepare(query)?;
  stmt.query_row(params, mapper)
    .optional()
    .context("Generic select_one query")
}

/* --- Users and tokens --- */

pub fn all_users(pool: &Pool) -> Result<Vec<User>> {
  select_many(
    pool,
    "SELECT id, username, password_hash, salt, date_joined
    FROM users ORDER BY id ASC",
    NO_PARAMS,
    map_user
  )
}

pub fn user_by_id(pool: &Pool, id: i32) -> Result<Option<User>> {
  select_one(
    pool,
    "SELECT id, username, password_hash, salt, date_joined
    FROM users WHERE id = ?",
    params![id],
    map_user
  )
}

pub fn user_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
  select_one(
    pool,
    "SELECT id, username, password_hash, salt, date_joined
    FROM users WHERE username = ?",
    params![username],
    map_user
  )
}

pub fn insert_user(pool: &Pool, user: &mut User) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO users (username, password_hash, salt, date_joined)
    VALUES (?, ?, ?, ?)",
    params![
      user.username,
      user.password_hash,
      user.salt,
      user.date_joined
    ]
  ).context("Inserting user")?;
  user.id = conn.last_insert_rowid() as i32;
  Ok(())
}

pub fn insert_token(pool: &Pool, token: &AuthToken) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO auth_tokens (key, user_id, created)
    VALUES (?, ?, ?)",
    params![token.key, token.user_id, token.created]
  ).context("Inserting auth token")?;
  Ok(())
}

// Resolves a token key straight to its user, the handlers
// never care about the token row itself.
pub fn user_by_token(pool: &Pool, key: &str) -> Result<Option<User>> {
  select_one(
    pool,
    "SELECT users.id, users.username, users.password_hash,
    users.salt, users.date_joined
    FROM auth_tokens, users WHERE
    auth_tokens.key = ?
    AND auth_tokens.user_id = users.id",
    params![key],
    map_user
  )
}

/* --- Fundraisers --- */

pub fn all_fundraisers(pool: &Pool) -> Result<Vec<Fundraiser>> {
  select_many(
    pool,
    "SELECT id, title, description, goal, image, is_open,
    is_active, date_created, owner_id
    FROM fundraisers ORDER BY id ASC",
    NO_PARAMS,
    map_fundraiser
  )
}

pub fn fundraiser_by_id(pool: &Pool, id: i32) -> Result<Option<Fundraiser>> {
  select_one(
    pool,
    "SELECT id, title, description, goal, image, is_open,
    is_active, date_created, owner_id
    FROM fundraisers WHERE id = ?",
    params![id],
    map_fundraiser
  )
}

pub fn insert_fundraiser(pool: &Pool, fundraiser: &mut Fundraiser) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO fundraisers
    (title, description, goal, image, is_open, is_active, date_created, owner_id)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    params![
      fundraiser.title,
      fundraiser.description,
      fundraiser.goal,
      fundraiser.image,
      fundraiser.is_open,
      fundraiser.is_active,
      fundraiser.date_created,
      fundraiser.owner_id
    ]
  ).context("Inserting fundraiser")?;
  fundraiser.id = conn.last_insert_rowid() as i32;
  Ok(())
}

// Only touches the fields that are Some on the update
// object, everything else keeps its current value. Returns
// the number of updated rows, which is 0 when the update
// object was entirely empty.
pub fn update_fundraiser(pool: &Pool, update: &FundraiserUpdate) -> Result<usize> {
  let mut fields: Vec<&str> = Vec::new();
  let mut values: Vec<&dyn ToSql> = Vec::new();
  if let Some(title) = &update.title {
    fields.push("title");
    values.push(title);
  }
  if let Some(description) = &update.description {
    fields.push("description");
    values.push(description);
  }
  if let Some(goal) = &update.goal {
    fields.push("goal");
    values.push(goal);
  }
  if let Some(image) = &update.image {
    fields.push("image");
    values.push(image);
  }
  if let Some(is_open) = &update.is_open {
    fields.push("is_open");
    values.push(is_open);
  }
  if let Some(is_active) = &update.is_active {
    fields.push("is_active");
    values.push(is_active);
  }
  if let Some(date_created) = &update.date_created {
    fields.push("date_created");
    values.push(date_created);
  }
  if fields.is_empty() {
    // Nothing to do, which is not an error:
    return Ok(0);
  }
  values.push(&update.id);
  let query = format!(
    "UPDATE fundraisers SET {} WHERE id = ?",
    helpers::generate_set_clause(&fields)
  );
  let conn = pool.clone().get()?;
  conn.execute(&query, values)
    .context("Updating fundraiser")
}

// The pledges go away with the fundraiser (schema cascade).
pub fn delete_fundraiser(pool: &Pool, id: i32) -> Result<usize> {
  let conn = pool.clone().get()?;
  conn.execute(
    "DELETE FROM fundraisers WHERE id = ?",
    params![id]
  ).context("Deleting fundraiser")
}

/* --- Pledges --- */

pub fn all_pledges(pool: &Pool) -> Result<Vec<Pledge>> {
  select_many(
    pool,
    "SELECT id, amount, comment, anonymous, fundraiser_id, supporter_id
    FROM pledges ORDER BY id ASC",
    NO_PARAMS,
    map_pledge
  )
}

pub fn pledge_by_id(pool: &Pool, id: i32) -> Result<Option<Pledge>> {
  select_one(
    pool,
    "SELECT id, amount, comment, anonymous, fundraiser_id, supporter_id
    FROM pledges WHERE id = ?",
    params![id],
    map_pledge
  )
}

pub fn pledges_for_fundraiser(pool: &Pool, fundraiser_id: i32) -> Result<Vec<Pledge>> {
  select_many(
    pool,
    "SELECT id, amount, comment, anonymous, fundraiser_id, supporter_id
    FROM pledges WHERE fundraiser_id = ? ORDER BY id ASC",
    params![fundraiser_id],
    map_pledge
  )
}

pub fn insert_pledge(pool: &Pool, pledge: &mut Pledge) -> Result<()> {
  let conn = pool.clone().get()?;
  conn.execute(
    "INSERT INTO pledges
    (amount, comment, anonymous, fundraiser_id, supporter_id)
    VALUES (?, ?, ?, ?, ?)",
    params![
      pledge.amount,
      pledge.comment,
      pledge.anonymous,
      pledge.fundraiser_id,
      pledge.supporter_id
    ]
  ).context("Inserting pledge")?;
  pledge.id = conn.last_insert_rowid() as i32;
  Ok(())
}

// Partial update limited by construction to amount, comment
// and anonymous: PledgeUpdate has no other fields.
pub fn update_pledge(pool: &Pool, update: &PledgeUpdate) -> Result<usize> {
  let mut fields: Vec<&str> = Vec::new();
  let mut values: Vec<&dyn ToSql> = Vec::new();
  if let Some(amount) = &update.amount {
    fields.push("amount");
    values.push(amount);
  }
  if let Some(comment) = &update.comment {
    fields.push("comment");
    values.push(comment);
  }
  if let Some(anonymous) = &update.anonymous {
    fields.push("anonymous");
    values.push(anonymous);
  }
  if fields.is_empty() {
    return Ok(0);
  }
  values.push(&update.id);
  let query = format!(
    "UPDATE pledges SET {} WHERE id = ?",
    helpers::generate_set_clause(&fields)
  );
  let conn = pool.clone().get()?;
  conn.execute(&query, values)
    .context("Updating pledge")
}
