use actix_web::{
  web,
  HttpRequest,
  HttpResponse,
  Result
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::db::entities::*;
use crate::db;
use crate::utils::{option_bool_to_i32, bool_to_i32, hash_utils, text_utils, time_utils};
use super::dtos::*;
use super::error::{map_db_error, Error, ValidationErrors};
use super::helpers;
use super::permissions;
use super::AppState;

// Module with all the API handler functions.
// Should probably be split into a directory with multiple
// files grouping handlers together.

// The old backend had these as max_length on the schema
// fields:
const MAX_TITLE_LENGTH: usize = 200;
const MAX_COMMENT_LENGTH: usize = 200;

/* --- Request body objects --- */
// These have to be public.
// Every field is an Option: the same struct serves the
// create path (validation decides what was required) and
// the partial update path (only the present fields get
// merged). Unknown keys in the body, like a client trying
// to send its own "owner", are dropped by serde before we
// ever see them.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundraiserForm {
  pub title: Option<String>,
  pub description: Option<String>,
  pub goal: Option<i64>,
  pub image: Option<String>,
  pub is_open: Option<bool>,
  pub is_active: Option<bool>,
  // Dates are strings in request bodies:
  pub date_created: Option<String>
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeForm {
  pub amount: Option<i64>,
  pub comment: Option<String>,
  pub anonymous: Option<bool>,
  pub fundraiser: Option<i32>
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsForm {
  pub username: Option<String>,
  pub password: Option<String>
}
/* --- End request body objects --- */

const REQUIRED_MESSAGE: &'static str = "This field is required.";

// Good enough for a URL column nobody validates the content
// of anyway:
fn is_url(value: &str) -> bool {
  lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(
      r"^https?://\S+$"
    ).unwrap();
  }
  URL_REGEX.is_match(value)
}

fn validate_fundraiser_create(form: &FundraiserForm) -> Result<(), Error> {
  let mut errors = ValidationErrors::new();
  match &form.title {
    Some(title) if !title.trim().is_empty() => {
      // Characters, not bytes, same as the old API's limit:
      if title.chars().count() > MAX_TITLE_LENGTH {
        errors.add("title", "Ensure this field has no more than 200 characters.");
      }
    },
    _ => errors.add("title", REQUIRED_MESSAGE)
  }
  match &form.description {
    Some(description) if !description.trim().is_empty() => (),
    _ => errors.add("description", REQUIRED_MESSAGE)
  }
  if form.goal.is_none() {
    errors.add("goal", REQUIRED_MESSAGE);
  }
  match &form.image {
    Some(image) if !image.trim().is_empty() => {
      if !is_url(image) {
        errors.add("image", "Enter a valid URL.");
      }
    },
    _ => errors.add("image", REQUIRED_MESSAGE)
  }
  if form.is_open.is_none() {
    errors.add("isOpen", REQUIRED_MESSAGE);
  }
  // is_active is optional and defaults to true, dateCreated
  // is system-assigned at creation and silently ignored.
  errors.into_result()
}

// Updates only validate the fields that are actually there.
fn validate_fundraiser_update(form: &FundraiserForm) -> Result<(), Error> {
  let mut errors = ValidationErrors::new();
  if let Some(title) = &form.title {
    if title.trim().is_empty() {
      errors.add("title", "This field may not be blank.");
    } else if title.chars().count() > MAX_TITLE_LENGTH {
      errors.add("title", "Ensure this field has no more than 200 characters.");
    }
  }
  if let Some(description) = &form.description {
    if description.trim().is_empty() {
      errors.add("description", "This field may not be blank.");
    }
  }
  if let Some(image) = &form.image {
    if !is_url(image) {
      errors.add("image", "Enter a valid URL.");
    }
  }
  if let Some(date_created) = &form.date_created {
    if time_utils::date_string_to_timestamp(date_created).is_none() {
      errors.add("dateCreated", "Datetime has wrong format. Use dd/MM/yyyy HH:mm:ssZ.");
    }
  }
  errors.into_result()
}

// The fundraiser reference is validated against the
// database, which is why this one needs the pool.
fn validate_pledge_create(form: &PledgeForm, pool: &db::Pool) -> Result<(), Error> {
  let mut errors = ValidationErrors::new();
  if form.amount.is_none() {
    errors.add("amount", REQUIRED_MESSAGE);
  }
  // An empty comment is fine, a missing key is not:
  if form.comment.is_none() {
    errors.add("comment", REQUIRED_MESSAGE);
  }
  if form.anonymous.is_none() {
    errors.add("anonymous", REQUIRED_MESSAGE);
  }
  match form.fundraiser {
    None => errors.add("fundraiser", REQUIRED_MESSAGE),
    Some(fundraiser_id) => {
      if db::fundraiser_by_id(pool, fundraiser_id)
        .map_err(map_db_error)?
        .is_none() {
          errors.add(
            "fundraiser",
            &format!("Invalid id {} - fundraiser does not exist.", fundraiser_id)
          );
      }
    }
  }
  errors.into_result()
}

// Pledge comments are the only free text anonymous-ish
// people can park on someone else's page, so they get the
// full escape + truncate treatment.
fn clean_comment(comment: String) -> String {
  let mut comment = comment;
  text_utils::truncate_utf8(&mut comment, MAX_COMMENT_LENGTH);
  text_utils::escape_html(&comment)
}

pub async fn index() -> HttpResponse {
  HttpResponse::Ok().body("Crowdfunding API")
}

// Default response when no route matched the request:
pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound(String::from("Endpoint doesn't exist")))
}

/* --- Fundraisers --- */

pub async fn fundraisers(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let fundraisers = db::all_fundraisers(&app_state.pool)
    .map_err(map_db_error)?;
  let dtos: Vec<FundraiserDto> =
    fundraisers.into_iter().map(|f| f.into()).collect();
  Ok(HttpResponse::Ok().json(dtos))
}

pub async fn create_fundraiser(
  app_state: web::Data<AppState>,
  form: web::Json<FundraiserForm>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  // Auth comes first: anonymous callers get their 401
  // before any validation runs.
  let user = helpers::require_user(&req, &app_state.pool)?;
  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }
  let form = form.into_inner();
  validate_fundraiser_create(&form)?;
  // The unwrap_or fallbacks are never reached for required
  // fields, validation already happened:
  let mut fundraiser = Fundraiser {
    id: -1,
    title: form.title.unwrap_or_default(),
    description: form.description.unwrap_or_default(),
    goal: form.goal.unwrap_or_default(),
    image: form.image.unwrap_or_default(),
    is_open: bool_to_i32(form.is_open.unwrap_or(false)),
    is_active: bool_to_i32(form.is_active.unwrap_or(true)),
    // System-assigned, whatever the body was claiming:
    date_created: time_utils::current_timestamp(),
    owner_id: user.id
  };
  db::insert_fundraiser(&app_state.pool, &mut fundraiser)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(FundraiserDto::from(fundraiser)))
}

pub async fn fundraiser(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let fundraiser = db::fundraiser_by_id(&app_state.pool, id)
    .map_err(map_db_error)?;
  match fundraiser {
    Some(f) => {
      let pledges = db::pledges_for_fundraiser(&app_state.pool, f.id)
        .map_err(map_db_error)?;
      Ok(HttpResponse::Ok().json(FundraiserDetailDto::from((f, pledges))))
    },
    None => Err(Error::NotFound("Fundraiser does not exist".to_string()))
  }
}

pub async fn update_fundraiser(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>,
  form: web::Json<FundraiserForm>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  // Existence first (404 even for anonymous callers), then
  // identity, then ownership:
  let fundraiser = db::fundraiser_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or(Error::NotFound("Fundraiser does not exist".to_string()))?;
  let user = helpers::require_user(&req, &app_state.pool)?;
  if !permissions::can_modify_fundraiser(&user, &fundraiser) {
    return Err(Error::Forbidden(
      "Only the owner can modify a fundraiser".to_string()
    ));
  }
  let form = form.into_inner();
  validate_fundraiser_update(&form)?;
  let update = FundraiserUpdate {
    id,
    title: form.title,
    description: form.description,
    goal: form.goal,
    image: form.image,
    is_open: option_bool_to_i32(form.is_open),
    is_active: option_bool_to_i32(form.is_active),
    date_created: form.date_created.as_deref()
      .and_then(time_utils::date_string_to_timestamp)
  };
  db::update_fundraiser(&app_state.pool, &update)
    .map_err(map_db_error)?;
  let updated = db::fundraiser_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or(Error::NotFound("Fundraiser does not exist".to_string()))?;
  Ok(HttpResponse::Ok().json(FundraiserDto::from(updated)))
}

pub async fn delete_fundraiser(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let fundraiser = db::fundraiser_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or(Error::NotFound("Fundraiser does not exist".to_string()))?;
  let user = helpers::require_user(&req, &app_state.pool)?;
  if !permissions::can_modify_fundraiser(&user, &fundraiser) {
    return Err(Error::Forbidden(
      "Only the owner can delete a fundraiser".to_string()
    ));
  }
  // The pledges follow through the schema cascade:
  db::delete_fundraiser(&app_state.pool, id)
    .map_err(map_db_error)?;
  Ok(HttpResponse::NoContent().finish())
}

/* --- Pledges --- */

pub async fn pledges(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let pledges = db::all_pledges(&app_state.pool)
    .map_err(map_db_error)?;
  let dtos: Vec<PledgeDto> =
    pledges.into_iter().map(|p| p.into()).collect();
  Ok(HttpResponse::Ok().json(dtos))
}

pub async fn create_pledge(
  app_state: web::Data<AppState>,
  form: web::Json<PledgeForm>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let user = helpers::require_user(&req, &app_state.pool)?;
  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }
  let form = form.into_inner();
  validate_pledge_create(&form, &app_state.pool)?;
  let mut pledge = Pledge {
    id: -1,
    amount: form.amount.unwrap_or_default(),
    comment: clean_comment(form.comment.unwrap_or_default()),
    anonymous: bool_to_i32(form.anonymous.unwrap_or(false)),
    fundraiser_id: form.fundraiser.unwrap_or_default(),
    // The supporter is the authenticated caller, period.
    supporter_id: user.id
  };
  db::insert_pledge(&app_state.pool, &mut pledge)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(PledgeDto::from(pledge)))
}

pub async fn pledge(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let pledge = db::pledge_by_id(&app_state.pool, id)
    .map_err(map_db_error)?;
  match pledge {
    Some(p) => Ok(HttpResponse::Ok().json(PledgeDto::from(p))),
    None => Err(Error::NotFound("Pledge does not exist".to_string()))
  }
}

pub async fn update_pledge(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>,
  form: web::Json<PledgeForm>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let pledge = db::pledge_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or(Error::NotFound("Pledge does not exist".to_string()))?;
  let user = helpers::require_user(&req, &app_state.pool)?;
  if !permissions::can_modify_pledge(&user, &pledge) {
    return Err(Error::Forbidden(
      "Only the supporter can modify a pledge".to_string()
    ));
  }
  let form = form.into_inner();
  // Only amount, comment and anonymous can move. A
  // "fundraiser" key in the body is ignored, the relation
  // is frozen at creation.
  let update = PledgeUpdate {
    id,
    amount: form.amount,
    comment: form.comment.map(clean_comment),
    anonymous: option_bool_to_i32(form.anonymous)
  };
  db::update_pledge(&app_state.pool, &update)
    .map_err(map_db_error)?;
  let updated = db::pledge_by_id(&app_state.pool, id)
    .map_err(map_db_error)?
    .ok_or(Error::NotFound("Pledge does not exist".to_string()))?;
  Ok(HttpResponse::Ok().json(PledgeDto::from(updated)))
}

/* --- Users and auth --- */

pub async fn users(
  app_state: web::Data<AppState>
) -> Result<HttpResponse, Error> {
  let users = db::all_users(&app_state.pool)
    .map_err(map_db_error)?;
  let dtos: Vec<UserDto> =
    users.into_iter().map(|u| u.into()).collect();
  Ok(HttpResponse::Ok().json(dtos))
}

pub async fn user(
  app_state: web::Data<AppState>,
  path: web::Path<(i32,)>
) -> Result<HttpResponse, Error> {
  let id = path.into_inner().0;
  let user = db::user_by_id(&app_state.pool, id)
    .map_err(map_db_error)?;
  match user {
    Some(u) => Ok(HttpResponse::Ok().json(UserDto::from(u))),
    None => Err(Error::NotFound("User does not exist".to_string()))
  }
}

pub async fn register(
  app_state: web::Data<AppState>,
  form: web::Json<CredentialsForm>
) -> Result<HttpResponse, Error> {
  if app_state.check_rate_limit() {
    return Err(Error::TooManyRequests);
  }
  let form = form.into_inner();
  let mut errors = ValidationErrors::new();
  let username = form.username.unwrap_or_default().trim().to_string();
  let password = form.password.unwrap_or_default();
  if username.is_empty() {
    errors.add("username", REQUIRED_MESSAGE);
  } else if db::user_by_username(&app_state.pool, &username)
    .map_err(map_db_error)?
    .is_some() {
      errors.add("username", "A user with that username already exists.");
  }
  if password.is_empty() {
    errors.add("password", REQUIRED_MESSAGE);
  }
  errors.into_result()?;
  let salt = hash_utils::new_salt(&username);
  let mut user = User {
    id: -1,
    password_hash: hash_utils::hash_password(&password, &salt),
    salt,
    username,
    date_joined: time_utils::current_timestamp()
  };
  db::insert_user(&app_state.pool, &mut user)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Created().json(UserDto::from(user)))
}

pub async fn token_auth(
  app_state: web::Data<AppState>,
  form: web::Json<CredentialsForm>
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  // Trimmed the same way register trims, so the two paths
  // agree on what the username is:
  let username = form.username.unwrap_or_default().trim().to_string();
  let password = form.password.unwrap_or_default();
  let user = db::user_by_username(&app_state.pool, &username)
    .map_err(map_db_error)?;
  // Same bland message whether the user doesn't exist or
  // the password is wrong:
  let user = match user {
    Some(u) if hash_utils::verify_password(&password, &u.salt, &u.password_hash) => u,
    _ => {
      let mut errors = ValidationErrors::new();
      errors.add("nonFieldErrors", "Unable to log in with provided credentials.");
      return errors.into_result().map(|_| HttpResponse::Ok().finish());
    }
  };
  let token = AuthToken {
    key: hash_utils::new_token_key(&user.username, &user.password_hash),
    user_id: user.id,
    created: time_utils::current_timestamp()
  };
  db::insert_token(&app_state.pool, &token)
    .map_err(map_db_error)?;
  Ok(HttpResponse::Ok().json(TokenDto { token: token.key }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::super::rate_limiter::BasicRateLimiter;
  use actix_web::test::TestRequest;
  use r2d2_sqlite::SqliteConnectionManager;
  use std::sync::RwLock;

  fn test_state() -> web::Data<AppState> {
    // Single connection on an in-memory database, otherwise
    // every connection would see its own empty schema:
    let manager = SqliteConnectionManager::memory()
      .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = db::Pool::builder()
      .max_size(1)
      .build(manager)
      .unwrap();
    db::create_schema(&pool).unwrap();
    web::Data::new(AppState {
      pool,
      // High enough to never trip during tests:
      rate_limiter: RwLock::new(BasicRateLimiter::new(100_000, 3600, 3600))
    })
  }

  // Seeds a user plus a token, returns both.
  fn test_user(state: &web::Data<AppState>, username: &str) -> (User, String) {
    let salt = hash_utils::new_salt(username);
    let mut user = User {
      id: -1,
      username: username.to_string(),
      password_hash: hash_utils::hash_password("hunter2", &salt),
      salt,
      date_joined: time_utils::current_timestamp()
    };
    db::insert_user(&state.pool, &mut user).unwrap();
    let token = AuthToken {
      key: hash_utils::new_token_key(username, &user.password_hash),
      user_id: user.id,
      created: time_utils::current_timestamp()
    };
    db::insert_token(&state.pool, &token).unwrap();
    (user, token.key)
  }

  fn authed_request(token: &str) -> HttpRequest {
    TestRequest::default()
      .header("Authorization", format!("Token {}", token))
      .to_http_request()
  }

  fn anonymous_request() -> HttpRequest {
    TestRequest::default().to_http_request()
  }

  fn roof_fund_form() -> FundraiserForm {
    FundraiserForm {
      title: Some("Roof Fund".to_string()),
      description: Some("The roof is leaking".to_string()),
      goal: Some(1000),
      image: Some("https://example.com/roof.jpg".to_string()),
      is_open: Some(true),
      is_active: None,
      date_created: None
    }
  }

  fn empty_fundraiser_form() -> FundraiserForm {
    FundraiserForm {
      title: None,
      description: None,
      goal: None,
      image: None,
      is_open: None,
      is_active: None,
      date_created: None
    }
  }

  fn pledge_form(fundraiser_id: i32) -> PledgeForm {
    PledgeForm {
      amount: Some(50),
      comment: Some("Good luck!".to_string()),
      anonymous: Some(false),
      fundraiser: Some(fundraiser_id)
    }
  }

  // Seeds a fundraiser through the create handler as the
  // given token's user, returns its id.
  async fn seed_fundraiser(state: &web::Data<AppState>, token: &str) -> i32 {
    let response = create_fundraiser(
      state.clone(),
      web::Json(roof_fund_form()),
      authed_request(token)
    ).await.unwrap();
    assert_eq!(201, response.status().as_u16());
    db::all_fundraisers(&state.pool).unwrap().pop().unwrap().id
  }

  #[test]
  fn title_length_counts_characters_not_bytes() {
    // 200 two-byte characters is exactly at the limit:
    let mut form = roof_fund_form();
    form.title = Some("é".repeat(200));
    assert!(validate_fundraiser_create(&form).is_ok());
    form.title = Some("é".repeat(201));
    match validate_fundraiser_create(&form) {
      Err(Error::Validation(errors)) =>
        assert!(errors.0.contains_key("title")),
      other => panic!("expected a title error, got {:?}", other.map(|_| ()))
    }
    let mut update = empty_fundraiser_form();
    update.title = Some("é".repeat(200));
    assert!(validate_fundraiser_update(&update).is_ok());
  }

  #[actix_rt::test]
  async fn anonymous_create_is_rejected_before_validation() {
    let state = test_state();
    // Completely invalid body, but the anonymous caller has
    // to get a 401, not the field errors:
    let result = create_fundraiser(
      state.clone(),
      web::Json(empty_fundraiser_form()),
      anonymous_request()
    ).await;
    match result {
      Err(Error::Unauthorized(_)) => (),
      other => panic!("expected Unauthorized, got {:?}", other.map(|_| ()))
    }
  }

  #[actix_rt::test]
  async fn create_collects_per_field_errors() {
    let state = test_state();
    let (_, token) = test_user(&state, "ginette");
    let mut form = empty_fundraiser_form();
    form.image = Some("not a url at all".to_string());
    let result = create_fundraiser(
      state.clone(),
      web::Json(form),
      authed_request(&token)
    ).await;
    match result {
      Err(Error::Validation(errors)) => {
        assert!(errors.0.contains_key("title"));
        assert!(errors.0.contains_key("description"));
        assert!(errors.0.contains_key("goal"));
        assert!(errors.0.contains_key("isOpen"));
        assert_eq!(
          vec!["Enter a valid URL.".to_string()],
          errors.0["image"]
        );
      },
      other => panic!("expected Validation, got {:?}", other.map(|_| ()))
    }
  }

  #[actix_rt::test]
  async fn create_forces_the_owner_to_the_requester() {
    let state = test_state();
    let (user, token) = test_user(&state, "ginette");
    // The body tries to sneak in an owner and a creation
    // date, both get dropped/overwritten:
    let body = serde_json::json!({
      "title": "Roof Fund",
      "description": "The roof is leaking",
      "goal": 1000,
      "image": "https://example.com/roof.jpg",
      "isOpen": true,
      "owner": 999,
      "dateCreated": "01/01/1970  0:00:00+00:00"
    });
    let form: FundraiserForm = serde_json::from_value(body).unwrap();
    let response = create_fundraiser(
      state.clone(),
      web::Json(form),
      authed_request(&token)
    ).await.unwrap();
    assert_eq!(201, response.status().as_u16());
    let stored = db::all_fundraisers(&state.pool).unwrap().pop().unwrap();
    assert_eq!(user.id, stored.owner_id);
    assert!(stored.date_created > 0);
    // is_active defaulted to true:
    assert_eq!(1, stored.is_active);
  }

  #[actix_rt::test]
  async fn the_roof_fund_scenario() {
    let state = test_state();
    let (_, token_a) = test_user(&state, "user_a");
    let (_, token_b) = test_user(&state, "user_b");
    let id = seed_fundraiser(&state, &token_a).await;

    // User B tries to move the goal:
    let mut goal_update = empty_fundraiser_form();
    goal_update.goal = Some(2000);
    let result = update_fundraiser(
      state.clone(),
      web::Path::from((id,)),
      web::Json(goal_update),
      authed_request(&token_b)
    ).await;
    match result {
      Err(Error::Forbidden(_)) => (),
      other => panic!("expected Forbidden, got {:?}", other.map(|_| ()))
    }

    // User A does the same and succeeds:
    let mut goal_update = empty_fundraiser_form();
    goal_update.goal = Some(2000);
    let response = update_fundraiser(
      state.clone(),
      web::Path::from((id,)),
      web::Json(goal_update),
      authed_request(&token_a)
    ).await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let stored = db::fundraiser_by_id(&state.pool, id).unwrap().unwrap();
    assert_eq!(2000, stored.goal);
    // The title was absent from the payload and kept its
    // value:
    assert_eq!("Roof Fund", stored.title);
  }

  #[actix_rt::test]
  async fn updating_a_missing_fundraiser_is_404_for_everyone() {
    let state = test_state();
    let (_, token) = test_user(&state, "ginette");
    let result = update_fundraiser(
      state.clone(),
      web::Path::from((42,)),
      web::Json(empty_fundraiser_form()),
      authed_request(&token)
    ).await;
    match result {
      Err(Error::NotFound(_)) => (),
      other => panic!("expected NotFound, got {:?}", other.map(|_| ()))
    }
    // Same without authentication, the 404 wins over the
    // 401:
    let result = update_fundraiser(
      state.clone(),
      web::Path::from((42,)),
      web::Json(empty_fundraiser_form()),
      anonymous_request()
    ).await;
    match result {
      Err(Error::NotFound(_)) => (),
      other => panic!("expected NotFound, got {:?}", other.map(|_| ()))
    }
  }

  #[actix_rt::test]
  async fn pledge_create_forces_the_supporter() {
    let state = test_state();
    let (_, owner_token) = test_user(&state, "ginette");
    let (supporter, supporter_token) = test_user(&state, "raoul");
    let fundraiser_id = seed_fundraiser(&state, &owner_token).await;
    // The body tries to supply its own supporter, serde
    // drops the unknown key before the handler even runs:
    let body = serde_json::json!({
      "amount": 50,
      "comment": "Good luck!",
      "anonymous": false,
      "fundraiser": fundraiser_id,
      "supporter": 999
    });
    let form: PledgeForm = serde_json::from_value(body).unwrap();
    let response = create_pledge(
      state.clone(),
      web::Json(form),
      authed_request(&supporter_token)
    ).await.unwrap();
    assert_eq!(201, response.status().as_u16());
    let stored = db::all_pledges(&state.pool).unwrap().pop().unwrap();
    assert_eq!(supporter.id, stored.supporter_id);
    assert_eq!(fundraiser_id, stored.fundraiser_id);
  }

  #[actix_rt::test]
  async fn pledge_on_a_missing_fundraiser_is_a_field_error() {
    let state = test_state();
    let (_, token) = test_user(&state, "raoul");
    let result = create_pledge(
      state.clone(),
      web::Json(pledge_form(42)),
      authed_request(&token)
    ).await;
    match result {
      Err(Error::Validation(errors)) =>
        assert!(errors.0.contains_key("fundraiser")),
      other => panic!("expected Validation, got {:?}", other.map(|_| ()))
    }
  }

  #[actix_rt::test]
  async fn only_the_supporter_can_update_a_pledge() {
    let state = test_state();
    let (_, owner_token) = test_user(&state, "ginette");
    let (_, supporter_token) = test_user(&state, "raoul");
    let fundraiser_id = seed_fundraiser(&state, &owner_token).await;
    create_pledge(
      state.clone(),
      web::Json(pledge_form(fundraiser_id)),
      authed_request(&supporter_token)
    ).await.unwrap();
    let pledge_id = db::all_pledges(&state.pool).unwrap().pop().unwrap().id;

    // The fundraiser owner is just another stranger here:
    let update = PledgeForm {
      amount: Some(1),
      comment: None,
      anonymous: None,
      fundraiser: None
    };
    let result = update_pledge(
      state.clone(),
      web::Path::from((pledge_id,)),
      web::Json(update),
      authed_request(&owner_token)
    ).await;
    match result {
      Err(Error::Forbidden(_)) => (),
      other => panic!("expected Forbidden, got {:?}", other.map(|_| ()))
    }

    // The supporter can, and only the present fields move:
    let update = PledgeForm {
      amount: Some(75),
      comment: None,
      anonymous: Some(true),
      // Ignored even when present:
      fundraiser: Some(999)
    };
    let response = update_pledge(
      state.clone(),
      web::Path::from((pledge_id,)),
      web::Json(update),
      authed_request(&supporter_token)
    ).await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let stored = db::pledge_by_id(&state.pool, pledge_id).unwrap().unwrap();
    assert_eq!(75, stored.amount);
    assert_eq!(1, stored.anonymous);
    assert_eq!("Good luck!", stored.comment);
    assert_eq!(fundraiser_id, stored.fundraiser_id);
  }

  #[actix_rt::test]
  async fn pledge_comments_get_escaped() {
    let state = test_state();
    let (_, owner_token) = test_user(&state, "ginette");
    let (_, supporter_token) = test_user(&state, "raoul");
    let fundraiser_id = seed_fundraiser(&state, &owner_token).await;
    let mut form = pledge_form(fundraiser_id);
    form.comment = Some("<b>bold</b>".to_string());
    create_pledge(
      state.clone(),
      web::Json(form),
      authed_request(&supporter_token)
    ).await.unwrap();
    let stored = db::all_pledges(&state.pool).unwrap().pop().unwrap();
    assert_eq!("&lt;b&gt;bold&lt;/b&gt;", stored.comment);
  }

  #[actix_rt::test]
  async fn deleting_a_fundraiser_takes_its_pledges_along() {
    let state = test_state();
    let (_, owner_token) = test_user(&state, "ginette");
    let (_, supporter_token) = test_user(&state, "raoul");
    let fundraiser_id = seed_fundraiser(&state, &owner_token).await;
    create_pledge(
      state.clone(),
      web::Json(pledge_form(fundraiser_id)),
      authed_request(&supporter_token)
    ).await.unwrap();
    let pledge_id = db::all_pledges(&state.pool).unwrap().pop().unwrap().id;

    // Not the owner:
    let result = delete_fundraiser(
      state.clone(),
      web::Path::from((fundraiser_id,)),
      authed_request(&supporter_token)
    ).await;
    match result {
      Err(Error::Forbidden(_)) => (),
      other => panic!("expected Forbidden, got {:?}", other.map(|_| ()))
    }

    let response = delete_fundraiser(
      state.clone(),
      web::Path::from((fundraiser_id,)),
      authed_request(&owner_token)
    ).await.unwrap();
    assert_eq!(204, response.status().as_u16());
    assert!(db::fundraiser_by_id(&state.pool, fundraiser_id).unwrap().is_none());
    assert!(db::pledge_by_id(&state.pool, pledge_id).unwrap().is_none());
  }

  #[actix_rt::test]
  async fn register_then_login_then_use_the_token() {
    let state = test_state();
    let response = register(
      state.clone(),
      web::Json(CredentialsForm {
        username: Some("ginette".to_string()),
        password: Some("hunter2".to_string())
      })
    ).await.unwrap();
    assert_eq!(201, response.status().as_u16());

    // Re-registering the same username fails:
    let result = register(
      state.clone(),
      web::Json(CredentialsForm {
        username: Some("ginette".to_string()),
        password: Some("hunter2".to_string())
      })
    ).await;
    match result {
      Err(Error::Validation(errors)) =>
        assert!(errors.0.contains_key("username")),
      other => panic!("expected Validation, got {:?}", other.map(|_| ()))
    }

    // Wrong password:
    let result = token_auth(
      state.clone(),
      web::Json(CredentialsForm {
        username: Some("ginette".to_string()),
        password: Some("hunter3".to_string())
      })
    ).await;
    match result {
      Err(Error::Validation(errors)) =>
        assert!(errors.0.contains_key("nonFieldErrors")),
      other => panic!("expected Validation, got {:?}", other.map(|_| ()))
    }

    // Right password gets a token that authenticates:
    let response = token_auth(
      state.clone(),
      web::Json(CredentialsForm {
        username: Some("ginette".to_string()),
        password: Some("hunter2".to_string())
      })
    ).await.unwrap();
    assert_eq!(200, response.status().as_u16());
    let user = db::user_by_username(&state.pool, "ginette").unwrap().unwrap();
    let resolved = helpers::require_user(
      &authed_request(&latest_token_key(&state)),
      &state.pool
    ).unwrap();
    assert_eq!(user.id, resolved.id);
  }

  #[actix_rt::test]
  async fn login_trims_the_username_like_register_does() {
    let state = test_state();
    register(
      state.clone(),
      web::Json(CredentialsForm {
        username: Some("  ginette ".to_string()),
        password: Some("hunter2".to_string())
      })
    ).await.unwrap();
    // Register stored "ginette", a padded login should still
    // find that user:
    let response = token_auth(
      state.clone(),
      web::Json(CredentialsForm {
        username: Some(" ginette  ".to_string()),
        password: Some("hunter2".to_string())
      })
    ).await.unwrap();
    assert_eq!(200, response.status().as_u16());
  }

  // Grabs the most recent token straight from the database,
  // reading response bodies in unit tests is more plumbing
  // than it's worth.
  fn latest_token_key(state: &web::Data<AppState>) -> String {
    let conn = state.pool.clone().get().unwrap();
    conn.query_row(
      "SELECT key FROM auth_tokens ORDER BY rowid DESC LIMIT 1",
      rusqlite::NO_PARAMS,
      |row| row.get(0)
    ).unwrap()
  }

  #[actix_rt::test]
  async fn an_unknown_token_is_unauthorized() {
    let state = test_state();
    let result = create_fundraiser(
      state.clone(),
      web::Json(roof_fund_form()),
      authed_request("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef")
    ).await;
    match result {
      Err(Error::Unauthorized(_)) => (),
      other => panic!("expected Unauthorized, got {:?}", other.map(|_| ()))
    }
  }
}
