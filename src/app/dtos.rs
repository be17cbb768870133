use serde::{Deserialize, Serialize};
use crate::db::entities::*;
use crate::utils::time_utils;

// Using the From trait to convert entities to DTOs, and
// testing that. I only need it one way, entity -> DTO,
// requests get dedicated body structs in the handlers
// module.

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
  pub id: i32,
  pub username: String
}

impl From<User> for UserDto {
  fn from(user: User) -> Self {
    Self {
      id: user.id,
      username: user.username
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
  pub token: String
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundraiserDto {
  pub id: i32,
  pub title: String,
  pub description: String,
  pub goal: i64,
  pub image: String,
  pub is_open: bool,
  pub is_active: bool,
  pub date_created: String,
  pub owner: i32
}

impl From<Fundraiser> for FundraiserDto {
  fn from(fundraiser: Fundraiser) -> Self {
    Self {
      id: fundraiser.id,
      title: fundraiser.title,
      description: fundraiser.description,
      goal: fundraiser.goal,
      image: fundraiser.image,
      is_open: fundraiser.is_open != 0,
      is_active: fundraiser.is_active != 0,
      date_created: time_utils::timestamp_to_date_string(fundraiser.date_created),
      owner: fundraiser.owner_id
    }
  }
}

// The supporter is an Option for the anonymous pledge case:
// when the anonymous flag is set we serialize null instead
// of the user id. The actual id stays in the database so
// the ownership check still works on updates.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PledgeDto {
  pub id: i32,
  pub amount: i64,
  pub comment: String,
  pub anonymous: bool,
  pub fundraiser: i32,
  pub supporter: Option<i32>
}

impl From<Pledge> for PledgeDto {
  fn from(pledge: Pledge) -> Self {
    let anonymous = pledge.anonymous != 0;
    Self {
      id: pledge.id,
      amount: pledge.amount,
      comment: pledge.comment,
      anonymous,
      fundraiser: pledge.fundraiser_id,
      supporter: if anonymous { None } else { Some(pledge.supporter_id) }
    }
  }
}

// The detail representation embeds every pledge of the
// campaign, the list one doesn't.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundraiserDetailDto {
  pub id: i32,
  pub title: String,
  pub description: String,
  pub goal: i64,
  pub image: String,
  pub is_open: bool,
  pub is_active: bool,
  pub date_created: String,
  pub owner: i32,
  pub pledges: Vec<PledgeDto>
}

impl From<(Fundraiser, Vec<Pledge>)> for FundraiserDetailDto {
  fn from((fundraiser, pledges): (Fundraiser, Vec<Pledge>)) -> Self {
    Self {
      id: fundraiser.id,
      title: fundraiser.title,
      description: fundraiser.description,
      goal: fundraiser.goal,
      image: fundraiser.image,
      is_open: fundraiser.is_open != 0,
      is_active: fundraiser.is_active != 0,
      date_created: time_utils::timestamp_to_date_string(fundraiser.date_created),
      owner: fundraiser.owner_id,
      pledges: pledges.into_iter().map(|p| p.into()).collect()
    }
  }
}
