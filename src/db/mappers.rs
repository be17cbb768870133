use super::entities::*;
use rusqlite::{Error, Row};

pub fn map_user(row: &Row) -> Result<User, Error> {
  Ok(User {
    id: row.get(0)?,
    username: row.get(1)?,
    password_hash: row.get(2)?,
    salt: row.get(3)?,
    date_joined: row.get(4)?
  })
}

pub fn map_fundraiser(row: &Row) -> Result<Fundraiser, Error> {
  Ok(Fundraiser {
    id: row.get(0)?,
    title: row.get(1)?,
    description: row.get(2)?,
    goal: row.get(3)?,
    image: row.get(4)?,
    is_open: row.get(5)?,
    is_active: row.get(6)?,
    date_created: row.get(7)?,
    owner_id: row.get(8)?
  })
}

pub fn map_pledge(row: &Row) -> Result<Pledge, Error> {
  Ok(Pledge {
    id: row.get(0)?,
    amount: row.get(1)?,
    comment: row.get(2)?,
    anonymous: row.get(3)?,
    fundraiser_id: row.get(4)?,
    supporter_id: row.get(5)?
  })
}
