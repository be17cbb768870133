use crate::db::entities::{Fundraiser, Pledge, User};

// Per-object access rules. Reads are always allowed so the
// handlers only ever call these for mutating requests, after
// the record was found (a missing record is a 404 no matter
// who's asking).

pub fn can_modify_fundraiser(user: &User, fundraiser: &Fundraiser) -> bool {
  fundraiser.owner_id == user.id
}

pub fn can_modify_pledge(user: &User, pledge: &Pledge) -> bool {
  pledge.supporter_id == user.id
}
