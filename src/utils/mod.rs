pub mod text_utils;
pub mod time_utils;
pub mod hash_utils;

// SQLite has no real boolean type so flags are i32 columns
// everywhere in the db module.
pub fn bool_to_i32(value: bool) -> i32 {
  if value { 1 } else { 0 }
}

pub fn option_bool_to_i32(value: Option<bool>) -> Option<i32> {
  value.map(bool_to_i32)
}
