use sha1::{Digest, Sha1};
use super::time_utils::current_timestamp;

// All the credential hashing lives here. SHA-1 because it's
// what we already have as a dependency. Passwords are salted
// with a per-user random-ish salt so identical passwords
// don't produce identical digests.

pub fn sha1_hex(value: &str) -> String {
  let mut hasher = Sha1::new();
  hasher.update(value.as_bytes());
  hasher
    .finalize()
    .iter()
    .map(|b| format!("{:02x}", b))
    .collect()
}

// Salts don't have to be secret, just unique enough.
pub fn new_salt(username: &str) -> String {
  let digest = sha1_hex(&format!("{}{}", username, current_timestamp()));
  // 8 hex chars of salt is plenty for our purposes:
  digest[..8].to_string()
}

pub fn hash_password(password: &str, salt: &str) -> String {
  sha1_hex(&format!("{}${}", salt, password))
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
  hash_password(password, salt) == expected_hash
}

// Token keys are derived from the username, the stored hash
// and the current time. Nobody can precompute these without
// already knowing the password hash.
pub fn new_token_key(username: &str, password_hash: &str) -> String {
  sha1_hex(&format!(
    "{}:{}:{}",
    username,
    password_hash,
    chrono::Local::now().timestamp_nanos()
  ))
}
