use sha1::{Digest, Sha1};
use uuid::Uuid;

// API tokens and newsletter unsubscribe tokens. 32 hex chars,
// random enough for both.
pub fn generate_token() -> String {
  Uuid::new_v4().simple().to_string()
}

// Only this hash of API tokens is stored in database.
pub fn hash_token(token: &str) -> String {
  format!("{:x}", Sha1::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokens_are_unique_hex() {
    let first = generate_token();
    let second = generate_token();
    assert_eq!(first.len(), 32);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(first, second);
  }

  #[test]
  fn hash_is_sha1_hex() {
    assert_eq!(
      hash_token("abc"),
      "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
  }
}
