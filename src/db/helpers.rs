use color_eyre::Result;
use eyre::eyre;
use crate::utils::text_utils::slugify;

// Past that many collisions something is very wrong.
const MAX_SLUG_ATTEMPTS: u32 = 1000;

/**
 * Slugify `source` and make it unique by appending "-1", "-2"...
 * `is_taken` says whether a candidate is already used by
 * another row.
 */
pub fn resolve_unique_slug<F>(source: &str, mut is_taken: F) -> Result<String>
  where F: FnMut(&str) -> Result<bool>
{
  let mut base = slugify(source);
  if base.is_empty() {
    base = String::from("untitled");
  }
  if !is_taken(&base)? {
    return Ok(base);
  }
  for counter in 1..=MAX_SLUG_ATTEMPTS {
    let candidate = format!("{}-{}", base, counter);
    if !is_taken(&candidate)? {
      return Ok(candidate);
    }
  }
  Err(eyre!("Could not find a free slug for {}", base))
}

/**
 * Generate a certain amount of query placeholders, "?,?,?"
 */
pub fn generate_placeholders(count: usize) -> String {
  vec!["?"; count].join(",")
}
