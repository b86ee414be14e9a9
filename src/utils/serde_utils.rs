use serde::{Deserialize, Deserializer};

// Partial updates need to tell "field absent" apart from
// "field explicitly set to null". Use with:
// #[serde(default, deserialize_with = "serde_utils::double_option")]
// Absent gives None, null gives Some(None).
pub fn double_option<'de, T, D>(
  deserializer: D
) -> Result<Option<Option<T>>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

// Admin forms tend to send empty strings for fields that
// should be NULL in database.
pub fn empty_string_to_none(value: Option<String>) -> Option<String> {
  value.and_then(|s| {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
  })
}
