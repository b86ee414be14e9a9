use html2text::from_read;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  // Not RFC 5322, just enough to catch typos in forms.
  static ref EMAIL_REGEX: Regex = Regex::new(
    r"^[^@\s]+@[^@\s]+\.[^@\s.]+$"
  ).unwrap();
  static ref RELATIVE_LINK_REGEX: Regex = Regex::new(
    r#"(href|src)="/"#
  ).unwrap();
  static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
}

// Used for anything that ends up in an URL: post slugs,
// category slugs and tag slugs.
// Accented latin letters are folded to their base letter,
// everything that isn't [a-z0-9] becomes a single dash.
pub fn slugify(value: &str) -> String {
  let mut slug = String::with_capacity(value.len());
  let mut pending_dash = false;
  for c in value.chars().flat_map(char::to_lowercase) {
    let c = fold_accent(c);
    if c.is_ascii_alphanumeric() {
      if pending_dash && !slug.is_empty() {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c);
    } else {
      pending_dash = true;
    }
  }
  slug
}

fn fold_accent(c: char) -> char {
  match c {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'æ' => 'a',
    'ç' => 'c',
    'è' | 'é' | 'ê' | 'ë' => 'e',
    'ì' | 'í' | 'î' | 'ï' => 'i',
    'ñ' => 'n',
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'œ' => 'o',
    'ù' | 'ú' | 'û' | 'ü' => 'u',
    'ý' | 'ÿ' => 'y',
    'ß' => 's',
    _ => c
  }
}

pub fn escape_html(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(c)
    }
  }
  escaped
}

// String::truncate panics when cutting a multibyte char in
// half, this cuts on a char boundary instead.
pub fn truncate_utf8(value: &mut String, max_chars: usize) {
  if let Some((idx, _)) = value.char_indices().nth(max_chars) {
    value.truncate(idx);
  }
}

pub fn is_valid_email(value: &str) -> bool {
  EMAIL_REGEX.is_match(value)
}

// Plain text excerpt out of the HTML content of a post.
pub fn excerpt_from_html(html: &str, max_chars: usize) -> String {
  // Large width so that html2text doesn't wrap lines, we
  // collapse whitespace right after anyway.
  let text = from_read(html.as_bytes(), 10_000);
  let mut excerpt = WHITESPACE_REGEX.replace_all(text.trim(), " ").to_string();
  if excerpt.chars().count() > max_chars {
    truncate_utf8(&mut excerpt, max_chars);
    excerpt = excerpt.trim_end().to_string();
    excerpt.push_str("...");
  }
  excerpt
}

// Feed readers need absolute URLs. `root` should never
// have a trailing slash.
pub fn relative_links_to_absolute(html: &str, root: &str) -> String {
  RELATIVE_LINK_REGEX
    .replace_all(html, format!("$1=\"{}/", root).as_str())
    .to_string()
}

// Category sub-topics come from a free form list in the
// admin: trim, drop empties and duplicates, keep order.
pub fn normalize_labels(labels: Vec<String>) -> Vec<String> {
  let mut normalized: Vec<String> = Vec::with_capacity(labels.len());
  for label in labels {
    let label = label.trim();
    if !label.is_empty() && !normalized.iter().any(|l| l == label) {
      normalized.push(label.to_string());
    }
  }
  normalized
}
