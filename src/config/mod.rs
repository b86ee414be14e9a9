// Adding the context method to errors:
use eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::convert::From;

#[derive(Debug, Deserialize)]
pub struct Config {
  pub db_path: String,
  pub bind_address: String,
  pub template_dir: String,
  // Buffer size of the page view channel:
  pub message_queue_size: usize,
  // Rate limiter settings:
  pub rl_max_requests: u32,
  pub rl_max_requests_time: u32,
  pub rl_block_duration: u32,
  // Replies deeper than this are collapsed in
  // comment threads.
  pub comment_collapse_depth: usize,
  // Origin of the admin frontend:
  pub cors_origin: String,
  // Used to generate feeds and post links:
  pub site_title: String,
  pub site_root: String,
  pub site_posts_root: String,
  pub site_rss_full_url: String,
  pub site_description: String
}

// Public subset of the config that gets moved into the
// app state, the rest shouldn't be carried around.
#[derive(Debug, Serialize)]
pub struct SiteInfo {
  pub title: String,
  pub root: String,
  pub posts_root: String,
  pub rss_full_url: String,
  pub description: String,
  pub comment_collapse_depth: usize
}

impl From<Config> for SiteInfo {
  fn from(config: Config) -> Self {
    Self {
      title: config.site_title,
      root: config.site_root,
      posts_root: config.site_posts_root,
      rss_full_url: config.site_rss_full_url,
      description: config.site_description,
      comment_collapse_depth: config.comment_collapse_depth
    }
  }
}

impl Config {

  pub fn from_env() -> Result<Config> {
    // Keys have to be lowercase when compared to
    // what's in the .env file.
    // db_path has no default on purpose.
    let c = config::Config::builder()
      .set_default("bind_address", "127.0.0.1:8080")?
      .set_default("template_dir", "./templates")?
      .set_default("message_queue_size", 30)?
      .set_default("rl_max_requests", 120)?
      .set_default("rl_max_requests_time", 60)?
      .set_default("rl_block_duration", 60)?
      .set_default("comment_collapse_depth", 3)?
      .set_default("cors_origin", "http://localhost:3000")?
      .set_default("site_title", "Quill")?
      // Should never have a trailing slash or THINGS WILL BREAK.
      .set_default("site_root", "http://localhost:8080")?
      .set_default("site_posts_root", "posts")?
      .set_default("site_rss_full_url", "http://localhost:8080/rss.xml")?
      .set_default("site_description", "Articles, reviews and the occasional rant.")?
      .add_source(config::Environment::default())
      .build()
      .context("Building configuration")?;
    c.try_deserialize()
      .context("Loading configuration from env")
  }

}

#[cfg(test)]
impl SiteInfo {
  pub fn for_tests() -> Self {
    Self {
      title: "Test blog".to_string(),
      root: "https://blog.test".to_string(),
      posts_root: "posts".to_string(),
      rss_full_url: "https://blog.test/rss.xml".to_string(),
      description: "A blog for tests".to_string(),
      comment_collapse_depth: 3
    }
  }
}
