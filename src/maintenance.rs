#![allow(dead_code)]
mod config;
mod db;
mod ratings;
mod utils;

use std::env;
use color_eyre::Result;
use eyre::{eyre, WrapErr};
use dotenv::dotenv;
use log::info;
use getopts::Options;
use crate::config::Config;
use crate::db::entities::UserRole;
use crate::utils::{text_utils, time_utils, token_utils};

fn print_usage(program: &str, opts: Options) {
  let brief = format!("Usage: {} [options]", program);
  print!("{}", opts.usage(&brief));
}

// "NAME,EMAIL,ROLE" with ROLE one of admin, author, reader.
fn parse_user_arg(arg: &str) -> Result<(String, String, UserRole)> {
  let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
  if parts.len() != 3 || parts[0].is_empty() {
    return Err(eyre!("Expected NAME,EMAIL,ROLE, got {}", arg));
  }
  let email = parts[1].to_lowercase();
  if !text_utils::is_valid_email(&email) {
    return Err(eyre!("Invalid email address: {}", parts[1]));
  }
  let role: UserRole = parts[2].parse()
    .wrap_err("Role must be admin, author or reader")?;
  Ok((parts[0].to_string(), email, role))
}

/**
 * Maintenance tasks meant for the command line or a
 * cronjob, working straight on the database file.
 */
fn main() -> Result<()> {
  dotenv().ok();
  env_logger::init();

  let args: Vec<String> = env::args().collect();
  let program = args[0].clone();
  let mut opts = Options::new();
  opts.optflag("i", "init", "Create the database schema");
  opts.optflag("r", "recompute-ratings", "Recompute the rating of every post");
  opts.optflag("p", "publish-scheduled", "Publish scheduled posts that are due");
  opts.optopt("u", "create-user", "Create a user and print its API token", "NAME,EMAIL,ROLE");
  opts.optflag("h", "help", "Program usage");
  let opt_matches = opts.parse(&args[1..])?;
  if opt_matches.opt_present("h") || args.len() < 2 {
    print_usage(&program, opts);
    return Ok(());
  }

  let config = Config::from_env()
    .context("Configuration (environment or .env file) is missing")?;
  // The schema is applied when connections are opened.
  let pool = db::open_pool(&config.db_path)?;
  let mut conn = pool.get()?;

  if opt_matches.opt_present("i") {
    info!("Database schema is ready at {}", config.db_path);
  }
  if opt_matches.opt_present("p") {
    let count = db::posts::publish_due_posts(&conn, time_utils::current_timestamp())?;
    info!("Published {} scheduled post(s)", count);
  }
  if opt_matches.opt_present("r") {
    ratings::recompute_all(&mut conn)?;
  }
  if let Some(arg) = opt_matches.opt_str("u") {
    let (name, email, role) = parse_user_arg(&arg)?;
    let token = token_utils::generate_token();
    let id = db::users::insert_user(
      &conn,
      &name,
      &email,
      role,
      &token_utils::hash_token(&token)
    )?;
    info!("Created user {} with id {}", name, id);
    // Only the hash is stored, this is the one chance to
    // get the token.
    println!("API token for {}: {}", name, token);
  }

  Ok(())
}
