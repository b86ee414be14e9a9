use rusqlite::{Connection, params};
use eyre::WrapErr;
use color_eyre::Result;
use serde::Deserialize;
use super::entities::*;
use super::mappers::{map_adsense_stat, ADSENSE_FIELDS};
use super::{select_count, select_many};

// Page views and AdSense counters.

pub fn insert_page_view(conn: &Connection, view: &PageView) -> Result<()> {
  conn.execute(
    "INSERT INTO page_views (post_id, path, visitor_ip, user_agent, referrer, created_at) \
    VALUES (?, ?, ?, ?, ?, ?)",
    params![
      view.post_id,
      view.path,
      view.visitor_ip,
      view.user_agent,
      view.referrer,
      view.created_at
    ]
  ).context("Inserting page view")?;
  Ok(())
}

pub fn count_page_views_since(conn: &Connection, since: i64) -> Result<usize> {
  select_count(
    conn,
    "SELECT count(*) FROM page_views WHERE created_at >= ?",
    params![since]
  )
}

// Visitors are told apart by anonymized IP and user agent.
pub fn count_unique_visitors_since(conn: &Connection, since: i64) -> Result<usize> {
  select_count(
    conn,
    "SELECT count(*) FROM (SELECT DISTINCT visitor_ip, user_agent \
    FROM page_views WHERE created_at >= ?)",
    params![since]
  )
}

// (day, views) pairs, oldest day first.
pub fn page_views_per_day(conn: &Connection, since: i64) -> Result<Vec<(String, i64)>> {
  select_many(
    conn,
    "SELECT date(created_at, 'unixepoch') AS day, count(*) FROM page_views \
    WHERE created_at >= ? GROUP BY day ORDER BY day ASC",
    params![since],
    |row| Ok((row.get(0)?, row.get(1)?))
  )
}

// (post id, title, slug, views), most viewed first.
pub fn top_posts_since(
  conn: &Connection,
  since: i64,
  max: usize
) -> Result<Vec<(i64, String, String, i64)>> {
  select_many(
    conn,
    "SELECT posts.id, posts.title, posts.slug, count(*) AS views \
    FROM page_views JOIN posts ON posts.id = page_views.post_id \
    WHERE page_views.created_at >= ? \
    GROUP BY posts.id ORDER BY views DESC, posts.id ASC LIMIT ?",
    params![since, max as i64],
    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
  )
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdEvent {
  Impression,
  Click
}

pub fn record_ad_event(conn: &Connection, day: &str, slot: &str, event: AdEvent) -> Result<()> {
  let (impressions, clicks) = match event {
    AdEvent::Impression => (1, 0),
    AdEvent::Click => (0, 1)
  };
  conn.execute(
    "INSERT INTO adsense_stats (day, slot, impressions, clicks) VALUES (?1, ?2, ?3, ?4) \
    ON CONFLICT (day, slot) DO UPDATE SET \
    impressions = impressions + excluded.impressions, \
    clicks = clicks + excluded.clicks",
    params![day, slot, impressions, clicks]
  ).context("Recording AdSense event")?;
  Ok(())
}

pub fn set_ad_earnings(conn: &Connection, day: &str, slot: &str, earnings: f64) -> Result<()> {
  conn.execute(
    "INSERT INTO adsense_stats (day, slot, earnings) VALUES (?1, ?2, ?3) \
    ON CONFLICT (day, slot) DO UPDATE SET earnings = excluded.earnings",
    params![day, slot, earnings]
  ).context("Setting AdSense earnings")?;
  Ok(())
}

// Both bounds included. Days are YYYY-MM-DD so comparing
// them as text works.
pub fn adsense_stats_between(conn: &Connection, from: &str, to: &str) -> Result<Vec<AdSenseStat>> {
  select_many(
    conn,
    &format!(
      "SELECT {} FROM adsense_stats WHERE day >= ? AND day <= ? ORDER BY day ASC, slot ASC",
      ADSENSE_FIELDS
    ),
    params![from, to],
    map_adsense_stat
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::db::{fixtures, memory_pool};

  fn view(post_id: Option<i64>, ip: &str, created_at: i64) -> PageView {
    PageView {
      post_id,
      path: "/posts/x".to_string(),
      visitor_ip: ip.to_string(),
      user_agent: "test".to_string(),
      referrer: None,
      created_at
    }
  }

  #[test]
  fn views_and_unique_visitors() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    let a = fixtures::post(&conn, "A", PostStatus::Published, None);
    let b = fixtures::post(&conn, "B", PostStatus::Published, None);
    insert_page_view(&conn, &view(Some(a), "1.2.3.0", 86400)).unwrap();
    insert_page_view(&conn, &view(Some(a), "1.2.3.0", 86400 + 10)).unwrap();
    insert_page_view(&conn, &view(Some(b), "5.6.7.0", 2 * 86400)).unwrap();
    insert_page_view(&conn, &view(Some(b), "5.6.7.0", 10)).unwrap();

    assert_eq!(count_page_views_since(&conn, 86400).unwrap(), 3);
    assert_eq!(count_unique_visitors_since(&conn, 86400).unwrap(), 2);
    assert_eq!(
      page_views_per_day(&conn, 86400).unwrap(),
      vec![("1970-01-02".to_string(), 2), ("1970-01-03".to_string(), 1)]
    );
    let top = top_posts_since(&conn, 86400, 5).unwrap();
    assert_eq!(top[0].0, a);
    assert_eq!(top[0].3, 2);
  }

  #[test]
  fn ad_events_accumulate_per_day_and_slot() {
    let pool = memory_pool();
    let conn = pool.get().unwrap();
    record_ad_event(&conn, "2024-01-01", "sidebar", AdEvent::Impression).unwrap();
    record_ad_event(&conn, "2024-01-01", "sidebar", AdEvent::Impression).unwrap();
    record_ad_event(&conn, "2024-01-01", "sidebar", AdEvent::Click).unwrap();
    record_ad_event(&conn, "2024-01-02", "footer", AdEvent::Impression).unwrap();
    set_ad_earnings(&conn, "2024-01-01", "sidebar", 1.5).unwrap();

    let stats = adsense_stats_between(&conn, "2024-01-01", "2024-01-01").unwrap();
    assert_eq!(stats, vec![AdSenseStat {
      day: "2024-01-01".to_string(),
      slot: "sidebar".to_string(),
      impressions: 2,
      clicks: 1,
      earnings: 1.5
    }]);
    assert_eq!(adsense_stats_between(&conn, "2024-01-01", "2024-12-31").unwrap().len(), 2);
  }
}
