/*
 * Page view recording. Handlers hand the views over to a
 * background thread so that reading a post never waits on
 * the stats insert.
 */

use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::net::IpAddr;
use color_eyre::Result;
use eyre::eyre;
use log::{error, info, debug};
use crate::db::Pool;
use crate::db::analytics::insert_page_view;
use crate::db::entities::PageView;
use crate::utils::ip_utils::anonymize_ip;
use crate::utils::time_utils::current_timestamp;

// What the handlers know about a view. The IP address is
// anonymized by the stats thread before it's stored.
#[derive(Debug)]
pub struct BasePageView {
  pub post_id: Option<i64>,
  pub path: String,
  pub client_ip: Option<IpAddr>,
  pub user_agent: String,
  pub referrer: Option<String>
}

#[derive(Debug)]
enum StatsMessage {
  Close,
  InsertPageView(BasePageView)
}

pub struct StatsService {
  tx: SyncSender<StatsMessage>,
  thread_handle: Option<JoinHandle<()>>
}

impl StatsService {

  // `queue_size` is the buffer of the channel. Views sent
  // while it's full are dropped.
  pub fn open(pool: &Pool, queue_size: usize) -> Result<StatsService> {
    let (tx, rx) = mpsc::sync_channel::<StatsMessage>(queue_size);
    let pool = pool.clone();
    info!("Starting stats thread...");
    let thread_handle = thread::Builder::new()
      .name("stats".to_string())
      .spawn(move || loop {
        match rx.recv() {
          Ok(StatsMessage::Close) | Err(_) => {
            info!("Stats thread terminating...");
            break;
          },
          Ok(StatsMessage::InsertPageView(base_view)) => {
            let view = PageView {
              post_id: base_view.post_id,
              path: base_view.path,
              visitor_ip: base_view.client_ip
                .map(|ip| anonymize_ip(&ip))
                .unwrap_or_default(),
              user_agent: base_view.user_agent,
              referrer: base_view.referrer,
              created_at: current_timestamp()
            };
            debug!("Inserting page view: {:?}", view);
            // A connection per message, the thread mostly sleeps.
            let inserted = pool.get()
              .map_err(|e| eyre!(e))
              .and_then(|conn| insert_page_view(&conn, &view));
            if let Err(e) = inserted {
              error!("Error from StatsService: could not insert page view - {}", e);
            }
          }
        }
      })?;
    Ok(StatsService {
      tx,
      thread_handle: Some(thread_handle)
    })
  }

  // try_send: a full buffer must never block a worker.
  pub fn insert_page_view(&self, view: BasePageView) -> Result<()> {
    debug!("Sending page view to stats thread: {:?}", view);
    match self.tx.try_send(StatsMessage::InsertPageView(view)) {
      Ok(_) => Ok(()),
      Err(TrySendError::Full(msg)) => {
        error!("Stats thread buffer is full, could not insert: {:?}", msg);
        Ok(())
      },
      Err(TrySendError::Disconnected(msg)) => {
        error!("Stats thread is dead, could not insert: {:?}", msg);
        Err(eyre!("Stats thread appears to have died"))
      }
    }
  }

}

// Close waits behind the views already queued, so they
// all get written before the join returns.
impl Drop for StatsService {
  fn drop(&mut self) {
    match self.tx.send(StatsMessage::Close) {
      Ok(_) => info!("StatsService is closing..."),
      Err(e) => error!("Could not close StatsService - {}", e)
    }
    if let Some(handle) = self.thread_handle.take() {
      if handle.join().is_err() {
        error!("Stats thread panicked");
      }
    }
  }
}
