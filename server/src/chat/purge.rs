//! Daily message purge.
//!
//! Spawns a tokio task that sleeps until the next occurrence of the
//! configured UTC hour and then deletes every message. Connected WebSocket
//! clients are not notified; their next history fetch simply comes back empty.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::chat::store;
use crate::db::DbPool;

/// Time from `now` until the next `hour_utc:00:00`. If `now` is exactly on
/// the hour, the run is scheduled a full day later.
pub fn duration_until_next_run(now: DateTime<Utc>, hour_utc: u32) -> Duration {
    let hour = hour_utc.min(23);
    let today = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);

    let next = if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    };

    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Spawn the background purge loop.
pub fn spawn_message_purge(db: DbPool, hour_utc: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = duration_until_next_run(Utc::now(), hour_utc);
            tracing::debug!(
                seconds = wait.as_secs(),
                hour_utc,
                "Next message purge scheduled"
            );
            tokio::time::sleep(wait).await;

            let db_clone = db.clone();
            match tokio::task::spawn_blocking(move || store::delete_all_messages(&db_clone)).await
            {
                Ok(Ok(count)) => {
                    tracing::info!("Message purge: deleted {} messages", count);
                }
                Ok(Err(e)) => {
                    tracing::error!("Message purge error: {}", e);
                }
                Err(e) => {
                    tracing::error!("Message purge task join error: {}", e);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_midnight_from_evening() {
        let wait = duration_until_next_run(at(23, 30, 0), 0);
        assert_eq!(wait, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_later_same_day() {
        let wait = duration_until_next_run(at(1, 0, 0), 3);
        assert_eq!(wait, Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_exactly_on_the_hour_waits_a_day() {
        let wait = duration_until_next_run(at(0, 0, 0), 0);
        assert_eq!(wait, Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_hour_already_passed_rolls_over() {
        let wait = duration_until_next_run(at(5, 0, 1), 4);
        assert_eq!(wait, Duration::from_secs(23 * 3600 - 1));
    }

    #[test]
    fn test_out_of_range_hour_is_clamped() {
        let wait = duration_until_next_run(at(22, 0, 0), 99);
        assert_eq!(wait, Duration::from_secs(3600));
    }
}
