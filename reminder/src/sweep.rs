use chrono::{FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use common::{error::Res, events::OutboundCommand};
use db::models::activation::subscription_end;
use sqlx::SqlitePool;

use crate::notifier::Notifier;

/// Reminders start this many days before the subscription ends.
pub const REMIND_FROM_DAYS: i64 = 5;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Whole days until the subscription ends, rounded down.
pub fn days_left(service_provided_at: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (subscription_end(service_provided_at) - now)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

/// A reminder goes out once per distinct day count inside the window.
pub fn reminder_due(days_left: i64, last_reminder_day: Option<i64>) -> bool {
    (1..=REMIND_FROM_DAYS).contains(&days_left) && last_reminder_day != Some(days_left)
}

/// Offset customers read dates in, built from minutes east of UTC.
/// An out-of-range value falls back to UTC.
pub fn display_offset(minutes_east: i32) -> FixedOffset {
    minutes_east
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            log::warn!("Display offset {} min is out of range, using UTC", minutes_east);
            Utc.fix()
        })
}

/// `end` is naive UTC; the date is shown in `offset`.
pub fn reminder_text(days_left: i64, end: NaiveDateTime, offset: &FixedOffset) -> String {
    format!(
        "⏰ Напоминание о подписке\n\n\
         Ваша подписка Starlink заканчивается через {days_left} день(дня/дней).\n\
         Дата окончания: {}\n\n\
         Пожалуйста, продлите подписку.",
        offset.from_utc_datetime(&end).format("%d.%m.%Y")
    )
}

/// One pass over serviced activations.
///
/// The reminder day is recorded only after the notifier accepted the
/// message. A failed hand-off is logged and the sweep moves on; the next
/// pass retries it while the day count is unchanged.
pub async fn run_sweep(
    pool: &SqlitePool,
    notifier: &dyn Notifier,
    now: NaiveDateTime,
    display_offset: &FixedOffset,
) -> Res<SweepReport> {
    let candidates = db::activation::get_reminder_candidates(pool).await?;
    let mut report = SweepReport {
        checked: candidates.len(),
        ..Default::default()
    };

    for candidate in candidates {
        let days = days_left(candidate.service_provided_at, now);
        if !reminder_due(days, candidate.last_reminder_day) {
            continue;
        }

        let end = subscription_end(candidate.service_provided_at);
        let command = OutboundCommand::text(
            candidate.user_id,
            reminder_text(days, end, display_offset),
        );
        if let Err(error) = notifier.notify(command).await {
            log::warn!(
                "Reminder for activation {} (user {}) not delivered: {}",
                candidate.id,
                candidate.user_id,
                error
            );
            report.failed += 1;
            continue;
        }

        if let Err(error) = db::activation::set_last_reminder_day(pool, candidate.id, days).await
        {
            log::error!(
                "Reminder for activation {} sent but not recorded: {}",
                candidate.id,
                error
            );
        }
        report.sent += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use db::dtos::activation::ActivationCreateRequest;

    use super::*;
    use crate::notifier::tests::Recorder;

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    async fn serviced(pool: &SqlitePool, user_id: i64, at: NaiveDateTime) -> i64 {
        let activation = db::activation::insert_activation(
            pool,
            ActivationCreateRequest {
                user_id,
                phone: "+79991234567".into(),
                name: "Иван".into(),
                username: None,
            },
        )
        .await
        .unwrap();
        db::activation::mark_service_provided(pool, activation.id, at)
            .await
            .unwrap();
        activation.id
    }

    async fn last_day(pool: &SqlitePool, id: i64) -> Option<i64> {
        db::activation::get_activation_by_id(pool, id)
            .await
            .unwrap()
            .unwrap()
            .last_reminder_day
    }

    #[test]
    fn days_left_rounds_down() {
        let start = t0();
        assert_eq!(days_left(start, start + Duration::days(27)), 3);
        assert_eq!(
            days_left(start, start + Duration::days(27) + Duration::seconds(1)),
            2
        );
        assert_eq!(days_left(start, start), 30);
        assert_eq!(days_left(start, start + Duration::days(31)), -1);
    }

    #[test]
    fn due_window() {
        assert!(!reminder_due(6, None));
        assert!(reminder_due(5, None));
        assert!(reminder_due(1, Some(2)));
        assert!(!reminder_due(3, Some(3)));
        assert!(!reminder_due(0, None));
    }

    #[test]
    fn text_shows_end_date() {
        let text = reminder_text(3, t0() + Duration::days(30), &utc());
        assert!(text.contains("через 3 день"));
        assert!(text.contains("31.03.2025"));
    }

    #[test]
    fn end_date_follows_the_display_offset() {
        // 22:30 UTC is already the next day in Moscow
        let end = NaiveDate::from_ymd_opt(2025, 3, 31)
            .unwrap()
            .and_hms_opt(22, 30, 0)
            .unwrap();
        assert!(reminder_text(1, end, &utc()).contains("31.03.2025"));
        assert!(reminder_text(1, end, &display_offset(180)).contains("01.04.2025"));
        assert!(reminder_text(1, end, &display_offset(-120)).contains("31.03.2025"));
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        assert_eq!(display_offset(180).local_minus_utc(), 3 * 3600);
        assert_eq!(display_offset(24 * 60).local_minus_utc(), 0);
        assert_eq!(display_offset(i32::MAX).local_minus_utc(), 0);
    }

    #[tokio::test]
    async fn one_reminder_per_day_count() {
        let pool = db::setup_in_memory().await.unwrap();
        let id = serviced(&pool, 7, t0()).await;
        let notifier = Recorder::default();
        let now = t0() + Duration::days(27);

        let report = run_sweep(&pool, &notifier, now, &utc()).await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                checked: 1,
                sent: 1,
                failed: 0
            }
        );
        assert_eq!(last_day(&pool, id).await, Some(3));

        let report = run_sweep(&pool, &notifier, now, &utc()).await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);

        // next day, next reminder
        let report = run_sweep(&pool, &notifier, now + Duration::days(1), &utc())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(last_day(&pool, id).await, Some(2));
    }

    #[tokio::test]
    async fn outside_window_is_quiet() {
        let pool = db::setup_in_memory().await.unwrap();
        serviced(&pool, 7, t0()).await;
        let notifier = Recorder::default();

        for offset in [0, 20, 24, 30, 40] {
            let report = run_sweep(&pool, &notifier, t0() + Duration::days(offset), &utc())
                .await
                .unwrap();
            assert_eq!(report.sent, 0, "day {offset}");
        }
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_later_and_does_not_block_others() {
        let pool = db::setup_in_memory().await.unwrap();
        let blocked = serviced(&pool, 1, t0()).await;
        let fine = serviced(&pool, 2, t0()).await;
        let notifier = Recorder {
            failing: vec![1],
            ..Default::default()
        };

        let report = run_sweep(&pool, &notifier, t0() + Duration::days(26), &utc())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(last_day(&pool, blocked).await, None);
        assert_eq!(last_day(&pool, fine).await, Some(4));

        let working = Recorder::default();
        let report = run_sweep(&pool, &working, t0() + Duration::days(26), &utc())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(last_day(&pool, blocked).await, Some(4));
    }

    #[tokio::test]
    async fn re_marking_re_arms_reminders() {
        let pool = db::setup_in_memory().await.unwrap();
        let id = serviced(&pool, 7, t0()).await;
        let notifier = Recorder::default();

        run_sweep(&pool, &notifier, t0() + Duration::days(27), &utc())
            .await
            .unwrap();
        assert_eq!(last_day(&pool, id).await, Some(3));

        let renewed = t0() + Duration::days(3);
        db::activation::mark_service_provided(pool.as_ref(), id, renewed)
            .await
            .unwrap();
        assert_eq!(last_day(&pool, id).await, None);

        let report = run_sweep(&pool, &notifier, renewed + Duration::days(27), &utc())
            .await
            .unwrap();
        assert_eq!(report.sent, 1);
    }
}
