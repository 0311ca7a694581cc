use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, Duration},
};

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const ELAPSED: u8 = 2;

/// Cancellable single-shot countdown. The task decrements once per
/// wall-clock second and publishes the remaining seconds on a watch
/// channel. The fires-once and never-after-cancel invariants are enforced
/// by the task's own state transition, not by caller discipline: the
/// callback runs only on a successful running→elapsed swap, and `cancel`
/// only takes effect on a successful running→cancelled swap.
pub struct CountdownTimer {
    state: Arc<AtomicU8>,
    remaining: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl CountdownTimer {
    pub fn start(duration_seconds: u64, on_elapsed: impl FnOnce() + Send + 'static) -> Self {
        let (tx, remaining) = watch::channel(duration_seconds);
        let state = Arc::new(AtomicU8::new(RUNNING));
        let task_state = Arc::clone(&state);
        let task = tokio::spawn(async move {
            let mut left = duration_seconds;
            let mut ticker = interval(Duration::from_secs(1));
            // the first tick of an interval completes immediately
            ticker.tick().await;
            while left > 0 {
                ticker.tick().await;
                if task_state.load(Ordering::SeqCst) != RUNNING {
                    return;
                }
                left -= 1;
                let _ = tx.send(left);
            }
            if task_state
                .compare_exchange(RUNNING, ELAPSED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                on_elapsed();
            }
        });
        Self {
            state,
            remaining,
            task,
        }
    }

    /// Stops the countdown. Idempotent: calling it again, or after the
    /// timer elapsed naturally, has no effect.
    pub fn cancel(&self) {
        if self
            .state
            .compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.task.abort();
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        *self.remaining.borrow()
    }

    pub fn subscribe_remaining(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    pub fn has_elapsed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == ELAPSED
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCELLED
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Zero-padded `MM:SS` of the remaining time.
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

/// Display urgency band for the remaining time: under a minute is
/// critical, under five minutes is a warning.
pub fn urgency(seconds: u64) -> Urgency {
    if seconds < 60 {
        Urgency::Critical
    } else if seconds < 300 {
        Urgency::Warning
    } else {
        Urgency::Normal
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use tokio::time::timeout;

    use super::*;

    #[test]
    fn formats_remaining_time_as_zero_padded_minutes_and_seconds() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(2), "00:02");
        assert_eq!(format_remaining(61), "01:01");
        assert_eq!(format_remaining(1800), "30:00");
    }

    #[test]
    fn urgency_bands_match_the_display_thresholds() {
        assert_eq!(urgency(0), Urgency::Critical);
        assert_eq!(urgency(59), Urgency::Critical);
        assert_eq!(urgency(60), Urgency::Warning);
        assert_eq!(urgency(299), Urgency::Warning);
        assert_eq!(urgency(300), Urgency::Normal);
        assert_eq!(urgency(1800), Urgency::Normal);
    }

    #[tokio::test]
    async fn counts_down_and_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_callback = Arc::clone(&fired);
        let timer = CountdownTimer::start(2, move || {
            fired_in_callback.fetch_add(1, Ordering::SeqCst);
        });

        let mut remaining = timer.subscribe_remaining();
        let mut seen = vec![format_remaining(*remaining.borrow())];
        for _ in 0..2 {
            timeout(Duration::from_secs(3), remaining.changed())
                .await
                .expect("tick timeout")
                .expect("sender alive");
            seen.push(format_remaining(*remaining.borrow()));
        }
        assert_eq!(seen, vec!["00:02", "00:01", "00:00"]);

        // give the callback a moment past the final tick, then make sure
        // nothing fires a second time
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.has_elapsed());
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_duration_fires_without_waiting_for_a_tick() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_callback = Arc::clone(&fired);
        let _timer = CountdownTimer::start(0, move || {
            fired_in_callback.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_prevents_the_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_callback = Arc::clone(&fired);
        let timer = CountdownTimer::start(1, move || {
            fired_in_callback.fetch_add(1, Ordering::SeqCst);
        });

        timer.cancel();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timer.is_cancelled());
        assert!(!timer.has_elapsed());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_harmless_after_elapse() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_in_callback = Arc::clone(&fired);
        let cancelled_early = CountdownTimer::start(5, move || {
            fired_in_callback.fetch_add(1, Ordering::SeqCst);
        });
        cancelled_early.cancel();
        cancelled_early.cancel();
        assert!(cancelled_early.is_cancelled());

        let fired_late = Arc::new(AtomicUsize::new(0));
        let fired_in_callback = Arc::clone(&fired_late);
        let elapsed = CountdownTimer::start(0, move || {
            fired_in_callback.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        elapsed.cancel();
        assert!(elapsed.has_elapsed());
        assert!(!elapsed.is_cancelled());
        assert_eq!(fired_late.load(Ordering::SeqCst), 1);
    }
}
