//! Per-worker request pacing
//!
//! Each worker owns its own `Pacer`; there is no global limiter, so the
//! aggregate request rate is roughly `workers / delay`.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::downloader::cancel::StopRequested;

#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last_turn: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last_turn: None }
    }

    /// Wait until `delay` has passed since this pacer's previous turn
    ///
    /// The first turn is immediate. Returns early with `StopRequested` when
    /// the token is cancelled before or during the wait.
    pub async fn wait_turn(&mut self, stop: &CancellationToken) -> Result<(), StopRequested> {
        if stop.is_cancelled() {
            return Err(StopRequested);
        }

        if let Some(last) = self.last_turn {
            let Some(ready_at) = last.checked_add(self.delay) else {
                // the next turn lies past the end of the clock
                stop.cancelled().await;
                return Err(StopRequested);
            };
            if ready_at > Instant::now() {
                tokio::select! {
                    () = tokio::time::sleep_until(ready_at) => {}
                    () = stop.cancelled() => return Err(StopRequested),
                }
            }
        }

        self.last_turn = Some(Instant::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn successive_turns_are_spaced_by_the_delay() {
        let token = CancellationToken::new();
        let mut pacer = Pacer::new(Duration::from_millis(500));

        let start = Instant::now();
        pacer.wait_turn(&token).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        pacer.wait_turn(&token).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));

        pacer.wait_turn(&token).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn time_spent_elsewhere_counts_towards_the_delay() {
        let token = CancellationToken::new();
        let mut pacer = Pacer::new(Duration::from_secs(1));

        pacer.wait_turn(&token).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let before = Instant::now();
        pacer.wait_turn(&token).await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pacers_are_independent() {
        let token = CancellationToken::new();
        let mut a = Pacer::new(Duration::from_secs(10));
        let mut b = Pacer::new(Duration::from_secs(10));

        let start = Instant::now();
        a.wait_turn(&token).await.unwrap();
        b.wait_turn(&token).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_the_wait() {
        let token = CancellationToken::new();
        let mut pacer = Pacer::new(Duration::from_secs(3600));
        pacer.wait_turn(&token).await.unwrap();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        assert_eq!(pacer.wait_turn(&token).await, Err(StopRequested));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_beyond_the_clock_waits_for_stop() {
        let token = CancellationToken::new();
        let mut pacer = Pacer::new(Duration::from_secs(u64::MAX / 2));
        pacer.wait_turn(&token).await.unwrap();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        assert_eq!(pacer.wait_turn(&token).await, Err(StopRequested));
    }

    #[tokio::test]
    async fn stopped_token_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let mut pacer = Pacer::new(Duration::ZERO);
        assert_eq!(pacer.wait_turn(&token).await, Err(StopRequested));
    }
}
