//! Heartbeat timer with an optional pong deadline.

use std::pin::Pin;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior, Sleep};

/// What the heartbeat wants done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Beat {
    /// Time to send a ping.
    Ping,
    /// A ping went unanswered for longer than the pong timeout.
    Expired,
}

/// Lives exactly as long as the connection is up.
pub(crate) struct Heartbeat {
    ticker: Interval,
    pong_timeout: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl Heartbeat {
    /// First ping fires one full period after start.
    pub(crate) fn start(period: Duration, pong_timeout: Option<Duration>) -> Self {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            pong_timeout,
            deadline: None,
        }
    }

    pub(crate) async fn next(&mut self) -> Beat {
        match self.deadline.as_mut() {
            Some(deadline) => tokio::select! {
                () = deadline => Beat::Expired,
                _ = self.ticker.tick() => Beat::Ping,
            },
            None => {
                self.ticker.tick().await;
                Beat::Ping
            }
        }
    }

    /// A ping was sent. Starts the pong deadline unless one is already running,
    /// so a slow peer cannot push it out by letting pings pile up.
    pub(crate) fn ping_sent(&mut self) {
        if self.deadline.is_none() {
            if let Some(timeout) = self.pong_timeout {
                self.deadline = Some(Box::pin(time::sleep(timeout)));
            }
        }
    }

    pub(crate) fn pong_received(&mut self) {
        self.deadline = None;
    }

    pub(crate) fn pong_timeout(&self) -> Option<Duration> {
        self.pong_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_ping_after_one_period() {
        let start = Instant::now();
        let mut hb = Heartbeat::start(Duration::from_secs(30), None);
        assert_eq!(hb.next().await, Beat::Ping);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(hb.next().await, Beat::Ping);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_ping_expires() {
        let start = Instant::now();
        let mut hb = Heartbeat::start(Duration::from_secs(30), Some(Duration::from_secs(10)));
        assert_eq!(hb.next().await, Beat::Ping);
        hb.ping_sent();
        assert_eq!(hb.next().await, Beat::Expired);
        assert_eq!(start.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn pong_clears_deadline() {
        let start = Instant::now();
        let mut hb = Heartbeat::start(Duration::from_secs(30), Some(Duration::from_secs(10)));
        hb.next().await;
        hb.ping_sent();
        hb.pong_received();
        assert_eq!(hb.next().await, Beat::Ping);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn no_deadline_without_timeout() {
        let mut hb = Heartbeat::start(Duration::from_secs(1), None);
        for _ in 0..3 {
            assert_eq!(hb.next().await, Beat::Ping);
            hb.ping_sent();
        }
    }
}
