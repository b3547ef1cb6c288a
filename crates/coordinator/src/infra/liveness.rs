//! Liveness signal (C11) wired into `observe::metrics::serve_metrics`:
//! the process is alive as long as the expiry reaper has completed a sweep
//! recently. A reaper stuck on a poisoned database connection is exactly
//! the kind of silent failure `/health` exists to surface.

use std::sync::atomic::{AtomicI64, Ordering};

pub struct ReaperLiveness {
    last_sweep_unix_ms: AtomicI64,
    max_silence: chrono::Duration,
}

impl ReaperLiveness {
    pub fn new(max_silence: chrono::Duration) -> Self {
        Self {
            last_sweep_unix_ms: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
            max_silence,
        }
    }

    pub fn record_sweep(&self) {
        self.last_sweep_unix_ms.store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl observe::metrics::LivenessChecking for ReaperLiveness {
    async fn is_alive(&self) -> bool {
        let last = self.last_sweep_unix_ms.load(Ordering::Relaxed);
        let elapsed = chrono::Utc::now().timestamp_millis() - last;
        elapsed < self.max_silence.num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_liveness_reports_alive() {
        let liveness = ReaperLiveness::new(chrono::Duration::seconds(60));
        assert!(observe::metrics::LivenessChecking::is_alive(&liveness).await);
    }

    #[tokio::test]
    async fn silence_past_the_threshold_reports_dead() {
        let liveness = ReaperLiveness::new(chrono::Duration::milliseconds(-1));
        assert!(!observe::metrics::LivenessChecking::is_alive(&liveness).await);
    }
}
