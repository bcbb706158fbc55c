// SPDX-FileCopyrightText: 2026 Plexbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Start barrier: waits until every participating plugin has either started
//! or failed.
//!
//! Each participant holds a [`StartTicket`]. A ticket dropped without being
//! resolved counts as a failure, so a panicking or aborted start task cannot
//! keep the barrier closed.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How the barrier resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Every participant reported.
    Released {
        started: Vec<String>,
        failed: Vec<String>,
    },
    /// The timeout elapsed with participants still pending.
    TimedOut { pending: Vec<String> },
    /// Shutdown was requested while waiting.
    Cancelled { pending: Vec<String> },
}

struct Report {
    plugin: String,
    started: bool,
}

/// Collects start reports from a fixed set of plugins.
pub struct StartBarrier {
    tx: mpsc::UnboundedSender<Report>,
    rx: mpsc::UnboundedReceiver<Report>,
    pending: Vec<String>,
}

impl Default for StartBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl StartBarrier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            pending: Vec::new(),
        }
    }

    /// Enlist `plugin` and hand out its ticket.
    pub fn ticket(&mut self, plugin: impl Into<String>) -> StartTicket {
        let plugin = plugin.into();
        self.pending.push(plugin.clone());
        StartTicket {
            plugin,
            tx: self.tx.clone(),
            resolved: false,
        }
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Wait for every ticket to resolve, at most `timeout`.
    pub async fn wait(self, timeout: Duration, cancel: &CancellationToken) -> BarrierOutcome {
        let Self {
            tx,
            mut rx,
            mut pending,
        } = self;
        drop(tx);

        let mut started = Vec::new();
        let mut failed = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;

        while !pending.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return BarrierOutcome::Cancelled { pending };
                }
                report = rx.recv() => match report {
                    Some(Report { plugin, started: ok }) => {
                        pending.retain(|p| p != &plugin);
                        debug!(plugin = %plugin, started = ok, remaining = pending.len(), "start reported");
                        if ok {
                            started.push(plugin);
                        } else {
                            failed.push(plugin);
                        }
                    }
                    // Every ticket is gone; whoever did not report failed.
                    None => {
                        failed.append(&mut pending);
                    }
                },
                _ = tokio::time::sleep_until(deadline) => {
                    return BarrierOutcome::TimedOut { pending };
                }
            }
        }

        BarrierOutcome::Released { started, failed }
    }
}

/// One plugin's obligation to report to a [`StartBarrier`].
pub struct StartTicket {
    plugin: String,
    tx: mpsc::UnboundedSender<Report>,
    resolved: bool,
}

impl StartTicket {
    /// The plugin this ticket reports for.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Report that the plugin reached `started`.
    pub fn started(mut self) {
        self.report(true);
    }

    /// Report that the plugin will not start. Dropping the ticket unused
    /// reports the same.
    pub fn failed(mut self) {
        self.report(false);
    }

    fn report(&mut self, started: bool) {
        if self.resolved {
            return;
        }
        self.resolved = true;
        let _ = self.tx.send(Report {
            plugin: self.plugin.clone(),
            started,
        });
    }
}

impl Drop for StartTicket {
    fn drop(&mut self) {
        self.report(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_barrier_releases_immediately() {
        let barrier = StartBarrier::new();
        let outcome = barrier
            .wait(Duration::from_secs(1), &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            BarrierOutcome::Released {
                started: vec![],
                failed: vec![]
            }
        );
    }

    #[tokio::test]
    async fn releases_once_everyone_reported() {
        let mut barrier = StartBarrier::new();
        let a = barrier.ticket("a");
        let b = barrier.ticket("b");
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            b.failed();
            a.started();
        });

        let outcome = barrier
            .wait(Duration::from_secs(5), &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            BarrierOutcome::Released {
                started: vec!["a".to_string()],
                failed: vec!["b".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn dropped_ticket_counts_as_failure() {
        let mut barrier = StartBarrier::new();
        let a = barrier.ticket("a");
        let handle = tokio::spawn(async move {
            let _ticket = a;
            std::future::pending::<()>().await;
        });
        handle.abort();

        let outcome = barrier
            .wait(Duration::from_secs(5), &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            BarrierOutcome::Released {
                started: vec![],
                failed: vec!["a".to_string()]
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_pending_plugins() {
        let mut barrier = StartBarrier::new();
        let fast = barrier.ticket("fast");
        let _slow = barrier.ticket("slow");
        fast.started();

        let outcome = barrier
            .wait(Duration::from_secs(120), &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            BarrierOutcome::TimedOut {
                pending: vec!["slow".to_string()]
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins() {
        let mut barrier = StartBarrier::new();
        let _ticket = barrier.ticket("slow");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = barrier.wait(Duration::from_secs(120), &cancel).await;
        assert_eq!(
            outcome,
            BarrierOutcome::Cancelled {
                pending: vec!["slow".to_string()]
            }
        );
    }
}
