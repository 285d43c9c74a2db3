//! Tick scheduler and watchdog.
//!
//! The scheduler owns the module registry and drives it on a fixed period:
//! every tick it logs chain vitals, then runs each module sequentially. A
//! module error is logged and counted but never aborts the tick or the
//! process. The watchdog runs beside it and kills the process when the
//! factory stays unreachable or a module stops completing runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::chain::ChainOps;
use crate::errors::CoordinatorError;
use crate::factory::FactoryHandle;
use crate::metrics::{metrics, Timer};
use crate::modules::{ManagerModule, RunOutcome};
use crate::observability::CorrelationId;

const WATCHDOG_PERIOD: Duration = Duration::from_secs(10);
/// A module is considered stalled after this many missed periods.
const STALL_FACTOR: u32 = 3;

/// Last-completed-run stamps, shared between the tick loop and the watchdog.
#[derive(Debug, Default)]
pub struct Liveness {
    last_runs: RwLock<HashMap<String, Instant>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&self, module: &str) {
        self.last_runs
            .write()
            .insert(module.to_string(), Instant::now());
    }

    /// Names of modules whose last completed run is older than `threshold`.
    pub fn stalled(&self, threshold: Duration) -> Vec<String> {
        self.last_runs
            .read()
            .iter()
            .filter(|(_, stamp)| stamp.elapsed() > threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// What the watchdog should do after one probe round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogVerdict {
    Healthy,
    /// Factory ping failed once; re-establish the handle and keep going.
    Reconnect,
    Fatal(String),
}

/// Watchdog decision state, kept separate from the probe loop so the
/// escalation rules are testable without timers.
#[derive(Debug, Default)]
pub struct WatchdogState {
    consecutive_failures: u32,
}

impl WatchdogState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, ping_ok: bool, stalled: &[String]) -> WatchdogVerdict {
        if !stalled.is_empty() {
            return WatchdogVerdict::Fatal(format!(
                "modules stalled: {}",
                stalled.join(", ")
            ));
        }
        if ping_ok {
            self.consecutive_failures = 0;
            return WatchdogVerdict::Healthy;
        }
        self.consecutive_failures += 1;
        if self.consecutive_failures >= 2 {
            WatchdogVerdict::Fatal("factory unreachable after reconnect".to_string())
        } else {
            WatchdogVerdict::Reconnect
        }
    }
}

pub struct Scheduler {
    modules: Vec<Box<dyn ManagerModule>>,
    hub: Arc<dyn ChainOps>,
    factory: Arc<FactoryHandle>,
    checks_period: Duration,
    fee_denom: String,
    liveness: Arc<Liveness>,
}

impl Scheduler {
    pub fn new(
        modules: Vec<Box<dyn ManagerModule>>,
        hub: Arc<dyn ChainOps>,
        factory: Arc<FactoryHandle>,
        checks_period: Duration,
        fee_denom: &str,
    ) -> Self {
        Self {
            modules,
            hub,
            factory,
            checks_period,
            fee_denom: fee_denom.to_string(),
            liveness: Arc::new(Liveness::new()),
        }
    }

    /// Drive the tick loop until the task is cancelled. The watchdog is
    /// spawned alongside and terminates the process itself on a fatal
    /// verdict, so this future only returns through cancellation.
    pub async fn run(mut self) -> Result<(), CoordinatorError> {
        // Seed the stamps so the stall check measures from startup, not
        // from an unset state.
        for module in &self.modules {
            self.liveness.stamp(module.name());
        }

        tokio::spawn(watchdog_loop(
            self.factory.clone(),
            self.liveness.clone(),
            self.checks_period * STALL_FACTOR,
        ));

        let mut ticker = tokio::time::interval(self.checks_period);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// Run one full tick: vitals first, then every module in registration
    /// order. Public so tests can drive the cycle without timers.
    pub async fn run_once(&mut self) {
        let correlation = CorrelationId::new();
        metrics().increment_counter("ticks_total");

        self.show_stats(&correlation).await;

        for module in &mut self.modules {
            let name = module.name().to_string();
            let timer = Timer::new(&format!("module_run_ms_{name}"));
            match module.run().await {
                Ok(RunOutcome::Executed { tx_hash }) => {
                    info!(correlation_id = %correlation, module = %name, tx_hash = %tx_hash, "module executed");
                    metrics().increment_counter(&format!("module_executed_total_{name}"));
                }
                Ok(RunOutcome::Idle(reason)) => {
                    info!(correlation_id = %correlation, module = %name, reason, "module idle");
                    metrics().increment_counter(&format!("module_idle_total_{name}"));
                }
                Err(e) => {
                    // One failing module must not stop the others
                    error!(
                        correlation_id = %correlation,
                        module = %name,
                        category = e.category().metric_label(),
                        error = %e,
                        "module run failed"
                    );
                    metrics().increment_counter(&format!(
                        "module_errors_total_{}",
                        e.category().metric_label()
                    ));
                }
            }
            timer.finish();
            self.liveness.stamp(&name);
        }

        for module in &self.modules {
            let name = module.name();
            if let Some(stats) = metrics().get_histogram_stats(&format!("module_run_ms_{name}")) {
                debug!(
                    correlation_id = %correlation,
                    module = %name,
                    runs = stats.count,
                    p50_ms = stats.p50,
                    p95_ms = stats.p95,
                    "module run latency"
                );
            }
        }
    }

    /// Log chain vitals at the start of the tick. Failures here are logged
    /// and left to the watchdog; the modules still get their turn.
    async fn show_stats(&self, correlation: &CorrelationId) {
        match self.hub.block_height().await {
            Ok(height) => {
                metrics().set_gauge("block_height", height);
                info!(correlation_id = %correlation, height, "hub chain height");
            }
            Err(e) => warn!(correlation_id = %correlation, error = %e, "height query failed"),
        }

        if let Some(sender) = self.hub.sender() {
            match self.hub.bank_balance(&sender, &self.fee_denom).await {
                Ok(balance) => {
                    metrics().set_gauge("wallet_fee_balance", balance.min(u64::MAX as u128) as u64);
                    info!(
                        correlation_id = %correlation,
                        address = %sender,
                        balance,
                        denom = %self.fee_denom,
                        "wallet balance"
                    );
                }
                Err(e) => {
                    warn!(correlation_id = %correlation, error = %e, "balance query failed")
                }
            }
        }
    }
}

async fn watchdog_loop(factory: Arc<FactoryHandle>, liveness: Arc<Liveness>, stall_after: Duration) {
    let mut state = WatchdogState::new();
    let mut ticker = tokio::time::interval(WATCHDOG_PERIOD);
    // First tick fires immediately; skip it so the probe starts one period in.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let ping_ok = factory.ping().await.is_ok();
        let stalled = liveness.stalled(stall_after);
        match state.observe(ping_ok, &stalled) {
            WatchdogVerdict::Healthy => {}
            WatchdogVerdict::Reconnect => {
                warn!("factory ping failed, reconnecting");
                metrics().increment_counter("watchdog_reconnects_total");
                if let Err(e) = factory.reconnect().await {
                    warn!(error = %e, "factory reconnect failed");
                }
            }
            WatchdogVerdict::Fatal(reason) => {
                error!(reason = %reason, "watchdog fatal, terminating");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_ping_failure_triggers_reconnect() {
        let mut state = WatchdogState::new();
        assert_eq!(state.observe(false, &[]), WatchdogVerdict::Reconnect);
    }

    #[test]
    fn repeated_ping_failure_is_fatal() {
        let mut state = WatchdogState::new();
        assert_eq!(state.observe(false, &[]), WatchdogVerdict::Reconnect);
        assert!(matches!(
            state.observe(false, &[]),
            WatchdogVerdict::Fatal(_)
        ));
    }

    #[test]
    fn successful_ping_resets_failure_count() {
        let mut state = WatchdogState::new();
        state.observe(false, &[]);
        assert_eq!(state.observe(true, &[]), WatchdogVerdict::Healthy);
        // Counter restarted, so one more failure only reconnects
        assert_eq!(state.observe(false, &[]), WatchdogVerdict::Reconnect);
    }

    #[test]
    fn stalled_module_is_fatal_even_when_ping_succeeds() {
        let mut state = WatchdogState::new();
        let verdict = state.observe(true, &["core".to_string()]);
        match verdict {
            WatchdogVerdict::Fatal(reason) => assert!(reason.contains("core")),
            other => panic!("expected fatal, got {other:?}"),
        }
    }

    #[test]
    fn liveness_reports_only_old_stamps() {
        let liveness = Liveness::new();
        liveness.stamp("core");
        assert!(liveness.stalled(Duration::from_secs(60)).is_empty());
        assert_eq!(liveness.stalled(Duration::ZERO).len(), 1);
    }
}
