//! Caller-owned risk session
//!
//! Holds the rolling state for one backtest run or trading session and
//! feeds it into the stateless breaker and anomaly checks. Sessions share
//! nothing; run one per independent simulation.

use super::{
    check_anomalies, check_circuit_breaker, AnomalyDecision, CircuitBreakerConfig,
    CircuitBreakerDecision, ExecutionSample, HaltReason, MetricsWindow, RiskError, RiskFramework,
    RollingRiskState,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, VecDeque};

const METRICS_CAPACITY: usize = 200;
const METRICS_RECENT: usize = 10;

/// Rolling risk state for one venue
#[derive(Debug, Clone)]
pub struct RiskSession {
    framework: RiskFramework,
    venue: String,
    breakers: CircuitBreakerConfig,
    state: RollingRiskState,
    exposures: BTreeMap<String, Decimal>,
    trade_times: VecDeque<DateTime<Utc>>,
    day: NaiveDate,
    metrics: MetricsWindow,
    tripped: Option<HaltReason>,
}

impl RiskSession {
    pub fn new(
        framework: RiskFramework,
        venue: impl Into<String>,
        initial_equity: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        let venue = venue.into();
        let breakers = framework.breakers_for(&venue);
        Self {
            framework,
            venue,
            breakers,
            state: RollingRiskState::new(initial_equity),
            exposures: BTreeMap::new(),
            trade_times: VecDeque::new(),
            day: now.date_naive(),
            metrics: MetricsWindow::new(METRICS_CAPACITY, METRICS_RECENT),
            tripped: None,
        }
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn state(&self) -> &RollingRiskState {
        &self.state
    }

    /// The latched halt, if any
    pub fn tripped(&self) -> Option<&HaltReason> {
        self.tripped.as_ref()
    }

    pub fn exposure(&self, strategy: &str) -> Decimal {
        self.exposures.get(strategy).copied().unwrap_or(dec!(0))
    }

    /// Roll the day at UTC midnight and expire hourly trade timestamps
    fn advance(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today > self.day {
            tracing::debug!(venue = %self.venue, day = %today, "risk session rolled to new day");
            self.state.reset_daily();
            self.day = today;
        }

        let cutoff = now - Duration::hours(1);
        while let Some(ts) = self.trade_times.front() {
            if *ts <= cutoff {
                self.trade_times.pop_front();
            } else {
                break;
            }
        }
        self.state.trades_last_hour = u32::try_from(self.trade_times.len()).unwrap_or(u32::MAX);
    }

    fn snapshot(&self, strategy: &str) -> RollingRiskState {
        RollingRiskState {
            strategy_exposure: self.exposure(strategy),
            ..self.state.clone()
        }
    }

    /// Evaluate the breaker for a prospective trade
    ///
    /// Loss-driven halts latch and keep blocking until [`RiskSession::reset`].
    pub fn check_circuit_breaker(&mut self, strategy: &str, now: DateTime<Utc>) -> CircuitBreakerDecision {
        self.advance(now);
        if let Some(reason) = &self.tripped {
            return CircuitBreakerDecision::halt(reason.clone());
        }

        let decision = check_circuit_breaker(&self.breakers, &self.snapshot(strategy));
        if let Some(reason) = &decision.reason {
            if reason.is_latching() {
                tracing::warn!(venue = %self.venue, ?reason, "circuit breaker tripped");
                self.tripped = Some(reason.clone());
            } else {
                tracing::debug!(venue = %self.venue, strategy, ?reason, "trade throttled");
            }
        }
        decision
    }

    /// Compare recent executions with the session's baseline
    pub fn check_anomalies(&self) -> AnomalyDecision {
        match &self.framework.anomaly {
            Some(config) => check_anomalies(config, &self.metrics.rolling_metrics()),
            None => AnomalyDecision::clear(),
        }
    }

    /// Run both checks and open the position if they pass
    pub fn try_open(
        &mut self,
        strategy: &str,
        notional: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), RiskError> {
        let decision = self.check_circuit_breaker(strategy, now);
        if let Some(reason) = decision.reason {
            return Err(RiskError::TradingHalted(reason));
        }
        let anomaly = self.check_anomalies();
        if let Some(kind) = anomaly.kind {
            tracing::warn!(venue = %self.venue, ?kind, observed = ?anomaly.observed, "execution anomaly");
            return Err(RiskError::Anomaly(kind));
        }
        self.open_position(strategy, notional, now);
        Ok(())
    }

    /// Record an opened position without checking limits
    pub fn open_position(&mut self, strategy: &str, notional: Decimal, now: DateTime<Utc>) {
        self.advance(now);
        *self.exposures.entry(strategy.to_string()).or_insert(dec!(0)) += notional;
        self.state.total_exposure += notional;
        self.trade_times.push_back(now);
        self.state.trades_last_hour = self.state.trades_last_hour.saturating_add(1);
        self.state.trades_today = self.state.trades_today.saturating_add(1);
    }

    /// Release exposure and book the trade's PnL
    pub fn close_position(
        &mut self,
        strategy: &str,
        notional: Decimal,
        pnl: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), RiskError> {
        self.advance(now);
        let open = self.exposure(strategy);
        if notional > open {
            return Err(RiskError::ExposureUnderflow {
                strategy: strategy.to_string(),
                open,
                requested: notional,
            });
        }
        let remaining = open - notional;
        if remaining.is_zero() {
            self.exposures.remove(strategy);
        } else {
            self.exposures.insert(strategy.to_string(), remaining);
        }
        self.state.total_exposure -= notional;
        self.state.record_pnl(pnl);
        Ok(())
    }

    /// Feed one execution into the anomaly window
    pub fn record_execution(&mut self, sample: ExecutionSample) {
        self.metrics.push(sample);
    }

    /// Clear the latch and loss streak, rebasing peak and daily equity on
    /// the current value. Open exposure and trade history are kept.
    pub fn reset(&mut self) {
        tracing::info!(venue = %self.venue, tripped = ?self.tripped, "risk session reset");
        self.tripped = None;
        self.state.consecutive_losses = 0;
        self.state.peak_equity = self.state.current_equity;
        self.state.daily_start_equity = self.state.current_equity;
        self.metrics.clear();
    }
}
