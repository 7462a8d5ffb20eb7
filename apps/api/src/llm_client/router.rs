//! Provider Router: ordered failover with a per-provider circuit breaker.
//!
//! Providers are tried in declared priority order; the first success wins.
//! A provider that fails `FAILURE_THRESHOLD` times in a row is skipped for
//! `CIRCUIT_COOLDOWN`.
//!
//! Counter reset: a success resets the provider's failure count. The cooldown
//! expiring does not. Once the cooldown has passed the circuit is half-open:
//! exactly one caller at a time is admitted as a trial, everyone else keeps
//! skipping the provider, and one more failure re-opens it straight away.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::llm_client::retry::{ResilientProvider, RetryPolicy};
use crate::llm_client::{ProviderError, TextProvider};

pub const FAILURE_THRESHOLD: u32 = 3;
pub const CIRCUIT_COOLDOWN: Duration = Duration::from_secs(120);

/// The last concrete failure seen while routing, with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error(
        "All providers failed: {}",
        .last_failure
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "no provider available (all circuits open)".to_string())
    )]
    AllProvidersFailed { last_failure: Option<ProviderFailure> },
}

/// Per-provider breaker record.
#[derive(Debug, Default)]
struct CircuitState {
    consecutive_failures: u32,
    open_until: Option<Instant>,
    /// A half-open trial call is in flight.
    trial_in_flight: bool,
}

/// Point-in-time view of one provider's breaker, for `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub consecutive_failures: u32,
    pub circuit_open: bool,
    pub reopens_in_secs: Option<u64>,
}

struct RoutedProvider {
    provider: ResilientProvider,
    circuit: Mutex<CircuitState>,
}

impl RoutedProvider {
    fn circuit(&self) -> MutexGuard<'_, CircuitState> {
        self.circuit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides whether a call may reach this provider. The half-open trial is
    /// reserved in the same critical section that checks the window.
    fn admit(&self, now: Instant) -> Option<Admission<'_>> {
        let mut circuit = self.circuit();
        match circuit.open_until {
            Some(until) if now < until => None,
            Some(_) if circuit.consecutive_failures >= FAILURE_THRESHOLD => {
                if circuit.trial_in_flight {
                    return None;
                }
                circuit.trial_in_flight = true;
                Some(Admission { trial: Some(self) })
            }
            _ => Some(Admission { trial: None }),
        }
    }

    /// Increments the failure count and trips the breaker in one critical section.
    fn record_failure(&self, now: Instant) -> u32 {
        let mut circuit = self.circuit();
        circuit.consecutive_failures += 1;
        if circuit.consecutive_failures >= FAILURE_THRESHOLD {
            let until = now + CIRCUIT_COOLDOWN;
            if circuit.open_until.map_or(true, |current| until > current) {
                circuit.open_until = Some(until);
            }
            warn!(
                "Circuit opened for provider '{}' after {} consecutive failures (cooldown {}s)",
                self.provider.name(),
                circuit.consecutive_failures,
                CIRCUIT_COOLDOWN.as_secs()
            );
        }
        circuit.consecutive_failures
    }

    fn record_success(&self) {
        let mut circuit = self.circuit();
        if circuit.consecutive_failures > 0 {
            info!(
                "Provider '{}' recovered after {} failures",
                self.provider.name(),
                circuit.consecutive_failures
            );
        }
        circuit.consecutive_failures = 0;
    }

    fn health(&self, now: Instant) -> ProviderHealth {
        let circuit = self.circuit();
        let remaining = circuit
            .open_until
            .filter(|until| *until > now)
            .map(|until| until - now);
        ProviderHealth {
            name: self.provider.name().to_string(),
            consecutive_failures: circuit.consecutive_failures,
            circuit_open: remaining.is_some(),
            reopens_in_secs: remaining.map(|d| d.as_secs()),
        }
    }
}

/// Permission for one call. Releases a half-open trial when dropped, so a
/// cancelled trial does not keep the provider shut.
struct Admission<'a> {
    trial: Option<&'a RoutedProvider>,
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.trial {
            entry.circuit().trial_in_flight = false;
        }
    }
}

/// Shared across all sessions. Construct once and hand out behind an `Arc`.
pub struct ProviderRouter {
    providers: Vec<RoutedProvider>,
}

impl ProviderRouter {
    /// Wraps each provider in a `ResilientProvider` using `policy`.
    /// Order of `providers` is the failover priority.
    pub fn new(providers: Vec<Arc<dyn TextProvider>>, policy: RetryPolicy) -> Self {
        Self {
            providers: providers
                .into_iter()
                .map(|provider| RoutedProvider {
                    provider: ResilientProvider::new(provider, policy),
                    circuit: Mutex::new(CircuitState::default()),
                })
                .collect(),
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider.name()).collect()
    }

    /// Routes one generation request.
    ///
    /// Breaker bookkeeping happens only after a provider call has returned. If the
    /// caller drops this future mid-call, nothing is recorded for that provider.
    pub async fn generate(&self, prompt: &str) -> Result<String, RouterError> {
        let mut last_failure: Option<ProviderFailure> = None;

        for entry in &self.providers {
            let name = entry.provider.name();
            let Some(_admission) = entry.admit(Instant::now()) else {
                debug!("Skipping provider '{name}': circuit open");
                continue;
            };

            match entry.provider.generate(prompt).await {
                Ok(text) => {
                    entry.record_success();
                    debug!("Provider '{name}' returned {} chars", text.len());
                    return Ok(text);
                }
                Err(error) => {
                    let failures = entry.record_failure(Instant::now());
                    warn!("Provider '{name}' failed ({failures} consecutive): {error}");
                    last_failure = Some(ProviderFailure {
                        provider: name.to_string(),
                        error,
                    });
                }
            }
        }

        Err(RouterError::AllProvidersFailed { last_failure })
    }

    pub fn health(&self) -> Vec<ProviderHealth> {
        let now = Instant::now();
        self.providers.iter().map(|p| p.health(now)).collect()
    }
}
