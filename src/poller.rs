//! Poll-and-Publish Cycle
//!
//! [`Poller`] ties a bus [`Connector`], the [`RegisterMap`] and the
//! [`MetricsCollector`] together and runs one cycle per trigger.
//!
//! # Triggering
//!
//! - **On demand** ([`Poller::collect_on_demand`]): a fresh session per
//!   cycle, closed before returning.
//! - **Background** ([`Poller::run`]): a long-lived session polled on a fixed
//!   interval. A read failure drops the session; the next tick reconnects.
//!
//! Both paths go through one async mutex, so at most one session is open
//! against the meter at any time and overlapping scrapes queue up.
//!
//! # Failure Handling
//!
//! A failed cycle publishes nothing. It sets `up` to 0, bumps the failure
//! counter and returns the error; previously published values stay exposed.
//! There is no retry within a cycle.

use crate::bus::{BusSession, Connector};
use crate::error::Result;
use crate::meter::{self, MetricSnapshot};
use crate::metrics::MetricsCollector;
use crate::registers::RegisterMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

pub struct Poller<C: Connector> {
    connector: C,
    registers: RegisterMap,
    metrics: MetricsCollector,
    session: Mutex<Option<C::Session>>,
}

impl<C: Connector> Poller<C> {
    pub fn new(connector: C, registers: RegisterMap, metrics: MetricsCollector) -> Self {
        Self {
            connector,
            registers,
            metrics,
            session: Mutex::new(None),
        }
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn registers(&self) -> &RegisterMap {
        &self.registers
    }

    /// Open the long-lived session used by background polling.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.session.lock().await;
        if let Some(old) = guard.take() {
            old.close().await;
        }
        *guard = Some(self.connector.connect().await?);
        Ok(())
    }

    /// Whether a long-lived session is currently held
    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Run one cycle over a session opened just for it.
    pub async fn collect_on_demand(&self) -> Result<MetricSnapshot> {
        let _guard = self.session.lock().await;

        let mut session = match self.connector.connect().await {
            Ok(session) => session,
            Err(e) => return self.finish(Err(e)),
        };

        let outcome = meter::poll(&mut session, &self.registers).await;
        session.close().await;

        self.finish(outcome)
    }

    /// Run one cycle over the long-lived session, reconnecting if needed.
    pub async fn collect_background(&self) -> Result<MetricSnapshot> {
        let mut guard = self.session.lock().await;

        let mut session = match guard.take() {
            Some(session) => session,
            None => {
                info!("Reconnecting to power meter");
                match self.connector.connect().await {
                    Ok(session) => session,
                    Err(e) => return self.finish(Err(e)),
                }
            }
        };

        let outcome = meter::poll(&mut session, &self.registers).await;
        if outcome.is_ok() {
            *guard = Some(session);
        } else {
            debug!("Dropping Modbus session after failed poll");
            session.close().await;
        }

        self.finish(outcome)
    }

    /// Poll on a fixed interval until the task is dropped.
    pub async fn run(self: Arc<Self>, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Polling power meter every {:?}", period);

        loop {
            ticker.tick().await;

            match self.collect_background().await {
                Ok(snapshot) => info!("Collected {} readings from power meter", snapshot.len()),
                Err(e) => error!("Failed to collect metrics: {}", e),
            }
        }
    }

    fn finish(&self, outcome: Result<MetricSnapshot>) -> Result<MetricSnapshot> {
        match outcome {
            Ok(snapshot) => {
                self.metrics.publish(&snapshot);
                debug!("Published {} readings", snapshot.len());
                Ok(snapshot)
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }
}
