// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Timer-driven reconciliation loop.
//!
//! The loop runs a tick, then waits on a [`Ticker`] until the next one. Time is
//! behind the [`Ticker`] trait so the loop can be driven without real sleeps.
//!
//! Shutdown is observed only between ticks: a tick that has started always runs
//! to completion, so no zone is left with a half-applied mutation batch. Startup
//! only reads from the provider and is abandoned as soon as shutdown arrives.

use crate::errors::SyncError;
use crate::reconcilers::Reconciler;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Waits until the next tick is due.
#[async_trait]
pub trait Ticker: Send {
    async fn wait(&mut self);
}

/// Sleeps a fixed interval after every tick.
#[derive(Debug, Clone)]
pub struct IntervalTicker {
    interval: Duration,
}

impl IntervalTicker {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn wait(&mut self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Run ticks until `shutdown` changes or its sender is dropped.
///
/// Returns the number of ticks that ran.
pub async fn run_loop(
    reconciler: &mut Reconciler,
    ticker: &mut dyn Ticker,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticks = 0;

    loop {
        if *shutdown.borrow_and_update() {
            break;
        }

        reconciler.run_tick().await;
        ticks += 1;

        tokio::select! {
            () = ticker.wait() => {}
            _ = shutdown.changed() => {
                debug!("Shutdown requested while waiting for the next tick");
                break;
            }
        }
    }

    info!(ticks, "Reconciliation loop stopped");
    ticks
}

/// Run the startup phase, then the loop, honouring `shutdown` during both.
///
/// Returns `Ok(0)` without ticking when shutdown arrives before startup
/// finishes. Startup errors are returned as-is.
pub async fn run_with_startup(
    reconciler: &mut Reconciler,
    ticker: &mut dyn Ticker,
    mut shutdown: watch::Receiver<bool>,
) -> Result<u64, SyncError> {
    if *shutdown.borrow_and_update() {
        info!("Shutdown requested before startup");
        return Ok(0);
    }

    tokio::select! {
        result = reconciler.startup() => result?,
        _ = shutdown.changed() => {
            info!("Shutdown requested during startup");
            return Ok(0);
        }
    }

    Ok(run_loop(reconciler, ticker, shutdown).await)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod scheduler_tests;
