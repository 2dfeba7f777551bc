//! Relay race
//!
//! The race owns the call source, the retracer and the runner map. It does
//! not live anywhere fixed: it travels inside the baton, so whichever runner
//! holds the baton has exclusive access to all of it and no lock is needed
//! on the runner map.
//!
//! Shutdown is two-phase. The runner that reads end-of-stream sends the race
//! back to the forerunner over the finish line; the forerunner then closes
//! the shutdown channel and joins every worker.

use std::collections::BTreeMap;
use std::fmt;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender};
use tracing::{debug, warn};

use super::runner::RelayRunner;
use crate::retrace::Retracer;
use crate::trace::{Call, CallSource, Leg, FORERUNNER_LEG};
use crate::utils::{ReplayError, Result};

/// The next call to execute, together with the race it belongs to
pub struct Baton {
    pub(crate) call: Call,
    pub(crate) race: Box<RelayRace>,
}

/// The race handed back to the forerunner once it is over
pub struct FinishLine {
    pub(crate) race: Box<RelayRace>,
    pub(crate) outcome: Result<RaceOutcome>,
}

impl FinishLine {
    pub(crate) fn new(race: Box<RelayRace>, outcome: Result<RaceOutcome>) -> Self {
        Self { race, outcome }
    }

    /// Hand the race to the forerunner
    pub(crate) fn deliver(self) {
        let finish_tx = self.race.finish_tx.clone();
        if finish_tx.send(self).is_err() {
            warn!("Forerunner is gone, race result dropped");
        }
    }

    /// Stop every runner, then surface the outcome
    pub(crate) fn settle(self) -> Result<RaceResult> {
        let FinishLine { mut race, outcome } = self;
        race.stop_runners();
        let outcome = outcome?;
        Ok(race.into_result(outcome))
    }
}

/// How a race ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOutcome {
    /// Every call was retraced
    Completed,
    /// State was dumped at this call and the replay should stop
    StateDumped { call_no: u32 },
}

/// Everything a finished race hands back
pub struct RaceResult {
    pub outcome: RaceOutcome,
    /// The retracer, with its state, for the next race
    pub retracer: Retracer,
    /// Legs that got a runner, in ascending order
    pub legs: Vec<Leg>,
    /// Worker threads joined at the end of the race
    pub workers_stopped: usize,
}

impl fmt::Debug for RaceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaceResult")
            .field("outcome", &self.outcome)
            .field("legs", &self.legs)
            .field("workers_stopped", &self.workers_stopped)
            .finish_non_exhaustive()
    }
}

struct RunnerSlot {
    baton_tx: Sender<Baton>,
    /// `None` for the forerunner, which runs on the calling thread
    worker: Option<JoinHandle<()>>,
}

/// Replays one call source across per-leg runners
pub struct RelayRace {
    source: Box<dyn CallSource>,
    pub(crate) retracer: Retracer,
    runners: BTreeMap<Leg, RunnerSlot>,
    finish_tx: Sender<FinishLine>,
    shutdown_tx: Option<Sender<()>>,
    shutdown_rx: Receiver<()>,
    forerunner: Option<RelayRunner>,
    workers_stopped: usize,
}

impl RelayRace {
    /// Create a race with only the forerunner
    pub fn new(source: impl CallSource + 'static, retracer: Retracer) -> Self {
        let (baton_tx, baton_rx) = flume::bounded(1);
        let (finish_tx, finish_rx) = flume::bounded(1);
        let (shutdown_tx, shutdown_rx) = flume::bounded(0);

        let mut runners = BTreeMap::new();
        runners.insert(
            FORERUNNER_LEG,
            RunnerSlot {
                baton_tx,
                worker: None,
            },
        );

        Self {
            source: Box::new(source),
            retracer,
            runners,
            finish_tx,
            shutdown_tx: Some(shutdown_tx),
            shutdown_rx,
            forerunner: Some(RelayRunner::forerunner(baton_rx, finish_rx)),
            workers_stopped: 0,
        }
    }

    /// Run the race to the end on the calling thread
    pub fn run(self) -> Result<RaceResult> {
        let mut race = Box::new(self);
        let forerunner = race
            .forerunner
            .take()
            .ok_or(ReplayError::RaceAbandoned)?;
        race.retracer.begin_race();

        let first = match race.next_call() {
            Ok(Some(call)) => call,
            Ok(None) => {
                debug!("Empty trace");
                return FinishLine::new(race, Ok(RaceOutcome::Completed)).settle();
            }
            Err(e) => return FinishLine::new(race, Err(e)).settle(),
        };

        if first.thread_id == FORERUNNER_LEG {
            forerunner.run_forerunner(Some(Baton { call: first, race }))
        } else {
            if let Err(finish) = race.pass_baton(first) {
                return finish.settle();
            }
            forerunner.run_forerunner(None)
        }
    }

    /// Hand `call` to the runner of its leg, creating it on first use
    ///
    /// On failure the race comes back as a finish line carrying the error.
    pub(crate) fn pass_baton(
        mut self: Box<Self>,
        call: Call,
    ) -> std::result::Result<(), FinishLine> {
        let leg = call.thread_id;
        let baton_tx = match self.runner(leg) {
            Ok(tx) => tx,
            Err(e) => return Err(FinishLine::new(self, Err(e))),
        };

        debug!("Baton at call {} passes to leg {}", call.no, leg);
        baton_tx
            .send(Baton { call, race: self })
            .map_err(|flume::SendError(baton)| {
                FinishLine::new(baton.race, Err(ReplayError::BatonDropped { leg }))
            })
    }

    /// Baton sender for `leg`, spawning its worker if the leg is new
    fn runner(&mut self, leg: Leg) -> Result<Sender<Baton>> {
        if let Some(slot) = self.runners.get(&leg) {
            return Ok(slot.baton_tx.clone());
        }

        let (baton_tx, baton_rx) = flume::bounded(1);
        let runner = RelayRunner::worker(leg, baton_rx, self.shutdown_rx.clone());
        let worker = thread::Builder::new()
            .name(format!("leg-{}", leg))
            .spawn(move || runner.run_worker())
            .map_err(|source| ReplayError::Spawn { leg, source })?;
        debug!("Spawned runner for leg {}", leg);

        self.runners.insert(
            leg,
            RunnerSlot {
                baton_tx: baton_tx.clone(),
                worker: Some(worker),
            },
        );
        Ok(baton_tx)
    }

    pub(crate) fn next_call(&mut self) -> Result<Option<Call>> {
        Ok(self.source.next_call()?)
    }

    /// Signal every worker to finish and wait for them
    ///
    /// Closing the shutdown channel wakes all waiting workers at once.
    /// Calling this again is a no-op.
    fn stop_runners(&mut self) {
        if self.shutdown_tx.take().is_some() {
            debug!("Stopping {} runners", self.runners.len() - 1);
        }
        for (leg, slot) in self.runners.iter_mut() {
            if let Some(worker) = slot.worker.take() {
                match worker.join() {
                    Ok(()) => {
                        self.workers_stopped += 1;
                        debug!("Runner for leg {} stopped", leg);
                    }
                    Err(_) => warn!("Runner for leg {} panicked", leg),
                }
            }
        }
    }

    fn into_result(self: Box<Self>, outcome: RaceOutcome) -> RaceResult {
        let race = *self;
        RaceResult {
            outcome,
            retracer: race.retracer,
            legs: race.runners.keys().copied().collect(),
            workers_stopped: race.workers_stopped,
        }
    }
}
