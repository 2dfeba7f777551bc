//! Relay runners
//!
//! One runner per leg. A runner without the baton is always blocked in
//! `wait`; with it, the runner retraces calls until the leg changes or the
//! source runs dry.

use flume::{Receiver, Selector};
use tracing::debug;

use super::race::{Baton, FinishLine, RaceOutcome, RaceResult};
use crate::retrace::Dispatch;
use crate::trace::{Leg, FORERUNNER_LEG};
use crate::utils::{ReplayError, Result};

/// How a runner learns the race is over
enum FinishSignal {
    /// Forerunner: the race state comes back over this channel
    FinishLine(Receiver<FinishLine>),
    /// Workers: closed by the forerunner once the race is settled
    Shutdown(Receiver<()>),
}

enum Wake {
    Baton(Baton),
    FinishLine(FinishLine),
    Finished,
}

/// How a leg run ended
enum LegEnd {
    /// The baton went to another leg
    Handoff,
    /// The race is over, for whatever reason
    Finish(FinishLine),
}

pub(crate) struct RelayRunner {
    leg: Leg,
    baton_rx: Receiver<Baton>,
    finish: FinishSignal,
}

impl RelayRunner {
    pub(crate) fn forerunner(baton_rx: Receiver<Baton>, finish_rx: Receiver<FinishLine>) -> Self {
        Self {
            leg: FORERUNNER_LEG,
            baton_rx,
            finish: FinishSignal::FinishLine(finish_rx),
        }
    }

    pub(crate) fn worker(leg: Leg, baton_rx: Receiver<Baton>, shutdown_rx: Receiver<()>) -> Self {
        Self {
            leg,
            baton_rx,
            finish: FinishSignal::Shutdown(shutdown_rx),
        }
    }

    /// Forerunner loop, runs on the thread that started the race
    pub(crate) fn run_forerunner(self, first: Option<Baton>) -> Result<RaceResult> {
        match self.race_loop(first) {
            Some(finish) => finish.settle(),
            None => Err(ReplayError::RaceAbandoned),
        }
    }

    /// Worker loop, runs on the leg's own thread until shutdown
    pub(crate) fn run_worker(self) {
        debug!("Runner for leg {} waiting", self.leg);
        self.race_loop(None);
        debug!("Runner for leg {} finished", self.leg);
    }

    /// Run legs until the race is over
    ///
    /// Returns the finish line for the forerunner, `None` once a worker is
    /// shut down or every sender is gone.
    fn race_loop(&self, mut pending: Option<Baton>) -> Option<FinishLine> {
        loop {
            let baton = match pending.take() {
                Some(baton) => baton,
                None => match self.wait() {
                    Wake::Baton(baton) => baton,
                    Wake::FinishLine(finish) => return Some(finish),
                    Wake::Finished => return None,
                },
            };

            if let LegEnd::Finish(finish) = self.run_leg(baton) {
                match self.finish {
                    FinishSignal::FinishLine(_) => return Some(finish),
                    FinishSignal::Shutdown(_) => finish.deliver(),
                }
            }
        }
    }

    /// Block until a baton or a finish signal arrives
    ///
    /// A pending baton always wins over the finish signal.
    fn wait(&self) -> Wake {
        if let Ok(baton) = self.baton_rx.try_recv() {
            return Wake::Baton(baton);
        }

        match &self.finish {
            FinishSignal::FinishLine(finish_rx) => Selector::new()
                .recv(&self.baton_rx, |res| match res {
                    Ok(baton) => Wake::Baton(baton),
                    Err(_) => Wake::Finished,
                })
                .recv(finish_rx, |res| match res {
                    Ok(finish) => Wake::FinishLine(finish),
                    Err(_) => Wake::Finished,
                })
                .wait(),
            FinishSignal::Shutdown(shutdown_rx) => Selector::new()
                .recv(&self.baton_rx, |res| match res {
                    Ok(baton) => Wake::Baton(baton),
                    Err(_) => Wake::Finished,
                })
                .recv(shutdown_rx, |_| Wake::Finished)
                .wait(),
        }
    }

    /// Retrace consecutive calls of this leg
    fn run_leg(&self, baton: Baton) -> LegEnd {
        let Baton { mut call, mut race } = baton;
        debug_assert_eq!(call.thread_id, self.leg);

        loop {
            match race.retracer.retrace_call(&call) {
                Ok(Dispatch::Continue) => {}
                Ok(Dispatch::Terminate) => {
                    let outcome = RaceOutcome::StateDumped { call_no: call.no };
                    return LegEnd::Finish(FinishLine::new(race, Ok(outcome)));
                }
                Err(e) => return LegEnd::Finish(FinishLine::new(race, Err(e))),
            }

            call = match race.next_call() {
                Ok(Some(next)) => next,
                Ok(None) => {
                    debug!("Leg {} reached the end of the trace", self.leg);
                    return LegEnd::Finish(FinishLine::new(race, Ok(RaceOutcome::Completed)));
                }
                Err(e) => return LegEnd::Finish(FinishLine::new(race, Err(e))),
            };

            if call.thread_id != self.leg {
                if let Err(e) = race.retracer.flush_pending_work() {
                    return LegEnd::Finish(FinishLine::new(race, Err(e)));
                }
                return match race.pass_baton(call) {
                    Ok(()) => LegEnd::Handoff,
                    Err(finish) => LegEnd::Finish(finish),
                };
            }
        }
    }
}
