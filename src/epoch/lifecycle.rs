//! Epoch state machine.
//!
//! ```text
//! Open --submit--> InSubmission --execute--> InExecution --close--> Closed
//!                                                                     |
//!                      Open (epoch_id + 1) <---------next-------------+
//! ```
//!
//! Every transition consumes nothing and returns a new [`Epoch`]; the input
//! snapshot is left untouched. Times are unix seconds supplied by the caller.

use tracing::{debug, info};

use crate::error::ClearingError;
use crate::types::{Epoch, EpochSolution, EpochState, EpochTiming, TrancheOrders};

/// Earliest time `epoch` may be closed.
pub fn closable_at(epoch: &Epoch, timing: &EpochTiming) -> u64 {
    epoch.started_at.saturating_add(timing.min_epoch_duration)
}

/// An epoch can close once it is open and has run for the minimum duration.
pub fn can_close_epoch(epoch: &Epoch, timing: &EpochTiming, now: u64) -> bool {
    epoch.state == EpochState::Open && now >= closable_at(epoch, timing)
}

fn transition_error(epoch: &Epoch, to: EpochState, reason: impl Into<String>) -> ClearingError {
    ClearingError::InvalidTransition {
        from: epoch.state,
        to,
        reason: reason.into(),
    }
}

impl Epoch {
    /// Close order intake and move to `InSubmission`.
    ///
    /// # Errors
    ///
    /// * [`ClearingError::InvalidTransition`] - epoch is not `Open`
    /// * [`ClearingError::EpochNotClosable`] - minimum duration not elapsed
    pub fn submit(&self, timing: &EpochTiming, now: u64) -> Result<Epoch, ClearingError> {
        if self.state != EpochState::Open {
            return Err(transition_error(self, EpochState::InSubmission, "epoch is not open"));
        }
        if !can_close_epoch(self, timing, now) {
            return Err(ClearingError::EpochNotClosable {
                epoch_id: self.epoch_id,
                closable_at: closable_at(self, timing),
                now,
            });
        }
        debug!(pool_id = self.pool_id, epoch_id = self.epoch_id, now, "epoch submitted");
        Ok(Epoch {
            state: EpochState::InSubmission,
            submitted_at: Some(now),
            ..self.clone()
        })
    }

    /// Attach a computed solution and the order summaries it was built from.
    ///
    /// Re-submitting during `InSubmission` replaces the previous solution.
    pub fn with_solution(
        &self,
        solution: EpochSolution,
        summaries: Vec<TrancheOrders>,
    ) -> Result<Epoch, ClearingError> {
        if self.state != EpochState::InSubmission {
            return Err(transition_error(
                self,
                EpochState::InSubmission,
                "solutions are only accepted during submission",
            ));
        }
        if solution.pool_id != self.pool_id || solution.epoch_id != self.epoch_id {
            return Err(transition_error(
                self,
                EpochState::InSubmission,
                format!(
                    "solution is for pool {} epoch {}",
                    solution.pool_id, solution.epoch_id
                ),
            ));
        }
        Ok(Epoch {
            summaries,
            solution: Some(solution),
            ..self.clone()
        })
    }

    /// Start executing the attached solution after the challenge period.
    pub fn execute(&self, timing: &EpochTiming, now: u64) -> Result<Epoch, ClearingError> {
        let to = EpochState::InExecution;
        if self.state != EpochState::InSubmission {
            return Err(transition_error(self, to, "epoch is not in submission"));
        }
        match &self.solution {
            None => return Err(transition_error(self, to, "no solution submitted")),
            Some(s) if !s.is_feasible => {
                return Err(transition_error(self, to, "submitted solution is infeasible"))
            }
            Some(_) => {}
        }
        let submitted_at = self.submitted_at.unwrap_or(self.started_at);
        let challenge_end = submitted_at.saturating_add(timing.challenge_period);
        if now < challenge_end {
            return Err(transition_error(
                self,
                to,
                format!("challenge period ends at {challenge_end}"),
            ));
        }
        Ok(Epoch {
            state: to,
            ..self.clone()
        })
    }

    pub fn close(&self) -> Result<Epoch, ClearingError> {
        if self.state != EpochState::InExecution {
            return Err(transition_error(self, EpochState::Closed, "epoch is not executing"));
        }
        info!(pool_id = self.pool_id, epoch_id = self.epoch_id, "epoch closed");
        Ok(Epoch {
            state: EpochState::Closed,
            ..self.clone()
        })
    }

    /// The epoch that follows a closed one.
    pub fn next(&self, now: u64) -> Result<Epoch, ClearingError> {
        if self.state != EpochState::Closed {
            return Err(transition_error(self, EpochState::Open, "epoch is not closed"));
        }
        Ok(Epoch::open(self.pool_id, self.epoch_id + 1, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Ratio;

    const DAY: u64 = 86_400;

    fn timing() -> EpochTiming {
        EpochTiming::default()
    }

    fn solution(feasible: bool) -> EpochSolution {
        EpochSolution {
            pool_id: 1,
            epoch_id: 7,
            allocations: vec![],
            is_feasible: feasible,
            score: Ratio::ONE,
            violations: vec![],
            fills: vec![],
        }
    }

    #[test]
    fn test_can_close_epoch() {
        let e = Epoch::open(1, 7, 1_000);
        assert!(!can_close_epoch(&e, &timing(), 1_000));
        assert!(!can_close_epoch(&e, &timing(), 1_000 + DAY - 1));
        assert!(can_close_epoch(&e, &timing(), 1_000 + DAY));

        let submitted = e.submit(&timing(), 1_000 + DAY).unwrap();
        assert!(!can_close_epoch(&submitted, &timing(), u64::MAX));
    }

    #[test]
    fn test_submit_too_early() {
        let e = Epoch::open(1, 7, 1_000);
        let err = e.submit(&timing(), 2_000).unwrap_err();
        assert_eq!(
            err,
            ClearingError::EpochNotClosable {
                epoch_id: 7,
                closable_at: 1_000 + DAY,
                now: 2_000,
            }
        );
    }

    #[test]
    fn test_full_cycle() {
        let t = timing();
        let e = Epoch::open(1, 7, 0);
        let e = e.submit(&t, DAY).unwrap();
        assert_eq!(e.state, EpochState::InSubmission);
        assert_eq!(e.submitted_at, Some(DAY));

        let e = e.with_solution(solution(true), vec![]).unwrap();
        assert!(e.execute(&t, DAY + 10).is_err());
        let e = e.execute(&t, DAY + t.challenge_period).unwrap();
        assert_eq!(e.state, EpochState::InExecution);

        let e = e.close().unwrap();
        assert_eq!(e.state, EpochState::Closed);

        let next = e.next(DAY * 2).unwrap();
        assert_eq!(next.epoch_id, 8);
        assert!(next.is_open());
        assert!(next.solution.is_none());
    }

    #[test]
    fn test_execute_requires_feasible_solution() {
        let t = timing();
        let e = Epoch::open(1, 7, 0).submit(&t, DAY).unwrap();
        assert!(matches!(
            e.execute(&t, u64::MAX),
            Err(ClearingError::InvalidTransition { .. })
        ));
        let e = e.with_solution(solution(false), vec![]).unwrap();
        assert!(e.execute(&t, u64::MAX).is_err());
    }

    #[test]
    fn test_with_solution_rejects_mismatched_epoch() {
        let t = timing();
        let e = Epoch::open(1, 8, 0).submit(&t, DAY).unwrap();
        assert!(e.with_solution(solution(true), vec![]).is_err());
    }

    #[test]
    fn test_illegal_transitions() {
        let open = Epoch::open(1, 7, 0);
        assert!(open.close().is_err());
        assert!(open.next(0).is_err());
        assert!(open.with_solution(solution(true), vec![]).is_err());
        assert!(open.execute(&timing(), u64::MAX).is_err());
    }

    #[test]
    fn test_transitions_leave_input_untouched() {
        let e = Epoch::open(1, 7, 0);
        let _ = e.submit(&timing(), DAY).unwrap();
        assert_eq!(e.state, EpochState::Open);
        assert_eq!(e.submitted_at, None);
    }
}
