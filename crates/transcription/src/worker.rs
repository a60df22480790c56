//! Running solves off the caller's thread: wall-clock bounded single solves and parallel batches.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use descent_nlp::{CancelToken, NlpSolver, SqpSolver};
use log::{debug, warn};

use crate::problem::TrajectoryProblem;
use crate::request::{DescentError, solve_problem_with};
use crate::solution::Solution;
use crate::solver::{SolverAdapter, SolverOptions};

/// Extra time a worker gets past its wall-clock limit to hand back its last iterate.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// [`solve_with_timeout_using`] with the bundled backend.
pub fn solve_with_timeout(
    problem: TrajectoryProblem,
    options: SolverOptions,
    timeout: Duration,
) -> Result<Solution, DescentError> {
    solve_with_timeout_using(SolverAdapter::<SqpSolver>::new(), problem, options, timeout)
}

/// Solves on a dedicated thread with a wall-clock limit and a cancellation token installed.
///
/// A solve that honours the limit comes back as an iteration-limit [`Solution`]; one that does
/// not report within `timeout` plus [`GRACE_PERIOD`] is cancelled and abandoned with
/// [`DescentError::TimedOut`].
pub fn solve_with_timeout_using<S>(
    adapter: SolverAdapter<S>,
    problem: TrajectoryProblem,
    mut options: SolverOptions,
    timeout: Duration,
) -> Result<Solution, DescentError>
where
    S: NlpSolver + 'static,
{
    options.time_limit = Some(options.time_limit.map_or(timeout, |t| t.min(timeout)));
    let token = options.cancel.get_or_insert_with(CancelToken::new).clone();

    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let result = solve_problem_with(&adapter, &problem, &options);
        // The receiver is gone only after a timeout; nobody is waiting for this result.
        let _ = tx.send(result);
    });

    match rx.recv_timeout(timeout + GRACE_PERIOD) {
        Ok(result) => {
            if handle.join().is_err() {
                warn!("solver thread panicked after reporting its result");
            }
            result
        }
        Err(RecvTimeoutError::Timeout) => {
            warn!("solver did not return within {timeout:?}; cancelling");
            token.cancel();
            Err(DescentError::TimedOut(timeout))
        }
        Err(RecvTimeoutError::Disconnected) => match handle.join() {
            Err(payload) => panic::resume_unwind(payload),
            Ok(()) => Err(DescentError::TimedOut(timeout)),
        },
    }
}

/// [`solve_batch_using`] with the bundled backend.
pub fn solve_batch(
    problems: &[TrajectoryProblem],
    options: &SolverOptions,
    workers: usize,
) -> Vec<Result<Solution, DescentError>> {
    solve_batch_using(&SolverAdapter::<SqpSolver>::new(), problems, options, workers)
}

/// Solves independent problems on up to `workers` threads. Results keep the input order.
pub fn solve_batch_using<S: NlpSolver>(
    adapter: &SolverAdapter<S>,
    problems: &[TrajectoryProblem],
    options: &SolverOptions,
    workers: usize,
) -> Vec<Result<Solution, DescentError>> {
    let workers = workers.clamp(1, problems.len().max(1));
    let next = &AtomicUsize::new(0);
    debug!("solving {} problems on {workers} workers", problems.len());

    let mut indexed: Vec<(usize, Result<Solution, DescentError>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some(problem) = problems.get(i) else {
                            break;
                        };
                        done.push((i, solve_problem_with(adapter, problem, options)));
                    }
                    done
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    });
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use descent_dynamics::State;
    use descent_nlp::{NlpError, NlpOutcome, NlpProblem, SolveOptions, TerminationReason};
    use descent_vehicle::RocketParameters;

    use super::*;
    use crate::solver::{LimitKind, SolverStatus};

    /// Returns the starting point after `delay`, or at the time limit when `honours_limit`.
    #[derive(Debug, Clone)]
    struct Sleepy {
        delay: Duration,
        honours_limit: bool,
    }

    impl NlpSolver for Sleepy {
        fn solve(
            &self,
            problem: &dyn NlpProblem,
            options: &SolveOptions,
        ) -> Result<NlpOutcome, NlpError> {
            let start = Instant::now();
            let mut reason = TerminationReason::Converged;
            while start.elapsed() < self.delay {
                if self.honours_limit
                    && options.time_limit.is_some_and(|t| start.elapsed() >= t)
                {
                    reason = TerminationReason::TimeLimit;
                    break;
                }
                thread::sleep(Duration::from_millis(5));
            }
            let mut x = vec![0.0; problem.num_variables()];
            problem.initial_point(&mut x);
            Ok(NlpOutcome {
                reason,
                objective: problem.objective(&x),
                x,
                lambda: vec![0.0; problem.num_constraints()],
                constraints: vec![0.0; problem.num_constraints()],
                max_violation: 0.0,
                dual_infeasibility: 0.0,
                iterations: 1,
                elapsed: start.elapsed(),
            })
        }
    }

    fn problem(y: f64) -> TrajectoryProblem {
        TrajectoryProblem::new(
            RocketParameters::default(),
            State {
                y,
                mass: 28_000.0,
                ..State::default()
            },
            3,
            0.5,
        )
    }

    #[test]
    fn wall_clock_limit_reports_iteration_limit() {
        let adapter = SolverAdapter::with_backend(Sleepy {
            delay: Duration::from_secs(30),
            honours_limit: true,
        });
        let solution = solve_with_timeout_using(
            adapter,
            problem(100.0),
            SolverOptions::default(),
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(solution.status, SolverStatus::IterationLimitReached);
        assert_eq!(solution.limit, Some(LimitKind::WallClock));
    }

    #[test]
    fn unresponsive_worker_times_out() {
        let adapter = SolverAdapter::with_backend(Sleepy {
            delay: GRACE_PERIOD + Duration::from_secs(2),
            honours_limit: false,
        });
        let err = solve_with_timeout_using(
            adapter,
            problem(100.0),
            SolverOptions::default(),
            Duration::from_millis(10),
        )
        .unwrap_err();
        assert!(matches!(err, DescentError::TimedOut(_)));
    }

    #[test]
    fn batch_keeps_input_order() {
        let adapter = SolverAdapter::with_backend(Sleepy {
            delay: Duration::ZERO,
            honours_limit: false,
        });
        let mut problems: Vec<_> = (1..=5).map(|i| problem(100.0 * i as f64)).collect();
        problems[2].intervals = 0;
        let results = solve_batch_using(&adapter, &problems, &SolverOptions::default(), 3);
        assert_eq!(results.len(), 5);
        assert!(matches!(results[2], Err(DescentError::InvalidParameters(_))));
        for i in [0, 1, 3, 4] {
            let solution = results[i].as_ref().unwrap();
            assert_eq!(solution.state(0).y, 100.0 * (i + 1) as f64);
        }
    }
}
