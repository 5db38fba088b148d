use {
    crate::{
        driver::{Pointer, Sleeper, ThreadSleeper},
        error::AutoclickError,
        locator::{Locate, Locator},
        matcher::{MatchThreshold, Matcher},
        retry::{RetryOrchestrator, RetryPolicy, StepOutcome},
    },
    anyhow::Context as _,
    std::{
        any::Any,
        fmt,
        panic::{self, AssertUnwindSafe},
        path::PathBuf,
        thread::{self, JoinHandle},
    },
    tracing::{error, info, warn},
};

/// One locate-and-click task.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub template: PathBuf,
    pub policy: RetryPolicy,
}

impl Step {
    pub fn new(template: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Steps that run strictly one after another. A step starts polling only
/// after the previous one clicked its target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepChain {
    steps: Vec<Step>,
}

impl StepChain {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<Step> for StepChain {
    fn from_iter<T: IntoIterator<Item = Step>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// How a chain run ended. Step indices are zero-based.
#[derive(Debug)]
pub enum ChainOutcome {
    Completed,
    Exhausted { step: usize },
    Failed { step: usize, error: AutoclickError },
    /// The desktop could not be opened, so no step ran.
    SetupFailed(AutoclickError),
    Panicked(String),
}

#[derive(Debug)]
pub struct ChainReport {
    pub total_steps: usize,
    pub steps_completed: usize,
    pub outcome: ChainOutcome,
}

impl ChainReport {
    fn new(total_steps: usize, steps_completed: usize, outcome: ChainOutcome) -> Self {
        Self {
            total_steps,
            steps_completed,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ChainOutcome::Completed)
    }

    fn log(&self) {
        match &self.outcome {
            ChainOutcome::Completed => info!("{self}"),
            ChainOutcome::Exhausted { .. } => warn!("{self}"),
            _ => error!("{self}"),
        }
    }
}

impl fmt::Display for ChainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.total_steps;
        match &self.outcome {
            ChainOutcome::Completed => write!(f, "click chain completed ({total} steps)"),
            ChainOutcome::Exhausted { step } => write!(
                f,
                "click chain stopped: step {}/{total} ran out of attempts",
                step + 1
            ),
            ChainOutcome::Failed { step, error } => {
                write!(f, "click chain failed at step {}/{total}: {error}", step + 1)
            }
            ChainOutcome::SetupFailed(error) => write!(f, "click chain could not start: {error}"),
            ChainOutcome::Panicked(message) => write!(f, "click chain panicked: {message}"),
        }
    }
}

/// Runs the chain on the current thread and stops at the first step that
/// does not end in a click.
pub fn run_chain<L: Locate, P: Pointer, S: Sleeper>(
    chain: &StepChain,
    locator: &L,
    pointer: &P,
    sleeper: &S,
) -> ChainReport {
    let orchestrator = RetryOrchestrator::new(locator, pointer, sleeper);
    let total = chain.len();
    for (index, step) in chain.steps().iter().enumerate() {
        match orchestrator.run_step(step) {
            Ok(StepOutcome::Found(_)) => {
                if index + 1 < total {
                    info!("step {}/{total} done, waiting for the next one", index + 1);
                }
            }
            Ok(StepOutcome::Exhausted { .. }) => {
                return ChainReport::new(total, index, ChainOutcome::Exhausted { step: index });
            }
            Err(error) => {
                return ChainReport::new(
                    total,
                    index,
                    ChainOutcome::Failed { step: index, error },
                );
            }
        }
    }
    ChainReport::new(total, total, ChainOutcome::Completed)
}

/// Background run of a chain.
///
/// Dropping the handle detaches the thread; the chain then keeps going until
/// it finishes or the process exits.
pub struct ChainHandle {
    thread: JoinHandle<ChainReport>,
}

impl ChainHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the chain to end. Never panics: a panic inside the chain is
    /// already turned into [`ChainOutcome::Panicked`].
    pub fn join(self) -> ChainReport {
        self.thread.join().unwrap_or_else(|payload| {
            ChainReport::new(0, 0, ChainOutcome::Panicked(panic_message(&*payload)))
        })
    }
}

/// Starts the chain on a detached background thread and returns immediately.
///
/// `make_driver` runs on that thread, so the locator, pointer and sleeper it
/// builds never have to be `Send`. Every failure inside the thread, panics
/// included, ends up in the logged [`ChainReport`] and never reaches the caller.
pub fn spawn_chain<F, L, P, S>(chain: StepChain, make_driver: F) -> anyhow::Result<ChainHandle>
where
    F: FnOnce() -> anyhow::Result<(L, P, S)> + Send + 'static,
    L: Locate + 'static,
    P: Pointer + 'static,
    S: Sleeper + 'static,
{
    let thread = thread::Builder::new()
        .name("autoclick-chain".into())
        .spawn(move || {
            let total = chain.len();
            let result = panic::catch_unwind(AssertUnwindSafe(|| match make_driver() {
                Ok((locator, pointer, sleeper)) => run_chain(&chain, &locator, &pointer, &sleeper),
                Err(err) => ChainReport::new(
                    total,
                    0,
                    ChainOutcome::SetupFailed(AutoclickError::Resource(err)),
                ),
            }));
            let report = result.unwrap_or_else(|payload| {
                ChainReport::new(total, 0, ChainOutcome::Panicked(panic_message(&*payload)))
            });
            report.log();
            report
        })
        .context("failed to spawn click chain thread")?;
    Ok(ChainHandle { thread })
}

/// [`spawn_chain`] against the real desktop.
pub fn spawn_desktop_chain(
    chain: StepChain,
    threshold: MatchThreshold,
) -> anyhow::Result<ChainHandle> {
    spawn_chain(chain, move || {
        let context = autoclick_desktop::Context::new()?;
        Ok((
            Locator::new(context.clone(), Matcher::new(threshold)),
            context,
            ThreadSleeper,
        ))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
