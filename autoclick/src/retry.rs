use {
    crate::{
        chain::Step,
        driver::{Pointer, Sleeper},
        error::AutoclickError,
        locator::{Locate, MatchResult},
        template::TemplateImage,
    },
    std::time::Duration,
    tracing::{info, warn},
};

/// Pause after a click so the UI can react before the next step starts searching.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// How long a step keeps polling for its template.
///
/// Polling uses a fixed interval: the element shows up whenever the browser
/// or the user gets there, so there is no latency distribution to back off on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_interval: Duration,
    pub pre_click_delay: Duration,
    /// Waited once before the first attempt.
    pub start_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            pre_click_delay: Duration::ZERO,
            start_delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    pub fn with_pre_click_delay(mut self, pre_click_delay: Duration) -> Self {
        self.pre_click_delay = pre_click_delay;
        self
    }

    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }
}

/// Terminal state of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The template was found and clicked.
    Found(MatchResult),
    /// Every attempt ran without a match. Nothing was clicked.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Searching { attempt: u32 },
    Found(MatchResult),
    Exhausted { attempts: u32 },
}

/// Polls a [`Locate`] until the template shows up, then clicks it.
pub struct RetryOrchestrator<'a, L, P, S> {
    locator: &'a L,
    pointer: &'a P,
    sleeper: &'a S,
}

impl<'a, L: Locate, P: Pointer, S: Sleeper> RetryOrchestrator<'a, L, P, S> {
    pub fn new(locator: &'a L, pointer: &'a P, sleeper: &'a S) -> Self {
        Self {
            locator,
            pointer,
            sleeper,
        }
    }

    /// Loads the step's template and runs it. A template that cannot be
    /// loaded fails the step before any capture happens.
    pub fn run_step(&self, step: &Step) -> Result<StepOutcome, AutoclickError> {
        let template = TemplateImage::load(&step.template)?;
        self.run(&template, &step.policy)
    }

    pub fn run(
        &self,
        template: &TemplateImage,
        policy: &RetryPolicy,
    ) -> Result<StepOutcome, AutoclickError> {
        info!("searching for {}", template.name());
        if !policy.start_delay.is_zero() {
            self.sleeper.sleep(policy.start_delay);
        }
        let mut state = State::Searching { attempt: 1 };
        loop {
            state = match state {
                State::Searching { attempt } if attempt > policy.max_attempts => {
                    State::Exhausted {
                        attempts: policy.max_attempts,
                    }
                }
                State::Searching { attempt } => self.attempt(template, policy, attempt)?,
                State::Found(found) => return Ok(StepOutcome::Found(found)),
                State::Exhausted { attempts } => {
                    warn!(
                        "{} not found after {} attempts",
                        template.name(),
                        attempts
                    );
                    return Ok(StepOutcome::Exhausted { attempts });
                }
            };
        }
    }

    fn attempt(
        &self,
        template: &TemplateImage,
        policy: &RetryPolicy,
        attempt: u32,
    ) -> Result<State, AutoclickError> {
        let max = policy.max_attempts;
        let Some(found) = self.locator.locate(template)? else {
            if attempt < max {
                info!("{} not found (attempt {attempt}/{max})", template.name());
                self.sleeper.sleep(policy.retry_interval);
            }
            return Ok(State::Searching {
                attempt: attempt + 1,
            });
        };

        info!(
            "{} found at ({}, {}), clicking (attempt {attempt}/{max})",
            template.name(),
            found.point.x,
            found.point.y
        );
        if !policy.pre_click_delay.is_zero() {
            self.sleeper.sleep(policy.pre_click_delay);
        }
        self.pointer
            .click(found.point)
            .map_err(AutoclickError::Dispatch)?;
        self.sleeper.sleep(SETTLE_DELAY);
        Ok(State::Found(found))
    }
}
