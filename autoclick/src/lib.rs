//! Visual auto-clicker for browser consent screens.
//!
//! A [`StepChain`] lists reference images of UI elements. Each step polls
//! every display until its image shows up, clicks its center, and only then
//! lets the next step start. [`spawn_desktop_chain`] runs the whole chain on a
//! background thread so the caller can keep waiting on its own work (for
//! example an OAuth redirect) in the meantime.

mod chain;
mod config;
mod driver;
mod error;
mod locator;
mod matcher;
mod retry;
mod template;

#[cfg(test)]
mod test_util;

pub use {
    crate::{
        chain::{
            run_chain, spawn_chain, spawn_desktop_chain, ChainHandle, ChainOutcome, ChainReport,
            Step, StepChain,
        },
        config::{ChainConfig, StepConfig},
        driver::{Point, Pointer, Screen, Sleeper, ThreadSleeper},
        error::{AutoclickError, TemplateLoadError},
        locator::{Locate, Locator, MatchResult},
        matcher::{ncc_score, Candidate, MatchThreshold, Matcher, DEFAULT_THRESHOLD},
        retry::{
            RetryOrchestrator, RetryPolicy, StepOutcome, DEFAULT_MAX_ATTEMPTS,
            DEFAULT_RETRY_INTERVAL, SETTLE_DELAY,
        },
        template::TemplateImage,
    },
    autoclick_desktop::{CapturedRaster, DisplaySurface},
};
