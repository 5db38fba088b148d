use {std::path::PathBuf, thiserror::Error};

/// Failures that stop a step (and with it the rest of the chain).
///
/// Running out of attempts is not an error; see [`StepOutcome::Exhausted`](crate::StepOutcome).
#[derive(Debug, Error)]
pub enum AutoclickError {
    #[error("display subsystem unavailable: {0:#}")]
    Resource(anyhow::Error),
    #[error("failed to load template {path:?}: {source}")]
    TemplateLoad {
        path: PathBuf,
        #[source]
        source: TemplateLoadError,
    },
    #[error("pointer injection failed: {0:#}")]
    Dispatch(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] image::ImageError),
    #[error("image has no pixels")]
    Empty,
}
