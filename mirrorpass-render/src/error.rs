use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a [`RenderEngine`](crate::engine::RenderEngine) implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine initialization failed: {0}")]
    Initialization(String),
    #[error("failed to allocate {resource}: {reason}")]
    Allocation {
        resource: &'static str,
        reason: String,
    },
    #[error("unknown {kind} handle {handle}")]
    UnknownHandle { kind: &'static str, handle: u64 },
    #[error("render submission failed: {0}")]
    Submission(String),
    #[error("texture readback failed: {0}")]
    Readback(String),
}

/// Errors surfaced by the mirror core.
///
/// Degenerate mirror geometry (gaze parallel to the plane) is not an error;
/// it is absorbed by the scheduler and reported as
/// [`FrameOutcome::Held`](crate::scheduler::FrameOutcome::Held).
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("invalid reflection plane: {0}")]
    InvalidPlane(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("failed to read configuration file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("mirror setup failed while creating the {stage}: {source}")]
    Setup {
        stage: &'static str,
        #[source]
        source: EngineError,
    },
    #[error("mirror frame failed: {0}")]
    Frame(#[source] EngineError),
}

impl MirrorError {
    pub(crate) fn setup(stage: &'static str) -> impl FnOnce(EngineError) -> Self {
        move |source| Self::Setup { stage, source }
    }
}
