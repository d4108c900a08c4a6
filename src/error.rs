//! Error taxonomy of the orchestration core.
//!
//! Unknown animation names have no variant: asking for a clip that
//! does not exist is a no-op, not a failure.

/// Errors surfaced by the orchestrator, the render loop and the asset loader.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The transport failed or the payload could not be parsed.
    #[error("failed to load asset `{url}`: {source}")]
    Load {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The host surface had no usable layout dimensions at construction time.
    #[error("host surface is not laid out ({width}x{height}); both dimensions must be non-zero")]
    UninitializedSurface { width: u32, height: u32 },

    /// A per-frame step failed. The next tick has already been scheduled.
    #[error("render tick failed: {0}")]
    Tick(#[source] anyhow::Error),

    /// The GPU backend could not be brought up.
    #[error("GPU surface error: {0}")]
    Gpu(String),
}

impl Error {
    pub(crate) fn load(url: &str, source: impl Into<anyhow::Error>) -> Self {
        Self::Load {
            url: url.to_string(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
