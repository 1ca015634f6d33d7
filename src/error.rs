/// Convenient alias used across the crate.
pub type CelResult<T> = Result<T, CelError>;

/// Unified error type for celgraph operations.
///
/// Recoverable conditions (missing canvases, dead animation handles) are
/// handled in place and never surface here; see the individual module docs
/// for which calls degrade to no-ops instead of failing.
#[derive(thiserror::Error, Debug)]
pub enum CelError {
    /// Caller passed a value outside the documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced resource (canvas, texture, property node) does not exist.
    #[error("resource missing: {0}")]
    ResourceMissing(String),

    /// The renderer or host refused an allocation.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The component is in a state it cannot recover from.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Wrapped foreign error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CelError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn resource_missing(msg: impl Into<String>) -> Self {
        Self::ResourceMissing(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_prefix() {
        let e = CelError::invalid_argument("denominator must be non-zero");
        assert_eq!(
            e.to_string(),
            "invalid argument: denominator must be non-zero"
        );
        let e = CelError::resource_exhausted("texture upload failed");
        assert!(e.to_string().starts_with("resource exhausted:"));
    }

    #[test]
    fn anyhow_conversion() {
        fn inner() -> CelResult<()> {
            Err(anyhow::anyhow!("backend gone"))?;
            Ok(())
        }
        let e = inner().unwrap_err();
        assert!(matches!(e, CelError::Other(_)));
    }
}
