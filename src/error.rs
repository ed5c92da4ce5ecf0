pub type MaskoverResult<T> = Result<T, MaskoverError>;

#[derive(thiserror::Error, Debug)]
pub enum MaskoverError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MaskoverError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MaskoverError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            MaskoverError::encode("x")
                .to_string()
                .contains("encode error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MaskoverError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
