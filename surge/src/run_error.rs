use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => e,
        }
    }
}

impl From<surge_core::Error> for RunError {
    fn from(err: surge_core::Error) -> Self {
        use surge_core::Error;

        match err {
            Error::InvalidWorkUnitSize
            | Error::InvalidConcurrency
            | Error::ScenarioIndex { .. }
            | Error::InvalidBaseUrl(_)
            | Error::InvalidApiKey => Self::InvalidInput(err.into()),
            Error::InvalidState(_)
            | Error::Histogram(_)
            | Error::Transport(_)
            | Error::Join(_) => Self::RuntimeError(err.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(e) | Self::RuntimeError(e) => write!(f, "{e:#}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_invalid_input() {
        let err = RunError::from(surge_core::Error::ScenarioIndex { index: 9, len: 8 });
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn engine_failures_map_to_runtime_error() {
        let err = RunError::from(surge_core::Error::Transport("boom".to_string()));
        assert_eq!(err.exit_code(), ExitCode::RuntimeError);
    }
}
