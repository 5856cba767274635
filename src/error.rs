/// Broad failure category, used by callers that need to react to a specific
/// condition (e.g. skip a star on degeneracy, abort on an unsupported band).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required pipeline field was never supplied.
    Configuration,
    /// Malformed numeric input (shape mismatch, non-positive scale, bad CSV cell).
    InvalidInput,
    /// The photometric band has no entry in the constant table.
    UnsupportedBand,
    /// The posterior cubic produced a root count other than 1 or 3.
    NumericalDegeneracy,
    /// The extinction-map service could not be reached or answered garbage.
    Service,
    /// Filesystem read/write failure.
    Io,
}

impl ErrorKind {
    fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Configuration | ErrorKind::InvalidInput | ErrorKind::Io => 2,
            ErrorKind::UnsupportedBand => 3,
            ErrorKind::NumericalDegeneracy | ErrorKind::Service => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn unsupported_band(band: &str, known: &[&str]) -> Self {
        Self::new(
            ErrorKind::UnsupportedBand,
            format!(
                "Unsupported band '{band}'. Bands with tabulated values: {}.",
                known.join(", ")
            ),
        )
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code())
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::configuration("x").exit_code(), 2);
        assert_eq!(AppError::unsupported_band("U", &["Ks"]).exit_code(), 3);
        assert_eq!(AppError::new(ErrorKind::NumericalDegeneracy, "x").exit_code(), 4);
    }

    #[test]
    fn unsupported_band_message_lists_known_bands() {
        let err = AppError::unsupported_band("U", &["J", "H", "Ks"]);
        assert_eq!(err.kind(), ErrorKind::UnsupportedBand);
        assert!(err.to_string().contains("'U'"));
        assert!(err.to_string().contains("J, H, Ks"));
    }
}
