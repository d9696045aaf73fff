use crate::version::Scheme;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("Invalid {scheme} version format: {version:?}")]
    InvalidVersionFormat { version: String, scheme: Scheme },

    #[error("No catalog data for package: {package}")]
    EmptyCatalog { package: String },
}

impl MatchError {
    pub(crate) fn invalid(version: &str, scheme: Scheme) -> Self {
        MatchError::InvalidVersionFormat {
            version: version.to_string(),
            scheme,
        }
    }
}
