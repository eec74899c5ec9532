use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Unsupported filter language: {0}")]
    UnsupportedFilterLanguage(String),

    #[error("Attribute resolution error: {0}")]
    AttributeResolution(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Filter parse error ({lang}): {message}")]
    FilterParse { lang: String, message: String },

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(String),

    #[error("Config error: {0}")]
    Config(String),
}

// The variants carry strings so a cached evaluation failure can be cloned out to every caller.
impl From<serde_json::Error> for SearchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<std::io::Error> for SearchError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<toml::de::Error> for SearchError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
