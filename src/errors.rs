use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("No active tab")]
    NoActiveTab,

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("No element is selected")]
    NoElementSelected,

    #[error("No element found for selector: {0}")]
    NoElementFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Click failed: {0}")]
    ClickFailed(String),

    #[error("Memory is not set")]
    MemoryNotSet,

    #[error("Value of type '{type_id}' has no attribute '{attribute}'")]
    MissingAttribute { type_id: String, attribute: String },

    #[error("Transform failed: {message}\n{diagnostics}")]
    TransformFailed {
        message: String,
        diagnostics: String,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chrome error: {0}")]
    ChromeError(String),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;

// headless_chrome reports everything through anyhow
impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::AnyhowError(err.to_string())
    }
}

impl AgentError {
    pub fn transform(message: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        AgentError::TransformFailed {
            message: message.into(),
            diagnostics: diagnostics.into(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        AgentError::UnsupportedOperation(what.into())
    }
}
