use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Not logged in to Instagram: {0}")]
    NotLoggedIn(String),

    #[error("{control} not found: {hint}")]
    RefNotFound { control: String, hint: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScoutError {
    pub fn ref_not_found(control: impl Into<String>, hint: impl Into<String>) -> Self {
        ScoutError::RefNotFound {
            control: control.into(),
            hint: hint.into(),
        }
    }

    /// Whether this error should abort the whole run rather than one profile.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScoutError::NotLoggedIn(_) | ScoutError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_not_found_message() {
        let err = ScoutError::ref_not_found(
            "Message button",
            "account may be private or unsupported language",
        );
        assert_eq!(
            err.to_string(),
            "Message button not found: account may be private or unsupported language"
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_login_failure_is_fatal() {
        assert!(ScoutError::NotLoggedIn("login form shown".into()).is_fatal());
        assert!(!ScoutError::Browser("timeout".into()).is_fatal());
    }
}
