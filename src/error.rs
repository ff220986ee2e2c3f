use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's own message when it sent
    /// one, otherwise the fallback for the failed operation.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("you must be signed in to do that")]
    Unauthenticated,

    #[error("only {owner} can modify this movie")]
    NotOwner { owner: String },
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl AppError {
    pub fn from_response(status: StatusCode, body: &str, fallback: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Self::Api { status, message }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            AppError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_wins_over_fallback() {
        let err = AppError::from_response(
            StatusCode::FORBIDDEN,
            r#"{"message":"Not your movie"}"#,
            "Failed to delete movie",
        );
        assert_eq!(err.to_string(), "Not your movie");
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn missing_or_blank_message_uses_fallback() {
        for body in ["", "{}", r#"{"message":"  "}"#, "<html>oops</html>"] {
            let err =
                AppError::from_response(StatusCode::UNAUTHORIZED, body, "Failed to delete movie");
            assert_eq!(err.to_string(), "Failed to delete movie", "body: {body:?}");
        }
    }
}
