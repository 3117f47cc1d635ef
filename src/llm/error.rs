use reqwest::StatusCode;

/// Longest slice of a provider body kept in error messages.
const BODY_PREVIEW_CHARS: usize = 512;

#[derive(Debug)]
pub enum GatewayError {
    /// A required provider setting is empty; raised before any network I/O.
    MissingConfig(&'static str),
    InvalidConfig(String),
    Store(anyhow::Error),
    Http(reqwest::Error),
    Timeout,
    Status { status: StatusCode, body: String },
    Decode { error: serde_json::Error, body: String },
    EmptyReply(&'static str),
}

impl GatewayError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Http(err)
        }
    }

    pub(crate) fn status(status: StatusCode, body: &[u8]) -> Self {
        GatewayError::Status { status, body: preview(body) }
    }

    pub(crate) fn decode(error: serde_json::Error, body: &[u8]) -> Self {
        GatewayError::Decode { error, body: preview(body) }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Timeout => true,
            GatewayError::Http(_) => true,
            GatewayError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::MissingConfig(_)
            | GatewayError::InvalidConfig(_)
            | GatewayError::Store(_)
            | GatewayError::Decode { .. }
            | GatewayError::EmptyReply(_) => false,
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::MissingConfig(field) => write!(f, "{field} is not configured"),
            GatewayError::InvalidConfig(msg) => write!(f, "invalid provider config: {msg}"),
            GatewayError::Store(err) => write!(f, "reading provider settings: {err:#}"),
            GatewayError::Http(err) => write!(f, "http error: {err}"),
            GatewayError::Timeout => write!(f, "request timed out"),
            GatewayError::Status { status, body } => write!(f, "api error {status}: {body}"),
            GatewayError::Decode { error, body } => {
                write!(f, "decode error: {error}, body: {body}")
            }
            GatewayError::EmptyReply(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Http(err) => Some(err),
            GatewayError::Decode { error, .. } => Some(error),
            GatewayError::Store(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display_includes_code_and_body() {
        let err = GatewayError::status(StatusCode::UNAUTHORIZED, br#"{"error":"bad key"}"#);
        assert_eq!(format!("{err}"), r#"api error 401 Unauthorized: {"error":"bad key"}"#);
        assert!(!err.is_retryable());
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let GatewayError::Status { body, .. } = GatewayError::status(StatusCode::BAD_GATEWAY, body.as_bytes()) else {
            unreachable!()
        };
        assert_eq!(body.chars().count(), BODY_PREVIEW_CHARS + 1);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        assert!(GatewayError::status(StatusCode::TOO_MANY_REQUESTS, b"").is_retryable());
        assert!(GatewayError::status(StatusCode::SERVICE_UNAVAILABLE, b"").is_retryable());
        assert!(!GatewayError::MissingConfig("model").is_retryable());
    }
}
