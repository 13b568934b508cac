use thiserror::Error;

/// Failure reported by the remote action API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("decode: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SocialError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("cannot act on yourself")]
    SelfAction,

    #[error("an action on {0} is already in flight")]
    InFlight(String),

    #[error("comment cannot be empty")]
    EmptyComment,

    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("no conversation is open")]
    NoRecipient,

    #[error("view was torn down before the response arrived")]
    Detached,

    #[error("unknown realtime event: {0}")]
    UnknownEvent(String),

    #[error("bad payload for {event}: {reason}")]
    Payload { event: String, reason: String },
}

impl SocialError {
    /// Text shown to the user when an action fails.
    pub fn notice_text(&self) -> String {
        match self {
            SocialError::Remote(RemoteError::Network(_)) => {
                "Network error. Please try again.".to_string()
            }
            SocialError::Remote(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
