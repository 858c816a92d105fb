/// Failure reported by a remote source, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Credential missing, invalid or expired.
    Unauthorized,
    /// Authenticated, but not allowed (e.g. not a chat member).
    Forbidden,
    NotFound,
    /// Request refused as invalid; carries the backend's (redacted) reason.
    Rejected(String),
    /// Network failure, timeout or server-side error.
    Unavailable,
    /// Response body did not match the expected shape.
    InvalidData,
}
