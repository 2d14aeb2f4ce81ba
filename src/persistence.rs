//! Persistence errors
//!
//! Every backing-store port in this crate reports failures through
//! [`PersistenceError`]. Policy differs per consumer: catalog reads degrade to
//! the fallback dataset, while order and wishlist writes propagate the error
//! to the caller for a retry.

use thiserror::Error;

/// Errors surfaced by a backing-store port.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The backing store could not be reached.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    /// The backing store rejected the read or write.
    #[error("backing store rejected the operation: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = PersistenceError::Unavailable("connection refused".into());

        assert_eq!(
            err.to_string(),
            "backing store unavailable: connection refused"
        );
    }
}
