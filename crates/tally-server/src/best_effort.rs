//! Outcome of writes that must never fail the caller
//!
//! Audit and security writes are attempted once. A failure is logged where
//! it happens and reported back as [`BestEffort::Dropped`] so callers can
//! observe it without having to handle an error.

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    Written,
    Dropped { reason: String },
}

impl BestEffort {
    pub fn dropped(reason: impl Into<String>) -> Self {
        Self::Dropped {
            reason: reason.into(),
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written)
    }

    /// Log and convert a store outcome
    pub(crate) fn from_store(kind: &'static str, result: Result<(), StoreError>) -> Self {
        match result {
            Ok(()) => Self::Written,
            Err(e) => {
                tracing::error!(record_kind = kind, error = %e, "Failed to persist record");
                Self::dropped(e.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_ok() {
        assert!(BestEffort::from_store("audit", Ok(())).is_written());
    }

    #[test]
    fn test_from_store_error_is_dropped_with_reason() {
        let outcome = BestEffort::from_store("audit", Err(StoreError::unavailable("down")));
        assert_eq!(
            outcome,
            BestEffort::Dropped {
                reason: "Store unavailable: down".into()
            }
        );
    }
}
