//! Ledger Error Taxonomy
//! Mission: One error surface for every caller-visible failure mode

/// Errors surfaced to callers of the ledger subsystem.
///
/// Store-level trouble is mostly absorbed internally (degrade-and-continue);
/// only the variants below ever reach a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Referenced id is not in the pending collection (already consumed,
    /// or never existed). No state was mutated.
    NotFound(String),
    /// Malformed input rejected before any write.
    ValidationFailed(String),
    /// The record store could not be read or written.
    StoreUnavailable(String),
    /// Recovery retry budget spent without finding a usable backup.
    RecoveryExhausted { attempts: u32 },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::NotFound(what) => write!(f, "Not found: {}", what),
            LedgerError::ValidationFailed(reason) => write!(f, "Validation failed: {}", reason),
            LedgerError::StoreUnavailable(reason) => write!(f, "Record store unavailable: {}", reason),
            LedgerError::RecoveryExhausted { attempts } => {
                write!(f, "Recovery exhausted after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for LedgerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = LedgerError::NotFound("transaction tx-1".to_string());
        assert_eq!(err.to_string(), "Not found: transaction tx-1");

        let err = LedgerError::RecoveryExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "Recovery exhausted after 5 attempts");
    }
}
