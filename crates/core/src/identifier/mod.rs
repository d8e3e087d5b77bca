//! Sequential ticket identifiers (`PREFIX` followed by a zero-padded number).
//!
//! Allocation itself is pure: given the current maximum identifier it returns
//! the next one. Uniqueness under concurrency comes from pairing it with an
//! insert guarded by the primary-key constraint (see [`allocate_and_insert`]).

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::IdentifierConfig;
use crate::metrics;
use crate::ticket::RepositoryError;

/// Errors from identifier allocation.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The stored maximum does not follow the `PREFIX<digits>` pattern.
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Every insert attempt hit an identifier that already existed.
    #[error("identifier allocation exhausted after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Formats and increments ticket identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAllocator {
    prefix: String,
    width: usize,
}

impl IdentifierAllocator {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn from_config(config: &IdentifierConfig) -> Self {
        Self::new(config.prefix.clone(), config.width)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Render a sequence number. Numbers wider than the configured width
    /// simply grow (RAC9999 is followed by RAC10000).
    pub fn format(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.width)
    }

    /// Extract the numeric suffix of an identifier carrying this prefix.
    pub fn parse_suffix(&self, identifier: &str) -> Result<u64, AllocationError> {
        let malformed = || AllocationError::MalformedIdentifier(identifier.to_string());

        let digits = identifier.strip_prefix(&self.prefix).ok_or_else(malformed)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        digits.parse::<u64>().map_err(|_| malformed())
    }

    /// Next identifier after `current_max` (`PREFIX0001` when nothing exists yet).
    pub fn allocate(&self, current_max: Option<&str>) -> Result<String, AllocationError> {
        let next = match current_max {
            None => 1,
            Some(max) => self
                .parse_suffix(max)?
                .checked_add(1)
                .ok_or_else(|| AllocationError::MalformedIdentifier(max.to_string()))?,
        };
        Ok(self.format(next))
    }
}

/// Bounded retry-on-conflict allocation.
///
/// Reads the current maximum, allocates the next identifier and hands it to
/// `insert`. When the insert reports [`RepositoryError::DuplicateIdentifier`]
/// (another writer took the number first) the maximum is re-read and the
/// sequence retried, up to `max_attempts` times. Any other error is returned
/// immediately.
pub fn allocate_and_insert<T, M, I>(
    allocator: &IdentifierAllocator,
    max_attempts: u32,
    mut current_max: M,
    mut insert: I,
) -> Result<T, AllocationError>
where
    M: FnMut() -> Result<Option<String>, RepositoryError>,
    I: FnMut(&str) -> Result<T, RepositoryError>,
{
    for attempt in 1..=max_attempts {
        let max = current_max()?;
        let id = allocator.allocate(max.as_deref())?;

        match insert(&id) {
            Ok(value) => {
                debug!(id = %id, attempt, "Allocated ticket identifier");
                return Ok(value);
            }
            Err(RepositoryError::DuplicateIdentifier(taken)) => {
                metrics::ALLOCATION_CONFLICTS.inc();
                warn!(id = %taken, attempt, "Identifier already taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AllocationError::AllocationExhausted {
        attempts: max_attempts,
    })
}
