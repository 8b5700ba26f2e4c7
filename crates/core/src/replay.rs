//! Optional single-use enforcement for share links.
//!
//! Share links are time bounded only, so the same link could be presented by several scanners
//! inside its window. When single-use mode is on, the server records every accepted
//! `(patient id, ts)` pair and rejects a second presentation until the pair expires.

use crate::constants::{EXPIRATION_MS, MSG_ALREADY_USED};
use crate::error::ScanError;
use crate::patient_id::PatientId;
use crate::token::ValidatedLink;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct SingleUseRegistry {
    consumed: Mutex<HashSet<(PatientId, i64)>>,
}

impl SingleUseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `link` as consumed at `now_ms`.
    ///
    /// Check and insert happen under one lock, so of two concurrent presentations exactly one
    /// succeeds. Entries whose window has closed are pruned on every call.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::MalformedPayload`] if the link was already consumed.
    pub fn consume(&self, link: &ValidatedLink, now_ms: i64) -> Result<(), ScanError> {
        let mut consumed = match self.consumed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        consumed.retain(|(_, issued_at_ms)| {
            now_ms.saturating_sub(*issued_at_ms) <= EXPIRATION_MS
        });

        let key = (link.patient_id.clone(), link.issued_at_ms);
        if consumed.contains(&key) {
            tracing::warn!(patient_id = %link.patient_id, "share link presented twice");
            return Err(ScanError::MalformedPayload(MSG_ALREADY_USED.into()));
        }
        consumed.insert(key);
        Ok(())
    }

    /// Number of links currently remembered.
    pub fn len(&self) -> usize {
        match self.consumed.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
