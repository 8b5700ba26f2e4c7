//! Server-side share-link operations.
//!
//! Bundles the issuer, the validator, the clock and the optional single-use registry behind one
//! cloneable handle for the REST API and the CLI.

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::error::ScanError;
use crate::patient_id::PatientId;
use crate::replay::SingleUseRegistry;
use crate::token::{ShareToken, TokenIssuer, TokenValidator, ValidatedLink};
use std::sync::Arc;

#[derive(Clone)]
pub struct ShareLinkService {
    issuer: TokenIssuer,
    validator: TokenValidator,
    clock: Arc<dyn Clock>,
    registry: Option<Arc<SingleUseRegistry>>,
}

impl ShareLinkService {
    /// Service on the system clock.
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &CoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            issuer: TokenIssuer::new(cfg),
            validator: TokenValidator::new(cfg),
            clock,
            registry: cfg
                .single_use_tokens()
                .then(|| Arc::new(SingleUseRegistry::new())),
        }
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    /// Issue a share link stamped with the current time.
    pub fn issue(&self, patient_id: &PatientId) -> ShareToken {
        self.issuer.issue(patient_id, self.clock.now_ms())
    }

    /// Validate a decoded payload at the current time.
    ///
    /// In single-use mode a link that validates is also consumed.
    pub fn validate(&self, payload: &str) -> Result<ValidatedLink, ScanError> {
        let now_ms = self.clock.now_ms();
        let link = self.validator.validate(payload, now_ms)?;
        if let Some(registry) = &self.registry {
            registry.consume(&link, now_ms)?;
        }
        Ok(link)
    }
}

impl std::fmt::Debug for ShareLinkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLinkService")
            .field("issuer", &self.issuer)
            .field("validator", &self.validator)
            .field("single_use", &self.registry.is_some())
            .finish()
    }
}
