//! Certificate number issuance.
//!
//! A number is issued at most once per new-report lifecycle and never for a
//! loaded report - the number found in an existing record is preserved
//! verbatim. Issuance is all-or-nothing: a failed generation leaves the
//! snapshot untouched and remains retryable.

use crate::{
    error::Result, CertificateNumber, CertificateType, FormSnapshot, ReportIdentity,
};
use std::collections::BTreeMap;

/// Source of unique, human-legible certificate numbers.
///
/// Real deployments back this with a network sequence service; the engine
/// only requires that `generate` is globally unique per certificate type.
pub trait NumberSequence {
    fn generate(&mut self, certificate_type: CertificateType) -> Result<CertificateNumber>;
}

/// Format a certificate number: type prefix, year, zero-padded sequence.
pub fn format_certificate_number(
    certificate_type: CertificateType,
    year: u16,
    sequence: u64,
) -> CertificateNumber {
    format!("{}-{}-{:06}", certificate_type.number_prefix(), year, sequence)
}

/// In-process sequence: per-type counters within a year.
///
/// Produces numbers like `EICR-2026-000042`.
#[derive(Debug, Clone)]
pub struct YearSequence {
    year: u16,
    counters: BTreeMap<CertificateType, u64>,
}

impl YearSequence {
    pub fn new(year: u16) -> Self {
        Self {
            year,
            counters: BTreeMap::new(),
        }
    }
}

impl NumberSequence for YearSequence {
    fn generate(&mut self, certificate_type: CertificateType) -> Result<CertificateNumber> {
        let counter = self.counters.entry(certificate_type).or_insert(0);
        *counter += 1;
        Ok(format_certificate_number(certificate_type, self.year, *counter))
    }
}

/// Session-scoped guard around number issuance.
///
/// The latch prevents duplicate issuance when the triggering condition (no
/// number, no bound report id) fires repeatedly within one lifecycle. It is
/// only set after a successful generation, so a failure stays retryable.
#[derive(Debug, Clone, Default)]
pub struct CertificateIssuer {
    issued: bool,
}

impl CertificateIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this lifecycle has already issued a number.
    pub fn has_issued(&self) -> bool {
        self.issued
    }

    /// Issue a number into the snapshot if one is needed.
    ///
    /// Returns `Ok(Some(number))` when a number was freshly issued,
    /// `Ok(None)` when nothing needed doing: the report already has a backing
    /// record (existing reports never re-issue), the snapshot already carries
    /// a number, or the latch is set.
    pub fn ensure_number(
        &mut self,
        identity: &ReportIdentity,
        snapshot: &mut FormSnapshot,
        sequence: &mut dyn NumberSequence,
    ) -> Result<Option<CertificateNumber>> {
        if identity.report_id().is_some() {
            return Ok(None);
        }
        if snapshot.certificate_number().is_some() {
            return Ok(None);
        }
        if self.issued {
            return Ok(None);
        }

        let number = sequence.generate(identity.certificate_type)?;
        snapshot.set_certificate_number(number.clone());
        self.issued = true;
        Ok(Some(number))
    }

    /// Re-arm for a fresh lifecycle ("Start New" / "Duplicate").
    pub fn reset(&mut self) {
        self.issued = false;
    }
}
