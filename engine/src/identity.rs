//! Report identity - certificate type plus the optional backing record id.

use crate::ReportId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of certificate a report produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CertificateType {
    /// Electrical Installation Certificate
    Eic,
    /// Electrical Installation Condition Report
    Eicr,
    /// Minor Electrical Installation Works Certificate
    MinorWorks,
}

impl CertificateType {
    /// Stable identifier used in storage keys and URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Eic => "eic",
            CertificateType::Eicr => "eicr",
            CertificateType::MinorWorks => "minor-works",
        }
    }

    /// Human-legible prefix for certificate numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            CertificateType::Eic => "EIC",
            CertificateType::Eicr => "EICR",
            CertificateType::MinorWorks => "MW",
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eic" => Ok(CertificateType::Eic),
            "eicr" => Ok(CertificateType::Eicr),
            "minor-works" => Ok(CertificateType::MinorWorks),
            other => Err(format!("unknown certificate type: {other}")),
        }
    }
}

/// Identity of the report being edited in a session.
///
/// `report_id` is `None` until the first successful cloud sync creates a
/// backing record; it transitions to `Some` exactly once per lifecycle.
/// "Start New" and "Duplicate" reset it back to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIdentity {
    pub certificate_type: CertificateType,
    report_id: Option<ReportId>,
    is_new: bool,
}

impl ReportIdentity {
    /// Identity for a brand-new report with no backing record.
    pub fn new_report(certificate_type: CertificateType) -> Self {
        Self {
            certificate_type,
            report_id: None,
            is_new: true,
        }
    }

    /// Identity for an existing report loaded by id.
    pub fn existing(certificate_type: CertificateType, report_id: impl Into<ReportId>) -> Self {
        Self {
            certificate_type,
            report_id: Some(report_id.into()),
            is_new: false,
        }
    }

    /// The backing record id, if one has been assigned.
    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    /// Whether this lifecycle started without a backing record.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Bind the id assigned by the first successful sync.
    ///
    /// Idempotent: returns `true` only when the id is newly bound. A second
    /// call with the same id is a no-op; once bound, the id never changes.
    pub fn bind_report_id(&mut self, report_id: impl Into<ReportId>) -> bool {
        if self.report_id.is_some() {
            return false;
        }
        self.report_id = Some(report_id.into());
        true
    }

    /// Reset back to a new, unbacked report ("Start New" / "Duplicate").
    pub fn reset(&mut self) {
        self.report_id = None;
        self.is_new = true;
    }
}
