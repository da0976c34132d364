//! Wire-format tests for the report API.
//!
//! These exercise the request/response types and the shared engine logic
//! without a database; end-to-end tests require a running PostgreSQL and a
//! configured DATABASE_URL.

use certsync_engine::issuer::format_certificate_number;
use certsync_engine::{CertificateType, FormSnapshot};
use serde_json::json;

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn upsert_request_accepts_null_report_id() {
        let body = json!({
            "reportId": null,
            "certificateType": "eicr",
            "data": {"clientName": "Alice"}
        });

        let value: serde_json::Value = body;
        assert!(value.get("reportId").unwrap().is_null());

        let certificate_type: CertificateType =
            serde_json::from_value(value.get("certificateType").unwrap().clone()).unwrap();
        assert_eq!(certificate_type, CertificateType::Eicr);
    }

    #[test]
    fn certificate_type_round_trips_through_the_path() {
        for (path, expected) in [
            ("eic", CertificateType::Eic),
            ("eicr", CertificateType::Eicr),
            ("minor-works", CertificateType::MinorWorks),
        ] {
            let parsed: CertificateType = path.parse().unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.as_str(), path);
        }

        assert!("pat-testing".parse::<CertificateType>().is_err());
    }

    #[test]
    fn snapshot_validation_rejects_non_objects() {
        assert!(FormSnapshot::from_value(json!({"clientName": "Alice"})).is_ok());
        assert!(FormSnapshot::from_value(json!(["not", "an", "object"])).is_err());
        assert!(FormSnapshot::from_value(json!("plain string")).is_err());
    }

    #[test]
    fn issued_numbers_follow_the_shared_format() {
        assert_eq!(
            format_certificate_number(CertificateType::Eicr, 2026, 7),
            "EICR-2026-000007"
        );
        assert_eq!(
            format_certificate_number(CertificateType::MinorWorks, 2026, 123_456),
            "MW-2026-123456"
        );
    }

    #[test]
    fn snapshot_serialization_is_deterministic() {
        let mut a = FormSnapshot::new();
        a.set("zsReading", json!(0.32));
        a.set("clientName", json!("Alice"));

        let mut b = FormSnapshot::new();
        b.set("clientName", json!("Alice"));
        b.set("zsReading", json!(0.32));

        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
