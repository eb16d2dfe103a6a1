use ipinfo::errors::{IpInfoError, Result};
use std::error::Error;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_invalid_address_error() {
        let error = IpInfoError::invalid_address("Invalid IP address or hostname");

        assert!(matches!(error, IpInfoError::InvalidAddress(_)));
        assert_eq!(error.code(), "E001");
        assert_eq!(
            error.to_string(),
            "Invalid Address: Invalid IP address or hostname"
        );
    }

    #[test]
    fn test_field_not_found_error() {
        let error = IpInfoError::field_not_found("Field 'bogus' not found");

        assert!(matches!(error, IpInfoError::FieldNotFound(_)));
        assert_eq!(error.message(), "Field 'bogus' not found");
    }

    #[test]
    fn test_refresh_errors() {
        let download = IpInfoError::download_failed("GeoLite2-City returned HTTP 401");
        let extraction = IpInfoError::extraction_failed("no member ending with .mmdb");
        let cycle = IpInfoError::refresh_cycle("cannot create data directory");

        assert_eq!(download.error_type(), "Download Failed");
        assert_eq!(extraction.error_type(), "Extraction Failed");
        assert_eq!(cycle.error_type(), "Refresh Cycle Error");
    }

    #[test]
    fn test_every_variant_has_distinct_code() {
        let errors = [
            IpInfoError::invalid_address("a"),
            IpInfoError::field_not_found("a"),
            IpInfoError::bulk_limit_exceeded("a"),
            IpInfoError::database_unavailable("a"),
            IpInfoError::download_failed("a"),
            IpInfoError::extraction_failed("a"),
            IpInfoError::refresh_cycle("a"),
            IpInfoError::file_operation("a"),
            IpInfoError::serialization("a"),
            IpInfoError::configuration("a"),
            IpInfoError::internal("a"),
        ];

        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let error: IpInfoError = io_error.into();

        assert!(matches!(error, IpInfoError::FileOperation(_)));
        assert!(error.message().contains("file missing"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: IpInfoError = json_error.into();

        assert!(matches!(error, IpInfoError::Serialization(_)));
    }

    #[test]
    fn test_question_mark_propagation() {
        fn read_missing() -> Result<String> {
            Ok(std::fs::read_to_string(
                "/definitely/not/a/real/path/GeoLite2-City.mmdb",
            )?)
        }

        assert!(matches!(read_missing(), Err(IpInfoError::FileOperation(_))));
    }
}

#[cfg(test)]
mod error_format_tests {
    use super::*;

    #[test]
    fn test_format_simple() {
        let error = IpInfoError::configuration("refresh.interval_secs must be greater than 0");
        assert_eq!(
            error.format_simple(),
            "Configuration Error: refresh.interval_secs must be greater than 0"
        );
    }

    #[test]
    fn test_format_colored_contains_parts() {
        let error = IpInfoError::internal("boom");
        let colored = error.format_colored();

        assert!(colored.contains("E011"));
        assert!(colored.contains("Internal Error"));
        assert!(colored.contains("boom"));
    }

    #[test]
    fn test_is_std_error() {
        let error = IpInfoError::database_unavailable("corrupt");
        let as_std: &dyn Error = &error;
        assert!(as_std.source().is_none());
    }
}
