//! `application-metadata.json` sidecar.

use lpk_schema::ApplicationMetadata;
use std::path::Path;

use super::ManifestError;

/// Decode the sidecar, requiring a non-empty package and launch activity.
///
/// # Errors
///
/// Returns [`ManifestError::MalformedMetadata`] for invalid JSON or missing
/// fields, and [`ManifestError::Io`] if the file cannot be read.
pub fn read_metadata_file(path: &Path) -> Result<ApplicationMetadata, ManifestError> {
    let text = std::fs::read_to_string(path)?;
    parse_metadata(&text)
}

/// See [`read_metadata_file`].
///
/// # Errors
///
/// Returns [`ManifestError::MalformedMetadata`].
pub fn parse_metadata(text: &str) -> Result<ApplicationMetadata, ManifestError> {
    let meta: ApplicationMetadata = serde_json::from_str(text)
        .map_err(|e| ManifestError::MalformedMetadata(e.to_string()))?;

    if meta.application_package.trim().is_empty() {
        return Err(ManifestError::MalformedMetadata(
            "applicationPackage is empty".to_string(),
        ));
    }
    if meta.unit_launch_activity_class.trim().is_empty() {
        return Err(ManifestError::MalformedMetadata(
            "unitLaunchActivityClass is empty".to_string(),
        ));
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_minimal() {
        let full = parse_metadata(
            r#"{"applicationName":"Example","applicationPackage":"com.example.unit","unitLaunchActivityClass":"com.example.unit.MainActivity"}"#,
        )
        .unwrap();
        assert_eq!(full.application_name.as_deref(), Some("Example"));

        let minimal = parse_metadata(
            r#"{"applicationPackage":"com.example.unit","unitLaunchActivityClass":"Main"}"#,
        )
        .unwrap();
        assert_eq!(minimal.application_name, None);
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        for bad in [
            r#"{"applicationPackage":"com.example.unit"}"#,
            r#"{"unitLaunchActivityClass":"Main"}"#,
            r#"{"applicationPackage":"","unitLaunchActivityClass":"Main"}"#,
            "not json",
        ] {
            assert!(
                matches!(parse_metadata(bad), Err(ManifestError::MalformedMetadata(_))),
                "accepted {bad}"
            );
        }
    }
}
