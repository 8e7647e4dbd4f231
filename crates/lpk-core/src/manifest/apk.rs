//! Reading `AndroidManifest.xml` out of an APK.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use zip::ZipArchive;

use super::ManifestError;
use super::axml;
use super::xml::{self, XmlElement};

/// Path of the manifest inside an APK.
pub const ANDROID_MANIFEST: &str = "AndroidManifest.xml";

/// The parts of an Android manifest a learning package needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkManifest {
    pub package: String,
    /// Raw `android:label`; may be an unresolved resource reference.
    pub label: String,
    /// `android:name` of the single activity handling the launch action.
    pub launch_activity: String,
}

impl ApkManifest {
    /// The label, unless it is a resource reference we cannot resolve
    /// without the APK's resource table.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnresolvedLabel`] for `@...` labels.
    pub fn resolved_label(&self) -> Result<&str, ManifestError> {
        if self.label.starts_with('@') {
            Err(ManifestError::UnresolvedLabel(self.label.clone()))
        } else {
            Ok(&self.label)
        }
    }
}

/// Read and parse the manifest of the APK at `path`.
///
/// # Errors
///
/// Fails if the APK is not a readable zip, lacks a manifest, or the manifest
/// does not satisfy [`manifest_from_document`].
pub fn read_apk_manifest(path: &Path, launch_action: &str) -> Result<ApkManifest, ManifestError> {
    let file = File::open(path)?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| ManifestError::Apk(e.to_string()))?;
    let mut entry = archive
        .by_name(ANDROID_MANIFEST)
        .map_err(|e| ManifestError::Apk(format!("{ANDROID_MANIFEST}: {e}")))?;

    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;

    let root = parse_manifest_document(&data)?;
    manifest_from_document(&root, launch_action)
}

/// Parse manifest bytes, binary or text.
///
/// # Errors
///
/// Returns [`ManifestError::Xml`] if neither form decodes.
pub fn parse_manifest_document(data: &[u8]) -> Result<XmlElement, ManifestError> {
    if axml::is_binary_xml(data) {
        return Ok(axml::parse_binary_xml(data)?);
    }
    let text = std::str::from_utf8(data).map_err(|e| ManifestError::Xml(e.to_string()))?;
    xml::parse_text_xml(text).map_err(ManifestError::Xml)
}

/// Extract package, label and the launch activity from a manifest tree.
///
/// Exactly one `<activity>` must declare an intent filter with
/// `launch_action`.
///
/// # Errors
///
/// Returns [`ManifestError::MissingElement`] / [`ManifestError::MissingAttribute`]
/// for structural gaps and [`ManifestError::NoLaunchActivity`] when zero or
/// several activities match.
pub fn manifest_from_document(
    root: &XmlElement,
    launch_action: &str,
) -> Result<ApkManifest, ManifestError> {
    if root.name != "manifest" {
        return Err(ManifestError::MissingElement("manifest"));
    }
    let package = root
        .attr("package")
        .filter(|p| !p.is_empty())
        .ok_or(ManifestError::MissingAttribute("package"))?;

    let mut applications = root.children_named("application");
    let application = applications
        .next()
        .ok_or(ManifestError::MissingElement("application"))?;
    if applications.next().is_some() {
        return Err(ManifestError::Xml(
            "more than one <application> element".to_string(),
        ));
    }

    let label = application
        .android_attr("label")
        .filter(|l| !l.is_empty())
        .ok_or(ManifestError::MissingAttribute("android:label"))?;

    let handles_launch = |activity: &&XmlElement| {
        activity.children_named("intent-filter").any(|filter| {
            filter
                .children_named("action")
                .any(|action| action.android_attr("name") == Some(launch_action))
        })
    };
    let matches: Vec<&XmlElement> = application
        .children_named("activity")
        .filter(handles_launch)
        .collect();

    let [activity] = matches.as_slice() else {
        return Err(ManifestError::NoLaunchActivity {
            found: matches.len(),
        });
    };
    let launch_activity = activity
        .android_attr("name")
        .ok_or(ManifestError::MissingAttribute("android:name"))?;

    Ok(ApkManifest {
        package: package.to_string(),
        label: label.to_string(),
        launch_activity: launch_activity.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::axml::encode::{Node, Value, encode};

    const ACTION: &str = "com.eidu.integration.LAUNCH_LEARNING_UNIT";

    fn activity(name: &str, action: &'static str) -> Node {
        Node::new("activity")
            .android("name", Value::Str(name.to_string()))
            .child(
                Node::new("intent-filter")
                    .child(Node::new("action").android("name", Value::Str(action.to_string()))),
            )
    }

    fn manifest(activities: Vec<Node>) -> Vec<u8> {
        let mut application =
            Node::new("application").android("label", Value::Str("Example".to_string()));
        for a in activities {
            application = application.child(a);
        }
        let root = Node::new("manifest")
            .plain("package", "com.example.unit")
            .child(application);
        encode(&root, false)
    }

    #[test]
    fn test_binary_manifest_single_launch_activity() {
        let data = manifest(vec![
            activity("MainActivity", ACTION),
            activity("SettingsActivity", "android.intent.action.MAIN"),
        ]);
        let root = parse_manifest_document(&data).unwrap();
        let m = manifest_from_document(&root, ACTION).unwrap();

        assert_eq!(
            m,
            ApkManifest {
                package: "com.example.unit".to_string(),
                label: "Example".to_string(),
                launch_activity: "MainActivity".to_string(),
            }
        );
    }

    #[test]
    fn test_two_launch_activities_rejected() {
        let data = manifest(vec![activity("A", ACTION), activity("B", ACTION)]);
        let root = parse_manifest_document(&data).unwrap();
        let err = manifest_from_document(&root, ACTION).unwrap_err();
        assert!(matches!(err, ManifestError::NoLaunchActivity { found: 2 }));
    }

    #[test]
    fn test_no_launch_activity() {
        let data = manifest(vec![activity("A", "android.intent.action.MAIN")]);
        let root = parse_manifest_document(&data).unwrap();
        let err = manifest_from_document(&root, ACTION).unwrap_err();
        assert!(matches!(err, ManifestError::NoLaunchActivity { found: 0 }));
    }

    #[test]
    fn test_missing_package_and_label() {
        let root = xml::parse_text_xml("<manifest><application/></manifest>").unwrap();
        assert!(matches!(
            manifest_from_document(&root, ACTION),
            Err(ManifestError::MissingAttribute("package"))
        ));

        let root = xml::parse_text_xml(r#"<manifest package="a.b"><application/></manifest>"#)
            .unwrap();
        assert!(matches!(
            manifest_from_document(&root, ACTION),
            Err(ManifestError::MissingAttribute("android:label"))
        ));
    }

    #[test]
    fn test_reference_label_is_unresolved() {
        let m = ApkManifest {
            package: "a.b".to_string(),
            label: "@0x7f0b0001".to_string(),
            launch_activity: "A".to_string(),
        };
        assert!(matches!(
            m.resolved_label(),
            Err(ManifestError::UnresolvedLabel(l)) if l == "@0x7f0b0001"
        ));
    }
}
