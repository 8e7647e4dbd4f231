//! Fixture archives for the integration tests.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lpk_cli::ops::Context;
use lpk_core::{Config, Layout, NullReporter};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const LAUNCH_ACTION: &str = "com.eidu.integration.LAUNCH_LEARNING_UNIT";
pub const AUTHORITY: &str = "com.eidu.integration.test.app.assets";

/// Plain-text `AndroidManifest.xml` with one activity per entry of
/// `launch_activities`, each handling the launch action.
pub fn manifest_xml(package: &str, label: &str, launch_activities: &[&str]) -> String {
    let activities: String = launch_activities
        .iter()
        .map(|name| {
            format!(
                r#"<activity android:name="{name}"><intent-filter><action android:name="{LAUNCH_ACTION}"/></intent-filter></activity>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="{package}">
  <application android:label="{label}">
    <activity android:name=".SettingsActivity"/>
    {activities}
  </application>
</manifest>"#
    )
}

fn zip_bytes(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), SimpleFileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Builder for a learning package zip.
#[derive(Default)]
pub struct PackageZip {
    entries: Vec<(String, Vec<u8>)>,
}

impl PackageZip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, bytes: &[u8]) -> Self {
        self.entries.push((name.to_string(), bytes.to_vec()));
        self
    }

    /// An `app.apk` whose manifest declares `launch_activities`.
    pub fn apk(self, package: &str, label: &str, launch_activities: &[&str]) -> Self {
        let manifest = manifest_xml(package, label, launch_activities);
        let apk = zip_bytes(&[("AndroidManifest.xml".to_string(), manifest.into_bytes())]);
        self.file("app.apk", &apk)
    }

    pub fn catalog(self, json: &str) -> Self {
        self.file("learning-units.json", json.as_bytes())
    }

    pub fn build(&self) -> Vec<u8> {
        zip_bytes(&self.entries)
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// The scenario package: `com.example.unit`, one launch activity, one unit
/// allowed to read `assets/`.
pub fn example_package() -> PackageZip {
    PackageZip::new()
        .apk("com.example.unit", "Example", &["MainActivity"])
        .catalog(r#"{"learningUnits":[{"unitId":"u1","icon":"i.png","additionalAssets":["assets/"]}]}"#)
        .file("assets/icon.png", b"\x89PNG fake")
        .file("secrets/key.txt", b"hunter2")
}

/// A context over a fresh home directory with a silent reporter.
pub fn context(home: &Path) -> Context {
    Context::open(Layout::new(home), Config::default(), Arc::new(NullReporter))
        .expect("failed to open context")
}

pub fn asset_uri(package: &str, path: &str, unit: &str) -> String {
    format!("content://{AUTHORITY}/{package}/{path}?unit={unit}")
}
