use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const UPDATE_URL: &str =
    "https://raw.githubusercontent.com/GeoSn0w/iDevice-Toolkit/refs/heads/main/CoreAppService/currentVer.json";

/// Remote update manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUpdate {
    pub latest_version: String,
    pub min_compatible_version: String,
    pub release_date: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    pub release_notes: Vec<String>,
    pub critical_update: bool,
}

pub struct UpdateService {
    url: String,
    current_version: String,
    client: reqwest::blocking::Client,
}

impl UpdateService {
    pub fn new() -> Self {
        Self::with_url(UPDATE_URL, env!("CARGO_PKG_VERSION"))
    }

    pub fn with_url(url: &str, current_version: &str) -> Self {
        UpdateService {
            url: url.to_string(),
            current_version: current_version.to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    /// Fetches the manifest and returns it only when it advertises a version
    /// newer than ours.
    pub fn check(&self) -> Result<Option<AppUpdate>> {
        let update: AppUpdate = self
            .client
            .get(&self.url)
            .send()
            .context("update check request failed")?
            .error_for_status()
            .context("update check rejected")?
            .json()
            .context("update manifest decoding error")?;

        if is_newer_version(&update.latest_version, &self.current_version) {
            log::info!("update available: {}", update.latest_version);
            Ok(Some(update))
        } else {
            log::info!(
                "no updates available (current {}, latest {})",
                self.current_version,
                update.latest_version
            );
            Ok(None)
        }
    }
}

impl Default for UpdateService {
    fn default() -> Self {
        Self::new()
    }
}

/// Dotted-triplet numeric comparison. Versions with fewer than three numeric
/// components never compare as newer.
pub fn is_newer_version(new: &str, current: &str) -> bool {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.').filter_map(|part| part.parse().ok()).collect()
    };
    let new = parse(new);
    let current = parse(current);
    if new.len() < 3 || current.len() < 3 {
        return false;
    }
    (new[0], new[1], new[2]) > (current[0], current[1], current[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_comparison() {
        assert!(is_newer_version("1.5.1", "1.5.0"));
        assert!(is_newer_version("1.6.0", "1.5.9"));
        assert!(is_newer_version("2.0.0", "1.9.9"));
        assert!(!is_newer_version("1.5.0", "1.5.0"));
        assert!(!is_newer_version("1.4.9", "1.5.0"));
        assert!(!is_newer_version("0.9.9", "1.0.0"));
    }

    #[test]
    fn short_versions_never_win() {
        assert!(!is_newer_version("2.0", "1.0.0"));
        assert!(!is_newer_version("2.0.0", "1.0"));
        assert!(!is_newer_version("garbage", "1.0.0"));
    }

    #[test]
    fn manifest_decodes_from_wire_shape() {
        let json = r#"{
            "latestVersion": "1.5.0",
            "minCompatibleVersion": "1.0.0",
            "releaseDate": "2025-05-13",
            "downloadURL": "https://example.com/app.ipa",
            "releaseNotes": ["Faster exploit", "New tweaks"],
            "criticalUpdate": false
        }"#;
        let update: AppUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.latest_version, "1.5.0");
        assert_eq!(update.download_url, "https://example.com/app.ipa");
        assert_eq!(update.release_notes.len(), 2);
        assert!(!update.critical_update);
    }

    #[test]
    fn unreachable_manifest_is_an_error_not_a_panic() {
        let service = UpdateService::with_url("http://127.0.0.1:9/ver.json", "1.0.0");
        assert!(service.check().is_err());
    }
}
