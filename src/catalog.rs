use crate::tweaks::{TweakDefinition, DEFAULT_TWEAKS_JSON};
use anyhow::{Context, Result};
use std::time::Duration;

pub const CATALOG_URL: &str =
    "https://raw.githubusercontent.com/GeoSn0w/iDevice-Toolkit/refs/heads/main/TweakRepo/tweaks.json";

/// Built-in tweak catalog: fetched from the remote repo at launch, falling
/// back to the embedded set on any transport or decode failure. Never
/// persisted locally.
pub struct TweakCatalog {
    url: String,
    client: reqwest::blocking::Client,
}

impl TweakCatalog {
    pub fn new() -> Self {
        Self::with_url(CATALOG_URL)
    }

    pub fn with_url(url: &str) -> Self {
        TweakCatalog {
            url: url.to_string(),
            client: reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    /// Loads the catalog, falling back to the embedded defaults. Infallible:
    /// the worst case is the default set.
    pub fn load(&self) -> Vec<TweakDefinition> {
        match self.fetch_remote() {
            Ok(tweaks) => {
                log::info!("fetched {} tweaks from the remote catalog", tweaks.len());
                tweaks
            }
            Err(err) => {
                log::warn!("remote catalog unavailable ({}), using defaults", err);
                Self::default_tweaks()
            }
        }
    }

    fn fetch_remote(&self) -> Result<Vec<TweakDefinition>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .context("catalog request failed")?
            .error_for_status()
            .context("catalog request rejected")?;
        let tweaks: Vec<TweakDefinition> =
            response.json().context("catalog JSON decoding error")?;
        Ok(tweaks)
    }

    /// The embedded fallback set. The literal is checked by tests, so the
    /// expect never fires in practice.
    pub fn default_tweaks() -> Vec<TweakDefinition> {
        serde_json::from_str(DEFAULT_TWEAKS_JSON).expect("embedded tweak catalog is valid JSON")
    }
}

impl Default for TweakCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tweaks::TweakCategory;

    #[test]
    fn default_tweaks_are_available_offline() {
        let tweaks = TweakCatalog::default_tweaks();
        assert_eq!(tweaks.len(), 8);
        assert!(tweaks.iter().all(|t| !t.paths.is_empty()));
        assert!(tweaks
            .iter()
            .any(|t| t.category == TweakCategory::Privacy));
    }

    #[test]
    fn unreachable_remote_falls_back_to_defaults() {
        // Nothing listens on this port; the fetch fails fast and load()
        // degrades to the embedded set.
        let catalog = TweakCatalog::with_url("http://127.0.0.1:9/tweaks.json");
        let tweaks = catalog.load();
        assert_eq!(tweaks.len(), TweakCatalog::default_tweaks().len());
    }
}
