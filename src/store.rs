use crate::tweaks::{TweakCategory, TweakDefinition};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("A tweak named '{0}' already exists")]
    DuplicateName(String),
    #[error("Name and paths are required")]
    MissingFields,
    #[error("No tweak named '{0}'")]
    NotFound(String),
}

/// User-created tweaks persisted as a JSON array in the app's data directory.
/// Read once at construction; rewritten (pretty-printed, sorted keys) on every
/// mutation.
pub struct CustomTweakStore {
    file: PathBuf,
    tweaks: Vec<TweakDefinition>,
}

impl CustomTweakStore {
    pub fn open(file: PathBuf) -> Self {
        let mut store = CustomTweakStore {
            file,
            tweaks: Vec::new(),
        };
        store.load();
        store
    }

    pub fn default_store_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".config");
        path.push("idevice-tweaks");
        path.push("custom_tweaks.json");
        path
    }

    /// A missing or unreadable file degrades to an empty store.
    fn load(&mut self) {
        let contents = match fs::read_to_string(&self.file) {
            Ok(contents) => contents,
            Err(_) => return,
        };
        match serde_json::from_str::<Vec<TweakDefinition>>(&contents) {
            Ok(tweaks) => {
                log::info!("loaded {} custom tweaks", tweaks.len());
                self.tweaks = tweaks;
            }
            Err(err) => {
                log::warn!("failed to parse custom tweaks file: {}", err);
            }
        }
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }
        // Going through Value sorts object keys, matching the export format.
        let value = serde_json::to_value(&self.tweaks)?;
        fs::write(&self.file, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("writing {}", self.file.display()))?;
        Ok(())
    }

    pub fn tweaks(&self) -> &[TweakDefinition] {
        &self.tweaks
    }

    pub fn get(&self, name: &str) -> Option<&TweakDefinition> {
        self.tweaks.iter().find(|t| t.name == name)
    }

    /// Adds a new custom tweak. Rejects empty names, empty path lists and
    /// duplicate names; the store is unchanged on failure.
    pub fn add(&mut self, mut tweak: TweakDefinition) -> Result<(), StoreError> {
        tweak.paths.retain(|p| !p.trim().is_empty());
        if tweak.name.trim().is_empty() || tweak.paths.is_empty() {
            return Err(StoreError::MissingFields);
        }
        if self.get(&tweak.name).is_some() {
            return Err(StoreError::DuplicateName(tweak.name));
        }
        tweak.category = TweakCategory::Custom;
        log::info!("added custom tweak: {}", tweak.name);
        self.tweaks.push(tweak);
        if let Err(err) = self.save() {
            log::warn!("failed to save custom tweaks: {}", err);
        }
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        let before = self.tweaks.len();
        self.tweaks.retain(|t| t.name != name);
        if self.tweaks.len() == before {
            return Err(StoreError::NotFound(name.to_string()));
        }
        log::info!("deleted custom tweak: {}", name);
        if let Err(err) = self.save() {
            log::warn!("failed to save custom tweaks: {}", err);
        }
        Ok(())
    }

    /// Writes one tweak as pretty-printed JSON with sorted keys.
    pub fn export(&self, name: &str, dest: &Path) -> Result<()> {
        let tweak = self
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let value = serde_json::to_value(tweak)?;
        fs::write(dest, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("writing {}", dest.display()))?;
        Ok(())
    }

    /// Imports one tweak record or an array of them. Name collisions are
    /// resolved by suffixing ("name (1)", "name (2)", ...), never by
    /// overwriting. The whole batch is validated before anything is stored;
    /// the store is unchanged on failure. Returns the names as stored.
    pub fn import(&mut self, source: &Path) -> Result<Vec<String>> {
        let contents = fs::read_to_string(source)
            .with_context(|| format!("reading {}", source.display()))?;
        let incoming: Vec<TweakDefinition> =
            match serde_json::from_str::<Vec<TweakDefinition>>(&contents) {
                Ok(list) => list,
                Err(_) => vec![serde_json::from_str(&contents)
                    .context("file is not a tweak record or an array of them")?],
            };

        let mut staged = Vec::with_capacity(incoming.len());
        for mut tweak in incoming {
            tweak.paths.retain(|p| !p.trim().is_empty());
            if tweak.name.trim().is_empty() || tweak.paths.is_empty() {
                anyhow::bail!("imported tweak is missing a name or paths");
            }
            tweak.category = TweakCategory::Custom;
            staged.push(tweak);
        }

        let mut imported = Vec::with_capacity(staged.len());
        for mut tweak in staged {
            tweak.name = self.unique_name(&tweak.name);
            log::info!("imported custom tweak: {}", tweak.name);
            imported.push(tweak.name.clone());
            self.tweaks.push(tweak);
        }
        self.save()?;
        Ok(imported)
    }

    fn unique_name(&self, name: &str) -> String {
        if self.get(name).is_none() {
            return name.to_string();
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{} ({})", name, counter);
            if self.get(&candidate).is_none() {
                return candidate;
            }
            counter += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tweak(name: &str) -> TweakDefinition {
        TweakDefinition::new(
            "wrench.fill",
            name,
            vec!["/tmp/a".to_string()],
            "test tweak",
            TweakCategory::Custom,
        )
    }

    #[test]
    fn add_and_reload() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("custom_tweaks.json");

        let mut store = CustomTweakStore::open(file.clone());
        store.add(tweak("Mine")).unwrap();

        let reloaded = CustomTweakStore::open(file);
        assert_eq!(reloaded.tweaks().len(), 1);
        assert_eq!(reloaded.tweaks()[0].name, "Mine");
    }

    #[test]
    fn duplicate_add_is_rejected_and_store_unchanged() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));
        store.add(tweak("Mine")).unwrap();
        let err = store.add(tweak("Mine")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName(_)));
        assert_eq!(store.tweaks().len(), 1);
    }

    #[test]
    fn add_requires_name_and_paths() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));

        let mut unnamed = tweak("");
        unnamed.name = "  ".to_string();
        assert!(matches!(store.add(unnamed), Err(StoreError::MissingFields)));

        let mut pathless = tweak("Mine");
        pathless.paths = vec!["   ".to_string()];
        assert!(matches!(store.add(pathless), Err(StoreError::MissingFields)));
        assert!(store.tweaks().is_empty());
    }

    #[test]
    fn delete_by_name() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));
        store.add(tweak("Mine")).unwrap();
        store.delete("Mine").unwrap();
        assert!(store.tweaks().is_empty());
        assert!(matches!(store.delete("Mine"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn corrupt_file_degrades_to_empty_store() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("t.json");
        fs::write(&file, "{ not json").unwrap();
        let store = CustomTweakStore::open(file);
        assert!(store.tweaks().is_empty());
    }

    #[test]
    fn import_renames_on_collision() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));
        store.add(tweak("Mine")).unwrap();

        let incoming = dir.path().join("incoming.json");
        fs::write(&incoming, serde_json::to_string(&tweak("Mine")).unwrap()).unwrap();

        assert_eq!(store.import(&incoming).unwrap(), vec!["Mine (1)"]);
        assert_eq!(store.import(&incoming).unwrap(), vec!["Mine (2)"]);
        assert_eq!(store.tweaks().len(), 3);
        // The original record was not overwritten.
        assert_eq!(store.get("Mine").unwrap().description, "test tweak");
    }

    #[test]
    fn import_accepts_an_array_of_records() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));
        let incoming = dir.path().join("incoming.json");
        fs::write(
            &incoming,
            serde_json::to_string(&vec![tweak("A"), tweak("B")]).unwrap(),
        )
        .unwrap();
        assert_eq!(store.import(&incoming).unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn export_then_import_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));
        let mut original = tweak("Mine");
        original.paths = vec!["/tmp/a".to_string(), "/tmp/b".to_string()];
        store.add(original.clone()).unwrap();

        let exported = dir.path().join("mine.json");
        store.export("Mine", &exported).unwrap();

        let imported_as = store.import(&exported).unwrap();
        assert_eq!(imported_as, vec!["Mine (1)"]);
        let copy = store.get("Mine (1)").unwrap();
        assert_eq!(copy.icon, original.icon);
        assert_eq!(copy.paths, original.paths);
        assert_eq!(copy.description, original.description);
        assert_eq!(copy.category, TweakCategory::Custom);
    }

    #[test]
    fn import_with_an_invalid_record_leaves_the_store_unchanged() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("t.json");
        let mut store = CustomTweakStore::open(file.clone());
        store.add(tweak("A")).unwrap();

        // "B" is fine, "C" has no usable paths; neither may be stored.
        let mut pathless = tweak("C");
        pathless.paths = vec!["   ".to_string()];
        let incoming = dir.path().join("incoming.json");
        fs::write(
            &incoming,
            serde_json::to_string(&vec![tweak("B"), pathless]).unwrap(),
        )
        .unwrap();

        assert!(store.import(&incoming).is_err());
        assert_eq!(store.tweaks().len(), 1);
        assert!(store.get("B").is_none());

        let reloaded = CustomTweakStore::open(file);
        assert_eq!(reloaded.tweaks().len(), 1);
        assert_eq!(reloaded.tweaks()[0].name, "A");
    }

    #[test]
    fn invalid_import_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = CustomTweakStore::open(dir.path().join("t.json"));
        let incoming = dir.path().join("incoming.json");
        fs::write(&incoming, "not json at all").unwrap();
        assert!(store.import(&incoming).is_err());
        assert!(store.tweaks().is_empty());
    }
}
