//! Persistent plugin preferences.
//!
//! Global switches plus a set of named speech profiles. The replacement
//! table and keyword set belong to a profile, so switching profile
//! switches which rules are in effect.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TtsError};
use crate::keywords::KeywordSet;
use crate::replace::ReplacementTable;

pub const DEFAULT_PROFILE: &str = "espeak";
pub const DEFAULT_SHELL: &str = "/bin/sh";
pub const DEFAULT_COMPOSE: &str = "{command} -v {language} -a {volume} {text}";

static FALLBACK_PROFILE: LazyLock<Profile> = LazyLock::new(Profile::default);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub command: String,
    pub compose: String,
    pub language: String,
    pub volume: String,
    pub replace: ReplacementTable,
    pub keywords: KeywordSet,
    pub keywords_active: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            command: "/usr/bin/espeak".into(),
            compose: DEFAULT_COMPOSE.into(),
            language: "de".into(),
            volume: "200".into(),
            replace: ReplacementTable::new(),
            keywords: KeywordSet::new(),
            keywords_active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    active: bool,
    shell: String,
    profile: String,
    profiles: BTreeMap<String, Profile>,
}

impl Default for Preferences {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), Profile::default());
        Self {
            active: true,
            shell: DEFAULT_SHELL.into(),
            profile: DEFAULT_PROFILE.into(),
            profiles,
        }
    }
}

impl Preferences {
    pub fn active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn set_shell(&mut self, shell: &str) {
        self.shell = shell.to_string();
    }

    pub fn profile_name(&self) -> &str {
        &self.profile
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Switch to `name`, creating it from the espeak defaults if needed.
    pub fn select_profile(&mut self, name: &str) {
        self.profile = name.to_string();
        self.ensure_profile();
    }

    pub fn current(&self) -> &Profile {
        self.profiles.get(&self.profile).unwrap_or(&FALLBACK_PROFILE)
    }

    pub fn current_mut(&mut self) -> &mut Profile {
        self.profiles.entry(self.profile.clone()).or_default()
    }

    /// Repair records read from disk: empty names and dangling profile
    /// selections fall back to defaults, empty keywords and patterns are
    /// dropped.
    fn ensure_profile(&mut self) {
        if self.profile.is_empty() {
            self.profile = DEFAULT_PROFILE.into();
        }
        if self.shell.is_empty() {
            self.shell = DEFAULT_SHELL.into();
        }
        for profile in self.profiles.values_mut() {
            profile.keywords.remove("");
            profile.replace.remove("");
        }
        self.profiles.entry(self.profile.clone()).or_default();
    }
}

/// Backing storage for [`Preferences`].
pub trait PreferenceStore: Send {
    fn load(&self) -> Result<Preferences>;
    fn save(&mut self, prefs: &Preferences) -> Result<()>;
}

/// Preferences kept in a YAML file.
pub struct YamlPreferenceStore {
    path: PathBuf,
}

impl YamlPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/chat-tts/prefs.yaml`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config/chat-tts/prefs.yaml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for YamlPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            info!(
                "No preferences at {}, using defaults",
                self.path.display()
            );
            return Ok(Preferences::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let mut prefs: Preferences = serde_yml::from_str(&contents).map_err(|e| {
            TtsError::Preferences(format!("failed to parse {}: {e}", self.path.display()))
        })?;
        prefs.ensure_profile();
        info!("Loaded preferences from {}", self.path.display());
        Ok(prefs)
    }

    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let yaml = serde_yml::to_string(prefs)
            .map_err(|e| TtsError::Preferences(format!("failed to serialize: {e}")))?;

        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}

/// In-process store. Clones share the same record.
#[derive(Clone, Default)]
pub struct MemoryPreferenceStore {
    saved: Arc<Mutex<Preferences>>,
}

impl MemoryPreferenceStore {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            saved: Arc::new(Mutex::new(prefs)),
        }
    }

    pub fn snapshot(&self) -> Preferences {
        match self.saved.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Preferences> {
        Ok(self.snapshot())
    }

    fn save(&mut self, prefs: &Preferences) -> Result<()> {
        let mut guard = self
            .saved
            .lock()
            .map_err(|_| TtsError::Preferences("preference store lock poisoned".into()))?;
        *guard = prefs.clone();
        Ok(())
    }
}
