// Static language and voice definitions

use crate::error::{Error, Result};
use crate::types::{LanguageId, VoiceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A spoken language and the word pool used to garble it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: LanguageId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Replacement words for listeners who don't know the language.
    /// Order is preserved from the source file.
    #[serde(default)]
    pub lexicon: Vec<String>,
}

impl Language {
    pub fn new(id: impl Into<LanguageId>, name: impl Into<String>, lexicon: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: None,
            lexicon,
        }
    }
}

/// A synthesis voice; `speaker` is the handle understood by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: VoiceId,
    #[serde(default)]
    pub name: Option<String>,
    pub speaker: String,
}

impl Voice {
    pub fn new(id: impl Into<VoiceId>, speaker: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            speaker: speaker.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Definition {
    #[serde(rename = "language")]
    Language(Language),
    #[serde(rename = "ttsVoice")]
    Voice(Voice),
}

/// Read-only index of every language and voice known to the server
#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    languages: HashMap<LanguageId, Language>,
    voices: HashMap<VoiceId, Voice>,
}

impl ContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML list of `language` / `ttsVoice` definitions
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let definitions: Vec<Definition> = serde_yaml::from_str(content)
            .map_err(|e| Error::Deserialization(e.to_string()))?;

        let mut catalog = Self::new();
        for definition in definitions {
            match definition {
                Definition::Language(language) => catalog.add_language(language)?,
                Definition::Voice(voice) => catalog.add_voice(voice)?,
            }
        }
        Ok(catalog)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Merge another catalog into this one; duplicate ids are rejected
    pub fn extend(&mut self, other: ContentCatalog) -> Result<()> {
        for (_, language) in other.languages {
            self.add_language(language)?;
        }
        for (_, voice) in other.voices {
            self.add_voice(voice)?;
        }
        Ok(())
    }

    pub fn add_language(&mut self, language: Language) -> Result<()> {
        if language.id.as_str().is_empty() {
            return Err(Error::InvalidDefinition("language id cannot be empty".to_string()));
        }
        if language.lexicon.iter().any(|w| w.trim().is_empty()) {
            return Err(Error::InvalidDefinition(format!(
                "language '{}' has a blank lexicon word",
                language.id
            )));
        }
        if self.languages.contains_key(&language.id) {
            return Err(Error::Duplicate(format!("language '{}'", language.id)));
        }
        self.languages.insert(language.id.clone(), language);
        Ok(())
    }

    pub fn add_voice(&mut self, voice: Voice) -> Result<()> {
        if voice.id.as_str().is_empty() || voice.speaker.is_empty() {
            return Err(Error::InvalidDefinition(format!(
                "voice '{}' needs both an id and a speaker",
                voice.id
            )));
        }
        if self.voices.contains_key(&voice.id) {
            return Err(Error::Duplicate(format!("voice '{}'", voice.id)));
        }
        self.voices.insert(voice.id.clone(), voice);
        Ok(())
    }

    pub fn language(&self, id: &LanguageId) -> Option<&Language> {
        self.languages.get(id)
    }

    pub fn voice(&self, id: &VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Language> {
        self.languages.values()
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }
}
