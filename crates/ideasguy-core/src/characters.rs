use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// A persona loaded from a JSON card on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterCard {
    pub id: String,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub greeting: Option<String>,
    pub avatar: Option<String>,
}

/// What the API exposes about a character; the system prompt stays server-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicCharacter {
    pub id: String,
    pub name: String,
    pub description: String,
    pub greeting: Option<String>,
    pub avatar: Option<String>,
}

impl CharacterCard {
    pub fn to_public(&self) -> PublicCharacter {
        PublicCharacter {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            greeting: self.greeting.clone(),
            avatar: self.avatar.clone(),
        }
    }

    /// Builds a card from raw JSON, accepting the TavernAI / Card v2 aliases
    /// `system`, `prompt` and `first_mes`.
    pub fn from_json(stem: &str, data: &Value) -> Self {
        let text = |key: &str| {
            data.get(key)
                .and_then(value_as_text)
                .filter(|value| !value.is_empty())
        };

        let system_prompt = text("system_prompt")
            .or_else(|| text("system"))
            .or_else(|| text("prompt"))
            .unwrap_or_default();

        Self {
            id: text("id").unwrap_or_else(|| stem.to_owned()),
            name: text("name").unwrap_or_else(|| stem.to_owned()),
            description: text("description").unwrap_or_default(),
            system_prompt,
            greeting: text("greeting").or_else(|| text("first_mes")),
            avatar: text("avatar"),
        }
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Directory of `*.json` character cards, re-read on every lookup so edits
/// show up without a restart.
#[derive(Debug, Clone)]
pub struct CharacterLibrary {
    root: PathBuf,
}

impl CharacterLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn list(&self) -> anyhow::Result<Vec<CharacterCard>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "characters directory missing");
                return Ok(Vec::new());
            }
            Err(error) => return Err(error.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut cards = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(card) = read_card(&path).await {
                if card.system_prompt.is_empty() {
                    debug!(path = %path.display(), "skipping character without system prompt");
                    continue;
                }
                cards.push(card);
            }
        }
        Ok(cards)
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<Option<CharacterCard>> {
        Ok(self.list().await?.into_iter().find(|card| card.id == id))
    }
}

async fn read_card(path: &Path) -> Option<CharacterCard> {
    let stem = path.file_stem()?.to_string_lossy().into_owned();
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(error) => {
            warn!(path = %path.display(), ?error, "failed to read character card");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(data) => Some(CharacterCard::from_json(&stem, &data)),
        Err(error) => {
            warn!(path = %path.display(), ?error, "failed to parse character card");
            None
        }
    }
}
