//! Sidecar files kept beside the running program.
//!
//! * `<src>.dream`: pretty-printed JSON object `name → {type, value}`.
//! * `<src>.blame`: append-only `[timestamp] message` lines.
//! * `<src>.therapy`: append-only session snapshots.
//!
//! Without a source path every operation is a no-op.

use sanity_types::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One persisted dream variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DreamRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub value: Json,
}

impl DreamRecord {
    pub fn from_value(value: &Value) -> Self {
        Self {
            type_name: value.type_name().to_string(),
            value: value.to_json(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from_typed_json(&self.type_name, &self.value)
    }
}

/// What a dream load found.
#[derive(Debug, Clone, PartialEq)]
pub enum DreamLoad {
    /// No source path: persistence disabled.
    Disabled,
    /// The sidecar does not exist (or could not be parsed).
    Missing,
    Found(BTreeMap<String, Value>),
}

#[derive(Debug, Clone, Default)]
pub struct Sidecars {
    source: Option<PathBuf>,
}

fn sidecar(source: &Path, suffix: &str) -> PathBuf {
    let mut os = source.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Local time in ISO-8601 with microseconds.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

impl Sidecars {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn dream_path(&self) -> Option<PathBuf> {
        self.source.as_deref().map(|s| sidecar(s, ".dream"))
    }

    pub fn blame_path(&self) -> Option<PathBuf> {
        self.source.as_deref().map(|s| sidecar(s, ".blame"))
    }

    pub fn therapy_path(&self) -> Option<PathBuf> {
        self.source.as_deref().map(|s| sidecar(s, ".therapy"))
    }

    /// `mercy.san` in the source file's directory.
    pub fn mercy_path(&self) -> Option<PathBuf> {
        let dir = self.source.as_deref()?.parent()?;
        Some(dir.join("mercy.san"))
    }

    pub fn load_dreams(&self) -> DreamLoad {
        let Some(path) = self.dream_path() else {
            return DreamLoad::Disabled;
        };
        let Ok(text) = fs::read_to_string(&path) else {
            return DreamLoad::Missing;
        };
        match serde_json::from_str::<BTreeMap<String, DreamRecord>>(&text) {
            Ok(records) => DreamLoad::Found(
                records
                    .into_iter()
                    .map(|(name, record)| (name, record.to_value()))
                    .collect(),
            ),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "unreadable dream file");
                DreamLoad::Missing
            }
        }
    }

    /// Persist dream variables. Nothing is written when there are none.
    pub fn save_dreams(&self, dreams: &BTreeMap<String, Value>) -> io::Result<()> {
        let Some(path) = self.dream_path() else {
            return Ok(());
        };
        if dreams.is_empty() {
            return Ok(());
        }
        let records: BTreeMap<&String, DreamRecord> = dreams
            .iter()
            .map(|(name, value)| (name, DreamRecord::from_value(value)))
            .collect();
        let text = serde_json::to_string_pretty(&records)?;
        fs::write(path, text)
    }

    pub fn append_blame(&self, message: &str) -> io::Result<()> {
        let Some(path) = self.blame_path() else {
            return Ok(());
        };
        append(&path, &format!("[{}] {message}\n", timestamp()))
    }

    pub fn append_therapy(&self, report: &str) -> io::Result<()> {
        let Some(path) = self.therapy_path() else {
            return Ok(());
        };
        append(
            &path,
            &format!("\n--- Session: {} ---\n{report}\n", timestamp()),
        )
    }
}

fn append(path: &Path, text: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(text.as_bytes())
}
