//! File handles with moods.
//!
//! A handle's starting mood, trust and traits come from the file
//! extension. Angry handles refuse to write (and lose trust for it);
//! Tired handles occasionally drop the tail of what they write.

use crate::rng::RandomSource;
use sanity_types::{Mood, Trait};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Base SP cost of one read or write.
pub const BASE_IO_COST: i64 = 3;
/// Files larger than this make their handle Tired on read.
const TIRED_READ_BYTES: usize = 1024 * 1024;
const TIRED_TRUNCATE_CHANCE: f64 = 0.05;

fn starting_state(path: &Path) -> (Mood, i64, &'static [Trait]) {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());
    match ext.as_deref() {
        None => (Mood::Neutral, 70, &[]),
        Some("san") | Some("md") => (Mood::Happy, 70, &[]),
        Some("txt") => (Mood::Neutral, 70, &[]),
        Some("json") => (Mood::Neutral, 70, &[Trait::Paranoid]),
        Some("csv") => (Mood::Sad, 70, &[]),
        Some("log") => (Mood::Neutral, 70, &[Trait::Tired]),
        Some("yaml") | Some("yml") => (Mood::Afraid, 70, &[]),
        Some("xml") => (Mood::Angry, 70, &[]),
        Some("env") => (Mood::Neutral, 40, &[Trait::Paranoid]),
        Some(_) => (Mood::Afraid, 70, &[]),
    }
}

#[derive(Debug)]
pub struct FileHandle {
    pub name: String,
    pub path: PathBuf,
    file: Option<File>,
    pub bytes_read: usize,
    pub bytes_written: usize,
    pub observed: bool,
    pub mood: Mood,
    pub trust: i64,
    pub traits: BTreeSet<Trait>,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        let path = path.into();
        let (mood, trust, traits) = starting_state(&path);
        Self {
            name: name.into(),
            path,
            file: None,
            bytes_read: 0,
            bytes_written: 0,
            observed: false,
            mood,
            trust,
            traits: traits.iter().copied().collect(),
        }
    }

    /// Open for reading and writing, creating the file and its parent
    /// directories when missing.
    pub fn open(&mut self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        self.file = Some(file);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file(&mut self) -> io::Result<&mut File> {
        let name = self.name.clone();
        self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, format!("File handle '{name}' is closed"))
        })
    }

    pub fn read(&mut self) -> io::Result<String> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(0))?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        self.bytes_read += content.len();
        self.observed = true;
        if content.len() > TIRED_READ_BYTES {
            self.mood = Mood::Neutral;
            self.traits.insert(Trait::Tired);
        }
        Ok(content)
    }

    /// Replace the file's contents. Returns whether anything was written.
    pub fn write(&mut self, content: &str, rng: &mut dyn RandomSource) -> io::Result<bool> {
        let Some(content) = self.prepare(content, rng) else {
            return Ok(false);
        };
        let file = self.file()?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        self.bytes_written += content.len();
        Ok(true)
    }

    /// Append to the file. Returns whether anything was written.
    pub fn append(&mut self, content: &str, rng: &mut dyn RandomSource) -> io::Result<bool> {
        let Some(content) = self.prepare(content, rng) else {
            return Ok(false);
        };
        let file = self.file()?;
        file.seek(SeekFrom::End(0))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        self.bytes_written += content.len();
        Ok(true)
    }

    /// Apply mood effects to outgoing content. `None` means the write
    /// silently fails.
    fn prepare(&mut self, content: &str, rng: &mut dyn RandomSource) -> Option<String> {
        if self.mood == Mood::Angry {
            self.trust = (self.trust - 10).max(0);
            return None;
        }
        if self.traits.contains(&Trait::Tired) && rng.chance(TIRED_TRUNCATE_CHANCE) {
            let len = content.chars().count();
            let cut = (len * 9 / 10).max(1);
            return Some(content.chars().take(cut).collect());
        }
        Some(content.to_string())
    }

    pub fn close(&mut self) {
        self.file = None;
    }

    pub fn size_bytes(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    /// SP cost of touching this file: `base + ceil(log2(KiB + 1))`.
    pub fn sp_cost(&self, base: i64) -> i64 {
        let kib = self.size_bytes() as f64 / 1024.0;
        base + (kib + 1.0).log2().ceil() as i64
    }
}
