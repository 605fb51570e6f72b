//! Per-variable psychological state: moods and traits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven moods a variable can be in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Afraid,
    Excited,
    Jealous,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Neutral,
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Afraid,
        Mood::Excited,
        Mood::Jealous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "Neutral",
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Angry => "Angry",
            Mood::Afraid => "Afraid",
            Mood::Excited => "Excited",
            Mood::Jealous => "Jealous",
        }
    }

    /// Parse a mood name as written in source (`Happy`, `Sad`, ...).
    pub fn parse(name: &str) -> Option<Mood> {
        Mood::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sticky modifiers attached to a variable.
///
/// Ordering follows declaration order so trait sets print stably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Trait {
    Elder,
    Resilient,
    Tired,
    Lucky,
    Unlucky,
    Paranoid,
    Popular,
    Lonely,
    Cursed,
    Blessed,
    Volatile,
}

impl Trait {
    pub const ALL: [Trait; 11] = [
        Trait::Elder,
        Trait::Resilient,
        Trait::Tired,
        Trait::Lucky,
        Trait::Unlucky,
        Trait::Paranoid,
        Trait::Popular,
        Trait::Lonely,
        Trait::Cursed,
        Trait::Blessed,
        Trait::Volatile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trait::Elder => "Elder",
            Trait::Resilient => "Resilient",
            Trait::Tired => "Tired",
            Trait::Lucky => "Lucky",
            Trait::Unlucky => "Unlucky",
            Trait::Paranoid => "Paranoid",
            Trait::Popular => "Popular",
            Trait::Lonely => "Lonely",
            Trait::Cursed => "Cursed",
            Trait::Blessed => "Blessed",
            Trait::Volatile => "Volatile",
        }
    }

    pub fn parse(name: &str) -> Option<Trait> {
        Trait::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
