//! Where deleted, overridden and evicted values go.

use sanity_types::{Mood, Value};
use std::collections::BTreeMap;

/// Reads an afterlife entry survives before it is consumed.
pub const SEANCE_LIMIT: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Soul {
    pub value: Value,
    pub mood: Mood,
    pub scars: u32,
    pub seances: u32,
}

#[derive(Debug, Default)]
pub struct Afterlife {
    souls: BTreeMap<String, Vec<Soul>>,
}

impl Afterlife {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, name: &str, value: Value, mood: Mood, scars: u32) {
        tracing::debug!(name, "sent to afterlife");
        self.souls.entry(name.to_string()).or_default().push(Soul {
            value,
            mood,
            scars,
            seances: 0,
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.souls.get(name).is_some_and(|v| !v.is_empty())
    }

    pub fn souls(&self, name: &str) -> &[Soul] {
        self.souls.get(name).map_or(&[], Vec::as_slice)
    }

    /// Number of names with at least one entry.
    pub fn len(&self) -> usize {
        self.souls.values().filter(|v| !v.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the newest entry for `name`.
    ///
    /// An entry already read [`SEANCE_LIMIT`] times is consumed and the
    /// read yields `Void`; an entry that died Afraid always reads `Void`.
    pub fn summon(&mut self, name: &str) -> Value {
        let Some(entries) = self.souls.get_mut(name) else {
            return Value::Void;
        };
        let Some(latest) = entries.last_mut() else {
            return Value::Void;
        };
        if latest.seances >= SEANCE_LIMIT {
            entries.pop();
            return Value::Void;
        }
        latest.seances += 1;
        if latest.mood == Mood::Afraid {
            Value::Void
        } else {
            latest.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_reads_then_gone() {
        let mut a = Afterlife::new();
        a.send("x", Value::Number(5.0), Mood::Neutral, 0);
        for _ in 0..3 {
            assert_eq!(a.summon("x"), Value::Number(5.0));
        }
        assert_eq!(a.summon("x"), Value::Void);
        assert!(!a.contains("x"));
    }

    #[test]
    fn afraid_souls_stay_silent() {
        let mut a = Afterlife::new();
        a.send("x", Value::Number(5.0), Mood::Afraid, 0);
        assert_eq!(a.summon("x"), Value::Void);
        assert_eq!(a.souls("x")[0].seances, 1);
    }

    #[test]
    fn newest_entry_answers_first() {
        let mut a = Afterlife::new();
        a.send("x", Value::Number(1.0), Mood::Neutral, 0);
        a.send("x", Value::Number(2.0), Mood::Neutral, 0);
        assert_eq!(a.summon("x"), Value::Number(2.0));
    }
}
