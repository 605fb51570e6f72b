//! A variable and its hidden psychological state.

use crate::rng::RandomSource;
use sanity_types::ast::DeclKeyword;
use sanity_types::{Mood, Trait, Value};
use std::collections::BTreeSet;

/// Accesses before a variable becomes Happy.
const HAPPY_AT_ACCESS: u64 = 7;
/// Accesses before a variable becomes Tired.
const TIRED_AT_ACCESS: u64 = 200;
/// Age past which a variable becomes Elder.
const ELDER_AGE: u64 = 500;
/// Statements a mood lasts before decaying to Neutral.
const MOOD_LIFETIME: u64 = 200;
/// Unaccessed statements before a Neutral variable turns Sad.
const NEGLECT_AFTER: u64 = 100;
/// Own accesses between self-mutations of a `whatever` variable.
const MUTATE_EVERY: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: Value,
    pub keyword: DeclKeyword,
    pub decl_line: u32,

    pub trust: i64,
    pub doubt: u32,
    pub age: u64,
    pub scars: u32,
    pub mood: Mood,
    /// Statement counter when `mood` was last set.
    pub mood_set_at: u64,
    pub traits: BTreeSet<Trait>,

    pub observed: bool,
    pub last_accessed: u64,
    pub access_count: u64,

    /// Bonded variable names; always mirrored on the other side.
    pub bonds: Vec<String>,
    /// For `pinky`: the linked variable.
    pub pinky_source: Option<String>,
    pub mutation_counter: u32,

    /// Every value this variable has held, oldest first.
    pub history: Vec<Value>,
    pub grief: u32,
    pub is_pretend: bool,
    pub is_uncertain: bool,
    pub previous_value: Option<Value>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value, keyword: DeclKeyword, decl_line: u32) -> Self {
        Self {
            name: name.into(),
            value,
            keyword,
            decl_line,
            trust: 100,
            doubt: 0,
            age: 0,
            scars: 0,
            mood: Mood::Neutral,
            mood_set_at: 0,
            traits: BTreeSet::new(),
            observed: false,
            last_accessed: 0,
            access_count: 0,
            bonds: Vec::new(),
            pinky_source: None,
            mutation_counter: 0,
            history: Vec::new(),
            grief: 0,
            is_pretend: false,
            is_uncertain: false,
            previous_value: None,
        }
    }

    pub fn has_trait(&self, t: Trait) -> bool {
        self.traits.contains(&t)
    }

    pub fn is_elder(&self) -> bool {
        self.has_trait(Trait::Elder)
    }

    /// Record a read at statement `stmt`.
    pub fn record_access(&mut self, stmt: u64) {
        self.access_count += 1;
        self.last_accessed = stmt;
        self.age = stmt;
        if self.keyword == DeclKeyword::Whatever {
            self.mutation_counter += 1;
        }
        if self.access_count == HAPPY_AT_ACCESS {
            self.mood = Mood::Happy;
            self.mood_set_at = stmt;
        }
        if self.access_count >= TIRED_AT_ACCESS {
            self.traits.insert(Trait::Tired);
        }
        if self.age > ELDER_AGE {
            self.traits.insert(Trait::Elder);
        }
    }

    pub fn add_scar(&mut self) {
        self.scars += 1;
        if self.scars >= 3 {
            self.traits.insert(Trait::Resilient);
        }
    }

    /// Lose `amount` trust, clamped at zero. Returns true when this call
    /// took trust from above zero to zero.
    pub fn lose_trust(&mut self, amount: i64) -> bool {
        let before = self.trust;
        self.trust = (self.trust - amount).max(0);
        if self.trust < 50 {
            self.mood = Mood::Angry;
        }
        if self.trust < 30 {
            self.traits.insert(Trait::Paranoid);
        }
        before > 0 && self.trust == 0
    }

    pub fn check_mood_decay(&mut self, stmt: u64) {
        let elapsed = stmt.saturating_sub(self.mood_set_at);
        match self.mood {
            Mood::Neutral => {}
            Mood::Angry => {
                if self.trust >= 50 && elapsed >= MOOD_LIFETIME {
                    self.mood = Mood::Neutral;
                }
            }
            _ => {
                if elapsed >= MOOD_LIFETIME {
                    self.mood = Mood::Neutral;
                }
            }
        }
    }

    pub fn check_sad_from_neglect(&mut self, stmt: u64) {
        if stmt.saturating_sub(self.last_accessed) >= NEGLECT_AFTER && self.mood == Mood::Neutral {
            self.mood = Mood::Sad;
            self.mood_set_at = stmt;
        }
    }

    pub fn apply_mood_to_number(&self, n: f64) -> f64 {
        if self.is_elder() {
            n
        } else if self.mood == Mood::Happy {
            n + 1.0
        } else if self.mood == Mood::Sad || self.has_trait(Trait::Tired) {
            n - 1.0
        } else {
            n
        }
    }

    pub fn apply_mood_to_word(&self, s: String) -> String {
        if self.is_elder() {
            s
        } else if self.mood == Mood::Happy {
            s + "!"
        } else if self.mood == Mood::Sad || self.has_trait(Trait::Tired) {
            drop_last_char(s)
        } else {
            s
        }
    }

    /// Self-mutation for `whatever` variables, run from the periodic sweep.
    /// Returns true when the value changed.
    pub fn check_mutation(&mut self, rng: &mut dyn RandomSource) -> bool {
        if self.keyword != DeclKeyword::Whatever || self.is_elder() {
            return false;
        }
        if self.mutation_counter < MUTATE_EVERY {
            return false;
        }
        self.mutation_counter = 0;
        match &mut self.value {
            Value::Number(n) => {
                *n += *n * 0.1 * rng.sign();
                true
            }
            Value::Word(s) if !s.is_empty() => {
                let mut chars: Vec<char> = s.chars().collect();
                let i = rng.index(chars.len());
                let c = rng.range_inclusive(97, 122) as u8 as char;
                chars[i] = c;
                *s = chars.into_iter().collect();
                true
            }
            _ => false,
        }
    }
}

/// Remove the final character, if any.
pub(crate) fn drop_last_char(mut s: String) -> String {
    s.pop();
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FixedRandom;

    fn var(value: Value) -> Variable {
        Variable::new("subject", value, DeclKeyword::Sure, 1)
    }

    #[test]
    fn seventh_access_makes_happy() {
        let mut v = var(Value::Number(1.0));
        for stmt in 1..=6 {
            v.record_access(stmt);
        }
        assert_eq!(v.mood, Mood::Neutral);
        v.record_access(7);
        assert_eq!(v.mood, Mood::Happy);
        assert_eq!(v.mood_set_at, 7);
    }

    #[test]
    fn trust_never_goes_negative() {
        let mut v = var(Value::Void);
        assert!(!v.lose_trust(60));
        assert_eq!(v.mood, Mood::Angry);
        assert!(v.lose_trust(60));
        assert_eq!(v.trust, 0);
        assert!(v.has_trait(Trait::Paranoid));
        assert!(!v.lose_trust(10));
    }

    #[test]
    fn three_scars_make_resilient() {
        let mut v = var(Value::Void);
        v.add_scar();
        v.add_scar();
        assert!(!v.has_trait(Trait::Resilient));
        v.add_scar();
        assert!(v.has_trait(Trait::Resilient));
    }

    #[test]
    fn angry_decays_only_with_trust() {
        let mut v = var(Value::Void);
        v.mood = Mood::Angry;
        v.trust = 40;
        v.check_mood_decay(500);
        assert_eq!(v.mood, Mood::Angry);
        v.trust = 60;
        v.check_mood_decay(500);
        assert_eq!(v.mood, Mood::Neutral);
    }

    #[test]
    fn elder_ignores_mood_modifiers() {
        let mut v = var(Value::Void);
        v.mood = Mood::Happy;
        assert_eq!(v.apply_mood_to_number(1.0), 2.0);
        v.traits.insert(Trait::Elder);
        assert_eq!(v.apply_mood_to_number(1.0), 1.0);
    }

    #[test]
    fn sad_words_lose_last_char() {
        let mut v = var(Value::Void);
        v.mood = Mood::Sad;
        assert_eq!(v.apply_mood_to_word("hello".into()), "hell");
        assert_eq!(v.apply_mood_to_word(String::new()), "");
    }

    #[test]
    fn whatever_mutates_after_fifty_accesses() {
        let mut v = Variable::new("w", Value::Number(100.0), DeclKeyword::Whatever, 1);
        let mut rng = FixedRandom(0.9);
        for stmt in 0..49 {
            v.record_access(stmt);
        }
        assert!(!v.check_mutation(&mut rng));
        v.record_access(50);
        assert!(v.check_mutation(&mut rng));
        assert_eq!(v.value, Value::Number(110.0));
        assert_eq!(v.mutation_counter, 0);
    }
}
