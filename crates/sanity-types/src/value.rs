//! Runtime values and the rules that relate them: coercion, truthiness,
//! the three flavours of equality, and display formatting.

use serde_json::{Map, Number as JsonNumber, Value as Json};
use std::collections::BTreeMap;
use std::fmt;

/// Blob field naming the personality an instance was built from.
/// Hidden from display; method calls on the blob resolve through it.
pub const PERSONALITY_FIELD: &str = "__personality";

/// A SanityLang runtime value.
///
/// Cloning is always a deep copy, so lists and blobs never alias between
/// bindings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Word(String),
    Yep,
    Nope,
    /// Indeterminate truth; resolves per evaluation scope (see [`Value::is_truthy`]).
    Dunno,
    Void,
    List(Vec<Value>),
    Blob(BTreeMap<String, Value>),
}

impl Value {
    pub fn word(s: impl Into<String>) -> Self {
        Value::Word(s.into())
    }

    pub fn truth(b: bool) -> Self {
        if b {
            Value::Yep
        } else {
            Value::Nope
        }
    }

    /// Type tag as written in `check` cases and debug output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Word(_) => "Word",
            Value::Yep => "Yep",
            Value::Nope => "Nope",
            Value::Dunno => "Dunno",
            Value::Void => "Void",
            Value::List(_) => "List",
            Value::Blob(_) => "Blob",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn is_dunno(&self) -> bool {
        matches!(self, Value::Dunno)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Value::Word(s) => Some(s),
            _ => None,
        }
    }

    /// The personality a `become` instance belongs to.
    pub fn personality(&self) -> Option<&str> {
        match self {
            Value::Blob(fields) => fields.get(PERSONALITY_FIELD).and_then(Value::as_word),
            _ => None,
        }
    }

    /// Whether two values carry the same type tag.
    pub fn same_type(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Truthiness of a value.
    ///
    /// `Dunno` has no fixed truth: it resolves from the evaluating scope's
    /// id, so it is stable inside one scope and may differ across scopes.
    pub fn is_truthy(&self, scope_id: u64) -> bool {
        match self {
            Value::Void | Value::Nope => false,
            Value::Yep => true,
            Value::Number(n) => *n != 0.0,
            Value::Word(s) => !s.is_empty(),
            Value::Dunno => scope_id % 2 == 0,
            Value::List(items) => !items.is_empty(),
            Value::Blob(fields) => !fields.is_empty(),
        }
    }

    // ── JSON ──────────────────────────────────────────────────────────────

    /// Convert to a JSON document. `Void` and `Dunno` become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Json::Number(JsonNumber::from(*n as i64))
                } else {
                    JsonNumber::from_f64(*n).map_or(Json::Null, Json::Number)
                }
            }
            Value::Word(s) => Json::String(s.clone()),
            Value::Yep => Json::Bool(true),
            Value::Nope => Json::Bool(false),
            Value::Dunno | Value::Void => Json::Null,
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Blob(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    /// Infer a value from untyped JSON.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Void,
            Json::Bool(b) => Value::truth(*b),
            Json::Number(n) => n.as_f64().map_or(Value::Void, Value::Number),
            Json::String(s) => Value::Word(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(fields) => Value::Blob(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Rebuild a value from a `{type, value}` pair as stored in dream files.
    /// Unknown or mismatched pairs decay to `Void`.
    pub fn from_typed_json(type_name: &str, json: &Json) -> Value {
        match (type_name, json) {
            ("Number", Json::Number(n)) => n.as_f64().map_or(Value::Void, Value::Number),
            ("Word", Json::String(s)) => Value::Word(s.clone()),
            ("Yep", _) => Value::Yep,
            ("Nope", _) => Value::Nope,
            ("Dunno", _) => Value::Dunno,
            ("List", Json::Array(_)) | ("Blob", Json::Object(_)) => Value::from_json(json),
            _ => Value::Void,
        }
    }
}

/// Format a number the way SanityLang prints it: integral values have no
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Word(s) => f.write_str(s),
            Value::Yep => f.write_str("yep"),
            Value::Nope => f.write_str("nope"),
            Value::Dunno => f.write_str("dunno"),
            Value::Void => f.write_str("Void"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Blob(fields) => {
                f.write_str("{")?;
                let visible = fields.iter().filter(|(k, _)| k.as_str() != PERSONALITY_FIELD);
                for (i, (k, v)) in visible.enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Coercion
// ══════════════════════════════════════════════════════════════════════════════

/// Result of [`coerce`]: both operands plus whether each one changed type.
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    pub left: Value,
    pub right: Value,
    pub left_coerced: bool,
    pub right_coerced: bool,
}

/// Coerce two operands for a binary operation.
///
/// `concat` selects the `&` rules, under which a Number facing a Word turns
/// into text instead of the Word turning into a Number.
pub fn coerce(left: &Value, right: &Value, concat: bool) -> Coerced {
    let mut out = Coerced {
        left: left.clone(),
        right: right.clone(),
        left_coerced: false,
        right_coerced: false,
    };

    if left.is_void() || right.is_void() || left.is_dunno() || right.is_dunno() {
        return out;
    }

    // Yep/Nope against a Number or Word, each side independently.
    if let Some(b) = truth_of(&out.left) {
        match out.right {
            Value::Number(_) => {
                out.left = Value::Number(if b { 1.0 } else { 0.0 });
                out.left_coerced = true;
            }
            Value::Word(_) => {
                out.left = Value::word(if b { "yep" } else { "nope" });
                out.left_coerced = true;
            }
            _ => {}
        }
    }
    if let Some(b) = truth_of(&out.right) {
        match out.left {
            Value::Number(_) => {
                out.right = Value::Number(if b { 1.0 } else { 0.0 });
                out.right_coerced = true;
            }
            Value::Word(_) => {
                out.right = Value::word(if b { "yep" } else { "nope" });
                out.right_coerced = true;
            }
            _ => {}
        }
    }

    match (&out.left, &out.right) {
        (Value::Number(n), Value::Word(s)) => {
            if concat {
                out.left = Value::Word(format_number(*n));
                out.left_coerced = true;
            } else {
                out.right = Value::Number(parse_number(s));
                out.right_coerced = true;
            }
        }
        (Value::Word(s), Value::Number(n)) => {
            if concat {
                out.right = Value::Word(format_number(*n));
                out.right_coerced = true;
            } else {
                out.left = Value::Number(parse_number(s));
                out.left_coerced = true;
            }
        }
        _ => {}
    }

    match (&out.left, &out.right) {
        (Value::List(items), Value::Number(_)) => {
            out.left = Value::Number(items.len() as f64);
            out.left_coerced = true;
        }
        (Value::List(_), Value::Word(_)) => {
            out.left = Value::Word(out.left.to_string());
            out.left_coerced = true;
        }
        (Value::Number(_), Value::List(items)) => {
            out.right = Value::Number(items.len() as f64);
            out.right_coerced = true;
        }
        (Value::Word(_), Value::List(_)) => {
            out.right = Value::Word(out.right.to_string());
            out.right_coerced = true;
        }
        _ => {}
    }

    out
}

fn truth_of(value: &Value) -> Option<bool> {
    match value {
        Value::Yep => Some(true),
        Value::Nope => Some(false),
        _ => None,
    }
}

/// Numeric reading of a Word; anything unparseable is 0.
fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

// ══════════════════════════════════════════════════════════════════════════════
// Equality
// ══════════════════════════════════════════════════════════════════════════════

/// Edit distance between two strings, counted in chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let insertion = prev[j + 1] + 1;
            let deletion = curr[j] + 1;
            let substitution = prev[j] + usize::from(ca != cb);
            curr.push(insertion.min(deletion).min(substitution));
        }
        prev = curr;
    }
    prev[b.len()]
}

/// `~=`: same type and close enough.
///
/// Numbers are close within 20% of the larger magnitude (0.2 absolute when
/// one side is zero); Words within an edit distance of 3.
pub fn vibes_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            if *a == 0.0 && *b == 0.0 {
                true
            } else if *a == 0.0 || *b == 0.0 {
                (a - b).abs() <= 0.2
            } else {
                (a - b).abs() / a.abs().max(b.abs()) <= 0.2
            }
        }
        (Value::Word(a), Value::Word(b)) => levenshtein(a, b) <= 3,
        _ => strict_equal(left, right),
    }
}

/// `==`: equal after coercion.
pub fn loose_equal(left: &Value, right: &Value) -> bool {
    if left.same_type(right) {
        return left == right;
    }
    let c = coerce(left, right, false);
    match (&c.left, &c.right) {
        // Both sides lack a payload.
        (Value::Void | Value::Dunno, Value::Void | Value::Dunno) => true,
        (l, r) => l.same_type(r) && l == r,
    }
}

/// `===`: same type and same value.
pub fn strict_equal(left: &Value, right: &Value) -> bool {
    left.same_type(right) && left == right
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_print_without_fraction() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn dunno_follows_scope_parity() {
        assert!(Value::Dunno.is_truthy(0));
        assert!(!Value::Dunno.is_truthy(1));
        assert!(Value::Dunno.is_truthy(42));
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn parse_number_falls_back_to_zero() {
        assert_eq!(parse_number(" 3.5 "), 3.5);
        assert_eq!(parse_number("banana"), 0.0);
    }
}
