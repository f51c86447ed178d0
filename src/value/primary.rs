use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone};
use ordered_float::OrderedFloat;

use crate::flags;
use crate::value::Ternary;

/// A scalar value. The unit of data everywhere in the engine: cells,
/// variables, cursor rows and expression results are all `Primary`.
#[derive(Debug, Clone, PartialEq)]
pub enum Primary {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Ternary(Ternary),
    Datetime(DateTime<FixedOffset>),
    Null,
}

/// Hashable identity of a value for grouping, DISTINCT and set operations.
/// Integral floats collapse onto integers and strings compare trimmed and
/// case-insensitive, so the key agrees with the combined comparator for
/// values it considers equal. NULL is an ordinary key here: grouping treats
/// NULL = NULL even though predicates do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Time(i64),
}

impl Primary {
    pub fn is_null(&self) -> bool {
        matches!(self, Primary::Null)
    }

    /// The boolean-context projection of the value.
    pub fn ternary(&self) -> Ternary {
        match self {
            Primary::String(s) => match parse_bool_literal(s) {
                Some(b) => Ternary::parse_bool(b),
                None => Ternary::Unknown,
            },
            Primary::Integer(0) => Ternary::False,
            Primary::Integer(1) => Ternary::True,
            Primary::Integer(_) => Ternary::Unknown,
            Primary::Float(f) if *f == 0.0 => Ternary::False,
            Primary::Float(f) if *f == 1.0 => Ternary::True,
            Primary::Float(_) => Ternary::Unknown,
            Primary::Boolean(b) => Ternary::parse_bool(*b),
            Primary::Ternary(t) => *t,
            Primary::Datetime(_) => Ternary::Unknown,
            Primary::Null => Ternary::Unknown,
        }
    }

    /// Numeric coercion. Strings parse after trimming.
    pub fn to_float(&self) -> Option<f64> {
        match self {
            Primary::Integer(i) => Some(*i as f64),
            Primary::Float(f) => Some(*f),
            Primary::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Integral coercion, used where the dialect requires whole numbers
    /// (LIMIT, OFFSET, FETCH positions, column numbers).
    pub fn to_integer(&self) -> Option<i64> {
        match self {
            Primary::Integer(i) => Some(*i),
            Primary::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Primary::String(s) => {
                let t = s.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            }
            _ => None,
        }
    }

    /// Temporal coercion. String forms are interpreted in the process
    /// location.
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Primary::Datetime(dt) => Some(*dt),
            Primary::String(s) => str_to_datetime(s),
            _ => None,
        }
    }

    pub fn to_boolean(&self) -> Option<bool> {
        match self {
            Primary::Boolean(b) => Some(*b),
            Primary::Ternary(Ternary::True) => Some(true),
            Primary::Ternary(Ternary::False) => Some(false),
            Primary::String(s) => parse_bool_literal(s),
            Primary::Integer(0) => Some(false),
            Primary::Integer(1) => Some(true),
            Primary::Float(f) if *f == 0.0 => Some(false),
            Primary::Float(f) if *f == 1.0 => Some(true),
            _ => None,
        }
    }

    /// Textual coercion for LIKE and concatenation. Only values with an
    /// obvious text form convert; booleans and datetimes do not.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Primary::String(s) => Some(s.clone()),
            Primary::Integer(i) => Some(i.to_string()),
            Primary::Float(f) => Some(format_float(*f)),
            _ => None,
        }
    }

    pub fn comparison_key(&self) -> ComparisonKey {
        match self {
            Primary::Null => ComparisonKey::Null,
            Primary::Boolean(b) => ComparisonKey::Bool(*b),
            Primary::Ternary(Ternary::True) => ComparisonKey::Bool(true),
            Primary::Ternary(Ternary::False) => ComparisonKey::Bool(false),
            Primary::Ternary(Ternary::Unknown) => ComparisonKey::Null,
            Primary::Integer(i) => ComparisonKey::Int(*i),
            Primary::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() && *f >= i64::MIN as f64 && *f <= i64::MAX as f64
                {
                    ComparisonKey::Int(*f as i64)
                } else {
                    ComparisonKey::Float(OrderedFloat(*f))
                }
            }
            Primary::String(s) => ComparisonKey::Str(s.trim().to_uppercase()),
            Primary::Datetime(dt) => {
                ComparisonKey::Time(dt.timestamp_nanos_opt().unwrap_or_else(|| dt.timestamp()))
            }
        }
    }
}

impl fmt::Display for Primary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primary::String(s) => write!(f, "'{}'", s),
            Primary::Integer(i) => write!(f, "{}", i),
            Primary::Float(v) => write!(f, "{}", format_float(*v)),
            Primary::Boolean(b) => write!(f, "{}", b),
            Primary::Ternary(t) => write!(f, "{}", t),
            Primary::Datetime(dt) => {
                write!(f, "'{}'", dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Primary::Null => write!(f, "NULL"),
        }
    }
}

/// Unambiguous float rendering: integral values keep a trailing `.0` so
/// they never read back as integers.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// The exact literal set the dialect accepts as booleans.
pub fn parse_bool_literal(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parses a datetime string in the process location. Accepts the dialect's
/// plain forms and RFC 3339 (which carries its own offset).
pub fn str_to_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    let loc = flags::location();
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y/%m/%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return loc.from_local_datetime(&naive).single();
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return loc.from_local_datetime(&naive).single();
        }
    }
    DateTime::parse_from_rfc3339(s).ok()
}
