use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Text encoding of source files. Conversion happens in the readers; the
/// core only forwards the choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Utf8,
    Sjis,
}

/// Ambient session configuration. A `Session` owns one; the loader and the
/// processor read it, nothing in the core mutates it mid-statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flags {
    /// Directory table identifiers are resolved against.
    pub repository: String,
    pub delimiter: char,
    pub encoding: Encoding,
    /// Treat the first line as data, not column names.
    pub no_header: bool,
    /// Timezone spec: "UTC", "Local" or a fixed offset like "+09:00".
    pub location: String,
    /// Frozen wall clock for deterministic runs,
    /// `YYYY-MM-DD HH:MM:SS.fffffffff`. Empty means the real clock.
    pub now: String,
    pub quiet: bool,
    pub strip_ending_line_break: bool,
    /// When set, non-coercible operands in arithmetic and concatenation
    /// are errors instead of NULL.
    pub strict_types: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            repository: String::new(),
            delimiter: ',',
            encoding: Encoding::Utf8,
            no_header: false,
            location: "UTC".to_string(),
            now: String::new(),
            quiet: false,
            strip_ending_line_break: false,
            strict_types: false,
        }
    }
}

impl Flags {
    /// The instant queries started under this configuration observe as NOW.
    pub fn query_now(&self) -> DateTime<FixedOffset> {
        if !self.now.is_empty() {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&self.now, "%Y-%m-%d %H:%M:%S%.f") {
                if let Some(dt) = location().from_local_datetime(&naive).single() {
                    return dt;
                }
            }
        }
        Utc::now().with_timezone(&location())
    }
}

static LOCATION: OnceCell<FixedOffset> = OnceCell::new();

/// Resolves the process timezone once. Later calls with a different spec
/// have no effect; an unparsable spec falls back to UTC.
pub fn init_location(spec: &str) {
    let _ = LOCATION.set(parse_location(spec).unwrap_or_else(utc));
}

pub fn location() -> FixedOffset {
    *LOCATION.get_or_init(utc)
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

fn parse_location(spec: &str) -> Option<FixedOffset> {
    match spec {
        "" | "UTC" | "utc" => Some(utc()),
        "Local" | "local" => Some(*Local::now().offset()),
        _ => {
            let (sign, rest) = match spec.as_bytes().first()? {
                b'+' => (1, &spec[1..]),
                b'-' => (-1, &spec[1..]),
                _ => return None,
            };
            let (h, m) = rest.split_once(':')?;
            let secs = sign * (h.parse::<i32>().ok()? * 3600 + m.parse::<i32>().ok()? * 60);
            FixedOffset::east_opt(secs)
        }
    }
}

static RNG: Lazy<Mutex<StdRng>> = Lazy::new(|| Mutex::new(StdRng::from_entropy()));

/// Process-wide random source backing the RAND() builtin.
pub fn random_f64() -> f64 {
    RNG.lock().gen()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_are_csv_utf8_with_header() {
        let f = Flags::default();
        assert_eq!(f.delimiter, ',');
        assert_eq!(f.encoding, Encoding::Utf8);
        assert!(!f.no_header);
        assert!(f.now.is_empty());
    }

    #[test]
    fn offset_specs_parse() {
        assert_eq!(parse_location("UTC"), Some(utc()));
        assert_eq!(parse_location("+09:00"), FixedOffset::east_opt(9 * 3600));
        assert_eq!(parse_location("-05:30"), FixedOffset::east_opt(-(5 * 3600 + 30 * 60)));
        assert_eq!(parse_location("Mars/Olympus"), None);
    }

    #[test]
    fn frozen_now_overrides_the_clock() {
        let flags = Flags {
            now: "2024-06-01 12:00:00.000000000".to_string(),
            ..Flags::default()
        };
        let t = flags.query_now();
        assert_eq!(t.timestamp(), 1717243200);
    }

    #[test]
    fn random_is_in_unit_interval() {
        for _ in 0..16 {
            let r = random_f64();
            assert!((0.0..1.0).contains(&r));
        }
    }
}
