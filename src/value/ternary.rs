use std::fmt;

/// Three-valued truth. Connectives follow the Kleene tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ternary {
    True,
    False,
    Unknown,
}

impl Ternary {
    pub fn parse_bool(b: bool) -> Self {
        if b { Self::True } else { Self::False }
    }

    /// Parses the textual forms accepted in literals: TRUE/FALSE/UNKNOWN,
    /// case-insensitive, plus the 0/1 and t/f shorthands.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TRUE" | "T" | "1" => Some(Self::True),
            "FALSE" | "F" | "0" => Some(Self::False),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn not(&self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }

    pub fn and(&self, b: Self) -> Self {
        match (self, b) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::True, Self::True) => Self::True,
        }
    }

    pub fn or(&self, b: Self) -> Self {
        match (self, b) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (Self::False, Self::False) => Self::False,
        }
    }

    pub fn xor(&self, b: Self) -> Self {
        match (self, b) {
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            (a, b) if *a == b => Self::False,
            _ => Self::True,
        }
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::Ternary::{self, False, True, Unknown};

    const ALL: [Ternary; 3] = [True, False, Unknown];

    #[test]
    fn not_follows_kleene() {
        assert_eq!(True.not(), False);
        assert_eq!(False.not(), True);
        assert_eq!(Unknown.not(), Unknown);
    }

    #[test]
    fn and_or_follow_kleene_over_all_pairs() {
        for p in ALL {
            for q in ALL {
                let and = p.and(q);
                let or = p.or(q);
                // AND: False dominates, then Unknown.
                if p == False || q == False {
                    assert_eq!(and, False, "{p} AND {q}");
                } else if p == Unknown || q == Unknown {
                    assert_eq!(and, Unknown, "{p} AND {q}");
                } else {
                    assert_eq!(and, True, "{p} AND {q}");
                }
                // OR: True dominates, then Unknown.
                if p == True || q == True {
                    assert_eq!(or, True, "{p} OR {q}");
                } else if p == Unknown || q == Unknown {
                    assert_eq!(or, Unknown, "{p} OR {q}");
                } else {
                    assert_eq!(or, False, "{p} OR {q}");
                }
            }
        }
    }

    #[test]
    fn xor_is_unknown_poisoned() {
        assert_eq!(True.xor(False), True);
        assert_eq!(False.xor(True), True);
        assert_eq!(True.xor(True), False);
        assert_eq!(False.xor(False), False);
        for p in ALL {
            assert_eq!(p.xor(Unknown), Unknown);
            assert_eq!(Unknown.xor(p), Unknown);
        }
    }

    #[test]
    fn parse_bool_and_textual_forms() {
        assert_eq!(Ternary::parse_bool(true), True);
        assert_eq!(Ternary::parse_bool(false), False);
        assert_eq!(Ternary::parse("true"), Some(True));
        assert_eq!(Ternary::parse("F"), Some(False));
        assert_eq!(Ternary::parse("unknown"), Some(Unknown));
        assert_eq!(Ternary::parse("maybe"), None);
    }
}
