use std::cmp::Ordering;
use std::fmt;

use crate::value::{Primary, Ternary};

/// Outcome of comparing two values in their first shared coercion domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonResult {
    Equal,
    NotEqual,
    Less,
    Greater,
    Incommensurable,
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "EQUAL",
            Self::NotEqual => "NOT_EQUAL",
            Self::Less => "LESS",
            Self::Greater => "GREATER",
            Self::Incommensurable => "INCOMMENSURABLE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "=",
            Self::NotEqual => "<>",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Compares two values by trying coercion domains in order: float, then
/// datetime, then boolean (unordered), then string. NULL on either side,
/// or no shared domain, is INCOMMENSURABLE.
pub fn compare_combinedly(p1: &Primary, p2: &Primary) -> ComparisonResult {
    if p1.is_null() || p2.is_null() {
        return ComparisonResult::Incommensurable;
    }

    if let (Some(f1), Some(f2)) = (p1.to_float(), p2.to_float()) {
        return match f1.partial_cmp(&f2) {
            Some(Ordering::Equal) => ComparisonResult::Equal,
            Some(Ordering::Less) => ComparisonResult::Less,
            Some(Ordering::Greater) => ComparisonResult::Greater,
            None => ComparisonResult::Incommensurable,
        };
    }

    if let (Some(d1), Some(d2)) = (p1.to_datetime(), p2.to_datetime()) {
        return match d1.cmp(&d2) {
            Ordering::Equal => ComparisonResult::Equal,
            Ordering::Less => ComparisonResult::Less,
            Ordering::Greater => ComparisonResult::Greater,
        };
    }

    if let (Some(b1), Some(b2)) = (p1.to_boolean(), p2.to_boolean()) {
        return if b1 == b2 {
            ComparisonResult::Equal
        } else {
            ComparisonResult::NotEqual
        };
    }

    if let (Primary::String(s1), Primary::String(s2)) = (p1, p2) {
        let v1 = s1.to_uppercase();
        let v2 = s2.to_uppercase();
        return match v1.cmp(&v2) {
            Ordering::Equal => ComparisonResult::Equal,
            Ordering::Less => ComparisonResult::Less,
            Ordering::Greater => ComparisonResult::Greater,
        };
    }

    ComparisonResult::Incommensurable
}

pub fn equal_to(p1: &Primary, p2: &Primary) -> Ternary {
    match compare_combinedly(p1, p2) {
        ComparisonResult::Incommensurable => Ternary::Unknown,
        r => Ternary::parse_bool(r == ComparisonResult::Equal),
    }
}

pub fn not_equal_to(p1: &Primary, p2: &Primary) -> Ternary {
    match compare_combinedly(p1, p2) {
        ComparisonResult::Incommensurable => Ternary::Unknown,
        r => Ternary::parse_bool(r != ComparisonResult::Equal),
    }
}

pub fn less_than(p1: &Primary, p2: &Primary) -> Ternary {
    match compare_combinedly(p1, p2) {
        ComparisonResult::Incommensurable | ComparisonResult::NotEqual => Ternary::Unknown,
        r => Ternary::parse_bool(r == ComparisonResult::Less),
    }
}

pub fn greater_than(p1: &Primary, p2: &Primary) -> Ternary {
    match compare_combinedly(p1, p2) {
        ComparisonResult::Incommensurable | ComparisonResult::NotEqual => Ternary::Unknown,
        r => Ternary::parse_bool(r == ComparisonResult::Greater),
    }
}

pub fn less_than_or_equal_to(p1: &Primary, p2: &Primary) -> Ternary {
    match compare_combinedly(p1, p2) {
        ComparisonResult::Incommensurable | ComparisonResult::NotEqual => Ternary::Unknown,
        r => Ternary::parse_bool(r != ComparisonResult::Greater),
    }
}

pub fn greater_than_or_equal_to(p1: &Primary, p2: &Primary) -> Ternary {
    match compare_combinedly(p1, p2) {
        ComparisonResult::Incommensurable | ComparisonResult::NotEqual => Ternary::Unknown,
        r => Ternary::parse_bool(r != ComparisonResult::Less),
    }
}

pub fn compare(p1: &Primary, p2: &Primary, op: ComparisonOperator) -> Ternary {
    match op {
        ComparisonOperator::Equal => equal_to(p1, p2),
        ComparisonOperator::NotEqual => not_equal_to(p1, p2),
        ComparisonOperator::LessThan => less_than(p1, p2),
        ComparisonOperator::GreaterThan => greater_than(p1, p2),
        ComparisonOperator::LessThanOrEqual => less_than_or_equal_to(p1, p2),
        ComparisonOperator::GreaterThanOrEqual => greater_than_or_equal_to(p1, p2),
    }
}

/// Null-safe equality: two NULLs are TRUE, otherwise plain equality.
pub fn equivalent_to(p1: &Primary, p2: &Primary) -> Ternary {
    if p1.is_null() && p2.is_null() {
        return Ternary::True;
    }
    equal_to(p1, p2)
}

/// The IS operator: compares the ternary projections directly, so
/// `x IS UNKNOWN` is TRUE exactly when x projects to UNKNOWN.
pub fn is(p1: &Primary, p2: &Primary) -> Ternary {
    Ternary::parse_bool(p1.ternary() == p2.ternary())
}

pub fn between(p: &Primary, low: &Primary, high: &Primary) -> Ternary {
    greater_than_or_equal_to(p, low).and(less_than_or_equal_to(p, high))
}

/// TRUE as soon as one element compares TRUE; an UNKNOWN comparison keeps
/// the result from ever reaching FALSE.
pub fn any(p: &Primary, list: &[Primary], op: ComparisonOperator) -> Ternary {
    let mut result = Ternary::False;
    for v in list {
        match compare(p, v, op) {
            Ternary::True => return Ternary::True,
            Ternary::Unknown => {
                if result == Ternary::False {
                    result = Ternary::Unknown;
                }
            }
            Ternary::False => {}
        }
    }
    result
}

/// FALSE as soon as one element compares FALSE; an UNKNOWN comparison keeps
/// the result from ever reaching TRUE.
pub fn all(p: &Primary, list: &[Primary], op: ComparisonOperator) -> Ternary {
    let mut result = Ternary::True;
    for v in list {
        match compare(p, v, op) {
            Ternary::False => return Ternary::False,
            Ternary::Unknown => {
                if result == Ternary::True {
                    result = Ternary::Unknown;
                }
            }
            Ternary::True => {}
        }
    }
    result
}
