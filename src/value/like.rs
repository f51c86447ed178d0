use crate::value::{Primary, Ternary};

/// SQL LIKE. Case-insensitive; `%` matches any run of characters, `_`
/// exactly one, `\` escapes the next character. The pattern decomposes
/// into (min-chars, max-chars, literal) segments; each literal is located
/// by forward substring search, so matching never backtracks.
pub fn like(p1: &Primary, p2: &Primary) -> Ternary {
    if p1.is_null() || p2.is_null() {
        return Ternary::Unknown;
    }
    let subject = match p1.to_text() {
        Some(s) => s.to_uppercase(),
        None => return Ternary::Unknown,
    };
    let pattern = match p2.to_text() {
        Some(s) => s.to_uppercase(),
        None => return Ternary::Unknown,
    };

    if subject == pattern {
        return Ternary::True;
    }
    if pattern.is_empty() {
        return Ternary::False;
    }

    let pattern_chars: Vec<char> = pattern.chars().collect();
    let mut pattern_pos = 0usize;
    let mut s = subject.as_str();

    loop {
        let (min_len, max_len, search, pos) = next_segment(&pattern_chars, pattern_pos);
        pattern_pos = pos;

        let any_string: &str = if !search.is_empty() {
            match s.find(&search) {
                Some(idx) => &s[..idx],
                None => return Ternary::False,
            }
        } else {
            s
        };

        let any_count = any_string.chars().count();
        if any_count < min_len {
            return Ternary::False;
        }
        if max_len >= 0 && (any_count as i64) > max_len {
            return Ternary::False;
        }

        if pattern_chars.len() <= pattern_pos {
            break;
        }

        s = &s[any_string.len() + search.len()..];
    }

    Ternary::True
}

/// Consumes one wildcard run plus the literal that follows it. Returns
/// (min chars, max chars or -1 for unbounded, literal, next position).
fn next_segment(pattern: &[char], position: usize) -> (usize, i64, String, usize) {
    let mut min_len = 0usize;
    let mut max_len: i64 = 0;
    let mut search = String::new();
    let mut next = position;

    let mut escaped = false;
    for &r in &pattern[position..] {
        if escaped {
            match r {
                '%' | '_' => search.push(r),
                _ => {
                    search.push('\\');
                    search.push(r);
                }
            }
            next += 1;
            escaped = false;
            continue;
        }

        if (r == '%' || r == '_') && !search.is_empty() {
            break;
        }
        next += 1;

        match r {
            '%' => max_len = -1,
            '_' => {
                min_len += 1;
                if max_len >= 0 {
                    max_len += 1;
                }
            }
            '\\' => escaped = true,
            _ => search.push(r),
        }
    }
    if escaped {
        search.push('\\');
    }

    (min_len, max_len, search, next)
}
