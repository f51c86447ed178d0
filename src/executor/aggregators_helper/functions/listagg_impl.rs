use crate::value::Primary;

/// LISTAGG: the text forms of the non-NULL values joined by a separator.
/// Ordering and DISTINCT are applied by the evaluator before calling;
/// all-NULL input yields NULL. A value with no text form renders through
/// its display form so booleans and datetimes still concatenate.
pub fn list_agg(values: &[Primary], separator: &str) -> Primary {
    let mut parts: Vec<String> = Vec::new();
    for value in values {
        if value.is_null() {
            continue;
        }
        parts.push(value.to_text().unwrap_or_else(|| value.to_string()));
    }
    if parts.is_empty() {
        Primary::Null
    } else {
        Primary::String(parts.join(separator))
    }
}
