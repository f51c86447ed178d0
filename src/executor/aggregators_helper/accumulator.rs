use crate::value::Primary;

/// The per-group state of one aggregate call.
///
/// The executor evaluates the call's argument once per group member and
/// feeds each value through `update`; `finalize` produces the result.
/// NULL members are each aggregate's business to skip; DISTINCT is the
/// executor's business (it dedupes before updating), so implementations
/// only carry the plain semantics.
pub trait Accumulator: Send {
    fn update(&mut self, value: &Primary);

    fn finalize(&self) -> Primary;
}
