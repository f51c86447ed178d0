use crate::executor::aggregators_helper::Accumulator;

/// One aggregate function: a name and a factory for its per-group state.
pub trait AggregateImpl: Send + Sync {
    fn name(&self) -> &'static str;

    fn create_accumulator(&self) -> Box<dyn Accumulator>;
}
