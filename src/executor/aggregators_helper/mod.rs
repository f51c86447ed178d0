mod accumulator;
mod aggregate_impl;
mod aggregate_registry;
mod functions;

pub use accumulator::Accumulator;
pub use aggregate_impl::AggregateImpl;
pub use aggregate_registry::AggregateRegistry;
pub use functions::{list_agg, AvgImpl, CountImpl, MaxImpl, MinImpl, SumImpl};
