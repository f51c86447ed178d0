pub mod aggregators_helper;
pub mod analytic;
pub mod eval;
pub mod functions;
pub mod join;
pub mod select;
pub mod statement;

#[cfg(test)]
mod _tests;

pub use eval::{eval, eval_ternary, RowContext};
pub use select::select;
pub use statement::{execute_statement, execute_statements, Flow, Processor};
