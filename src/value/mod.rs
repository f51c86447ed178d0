pub mod comparer;
pub mod like;
pub mod primary;
pub mod ternary;

pub use comparer::{
    all, any, between, compare, compare_combinedly, equal_to, equivalent_to, is,
    ComparisonOperator, ComparisonResult,
};
pub use like::like;
pub use primary::{format_float, str_to_datetime, ComparisonKey, Primary};
pub use ternary::Ternary;
