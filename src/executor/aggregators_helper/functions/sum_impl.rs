use crate::executor::aggregators_helper::{Accumulator, AggregateImpl};
use crate::value::Primary;

pub struct SumImpl;

impl AggregateImpl for SumImpl {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(SumAcc::Empty)
    }
}

// Integer input keeps an integer total until a float shows up; a value
// with no numeric form poisons the whole group to NULL.
enum SumAcc {
    Empty,
    Int(i64),
    Float(f64),
    Invalid,
}

impl Accumulator for SumAcc {
    fn update(&mut self, value: &Primary) {
        if value.is_null() {
            return;
        }
        *self = match (&*self, value) {
            (SumAcc::Invalid, _) => SumAcc::Invalid,
            (SumAcc::Empty, Primary::Integer(i)) => SumAcc::Int(*i),
            (SumAcc::Int(acc), Primary::Integer(i)) => SumAcc::Int(acc.wrapping_add(*i)),
            (SumAcc::Empty, other) => match other.to_float() {
                Some(f) => SumAcc::Float(f),
                None => SumAcc::Invalid,
            },
            (SumAcc::Int(acc), other) => match other.to_float() {
                Some(f) => SumAcc::Float(*acc as f64 + f),
                None => SumAcc::Invalid,
            },
            (SumAcc::Float(acc), other) => match other.to_float() {
                Some(f) => SumAcc::Float(acc + f),
                None => SumAcc::Invalid,
            },
        };
    }

    fn finalize(&self) -> Primary {
        match self {
            SumAcc::Empty | SumAcc::Invalid => Primary::Null,
            SumAcc::Int(i) => Primary::Integer(*i),
            SumAcc::Float(f) => Primary::Float(*f),
        }
    }
}
