use crate::executor::aggregators_helper::{Accumulator, AggregateImpl};
use crate::value::{compare_combinedly, ComparisonResult, Primary};

pub struct MinImpl;

impl AggregateImpl for MinImpl {
    fn name(&self) -> &'static str {
        "min"
    }

    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(MinMaxAcc { current: None, keep_on: ComparisonResult::Less })
    }
}

pub struct MaxImpl;

impl AggregateImpl for MaxImpl {
    fn name(&self) -> &'static str {
        "max"
    }

    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(MinMaxAcc { current: None, keep_on: ComparisonResult::Greater })
    }
}

// Replaces the held value when the candidate compares with `keep_on`;
// incommensurable candidates leave it alone.
struct MinMaxAcc {
    current: Option<Primary>,
    keep_on: ComparisonResult,
}

impl Accumulator for MinMaxAcc {
    fn update(&mut self, value: &Primary) {
        if value.is_null() {
            return;
        }
        match &self.current {
            None => self.current = Some(value.clone()),
            Some(current) => {
                if compare_combinedly(value, current) == self.keep_on {
                    self.current = Some(value.clone());
                }
            }
        }
    }

    fn finalize(&self) -> Primary {
        self.current.clone().unwrap_or(Primary::Null)
    }
}
