use crate::executor::aggregators_helper::{Accumulator, AggregateImpl};
use crate::value::Primary;

pub struct CountImpl;

impl AggregateImpl for CountImpl {
    fn name(&self) -> &'static str {
        "count"
    }

    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(CountAcc { count: 0 })
    }
}

struct CountAcc {
    count: i64,
}

impl Accumulator for CountAcc {
    fn update(&mut self, value: &Primary) {
        if !value.is_null() {
            self.count += 1;
        }
    }

    fn finalize(&self) -> Primary {
        Primary::Integer(self.count)
    }
}
