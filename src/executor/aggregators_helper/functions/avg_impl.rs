use crate::executor::aggregators_helper::{Accumulator, AggregateImpl};
use crate::value::Primary;

pub struct AvgImpl;

impl AggregateImpl for AvgImpl {
    fn name(&self) -> &'static str {
        "avg"
    }

    fn create_accumulator(&self) -> Box<dyn Accumulator> {
        Box::new(AvgAcc { sum: 0.0, count: 0, invalid: false })
    }
}

struct AvgAcc {
    sum: f64,
    count: i64,
    invalid: bool,
}

impl Accumulator for AvgAcc {
    fn update(&mut self, value: &Primary) {
        if value.is_null() || self.invalid {
            return;
        }
        match value.to_float() {
            Some(f) => {
                self.sum += f;
                self.count += 1;
            }
            None => self.invalid = true,
        }
    }

    fn finalize(&self) -> Primary {
        if self.invalid || self.count == 0 {
            Primary::Null
        } else {
            Primary::Float(self.sum / self.count as f64)
        }
    }
}
