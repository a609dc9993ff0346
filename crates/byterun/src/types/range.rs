//! Python range type.

use std::fmt::{self, Write};

use crate::{
    exception_private::{ExcType, RunResult},
    value::Value,
};

/// Python range object representing an immutable arithmetic sequence of integers.
///
/// The range is computed lazily during iteration, never stored as a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// The starting value (inclusive). Defaults to 0.
    pub start: i64,
    /// The ending value (exclusive).
    pub stop: i64,
    /// The step between values. Never 0.
    pub step: i64,
}

impl Range {
    /// Builds a range from the one, two or three integer arguments of `range()`.
    pub(crate) fn from_args(args: &[Value]) -> RunResult<Self> {
        let ints = args.iter().map(Value::as_int).collect::<RunResult<Vec<_>>>()?;
        let range = match ints.as_slice() {
            [stop] => Self {
                start: 0,
                stop: *stop,
                step: 1,
            },
            [start, stop] => Self {
                start: *start,
                stop: *stop,
                step: 1,
            },
            [start, stop, step] => {
                if *step == 0 {
                    return Err(ExcType::value_error_range_step_zero());
                }
                Self {
                    start: *start,
                    stop: *stop,
                    step: *step,
                }
            }
            [] => return Err(ExcType::type_error_at_least("range", 1, 0)),
            _ => return Err(ExcType::type_error_at_most("range", 3, ints.len())),
        };
        Ok(range)
    }

    /// Returns the number of elements the range yields.
    #[must_use]
    pub fn len(&self) -> usize {
        let (low, high, step) = if self.step > 0 {
            (self.start, self.stop, self.step)
        } else {
            (self.stop, self.start, -self.step)
        };
        if high <= low {
            return 0;
        }
        usize::try_from((high - low - 1) / step + 1).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` (already normalized to be non-negative), if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let offset = i64::try_from(index).ok()?;
        Some(self.start + offset * self.step)
    }

    #[must_use]
    pub fn contains(&self, value: i64) -> bool {
        let in_bounds = if self.step > 0 {
            value >= self.start && value < self.stop
        } else {
            value <= self.start && value > self.stop
        };
        in_bounds && (value - self.start) % self.step == 0
    }

    pub(crate) fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        if self.step == 1 {
            write!(f, "range({}, {})", self.start, self.stop)
        } else {
            write!(f, "range({}, {}, {})", self.start, self.stop, self.step)
        }
    }
}
