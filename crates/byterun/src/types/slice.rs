//! Python slice type.

use std::fmt::{self, Write};

use crate::{
    exception_private::{ExcType, RunResult},
    value::Value,
};

/// A `slice(start, stop, step)` object as built by `BUILD_SLICE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub(crate) fn from_values(start: &Value, stop: &Value, step: &Value) -> RunResult<Self> {
        Ok(Self {
            start: value_to_option_i64(start)?,
            stop: value_to_option_i64(stop)?,
            step: value_to_option_i64(step)?,
        })
    }

    /// Computes the concrete element positions selected from a sequence of `length` items.
    ///
    /// Implements `slice.indices(length)`: negative bounds count from the end, bounds are
    /// clamped, and a negative step walks backwards.
    pub(crate) fn positions(&self, length: usize) -> RunResult<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ExcType::value_error_slice_step_zero());
        }
        let len = i64::try_from(length).unwrap_or(i64::MAX);
        let mut positions = Vec::new();
        if step > 0 {
            let start = self.start.map_or(0, |s| normalize_index(s, len, 0, len));
            let stop = self.stop.map_or(len, |s| normalize_index(s, len, 0, len));
            let mut i = start;
            while i < stop {
                positions.extend(usize::try_from(i).ok());
                i += step;
            }
        } else {
            let start = self.start.map_or(len - 1, |s| normalize_index(s, len, -1, len - 1));
            let stop = self.stop.map_or(-1, |s| normalize_index(s, len, -1, len - 1));
            let mut i = start;
            while i > stop {
                positions.extend(usize::try_from(i).ok());
                i += step;
            }
        }
        Ok(positions)
    }

    pub(crate) fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        f.write_str("slice(")?;
        format_option_i64(f, self.start)?;
        f.write_str(", ")?;
        format_option_i64(f, self.stop)?;
        f.write_str(", ")?;
        format_option_i64(f, self.step)?;
        f.write_char(')')
    }
}

/// Converts a Value to `Option<i64>`, treating None as None.
fn value_to_option_i64(value: &Value) -> RunResult<Option<i64>> {
    match value {
        Value::None => Ok(None),
        Value::Int(i) => Ok(Some(*i)),
        Value::Bool(b) => Ok(Some(i64::from(*b))),
        _ => Err(ExcType::type_error_slice_indices()),
    }
}

/// Normalizes a slice index for a sequence of the given length.
///
/// Handles negative indices (counting from end) and clamps to [lower, upper].
fn normalize_index(index: i64, length: i64, lower: i64, upper: i64) -> i64 {
    let normalized = if index < 0 { index + length } else { index };
    normalized.clamp(lower, upper)
}

fn format_option_i64(f: &mut impl Write, value: Option<i64>) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{v}"),
        None => f.write_str("None"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Slice {
        Slice { start, stop, step }
    }

    #[test]
    fn test_positions() {
        assert_eq!(slice(Some(1), Some(3), None).positions(5).unwrap(), [1, 2]);
        assert_eq!(slice(None, None, Some(-1)).positions(3).unwrap(), [2, 1, 0]);
        assert_eq!(slice(Some(-2), None, None).positions(5).unwrap(), [3, 4]);
        assert_eq!(slice(None, None, Some(2)).positions(5).unwrap(), [0, 2, 4]);
        assert!(slice(Some(4), Some(1), None).positions(5).unwrap().is_empty());
    }

    #[test]
    fn test_zero_step() {
        assert!(slice(None, None, Some(0)).positions(3).is_err());
    }
}
