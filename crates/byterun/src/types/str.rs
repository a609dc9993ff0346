//! String helpers: repr quoting, float rendering and `%` formatting.

use std::fmt::{self, Write};

use crate::{
    exception_private::{ExcType, RunResult},
    value::Value,
};

/// Writes a Python-style repr of a string, picking the quote character the way CPython does.
pub fn string_repr_fmt(s: &str, f: &mut impl Write) -> fmt::Result {
    // double quotes only when the string has single quotes and no double quotes
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            _ => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// Returns the repr of a string as an owned `String`.
#[must_use]
pub fn string_repr(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    // writing to a String cannot fail
    let _ = string_repr_fmt(s, &mut out);
    out
}

/// Renders a float the way Python's `repr(float)` does.
///
/// Integral values keep a trailing `.0`; very large and very small magnitudes switch to
/// exponent notation with a signed, at least two digit exponent (`1e+16`, `1e-05`).
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_owned() } else { "-inf".to_owned() };
    }
    let abs = f.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        return fix_exp_format(&format!("{f:e}"));
    }
    if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Converts Rust exponent notation (`1e16`, `1.5e-7`) into Python's (`1e+16`, `1.5e-07`).
fn fix_exp_format(s: &str) -> String {
    let Some((mantissa, exp)) = s.split_once('e') else {
        return s.to_owned();
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(rest) => ('-', rest),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

/// Applies printf-style `%` formatting: `"%s=%d" % (name, value)`.
///
/// Supports `%s`, `%r`, `%d`, `%i`, `%f` with an optional precision, and `%%`.
pub(crate) fn percent_format(template: &str, args: &Value) -> RunResult<String> {
    let items: Vec<Value> = match args {
        Value::Tuple(items) => items.as_ref().clone(),
        other => vec![other.clone()],
    };
    let mut items = items.into_iter();
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut precision: Option<usize> = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            precision = Some(digits.parse().unwrap_or(0));
        }
        let Some(conversion) = chars.next() else {
            return Err(ExcType::value_error("incomplete format"));
        };
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let Some(item) = items.next() else {
            return Err(ExcType::type_error("not enough arguments for format string"));
        };
        match conversion {
            's' => out.push_str(&item.py_str()),
            'r' => out.push_str(&item.py_repr()),
            'd' | 'i' => match item {
                Value::Int(i) => write!(out, "{i}").map_err(fmt_error)?,
                Value::Bool(b) => write!(out, "{}", i64::from(b)).map_err(fmt_error)?,
                Value::Float(f) => write!(out, "{}", f.trunc() as i64).map_err(fmt_error)?,
                other => {
                    return Err(ExcType::type_error(format!(
                        "%{conversion} format: a real number is required, not {}",
                        other.type_name()
                    )))
                }
            },
            'f' => {
                let precision = precision.unwrap_or(6);
                let f = match item {
                    Value::Int(i) => i as f64,
                    Value::Bool(b) => f64::from(u8::from(b)),
                    Value::Float(f) => f,
                    other => {
                        return Err(ExcType::type_error(format!(
                            "must be real number, not {}",
                            other.type_name()
                        )))
                    }
                };
                write!(out, "{f:.precision$}").map_err(fmt_error)?;
            }
            other => {
                return Err(ExcType::value_error(format!(
                    "unsupported format character '{other}'"
                )))
            }
        }
    }

    if items.next().is_some() {
        return Err(ExcType::type_error(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(out)
}

/// Applies `str.format` with positional `{}` and `{0}` fields.
pub(crate) fn brace_format(template: &str, args: &[Value]) -> RunResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut auto_index = 0;
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => return Err(ExcType::value_error("expected '}' before end of string")),
                    }
                }
                let index = if field.is_empty() {
                    let index = auto_index;
                    auto_index += 1;
                    index
                } else {
                    field
                        .parse::<usize>()
                        .map_err(|_| ExcType::value_error(format!("unsupported format field '{field}'")))?
                };
                let value = args.get(index).ok_or_else(|| {
                    crate::exception_private::SimpleException::new_msg(
                        ExcType::IndexError,
                        format!("Replacement index {index} out of range for positional args tuple"),
                    )
                })?;
                out.push_str(&value.py_str());
            }
            '}' => return Err(ExcType::value_error("Single '}' encountered in format string")),
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn fmt_error(_: fmt::Error) -> crate::exception_private::RunError {
    crate::exception_private::RunError::internal("failed to write formatted string")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_repr() {
        assert_eq!(string_repr("abc"), "'abc'");
        assert_eq!(string_repr("it's"), "\"it's\"");
        assert_eq!(string_repr("a\nb"), "'a\\nb'");
        assert_eq!(string_repr("'\""), "'\\'\"'");
    }

    #[test]
    fn test_float_repr() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1.5e-7), "1.5e-07");
        assert_eq!(float_repr(f64::INFINITY), "inf");
    }

    #[test]
    fn test_percent_format() {
        let args = Value::Tuple(std::rc::Rc::new(vec![Value::Str("x".into()), Value::Int(3)]));
        assert_eq!(percent_format("%s=%d%%", &args).unwrap(), "x=3%");
        assert_eq!(percent_format("%.2f", &Value::Float(1.005)).unwrap(), "1.00");
        assert!(percent_format("%d", &Value::Str("a".into())).is_err());
    }

    #[test]
    fn test_brace_format() {
        let args = [Value::Int(1), Value::Str("two".into())];
        assert_eq!(brace_format("{} and {}", &args).unwrap(), "1 and two");
        assert_eq!(brace_format("{1}{{}}{0}", &args).unwrap(), "two{}1");
    }
}
