//! printf-style display formatting for numeric quantities.
//!
//! A pattern holds exactly one conversion, optionally surrounded by literal
//! text (`"%.3f mm"`, `"gain=%+d"`). `%%` is a literal percent sign.
//!
//! Supported conversions are `d i f F e E g G s` with the flags `- + space 0 #`,
//! a minimum width and a precision. `%g` behaves like C: six significant
//! digits by default, trailing zeros removed, exponent notation when the
//! exponent is below -4 or at least the precision.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Int,
    Fixed { upper: bool },
    Exponent { upper: bool },
    General { upper: bool },
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
}

/// A parsed display pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    pattern: String,
    prefix: String,
    suffix: String,
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            pattern: "%g".to_owned(),
            prefix: String::new(),
            suffix: String::new(),
            flags: Flags::default(),
            width: 0,
            precision: None,
            conversion: Conversion::General { upper: false },
        }
    }
}

impl NumberFormat {
    /// Parse a pattern such as `"%g"` or `"%8.3f V"`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut prefix = String::new();
        let mut chars = pattern.chars().peekable();
        loop {
            match chars.next() {
                None => return Err(Error::invalid_format(pattern, "no conversion found")),
                Some('%') if chars.peek() == Some(&'%') => {
                    chars.next();
                    prefix.push('%');
                }
                Some('%') => break,
                Some(c) => prefix.push(c),
            }
        }

        let mut flags = Flags::default();
        while let Some(&c) = chars.peek() {
            match c {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '0' => flags.zero = true,
                '#' => flags.alternate = true,
                _ => break,
            }
            chars.next();
        }

        let width = take_number(&mut chars, pattern)?.unwrap_or(0);
        let precision = if chars.peek() == Some(&'.') {
            chars.next();
            Some(take_number(&mut chars, pattern)?.unwrap_or(0))
        } else {
            None
        };

        let conversion = match chars.next() {
            Some('d' | 'i') => Conversion::Int,
            Some('f') => Conversion::Fixed { upper: false },
            Some('F') => Conversion::Fixed { upper: true },
            Some('e') => Conversion::Exponent { upper: false },
            Some('E') => Conversion::Exponent { upper: true },
            Some('g') => Conversion::General { upper: false },
            Some('G') => Conversion::General { upper: true },
            Some('s') => Conversion::Text,
            Some(other) => {
                return Err(Error::invalid_format(
                    pattern,
                    format!("unsupported conversion '{other}'"),
                ));
            }
            None => return Err(Error::invalid_format(pattern, "pattern ends inside a conversion")),
        };

        let mut suffix = String::new();
        while let Some(c) = chars.next() {
            if c == '%' {
                if chars.next() != Some('%') {
                    return Err(Error::invalid_format(pattern, "more than one conversion"));
                }
            }
            suffix.push(c);
        }

        Ok(Self {
            pattern: pattern.to_owned(),
            prefix,
            suffix,
            flags,
            width,
            precision,
            conversion,
        })
    }

    /// The pattern this format was parsed from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render a value with this pattern.
    ///
    /// Non-numeric values fall back to their settings string under numeric
    /// conversions.
    pub fn format(&self, value: &Value) -> String {
        let body = match (self.conversion, value.as_f64()) {
            (Conversion::Text, _) | (_, None) => value.to_settings_string(),
            (Conversion::Int, Some(_)) => {
                let i = value.as_i64().unwrap_or(0);
                self.signed(i < 0, i.unsigned_abs().to_string())
            }
            (Conversion::Fixed { upper }, Some(x)) => {
                let digits = self.precision.unwrap_or(6);
                let text = finite_or(x, upper, |x| format!("{:.*}", digits, x));
                self.signed(x.is_sign_negative() && !x.is_nan(), text)
            }
            (Conversion::Exponent { upper }, Some(x)) => {
                let digits = self.precision.unwrap_or(6);
                let text = finite_or(x, upper, |x| exponent(x, digits, upper));
                self.signed(x.is_sign_negative() && !x.is_nan(), text)
            }
            (Conversion::General { upper }, Some(x)) => {
                let text = finite_or(x, upper, |x| general(x, self.precision, upper, self.flags.alternate));
                self.signed(x.is_sign_negative() && !x.is_nan(), text)
            }
        };
        format!("{}{}{}", self.prefix, self.pad(body), self.suffix)
    }

    /// Attach the sign. `magnitude` never carries one.
    fn signed(&self, negative: bool, magnitude: String) -> String {
        let magnitude = magnitude.trim_start_matches('-').to_owned();
        if negative {
            format!("-{magnitude}")
        } else if self.flags.plus {
            format!("+{magnitude}")
        } else if self.flags.space {
            format!(" {magnitude}")
        } else {
            magnitude
        }
    }

    fn pad(&self, body: String) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.width - len;
        let numeric = !matches!(self.conversion, Conversion::Text);
        if self.flags.left {
            format!("{body}{}", " ".repeat(fill))
        } else if self.flags.zero && numeric && body.chars().any(|c| c.is_ascii_digit()) {
            let sign_len = body.starts_with(['-', '+', ' ']) as usize;
            let (sign, digits) = body.split_at(sign_len);
            format!("{sign}{}{digits}", "0".repeat(fill))
        } else {
            format!("{}{body}", " ".repeat(fill))
        }
    }
}

impl FromStr for NumberFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn take_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    pattern: &str,
) -> Result<Option<usize>> {
    let mut number: Option<usize> = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        let next = number
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|n| n.checked_add(digit as usize))
            .ok_or_else(|| Error::invalid_format(pattern, "width or precision is too large"))?;
        number = Some(next);
        chars.next();
    }
    Ok(number)
}

fn finite_or(x: f64, upper: bool, render: impl FnOnce(f64) -> String) -> String {
    let special = if x.is_nan() {
        "nan"
    } else if x.is_infinite() {
        "inf"
    } else {
        return render(x.abs());
    };
    if upper { special.to_ascii_uppercase() } else { special.to_owned() }
}

/// Split Rust's `{:e}` output into mantissa and exponent.
fn split_exponent(x: f64, digits: usize) -> (String, i32) {
    let raw = format!("{:.*e}", digits, x);
    match raw.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_owned(), exp.parse().unwrap_or(0)),
        None => (raw, 0),
    }
}

fn exponent_suffix(exp: i32, upper: bool) -> String {
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{e}{sign}{:02}", exp.unsigned_abs())
}

fn exponent(x: f64, digits: usize, upper: bool) -> String {
    let (mantissa, exp) = split_exponent(x, digits);
    format!("{mantissa}{}", exponent_suffix(exp, upper))
}

fn general(x: f64, precision: Option<usize>, upper: bool, keep_zeros: bool) -> String {
    let significant = precision.unwrap_or(6).max(1);
    let (mantissa, exp) = split_exponent(x, significant - 1);
    if exp < -4 || exp >= significant as i32 {
        let mantissa = if keep_zeros { mantissa } else { strip_zeros(mantissa) };
        format!("{mantissa}{}", exponent_suffix(exp, upper))
    } else {
        let decimals = (significant as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, x);
        if keep_zeros { fixed } else { strip_zeros(fixed) }
    }
}

fn strip_zeros(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(pattern: &str, value: impl Into<Value>) -> String {
        NumberFormat::parse(pattern).unwrap().format(&value.into())
    }

    #[test]
    fn test_general_default() {
        assert_eq!(fmt("%g", 5.0), "5");
        assert_eq!(fmt("%g", 0.1), "0.1");
        assert_eq!(fmt("%g", 1234567.0), "1.23457e+06");
        assert_eq!(fmt("%g", 0.0001), "0.0001");
        assert_eq!(fmt("%g", 0.00001), "1e-05");
        assert_eq!(fmt("%g", -2.5), "-2.5");
        assert_eq!(fmt("%g", 0.0), "0");
        assert_eq!(fmt("%g", 100000.0), "100000");
        assert_eq!(fmt("%g", 999999.5), "1e+06");
        assert_eq!(fmt("%g", 3), "3");
    }

    #[test]
    fn test_general_precision() {
        assert_eq!(fmt("%.3g", 3.14159), "3.14");
        assert_eq!(fmt("%.2g", 1234.0), "1.2e+03");
        assert_eq!(fmt("%#.3g", 1.0), "1.00");
    }

    #[test]
    fn test_fixed_and_exponent() {
        assert_eq!(fmt("%.3f", 2.0), "2.000");
        assert_eq!(fmt("%f", 1.5), "1.500000");
        assert_eq!(fmt("%.2e", 12345.0), "1.23e+04");
        assert_eq!(fmt("%E", 0.5), "5.000000E-01");
    }

    #[test]
    fn test_int_conversion_truncates() {
        assert_eq!(fmt("%d", 7.9), "7");
        assert_eq!(fmt("%d", -3), "-3");
        assert_eq!(fmt("%+d", 3), "+3");
    }

    #[test]
    fn test_width_and_flags() {
        assert_eq!(fmt("%6.2f", 3.14159), "  3.14");
        assert_eq!(fmt("%-6.1f|", 3.14159), "3.1   |");
        assert_eq!(fmt("%06.2f", -3.14159), "-03.14");
        assert_eq!(fmt("% d", 5), " 5");
    }

    #[test]
    fn test_literal_text() {
        assert_eq!(fmt("%.1f mm", 2.26), "2.3 mm");
        assert_eq!(fmt("%d%%", 50), "50%");
        assert_eq!(fmt("gain=%g", 2.0), "gain=2");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(fmt("%g", f64::INFINITY), "inf");
        assert_eq!(fmt("%g", f64::NEG_INFINITY), "-inf");
        assert_eq!(fmt("%G", f64::NAN), "NAN");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(NumberFormat::parse("no conversion").is_err());
        assert!(NumberFormat::parse("%q").is_err());
        assert!(NumberFormat::parse("%g %g").is_err());
        assert!(NumberFormat::parse("%.").is_err());
        assert!("%.4f".parse::<NumberFormat>().is_ok());
    }

    #[test]
    fn test_oversized_width_is_rejected() {
        let err = NumberFormat::parse("%99999999999999999999999.2f").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
        let err = NumberFormat::parse("%.99999999999999999999999f").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_text_conversion() {
        assert_eq!(fmt("%s", "abc"), "abc");
        assert_eq!(fmt("[%s]", 2.5), "[2.5]");
    }
}
