//! The format-spec mini-language: `[[fill]align][sign][#][0][width][,|_][.precision][type]`.

use crate::error::FormatError;
use crate::value::{float_repr, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    /// Padding goes between the sign/prefix and the digits.
    AfterSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Minus,
    Plus,
    Space,
}

/// A parsed format spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    fill: Option<char>,
    align: Option<Align>,
    sign: Option<Sign>,
    alternate: bool,
    zero: bool,
    width: Option<usize>,
    grouping: Option<char>,
    precision: Option<usize>,
    ty: Option<char>,
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        '=' => Some(Align::AfterSign),
        _ => None,
    }
}

impl FormatSpec {
    /// Parse spec text.
    pub fn parse(spec: &str) -> Result<Self, FormatError> {
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;
        let mut out = FormatSpec {
            fill: None,
            align: None,
            sign: None,
            alternate: false,
            zero: false,
            width: None,
            grouping: None,
            precision: None,
            ty: None,
        };

        if let Some(align) = chars.get(1).copied().and_then(align_of) {
            out.fill = Some(chars[0]);
            out.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            out.align = Some(align);
            i = 1;
        }

        match chars.get(i) {
            Some('+') => out.sign = Some(Sign::Plus),
            Some('-') => out.sign = Some(Sign::Minus),
            Some(' ') => out.sign = Some(Sign::Space),
            _ => {}
        }
        if out.sign.is_some() {
            i += 1;
        }
        if chars.get(i) == Some(&'#') {
            out.alternate = true;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            out.zero = true;
            i += 1;
        }

        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i > start {
            out.width = Some(parse_number(&chars[start..i])?);
        }

        if let Some(&(c @ (',' | '_'))) = chars.get(i) {
            out.grouping = Some(c);
            i += 1;
        }

        if chars.get(i) == Some(&'.') {
            i += 1;
            let start = i;
            while chars.get(i).is_some_and(char::is_ascii_digit) {
                i += 1;
            }
            if i == start {
                return Err(FormatError::spec("Format specifier missing precision"));
            }
            out.precision = Some(parse_number(&chars[start..i])?);
        }

        match &chars[i..] {
            [] => {}
            [ty] => out.ty = Some(*ty),
            _ => return Err(FormatError::spec("Invalid format specifier")),
        }
        Ok(out)
    }

    fn fill_char(&self) -> char {
        match (self.fill, self.zero) {
            (Some(fill), _) => fill,
            (None, true) => '0',
            (None, false) => ' ',
        }
    }

    /// Pad `prefix + body` to the requested width.
    fn pad(&self, prefix: &str, body: &str, default: Align) -> String {
        let align = match (self.align, self.zero) {
            (Some(align), _) => align,
            (None, true) if default == Align::Right => Align::AfterSign,
            (None, _) => default,
        };
        let len = prefix.chars().count() + body.chars().count();
        let width = self.width.unwrap_or(0);
        if len >= width {
            return format!("{prefix}{body}");
        }
        let fill = self.fill_char();
        let padding = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
        let total = width - len;
        match align {
            Align::Left => format!("{prefix}{body}{}", padding(total)),
            Align::Right => format!("{}{prefix}{body}", padding(total)),
            Align::Center => {
                let left = total / 2;
                format!("{}{prefix}{body}{}", padding(left), padding(total - left))
            }
            Align::AfterSign => format!("{prefix}{}{body}", padding(total)),
        }
    }

    fn sign_prefix(&self, negative: bool) -> &'static str {
        match (negative, self.sign) {
            (true, _) => "-",
            (false, Some(Sign::Plus)) => "+",
            (false, Some(Sign::Space)) => " ",
            (false, _) => "",
        }
    }
}

/// Largest width or precision a spec may ask for.
pub const MAX_SPEC_NUMBER: usize = 10_000;

fn parse_number(digits: &[char]) -> Result<usize, FormatError> {
    digits
        .iter()
        .collect::<String>()
        .parse()
        .ok()
        .filter(|n| *n <= MAX_SPEC_NUMBER)
        .ok_or_else(|| FormatError::spec("Too many decimal digits in format string"))
}

/// Apply `spec` to `value` the way `format(value, spec)` would.
///
/// An empty spec is plain text conversion. Strings, integers, floats, and
/// booleans understand the mini-language; anything else rejects a
/// non-empty spec.
pub fn format_value(value: &Value, spec: &str) -> Result<String, FormatError> {
    if spec.is_empty() {
        return Ok(value.to_text()?);
    }
    match value {
        Value::Str(s) => format_text(s, spec),
        Value::Int(i) => format_int(*i, &FormatSpec::parse(spec)?),
        Value::Bool(b) => format_int(i64::from(*b), &FormatSpec::parse(spec)?),
        Value::Float(f) => format_float(*f, &FormatSpec::parse(spec)?),
        Value::Captured(captured) => format_value(&captured.value, spec),
        other => Err(FormatError::spec(format!(
            "unsupported format spec for {}",
            other.type_name()
        ))),
    }
}

/// Apply `spec` to already-rendered text.
pub fn format_text(text: &str, spec: &str) -> Result<String, FormatError> {
    if spec.is_empty() {
        return Ok(text.to_string());
    }
    let spec = FormatSpec::parse(spec)?;
    match spec.ty {
        None | Some('s') => {}
        Some(ty) => {
            return Err(FormatError::spec(format!(
                "Unknown format code '{ty}' for object of type 'str'"
            )))
        }
    }
    if spec.sign.is_some() {
        return Err(FormatError::spec(
            "Sign not allowed in string format specifier",
        ));
    }
    if spec.alternate {
        return Err(FormatError::spec(
            "Alternate form (#) not allowed in string format specifier",
        ));
    }
    if spec.align == Some(Align::AfterSign) {
        return Err(FormatError::spec(
            "'=' alignment not allowed in string format specifier",
        ));
    }
    let body: String = match spec.precision {
        Some(p) => text.chars().take(p).collect(),
        None => text.to_string(),
    };
    Ok(spec.pad("", &body, Align::Left))
}

/// Insert `sep` every `every` digits, counting from the right.
fn group_digits(digits: &str, sep: char, every: usize) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(chars.len() + chars.len() / every);
    for (idx, c) in chars.iter().enumerate() {
        if idx > 0 && (chars.len() - idx) % every == 0 {
            out.push(sep);
        }
        out.push(*c);
    }
    out
}

fn format_int(value: i64, spec: &FormatSpec) -> Result<String, FormatError> {
    if let Some('e' | 'E' | 'f' | 'F' | 'g' | 'G' | '%') = spec.ty {
        return format_float(value as f64, spec);
    }
    if spec.precision.is_some() {
        return Err(FormatError::spec(
            "Precision not allowed in integer format specifier",
        ));
    }
    let magnitude = value.unsigned_abs();
    let (digits, radix_prefix, group_every) = match spec.ty {
        None | Some('d') | Some('n') => (magnitude.to_string(), "", 3),
        Some('b') => (format!("{magnitude:b}"), "0b", 4),
        Some('o') => (format!("{magnitude:o}"), "0o", 4),
        Some('x') => (format!("{magnitude:x}"), "0x", 4),
        Some('X') => (format!("{magnitude:X}"), "0X", 4),
        Some('c') => {
            let c = u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| FormatError::spec("%c arg not in range(0x110000)"))?;
            return Ok(spec.pad("", &c.to_string(), Align::Left));
        }
        Some(ty) => {
            return Err(FormatError::spec(format!(
                "Unknown format code '{ty}' for object of type 'int'"
            )))
        }
    };
    let digits = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, group_every),
        None => digits,
    };
    let mut prefix = spec.sign_prefix(value < 0).to_string();
    if spec.alternate {
        prefix.push_str(radix_prefix);
    }
    Ok(spec.pad(&prefix, &digits, Align::Right))
}

/// Rust's `{:e}` writes `1.5e3`; the mini-language wants `1.5e+03`.
fn fix_exponent(sci: &str, upper: bool) -> String {
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{mantissa}{e}{sign}{:02}", exp.abs())
}

fn strip_trailing_zeros(s: &str) -> String {
    let (num, exp) = match s.find(['e', 'E']) {
        Some(idx) => s.split_at(idx),
        None => (s, ""),
    };
    let num = if num.contains('.') {
        num.trim_end_matches('0').trim_end_matches('.')
    } else {
        num
    };
    format!("{num}{exp}")
}

/// General format: fixed or exponent depending on magnitude.
fn general(magnitude: f64, precision: usize, alternate: bool, upper: bool) -> String {
    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, magnitude);
    let exp: i32 = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);
    let text = if exp >= -4 && exp < p as i32 {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        format!("{magnitude:.decimals$}")
    } else {
        fix_exponent(&sci, upper)
    };
    if alternate {
        text
    } else {
        strip_trailing_zeros(&text)
    }
}

fn format_float(value: f64, spec: &FormatSpec) -> Result<String, FormatError> {
    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let upper = matches!(spec.ty, Some('E' | 'F' | 'G'));

    let body = if !magnitude.is_finite() {
        let text = if magnitude.is_nan() { "nan" } else { "inf" };
        let text = if upper {
            text.to_uppercase()
        } else {
            text.to_string()
        };
        if spec.ty == Some('%') {
            format!("{text}%")
        } else {
            text
        }
    } else {
        match spec.ty {
            Some('f' | 'F') => format!("{magnitude:.*}", spec.precision.unwrap_or(6)),
            Some('e' | 'E') => fix_exponent(
                &format!("{magnitude:.*e}", spec.precision.unwrap_or(6)),
                upper,
            ),
            Some('g' | 'G') => general(magnitude, spec.precision.unwrap_or(6), spec.alternate, upper),
            Some('%') => format!("{:.*}%", spec.precision.unwrap_or(6), magnitude * 100.0),
            None | Some('n') => match spec.precision {
                Some(p) => general(magnitude, p, spec.alternate, false),
                None => float_repr(magnitude),
            },
            Some(ty) => {
                return Err(FormatError::spec(format!(
                    "Unknown format code '{ty}' for object of type 'float'"
                )))
            }
        }
    };

    let body = match spec.grouping {
        Some(sep) if magnitude.is_finite() => {
            let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
            let (int_part, rest) = body.split_at(split);
            format!("{}{rest}", group_digits(int_part, sep, 3))
        }
        _ => body,
    };
    Ok(spec.pad(spec.sign_prefix(negative), &body, Align::Right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: impl Into<Value>, spec: &str) -> String {
        format_value(&value.into(), spec).unwrap()
    }

    #[test]
    fn test_empty_spec_is_text() {
        assert_eq!(fmt("abc", ""), "abc");
        assert_eq!(fmt(7, ""), "7");
        assert_eq!(fmt(true, ""), "True");
        assert_eq!(fmt(Value::Null, ""), "None");
    }

    #[test]
    fn test_string_alignment() {
        assert_eq!(fmt("ab", ">5"), "   ab");
        assert_eq!(fmt("ab", "<5"), "ab   ");
        assert_eq!(fmt("ab", "^6"), "  ab  ");
        assert_eq!(fmt("ab", "*^5"), "*ab**");
        assert_eq!(fmt("ab", "5"), "ab   ");
        assert_eq!(fmt("abcdef", ".3"), "abc");
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt(42, "5"), "   42");
        assert_eq!(fmt(42, "05"), "00042");
        assert_eq!(fmt(-42, "05"), "-0042");
        assert_eq!(fmt(42, "+d"), "+42");
        assert_eq!(fmt(255, "x"), "ff");
        assert_eq!(fmt(255, "#X"), "0XFF");
        assert_eq!(fmt(5, "b"), "101");
        assert_eq!(fmt(1234567, ","), "1,234,567");
        assert_eq!(fmt(65, "c"), "A");
        assert_eq!(fmt(true, "d"), "1");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt(3.14159, ".2f"), "3.14");
        assert_eq!(fmt(3.0, "f"), "3.000000");
        assert_eq!(fmt(1234.5, ".2e"), "1.23e+03");
        assert_eq!(fmt(0.5, ".0%"), "50%");
        assert_eq!(fmt(0.00001234, "g"), "1.234e-05");
        assert_eq!(fmt(1234.5, "g"), "1234.5");
        assert_eq!(fmt(1234567.0, ",.1f"), "1,234,567.0");
        assert_eq!(fmt(2.5, ""), "2.5");
        assert_eq!(fmt(-2.5, "8.2f"), "   -2.50");
        assert_eq!(fmt(7, ".1f"), "7.0");
    }

    #[test]
    fn test_rejections() {
        assert!(format_value(&Value::List(vec![]), ">5").is_err());
        assert!(format_value(&Value::from("x"), "d").is_err());
        assert!(format_value(&Value::from("x"), "+").is_err());
        assert!(format_value(&Value::Int(1), ".2").is_err());
        assert!(format_value(&Value::Int(1), "{x}").is_err());
        assert!(format_value(&Value::Int(1), "5.").is_err());
    }

    #[test]
    fn test_oversized_width_and_precision() {
        let too_many = |value: Value, spec: &str| {
            assert_eq!(
                format_value(&value, spec),
                Err(FormatError::spec("Too many decimal digits in format string"))
            );
        };
        too_many(Value::Int(1), "10000000000000000000");
        too_many(Value::Int(1), "5000000000");
        too_many(Value::Float(1.5), ".100000f");
        too_many(Value::from("x"), "99999999999999999999999");
        assert_eq!(fmt(1, "10000").len(), MAX_SPEC_NUMBER);
    }

    #[test]
    fn test_format_text_passthrough() {
        assert_eq!(format_text("'hello'", "").unwrap(), "'hello'");
        assert_eq!(format_text("'hi'", ">6").unwrap(), "  'hi'");
    }
}
