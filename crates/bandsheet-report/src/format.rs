//! `%`-style positional formatting (`"%.2f" % x`, `"%s-%d" % (a, b)`)

use crate::error::{ReportError, ReportResult};
use crate::value::Value;

#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    width: usize,
    precision: Option<usize>,
}

/// Apply a format string to positional arguments
///
/// `None` arguments render as the empty string whatever the conversion.
pub fn percent_format(fmt: &str, args: &[Value]) -> ReportResult<String> {
    let mut out = String::with_capacity(fmt.len() + 8);
    let mut args = args.iter();
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                _ => break,
            }
            chars.next();
        }
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            spec.width = spec.width * 10 + d as usize;
            chars.next();
        }
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut precision = 0;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                precision = precision * 10 + d as usize;
                chars.next();
            }
            spec.precision = Some(precision);
        }
        let conversion = chars
            .next()
            .ok_or_else(|| ReportError::eval("incomplete format"))?;
        if conversion == '%' {
            out.push('%');
            continue;
        }
        let arg = args
            .next()
            .ok_or_else(|| ReportError::eval("not enough arguments for format string"))?;
        let body = convert(conversion, &spec, arg)?;
        pad(&mut out, &body, &spec);
    }

    if args.next().is_some() {
        return Err(ReportError::eval(
            "not all arguments converted during string formatting",
        ));
    }
    Ok(out)
}

fn number(arg: &Value, conversion: char) -> ReportResult<f64> {
    arg.as_number().ok_or_else(|| {
        ReportError::eval(format!(
            "%{} format: a number is required, not {}",
            conversion,
            arg.type_name()
        ))
    })
}

fn sign(n: f64, spec: &Spec) -> &'static str {
    if n < 0.0 {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn convert(conversion: char, spec: &Spec, arg: &Value) -> ReportResult<String> {
    if arg.is_none() {
        return Ok(String::new());
    }
    Ok(match conversion {
        's' | 'r' => {
            let s = arg.to_string();
            match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            }
        }
        'd' | 'i' | 'u' => {
            let n = number(arg, conversion)?.trunc();
            format!("{}{}", sign(n, spec), n.abs() as i64)
        }
        'f' | 'F' => {
            let n = number(arg, conversion)?;
            let p = spec.precision.unwrap_or(6);
            format!("{}{:.*}", sign(n, spec), p, n.abs())
        }
        'e' | 'E' => {
            let n = number(arg, conversion)?;
            let p = spec.precision.unwrap_or(6);
            let s = exponent(n.abs(), p);
            let s = if conversion == 'E' { s.to_uppercase() } else { s };
            format!("{}{}", sign(n, spec), s)
        }
        'g' | 'G' => {
            let n = number(arg, conversion)?;
            format!("{}{}", sign(n, spec), general(n.abs(), spec.precision.unwrap_or(6)))
        }
        'x' | 'X' | 'o' => {
            let n = number(arg, conversion)?.trunc();
            let magnitude = n.abs() as i64;
            let digits = match conversion {
                'x' => format!("{:x}", magnitude),
                'X' => format!("{:X}", magnitude),
                _ => format!("{:o}", magnitude),
            };
            format!("{}{}", sign(n, spec), digits)
        }
        other => {
            return Err(ReportError::eval(format!(
                "unsupported format character '{}'",
                other
            )))
        }
    })
}

/// `1.5e+03` style exponent notation
fn exponent(n: f64, precision: usize) -> String {
    let s = format!("{:.*e}", precision, n);
    match s.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

/// Shortest of fixed and exponent notation with `precision` significant digits
fn general(n: f64, precision: usize) -> String {
    let precision = precision.max(1);
    if n == 0.0 {
        return "0".to_string();
    }
    let exp = n.log10().floor() as i32;
    if exp < -4 || exp >= precision as i32 {
        let s = exponent(n, precision - 1);
        match s.split_once('e') {
            Some((m, e)) if m.contains('.') => {
                format!("{}e{}", m.trim_end_matches('0').trim_end_matches('.'), e)
            }
            _ => s,
        }
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let s = format!("{:.*}", decimals, n);
        if s.contains('.') {
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            s
        }
    }
}

fn pad(out: &mut String, body: &str, spec: &Spec) {
    let len = body.chars().count();
    if len >= spec.width {
        out.push_str(body);
        return;
    }
    let fill = spec.width - len;
    if spec.left {
        out.push_str(body);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if spec.zero && body.starts_with(|c: char| c.is_ascii_digit() || "+- ".contains(c)) {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('+' | '-' | ' ')) => (Some(c), &body[1..]),
            _ => (None, body),
        };
        if let Some(c) = sign {
            out.push(c);
        }
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(digits);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fmt(f: &str, args: &[Value]) -> String {
        percent_format(f, args).unwrap()
    }

    #[test]
    fn test_common_conversions() {
        assert_eq!(fmt("%.2f", &[3.14159.into()]), "3.14");
        assert_eq!(fmt("%s-%d", &["a".into(), 7.9.into()]), "a-7");
        assert_eq!(fmt("%05d|%-4s|%4s", &[42.into(), "ab".into(), "cd".into()]), "00042|ab  |  cd");
        assert_eq!(fmt("%+.1f%%", &[12.34.into()]), "+12.3%");
        assert_eq!(fmt("%x %e", &[255.into(), 1500.into()]), "ff 1.500000e+03");
        assert_eq!(fmt("%g %g", &[0.5.into(), 1234567.into()]), "0.5 1.23457e+06");
    }

    #[test]
    fn test_none_renders_empty() {
        assert_eq!(fmt("[%s|%.2f]", &[Value::None, Value::None]), "[|]");
    }

    #[test]
    fn test_argument_count_errors() {
        assert!(percent_format("%s %s", &["a".into()]).is_err());
        assert!(percent_format("%s", &["a".into(), "b".into()]).is_err());
        assert!(percent_format("%d", &["x".into()]).is_err());
    }
}
