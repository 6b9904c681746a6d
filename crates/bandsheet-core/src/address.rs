//! Cell addresses and formula address translation
//!
//! Two address conventions meet in this crate:
//! - **A1**: column letters plus row number (`B3`, `$B$3`), used by the
//!   canonical formula form and by ODF (`[.B3]`).
//! - **R1C1**: row/column numbers, bracketed when relative to the formula's
//!   own cell (`R[1]C[-1]`, `R3C2`), used by XML Spreadsheet files.
//!
//! Columns are limited to two letters (`A`..`IV`, 256 columns) and rows to
//! 65535, mirroring the legacy format ceiling.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

static A1_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?[A-Za-z]{1,2}\$?[0-9]+").expect("valid A1 pattern"));

static R1C1_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"R(\[-?[0-9]+\]|[0-9]+)?C(\[-?[0-9]+\]|[0-9]+)?").expect("valid R1C1 pattern")
});

static A1_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:([A-Za-z_][A-Za-z0-9_]*)!)?(\$?[A-Za-z]{1,2}\$?[0-9]+)(?::(\$?[A-Za-z]{1,2}\$?[0-9]+))?",
    )
    .expect("valid A1 range pattern")
});

static ODF_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]").expect("valid ODF reference pattern"));

/// A cell address with 1-based row and column
///
/// The absolute flags correspond to `$` markers in A1 notation and to
/// unbracketed numbers in R1C1 notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row number (1-based)
    pub row: u32,
    /// Column number (1-based, A=1)
    pub col: u32,
    /// Whether the row reference is absolute
    pub row_absolute: bool,
    /// Whether the column reference is absolute
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new relative cell address
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_absolute: true,
            col_absolute: true,
        }
    }

    /// Parse an A1-style address such as `B3` or `$B$3`
    ///
    /// # Examples
    /// ```
    /// use bandsheet_core::CellAddress;
    ///
    /// let addr = CellAddress::parse_a1("$B3").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 2));
    /// assert!(addr.col_absolute);
    /// assert!(!addr.row_absolute);
    /// ```
    pub fn parse_a1(s: &str) -> Result<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = bytes.first() == Some(&b'$');
        if col_absolute {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::AddressTranslation(format!(
                "no column letters in '{}'",
                s
            )));
        }
        let col = letters_to_column(&s[col_start..pos])?;

        let row_absolute = bytes.get(pos) == Some(&b'$');
        if row_absolute {
            pos += 1;
        }

        let row: u32 = s[pos..]
            .parse()
            .map_err(|_| Error::AddressTranslation(format!("invalid row number in '{}'", s)))?;
        check_row(row, s)?;

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Format as an A1-style string
    pub fn to_a1(&self) -> String {
        let mut out = String::new();
        if self.col_absolute {
            out.push('$');
        }
        // Columns beyond the ceiling never get constructed by the parsers.
        out.push_str(&column_letters(self.col));
        if self.row_absolute {
            out.push('$');
        }
        out.push_str(&self.row.to_string());
        out
    }

    /// Parse an R1C1-style address relative to the cell at `base_row`/`base_col`
    pub fn parse_r1c1(s: &str, base_row: u32, base_col: u32) -> Result<Self> {
        let s = s.trim();
        let caps = R1C1_REF
            .captures(s)
            .filter(|c| c.get(0).map(|m| m.as_str().len()) == Some(s.len()))
            .ok_or_else(|| Error::AddressTranslation(format!("not an R1C1 address: '{}'", s)))?;
        Self::from_r1c1_captures(&caps, base_row, base_col)
    }

    fn from_r1c1_captures(caps: &Captures<'_>, base_row: u32, base_col: u32) -> Result<Self> {
        let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        let (row, row_absolute) = r1c1_part(caps.get(1).map(|m| m.as_str()), base_row, whole)?;
        let (col, col_absolute) = r1c1_part(caps.get(2).map(|m| m.as_str()), base_col, whole)?;
        check_row(row, whole)?;
        check_col(col, whole)?;
        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Format as an R1C1-style string relative to the cell at `base_row`/`base_col`
    pub fn to_r1c1(&self, base_row: u32, base_col: u32) -> String {
        let mut out = String::from("R");
        push_r1c1_part(&mut out, self.row, base_row, self.row_absolute);
        out.push('C');
        push_r1c1_part(&mut out, self.col, base_col, self.col_absolute);
        out
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_a1(s)
    }
}

fn check_row(row: u32, ctx: &str) -> Result<()> {
    if row == 0 || row > MAX_ROWS {
        return Err(Error::AddressTranslation(format!(
            "row {} out of range 1..={} in '{}'",
            row, MAX_ROWS, ctx
        )));
    }
    Ok(())
}

fn check_col(col: u32, ctx: &str) -> Result<()> {
    if col == 0 || col > MAX_COLS {
        return Err(Error::AddressTranslation(format!(
            "column {} out of range 1..={} in '{}'",
            col, MAX_COLS, ctx
        )));
    }
    Ok(())
}

fn r1c1_part(part: Option<&str>, base: u32, ctx: &str) -> Result<(u32, bool)> {
    match part {
        None => Ok((base, false)),
        Some(p) if p.starts_with('[') => {
            let offset: i64 = p[1..p.len() - 1]
                .parse()
                .map_err(|_| Error::AddressTranslation(format!("bad offset in '{}'", ctx)))?;
            let value = base as i64 + offset;
            if value < 1 || value > u32::MAX as i64 {
                return Err(Error::AddressTranslation(format!(
                    "relative reference '{}' leaves the sheet from R{}C",
                    ctx, base
                )));
            }
            Ok((value as u32, false))
        }
        Some(p) => {
            let value: u32 = p
                .parse()
                .map_err(|_| Error::AddressTranslation(format!("bad number in '{}'", ctx)))?;
            Ok((value, true))
        }
    }
}

fn push_r1c1_part(out: &mut String, value: u32, base: u32, absolute: bool) {
    if absolute {
        out.push_str(&value.to_string());
    } else {
        let offset = value as i64 - base as i64;
        if offset != 0 {
            out.push_str(&format!("[{}]", offset));
        }
    }
}

/// Convert a 1-based column number to letters (1 = A, 27 = AA)
///
/// Fails for columns beyond the two-letter ceiling.
pub fn column_to_letters(col: u32) -> Result<String> {
    check_col(col, &col.to_string())?;
    Ok(column_letters(col))
}

fn column_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    result
}

/// Convert column letters to a 1-based column number (A = 1, AA = 27)
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() || letters.len() > 2 {
        return Err(Error::AddressTranslation(format!(
            "column letters '{}' must be one or two letters",
            letters
        )));
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::AddressTranslation(format!(
                "invalid column letter '{}'",
                c
            )));
        }
        col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    check_col(col, letters)?;
    Ok(col)
}

/// Convert one A1 address to R1C1 relative to `base_row`/`base_col`
pub fn a1_to_r1c1(addr: &str, base_row: u32, base_col: u32) -> Result<String> {
    Ok(CellAddress::parse_a1(addr)?.to_r1c1(base_row, base_col))
}

/// Convert one R1C1 address to A1 relative to `base_row`/`base_col`
pub fn r1c1_to_a1(addr: &str, base_row: u32, base_col: u32) -> Result<String> {
    Ok(CellAddress::parse_r1c1(addr, base_row, base_col)?.to_a1())
}

/// Rewrite every A1 reference of a formula into R1C1 form
///
/// `base_row`/`base_col` is the cell holding the formula. String literals,
/// quoted sheet names and function names are left untouched.
///
/// ```
/// use bandsheet_core::address::formula_to_r1c1;
///
/// let f = formula_to_r1c1("=SUM(B1:B2)*$A$1", 3, 2).unwrap();
/// assert_eq!(f, "=SUM(R[-2]C:R[-1]C)*R1C1");
/// ```
pub fn formula_to_r1c1(formula: &str, base_row: u32, base_col: u32) -> Result<String> {
    map_code_segments(formula, |code| {
        rewrite_refs(code, &A1_REF, |caps| {
            let text = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            a1_to_r1c1(text, base_row, base_col)
        })
    })
}

/// Rewrite every R1C1 reference of a formula into A1 form
pub fn formula_to_a1(formula: &str, base_row: u32, base_col: u32) -> Result<String> {
    map_code_segments(formula, |code| {
        rewrite_refs(code, &R1C1_REF, |caps| {
            Ok(CellAddress::from_r1c1_captures(caps, base_row, base_col)?.to_a1())
        })
    })
}

/// Move a canonical (A1) formula from one cell to another
///
/// Relative references keep their offset to the formula cell; absolute
/// references are unchanged.
pub fn shift_formula(formula: &str, from: (u32, u32), to: (u32, u32)) -> Result<String> {
    if from == to {
        return Ok(formula.to_string());
    }
    let r1c1 = formula_to_r1c1(formula, from.0, from.1)?;
    formula_to_a1(&r1c1, to.0, to.1)
}

/// Convert a canonical formula (`=SUM(A1:B2)`) to OpenFormula (`of:=SUM([.A1:.B2])`)
pub fn formula_to_odf(formula: &str) -> Result<String> {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    let converted = map_code_segments(body, |code| {
        let refs = rewrite_refs(code, &A1_RANGE, |caps| {
            let sheet = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let start = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            CellAddress::parse_a1(start)?;
            let mut out = format!("[{}.{}", sheet, start);
            if let Some(end) = caps.get(3) {
                CellAddress::parse_a1(end.as_str())?;
                out.push_str(&format!(":.{}", end.as_str()));
            }
            out.push(']');
            Ok(out)
        })?;
        Ok(refs.replace(',', ";"))
    })?;
    Ok(format!("of:={}", converted))
}

/// Convert an OpenFormula (`of:=SUM([.A1:.B2])`) back to canonical form
pub fn formula_from_odf(formula: &str) -> Result<String> {
    let body = formula
        .strip_prefix("of:")
        .or_else(|| formula.strip_prefix("oooc:"))
        .unwrap_or(formula);
    let body = body.strip_prefix('=').unwrap_or(body);
    let converted = map_code_segments(body, |code| {
        let mut out = String::with_capacity(code.len());
        let mut last = 0;
        for caps in ODF_REF.captures_iter(code) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&code[last..whole.start()].replace(';', ","));
            let parts: Vec<String> = inner
                .as_str()
                .split(':')
                .enumerate()
                .map(|(i, part)| odf_ref_part(part, i == 0))
                .collect::<Result<_>>()?;
            out.push_str(&parts.join(":"));
            last = whole.end();
        }
        out.push_str(&code[last..].replace(';', ","));
        Ok(out)
    })?;
    Ok(format!("={}", converted))
}

fn odf_ref_part(part: &str, keep_sheet: bool) -> Result<String> {
    let (sheet, cell) = match part.rfind('.') {
        Some(dot) => (&part[..dot], &part[dot + 1..]),
        None => ("", part),
    };
    CellAddress::parse_a1(cell)?;
    let sheet = sheet.trim_start_matches('$');
    if keep_sheet && !sheet.is_empty() {
        Ok(format!("{}!{}", sheet, cell))
    } else {
        Ok(cell.to_string())
    }
}

/// Apply `f` to the parts of a formula outside string literals and quoted names
fn map_code_segments(formula: &str, mut f: impl FnMut(&str) -> Result<String>) -> Result<String> {
    let mut out = String::with_capacity(formula.len() + 8);
    let mut code = String::new();
    let mut chars = formula.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            out.push_str(&f(&code)?);
            code.clear();
            out.push(c);
            while let Some(inner) = chars.next() {
                out.push(inner);
                if inner == c {
                    // A doubled quote is an escaped quote inside the literal.
                    if chars.peek() == Some(&c) {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                        continue;
                    }
                    break;
                }
            }
        } else {
            code.push(c);
        }
    }
    out.push_str(&f(&code)?);
    Ok(out)
}

fn rewrite_refs(
    text: &str,
    re: &Regex,
    mut f: impl FnMut(&Captures<'_>) -> Result<String>,
) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        if !is_reference_boundary(text, m.start(), m.end()) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(&f(&caps)?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn is_reference_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    !matches!(before, Some(c) if ident(c) || c == '.' || c == '$')
        && !matches!(after, Some(c) if ident(c) || c == '(' || c == '[' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_to_letters(1).unwrap(), "A");
        assert_eq!(column_to_letters(26).unwrap(), "Z");
        assert_eq!(column_to_letters(27).unwrap(), "AA");
        assert_eq!(column_to_letters(256).unwrap(), "IV");
        assert!(column_to_letters(257).is_err());
        assert!(column_to_letters(0).is_err());

        assert_eq!(letters_to_column("A").unwrap(), 1);
        assert_eq!(letters_to_column("iv").unwrap(), 256);
        assert!(letters_to_column("IW").is_err());
        assert!(letters_to_column("AAA").is_err());
    }

    #[test]
    fn test_parse_a1() {
        let addr = CellAddress::parse_a1("C10").unwrap();
        assert_eq!((addr.row, addr.col), (10, 3));
        assert!(!addr.row_absolute && !addr.col_absolute);

        let addr = CellAddress::parse_a1("$A$1").unwrap();
        assert!(addr.row_absolute && addr.col_absolute);

        assert!(CellAddress::parse_a1("A0").is_err());
        assert!(CellAddress::parse_a1("A65536").is_err());
        assert!(CellAddress::parse_a1("1A").is_err());
    }

    #[test]
    fn test_single_address_translation() {
        assert_eq!(a1_to_r1c1("B3", 3, 2).unwrap(), "RC");
        assert_eq!(a1_to_r1c1("A1", 3, 2).unwrap(), "R[-2]C[-1]");
        assert_eq!(a1_to_r1c1("$B$3", 10, 10).unwrap(), "R3C2");
        assert_eq!(a1_to_r1c1("$B3", 1, 1).unwrap(), "R[2]C2");

        assert_eq!(r1c1_to_a1("R[-1]C", 5, 4).unwrap(), "D4");
        assert_eq!(r1c1_to_a1("R2C3", 5, 4).unwrap(), "$C$2");
        assert!(r1c1_to_a1("R[-5]C", 5, 4).is_err());
        assert!(r1c1_to_a1("R1C257", 1, 1).is_err());
    }

    #[test]
    fn test_formula_translation() {
        let r1c1 = formula_to_r1c1("=IF(A1>0,\"A1\",SUM($B$1:B2))", 2, 1).unwrap();
        assert_eq!(r1c1, "=IF(R[-1]C>0,\"A1\",SUM(R1C2:RC[1]))");
        assert_eq!(
            formula_to_a1(&r1c1, 2, 1).unwrap(),
            "=IF(A1>0,\"A1\",SUM($B$1:B2))"
        );
    }

    #[test]
    fn test_formula_translation_skips_functions() {
        assert_eq!(
            formula_to_r1c1("=LOG10(A2)+ATAN2(A1,A2)", 2, 1).unwrap(),
            "=LOG10(RC)+ATAN2(R[-1]C,RC)"
        );
        assert_eq!(
            formula_to_a1("=ROUND(RC[-1],2)", 4, 2).unwrap(),
            "=ROUND(A4,2)"
        );
    }

    #[test]
    fn test_shift_formula() {
        assert_eq!(
            shift_formula("=A1+$A$1", (2, 2), (10, 3)).unwrap(),
            "=B9+$A$1"
        );
        assert!(shift_formula("=A1", (2, 2), (1, 2)).is_err());
    }

    #[test]
    fn test_odf_formula() {
        assert_eq!(
            formula_to_odf("=SUM(A1:B2,Data!C3)").unwrap(),
            "of:=SUM([.A1:.B2];[Data.C3])"
        );
        assert_eq!(
            formula_from_odf("of:=SUM([.A1:.B2];[Data.C3])").unwrap(),
            "=SUM(A1:B2,Data!C3)"
        );
        assert_eq!(
            formula_from_odf("of:=CONCATENATE(\"a;b\";[.$A$1])").unwrap(),
            "=CONCATENATE(\"a;b\",$A$1)"
        );
    }

    proptest! {
        #[test]
        fn prop_absolute_bijection(row in 1u32..=MAX_ROWS, col in 1u32..=MAX_COLS) {
            let a1 = CellAddress::absolute(row, col).to_a1();
            let r1c1 = a1_to_r1c1(&a1, 1, 1).unwrap();
            prop_assert_eq!(&r1c1, &format!("R{}C{}", row, col));
            prop_assert_eq!(r1c1_to_a1(&r1c1, 1, 1).unwrap(), a1);
        }

        #[test]
        fn prop_relative_bijection(
            row in 1u32..=MAX_ROWS,
            col in 1u32..=MAX_COLS,
            base_row in 1u32..=MAX_ROWS,
            base_col in 1u32..=MAX_COLS,
        ) {
            let a1 = CellAddress::new(row, col).to_a1();
            let r1c1 = a1_to_r1c1(&a1, base_row, base_col).unwrap();
            prop_assert_eq!(r1c1_to_a1(&r1c1, base_row, base_col).unwrap(), a1);
        }
    }
}
