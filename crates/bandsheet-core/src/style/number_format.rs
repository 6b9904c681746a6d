//! Number format types

use once_cell::sync::Lazy;
use regex::Regex;

static COMPACT_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#,##)?0(?:\.(0+))?(%)?$").expect("valid compact format pattern")
});

/// Number format for cell display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Format code (`0.00`, `#,##0`, `0%`, `dd/mm/yyyy`, ...)
    Custom(String),
}

/// The subset of number formats every target format can express:
/// decimal places, thousands grouping and percent scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CompactFormat {
    /// Digits after the decimal point
    pub decimals: u8,
    /// Thousands grouping
    pub grouping: bool,
    /// Multiply by 100 and append `%`
    pub percent: bool,
}

impl CompactFormat {
    /// Render the equivalent format code
    pub fn to_code(&self) -> String {
        let mut code = String::new();
        if self.grouping {
            code.push_str("#,##");
        }
        code.push('0');
        if self.decimals > 0 {
            code.push('.');
            code.extend(std::iter::repeat('0').take(self.decimals as usize));
        }
        if self.percent {
            code.push('%');
        }
        code
    }
}

impl NumberFormat {
    /// Create a number format from a format code
    pub fn from_code<S: Into<String>>(code: S) -> Self {
        let code = code.into();
        if code.is_empty() || code.eq_ignore_ascii_case("general") {
            NumberFormat::General
        } else {
            NumberFormat::Custom(code)
        }
    }

    /// Fixed decimals (`0.00`)
    pub fn fixed(decimals: u8) -> Self {
        Self::from_compact(CompactFormat {
            decimals,
            grouping: false,
            percent: false,
        })
    }

    /// Thousands separator with decimals (`#,##0.00`)
    pub fn thousands(decimals: u8) -> Self {
        Self::from_compact(CompactFormat {
            decimals,
            grouping: true,
            percent: false,
        })
    }

    /// Percentage (`0.00%`)
    pub fn percent(decimals: u8) -> Self {
        Self::from_compact(CompactFormat {
            decimals,
            grouping: false,
            percent: true,
        })
    }

    /// Build from a compact description
    pub fn from_compact(compact: CompactFormat) -> Self {
        NumberFormat::Custom(compact.to_code())
    }

    /// Get the format code (`General` for the general format)
    pub fn code(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::Custom(code) => code,
        }
    }

    /// Check if this is the general format
    pub fn is_general(&self) -> bool {
        matches!(self, NumberFormat::General)
    }

    /// Reduce to a compact description, if the code is one
    ///
    /// `General` reduces to `None`; so does anything with dates, text
    /// sections or literals.
    pub fn compact(&self) -> Option<CompactFormat> {
        let NumberFormat::Custom(code) = self else {
            return None;
        };
        let caps = COMPACT_CODE.captures(code)?;
        let decimals = caps.get(2).map(|m| m.as_str().len()).unwrap_or(0);
        Some(CompactFormat {
            decimals: u8::try_from(decimals).ok()?,
            grouping: caps.get(1).is_some(),
            percent: caps.get(3).is_some(),
        })
    }

    /// Parse an XML Spreadsheet `ss:Format` value, resolving named formats
    pub fn from_xmlss(value: &str) -> Self {
        match value {
            "General" | "General Number" => NumberFormat::General,
            "Fixed" => Self::fixed(2),
            "Standard" => Self::thousands(2),
            "Percent" => Self::percent(2),
            "Scientific" => NumberFormat::Custom("0.00E+00".into()),
            "Short Date" => NumberFormat::Custom("Short Date".into()),
            other => Self::from_code(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_reduction() {
        assert_eq!(
            NumberFormat::from_code("#,##0.00").compact(),
            Some(CompactFormat {
                decimals: 2,
                grouping: true,
                percent: false
            })
        );
        assert_eq!(
            NumberFormat::from_code("0%").compact(),
            Some(CompactFormat {
                decimals: 0,
                grouping: false,
                percent: true
            })
        );
        assert_eq!(NumberFormat::from_code("dd/mm/yyyy").compact(), None);
        assert_eq!(NumberFormat::General.compact(), None);
    }

    #[test]
    fn test_named_xmlss_formats() {
        assert_eq!(NumberFormat::from_xmlss("Fixed"), NumberFormat::fixed(2));
        assert_eq!(NumberFormat::from_xmlss("Standard").code(), "#,##0.00");
        assert_eq!(NumberFormat::from_xmlss("Percent").code(), "0.00%");
        assert!(NumberFormat::from_xmlss("General").is_general());
    }

    #[test]
    fn test_compact_code_round_trip() {
        let compact = CompactFormat {
            decimals: 3,
            grouping: true,
            percent: true,
        };
        assert_eq!(compact.to_code(), "#,##0.000%");
        assert_eq!(NumberFormat::from_compact(compact).compact(), Some(compact));
    }
}
