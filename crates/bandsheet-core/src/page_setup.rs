//! Page setup (print layout) for a table

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// XML Spreadsheet `x:Orientation` value
    pub fn xmlss_name(&self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }

    /// Parse an XML Spreadsheet `x:Orientation` value
    pub fn from_xmlss_name(s: &str) -> Self {
        if s.eq_ignore_ascii_case("landscape") {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Page margins in inches
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
    pub header: f64,
    pub footer: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 1.0,
            bottom: 1.0,
            left: 0.75,
            right: 0.75,
            header: 0.5,
            footer: 0.5,
        }
    }
}

/// Paper size index values understood by both target formats
pub mod paper {
    pub const LETTER: u32 = 1;
    pub const LEGAL: u32 = 5;
    pub const A3: u32 = 8;
    pub const A4: u32 = 9;
    pub const A5: u32 = 11;
}

/// Physical `(width, height)` in millimetres of a paper size index, portrait
pub fn paper_dimensions_mm(index: u32) -> Option<(f64, f64)> {
    match index {
        paper::LETTER => Some((215.9, 279.4)),
        paper::LEGAL => Some((215.9, 355.6)),
        paper::A3 => Some((297.0, 420.0)),
        paper::A4 => Some((210.0, 297.0)),
        paper::A5 => Some((148.0, 210.0)),
        _ => None,
    }
}

/// Closest paper size index for a physical size (either orientation)
///
/// Sizes within 2mm of a known paper match it; anything else is treated as
/// A4 when it is no larger than A4 and A3 otherwise.
pub fn paper_index_for(width_mm: f64, height_mm: f64) -> u32 {
    let (short, long) = if width_mm <= height_mm {
        (width_mm, height_mm)
    } else {
        (height_mm, width_mm)
    };
    for index in [paper::LETTER, paper::LEGAL, paper::A3, paper::A4, paper::A5] {
        if let Some((w, h)) = paper_dimensions_mm(index) {
            if (w - short).abs() < 2.0 && (h - long).abs() < 2.0 {
                return index;
            }
        }
    }
    if short <= 210.0 && long <= 297.0 {
        paper::A4
    } else {
        paper::A3
    }
}

/// Print layout of one table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageSetup {
    pub orientation: Orientation,
    pub margins: Margins,
    /// Paper size index (see [`paper`])
    pub paper_size_index: u32,
    /// Center horizontally on the page
    pub center_horizontal: bool,
    /// Center vertically on the page
    pub center_vertical: bool,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            paper_size_index: paper::A4,
            center_horizontal: false,
            center_vertical: false,
        }
    }
}

impl PageSetup {
    /// Physical page size in millimetres with orientation applied
    ///
    /// Unknown paper indices fall back to A4.
    pub fn page_size_mm(&self) -> (f64, f64) {
        let (w, h) = paper_dimensions_mm(self.paper_size_index).unwrap_or((210.0, 297.0));
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    /// Check if every field has its default value
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_follows_orientation() {
        let mut setup = PageSetup {
            paper_size_index: paper::LETTER,
            ..PageSetup::default()
        };
        assert_eq!(setup.page_size_mm(), (215.9, 279.4));
        setup.orientation = Orientation::Landscape;
        assert_eq!(setup.page_size_mm(), (279.4, 215.9));
    }

    #[test]
    fn test_paper_index_for_physical_size() {
        assert_eq!(paper_index_for(210.0, 297.0), paper::A4);
        assert_eq!(paper_index_for(297.0, 210.0), paper::A4);
        assert_eq!(paper_index_for(215.9, 355.6), paper::LEGAL);
        assert_eq!(paper_index_for(148.1, 209.9), paper::A5);
        assert_eq!(paper_index_for(200.0, 250.0), paper::A4);
        assert_eq!(paper_index_for(500.0, 700.0), paper::A3);
    }
}
