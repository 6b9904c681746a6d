//! Page layouts (`style:page-layout`) for table print setup

use crate::styles::{length_to_inches, length_to_mm};
use bandsheet_core::page_setup::{paper_index_for, Orientation, PageSetup};
use bandsheet_core::value::format_number;

fn inches(v: f64) -> String {
    format!("{}in", format_number(v))
}

/// `style:page-layout` element for a table's page setup
///
/// The physical page size comes from the paper size index with the
/// orientation applied.
pub(crate) fn page_layout_xml(name: &str, setup: &PageSetup) -> String {
    let (width, height) = setup.page_size_mm();
    let orientation = match setup.orientation {
        Orientation::Portrait => "portrait",
        Orientation::Landscape => "landscape",
    };
    let centering = match (setup.center_horizontal, setup.center_vertical) {
        (false, false) => "none",
        (true, false) => "horizontal",
        (false, true) => "vertical",
        (true, true) => "both",
    };
    let m = &setup.margins;
    format!(
        concat!(
            "<style:page-layout style:name=\"{name}\">",
            "<style:page-layout-properties fo:page-width=\"{w}mm\" fo:page-height=\"{h}mm\" ",
            "style:print-orientation=\"{o}\" style:table-centering=\"{c}\" ",
            "fo:margin-top=\"{top}\" fo:margin-bottom=\"{bottom}\" fo:margin-left=\"{left}\" fo:margin-right=\"{right}\"/>",
            "<style:header-style><style:header-footer-properties fo:min-height=\"{header}\"/></style:header-style>",
            "<style:footer-style><style:header-footer-properties fo:min-height=\"{footer}\"/></style:footer-style>",
            "</style:page-layout>"
        ),
        name = name,
        w = format_number(width),
        h = format_number(height),
        o = orientation,
        c = centering,
        top = inches(m.top),
        bottom = inches(m.bottom),
        left = inches(m.left),
        right = inches(m.right),
        header = inches(m.header),
        footer = inches(m.footer),
    )
}

/// Page layout being rebuilt from `styles.xml`
#[derive(Debug, Default)]
pub(crate) struct PageLayoutBuilder {
    pub name: String,
    setup: PageSetup,
    size_mm: Option<(f64, f64)>,
    in_header: bool,
    in_footer: bool,
}

impl PageLayoutBuilder {
    pub fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn enter_header(&mut self, header: bool) {
        self.in_header = header;
        self.in_footer = !header;
    }

    /// Apply `style:page-layout-properties`
    pub fn layout_properties(&mut self, attrs: &[(String, String)]) {
        let mut width = None;
        let mut height = None;
        for (key, value) in attrs {
            let margins = &mut self.setup.margins;
            match key.as_str() {
                "fo:page-width" => width = length_to_mm(value),
                "fo:page-height" => height = length_to_mm(value),
                "style:print-orientation" => {
                    self.setup.orientation = if value == "landscape" {
                        Orientation::Landscape
                    } else {
                        Orientation::Portrait
                    }
                }
                "style:table-centering" => {
                    self.setup.center_horizontal = matches!(value.as_str(), "horizontal" | "both");
                    self.setup.center_vertical = matches!(value.as_str(), "vertical" | "both");
                }
                "fo:margin-top" => margins.top = length_to_inches(value).unwrap_or(margins.top),
                "fo:margin-bottom" => {
                    margins.bottom = length_to_inches(value).unwrap_or(margins.bottom)
                }
                "fo:margin-left" => margins.left = length_to_inches(value).unwrap_or(margins.left),
                "fo:margin-right" => {
                    margins.right = length_to_inches(value).unwrap_or(margins.right)
                }
                _ => {}
            }
        }
        if let (Some(w), Some(h)) = (width, height) {
            self.size_mm = Some((w, h));
        }
    }

    /// Apply `style:header-footer-properties` inside the current header or footer
    pub fn header_footer_properties(&mut self, attrs: &[(String, String)]) {
        let Some(height) = attrs
            .iter()
            .find(|(k, _)| k == "fo:min-height")
            .and_then(|(_, v)| length_to_inches(v))
        else {
            return;
        };
        if self.in_header {
            self.setup.margins.header = height;
        } else if self.in_footer {
            self.setup.margins.footer = height;
        }
    }

    pub fn finish(mut self) -> (String, PageSetup) {
        if let Some((w, h)) = self.size_mm {
            self.setup.paper_size_index = paper_index_for(w, h);
        }
        (self.name, self.setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandsheet_core::page_setup::paper;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_landscape_letter_layout() {
        let mut setup = PageSetup {
            orientation: Orientation::Landscape,
            paper_size_index: paper::LETTER,
            center_horizontal: true,
            ..PageSetup::default()
        };
        setup.margins.top = 0.25;
        let xml = page_layout_xml("pm1", &setup);
        assert!(xml.contains("fo:page-width=\"279.4mm\" fo:page-height=\"215.9mm\""));
        assert!(xml.contains("style:table-centering=\"horizontal\""));

        let mut builder = PageLayoutBuilder::new("pm1".into());
        builder.layout_properties(&[
            ("fo:page-width".into(), "279.4mm".into()),
            ("fo:page-height".into(), "215.9mm".into()),
            ("style:print-orientation".into(), "landscape".into()),
            ("style:table-centering".into(), "horizontal".into()),
            ("fo:margin-top".into(), "0.25in".into()),
        ]);
        let (name, back) = builder.finish();
        assert_eq!(name, "pm1");
        assert_eq!(back, setup);
    }

    #[test]
    fn test_unknown_size_uses_heuristic() {
        let mut builder = PageLayoutBuilder::new("pm2".into());
        builder.layout_properties(&[
            ("fo:page-width".into(), "20cm".into()),
            ("fo:page-height".into(), "25cm".into()),
        ]);
        assert_eq!(builder.finish().1.paper_size_index, paper::A4);
    }
}
