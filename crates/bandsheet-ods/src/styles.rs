//! Cell style translation between the document model and ODF properties
//!
//! Every property goes through an explicit lookup table in each direction.
//! Model values with no ODF counterpart are reported through
//! [`Translation::degrade`]: an error in strict mode, a warning plus the
//! closest ODF value otherwise.

use crate::error::{OdsError, OdsResult};
use crate::escape_xml;
use bandsheet_core::style::{
    BorderEdge, BorderLineStyle, BorderPosition, Color, FillStyle, FontVerticalAlign,
    HorizontalAlignment, Style, Underline, VerticalAlignment,
};
use bandsheet_core::value::format_number;

/// Style being translated and how to treat lossy properties
pub(crate) struct Translation<'a> {
    pub name: &'a str,
    pub strict: bool,
}

impl Translation<'_> {
    pub(crate) fn degrade(&self, message: String) -> OdsResult<()> {
        if self.strict {
            return Err(OdsError::StyleTranslation {
                style: self.name.to_string(),
                message,
            });
        }
        log::warn!("style {}: {}", self.name, message);
        Ok(())
    }
}

// === Lookup tables ===

/// Border widths by weight (hairline, thin, medium, thick)
const BORDER_WIDTHS: [(u8, f64); 4] = [(0, 0.05), (1, 0.74), (2, 1.76), (3, 2.49)];

fn border_line_to_odf(line: BorderLineStyle) -> Option<&'static str> {
    match line {
        BorderLineStyle::Continuous => Some("solid"),
        BorderLineStyle::Dash => Some("dashed"),
        BorderLineStyle::Dot => Some("dotted"),
        BorderLineStyle::DashDot => Some("dash-dot"),
        BorderLineStyle::DashDotDot => Some("dash-dot-dot"),
        BorderLineStyle::Double => Some("double"),
        BorderLineStyle::SlantDashDot => None,
    }
}

fn border_line_from_odf(s: &str) -> Option<BorderLineStyle> {
    Some(match s {
        "solid" => BorderLineStyle::Continuous,
        "dashed" | "fine-dashed" | "dash" => BorderLineStyle::Dash,
        "dotted" | "dot" => BorderLineStyle::Dot,
        "dash-dot" => BorderLineStyle::DashDot,
        "dash-dot-dot" => BorderLineStyle::DashDotDot,
        "double" | "double-thin" => BorderLineStyle::Double,
        _ => return None,
    })
}

fn border_attr(position: BorderPosition) -> &'static str {
    match position {
        BorderPosition::Left => "fo:border-left",
        BorderPosition::Right => "fo:border-right",
        BorderPosition::Top => "fo:border-top",
        BorderPosition::Bottom => "fo:border-bottom",
    }
}

fn horizontal_to_odf(h: HorizontalAlignment) -> Option<&'static str> {
    match h {
        HorizontalAlignment::General => None,
        HorizontalAlignment::Left => Some("start"),
        HorizontalAlignment::Center => Some("center"),
        HorizontalAlignment::Right => Some("end"),
        HorizontalAlignment::Justify => Some("justify"),
        HorizontalAlignment::Fill
        | HorizontalAlignment::CenterAcrossSelection
        | HorizontalAlignment::Distributed => None,
    }
}

fn horizontal_from_odf(s: &str) -> Option<HorizontalAlignment> {
    Some(match s {
        "start" | "left" => HorizontalAlignment::Left,
        "center" => HorizontalAlignment::Center,
        "end" | "right" => HorizontalAlignment::Right,
        "justify" => HorizontalAlignment::Justify,
        _ => return None,
    })
}

fn vertical_to_odf(v: VerticalAlignment) -> Option<&'static str> {
    match v {
        VerticalAlignment::Top => Some("top"),
        VerticalAlignment::Center => Some("middle"),
        VerticalAlignment::Bottom => Some("bottom"),
        VerticalAlignment::Justify | VerticalAlignment::Distributed => None,
    }
}

fn vertical_from_odf(s: &str) -> Option<VerticalAlignment> {
    Some(match s {
        "top" => VerticalAlignment::Top,
        "middle" => VerticalAlignment::Center,
        "bottom" | "automatic" => VerticalAlignment::Bottom,
        _ => return None,
    })
}

/// `(underline style, underline type)`
fn underline_to_odf(u: Underline) -> Option<(&'static str, &'static str)> {
    match u {
        Underline::None => None,
        Underline::Single | Underline::SingleAccounting => Some(("solid", "single")),
        Underline::Double | Underline::DoubleAccounting => Some(("solid", "double")),
    }
}

fn underline_from_odf(style: &str, kind: Option<&str>) -> Underline {
    match (style, kind) {
        ("none", _) => Underline::None,
        (_, Some("double")) => Underline::Double,
        _ => Underline::Single,
    }
}

fn text_position_to_odf(v: FontVerticalAlign) -> Option<&'static str> {
    match v {
        FontVerticalAlign::Baseline => None,
        FontVerticalAlign::Superscript => Some("super 58%"),
        FontVerticalAlign::Subscript => Some("sub 58%"),
    }
}

fn text_position_from_odf(s: &str) -> FontVerticalAlign {
    let first = s.split_whitespace().next().unwrap_or_default();
    match first {
        "super" => FontVerticalAlign::Superscript,
        "sub" => FontVerticalAlign::Subscript,
        _ => match first.trim_end_matches('%').parse::<f64>() {
            Ok(p) if p > 0.0 => FontVerticalAlign::Superscript,
            Ok(p) if p < 0.0 => FontVerticalAlign::Subscript,
            _ => FontVerticalAlign::Baseline,
        },
    }
}

/// Points per indent level (`fo:margin-left`)
const INDENT_POINTS: f64 = 10.0;

// === Lengths ===

/// Split `"2.5cm"` into `(2.5, "cm")`
fn split_length(s: &str) -> Option<(f64, &str)> {
    let s = s.trim();
    let at = s
        .find(|c: char| c.is_ascii_alphabetic() || c == '%')
        .unwrap_or(s.len());
    let value = s[..at].trim().parse::<f64>().ok()?;
    Some((value, &s[at..]))
}

/// Parse an ODF length into points
pub(crate) fn length_to_points(s: &str) -> Option<f64> {
    let (v, unit) = split_length(s)?;
    Some(match unit {
        "pt" | "" => v,
        "in" => v * 72.0,
        "cm" => v * 72.0 / 2.54,
        "mm" => v * 72.0 / 25.4,
        "pc" => v * 12.0,
        "px" => v * 0.75,
        _ => return None,
    })
}

/// Parse an ODF length into inches
pub(crate) fn length_to_inches(s: &str) -> Option<f64> {
    let (v, unit) = split_length(s)?;
    Some(match unit {
        "in" => v,
        "cm" => v / 2.54,
        "mm" => v / 25.4,
        "pt" | "" => v / 72.0,
        "pc" => v / 6.0,
        _ => return None,
    })
}

/// Parse an ODF length into millimetres
pub(crate) fn length_to_mm(s: &str) -> Option<f64> {
    let (v, unit) = split_length(s)?;
    Some(match unit {
        "mm" => v,
        "cm" => v * 10.0,
        "in" => v * 25.4,
        "pt" | "" => v * 25.4 / 72.0,
        _ => return None,
    })
}

// === Writing ===

fn border_value(edge: &BorderEdge, tr: &Translation<'_>) -> OdsResult<String> {
    let line = match border_line_to_odf(edge.line) {
        Some(line) => line,
        None => {
            tr.degrade(format!("border line {:?} drawn as dash-dot", edge.line))?;
            "dash-dot"
        }
    };
    let width = BORDER_WIDTHS
        .iter()
        .find(|(w, _)| *w == edge.weight)
        .map_or(0.74, |(_, pt)| *pt);
    let mut value = format!("{}pt {}", format_number(width), line);
    if !edge.color.is_auto() {
        value.push(' ');
        value.push_str(&edge.color.to_hex());
    }
    Ok(value)
}

/// `style:table-cell-properties`, `style:paragraph-properties` and
/// `style:text-properties` children of a cell style
pub(crate) fn cell_properties_xml(style: &Style, tr: &Translation<'_>) -> OdsResult<String> {
    let mut cell = String::new();
    match &style.fill {
        FillStyle::None => {}
        FillStyle::Solid { color } => {
            cell.push_str(&format!(" fo:background-color=\"{}\"", color.to_hex()));
        }
        FillStyle::Pattern { pattern, background, .. } => {
            tr.degrade(format!(
                "pattern fill {:?} written as its background color",
                pattern
            ))?;
            if !background.is_auto() {
                cell.push_str(&format!(" fo:background-color=\"{}\"", background.to_hex()));
            }
        }
    }
    for position in BorderPosition::ALL {
        if let Some(edge) = style.border.edge(position) {
            cell.push_str(&format!(
                " {}=\"{}\"",
                border_attr(position),
                border_value(edge, tr)?
            ));
        }
    }

    let al = &style.alignment;
    match vertical_to_odf(al.vertical) {
        Some(v) => cell.push_str(&format!(" style:vertical-align=\"{}\"", v)),
        None => {
            tr.degrade(format!("vertical alignment {:?} written as middle", al.vertical))?;
            cell.push_str(" style:vertical-align=\"middle\"");
        }
    }
    if al.wrap_text {
        cell.push_str(" fo:wrap-option=\"wrap\"");
    }
    if al.shrink_to_fit {
        cell.push_str(" style:shrink-to-fit=\"true\"");
    }
    if al.rotation != 0 {
        let angle = (al.rotation as i32).rem_euclid(360);
        cell.push_str(&format!(" style:rotation-angle=\"{}\"", angle));
    }
    if al.horizontal != HorizontalAlignment::General {
        cell.push_str(" style:text-align-source=\"fix\"");
    }

    let mut paragraph = String::new();
    if al.horizontal != HorizontalAlignment::General {
        let align = match horizontal_to_odf(al.horizontal) {
            Some(a) => a,
            None => {
                let closest = match al.horizontal {
                    HorizontalAlignment::Fill => "start",
                    HorizontalAlignment::Distributed => "justify",
                    _ => "center",
                };
                tr.degrade(format!(
                    "horizontal alignment {:?} written as {}",
                    al.horizontal, closest
                ))?;
                closest
            }
        };
        paragraph.push_str(&format!(" fo:text-align=\"{}\"", align));
    }
    if al.indent > 0 {
        paragraph.push_str(&format!(
            " fo:margin-left=\"{}pt\"",
            format_number(al.indent as f64 * INDENT_POINTS)
        ));
    }

    let font = &style.font;
    let mut text = format!(
        " style:font-name=\"{}\" fo:font-size=\"{}pt\"",
        escape_xml(&font.name),
        format_number(font.size)
    );
    text.push_str(if font.bold {
        " fo:font-weight=\"bold\""
    } else {
        " fo:font-weight=\"normal\""
    });
    text.push_str(if font.italic {
        " fo:font-style=\"italic\""
    } else {
        " fo:font-style=\"normal\""
    });
    if matches!(
        font.underline,
        Underline::SingleAccounting | Underline::DoubleAccounting
    ) {
        tr.degrade(format!("underline {:?} written as plain", font.underline))?;
    }
    if let Some((line, kind)) = underline_to_odf(font.underline) {
        text.push_str(&format!(
            " style:text-underline-style=\"{}\" style:text-underline-type=\"{}\" style:text-underline-width=\"auto\" style:text-underline-color=\"font-color\"",
            line, kind
        ));
    }
    if font.strikethrough {
        text.push_str(" style:text-line-through-style=\"solid\"");
    }
    if let Some(position) = text_position_to_odf(font.vertical_align) {
        text.push_str(&format!(" style:text-position=\"{}\"", position));
    }
    if !font.color.is_auto() {
        text.push_str(&format!(" fo:color=\"{}\"", font.color.to_hex()));
    }

    let mut xml = format!("<style:table-cell-properties{}/>", cell);
    if !paragraph.is_empty() {
        xml.push_str(&format!("<style:paragraph-properties{}/>", paragraph));
    }
    xml.push_str(&format!("<style:text-properties{}/>", text));
    Ok(xml)
}

// === Reading ===

fn get<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_border(value: &str) -> Option<BorderEdge> {
    if value.trim() == "none" || value.trim().is_empty() {
        return None;
    }
    let mut line = BorderLineStyle::Continuous;
    let mut weight = 1;
    let mut color = Color::Auto;
    for part in value.split_whitespace() {
        if let Some(c) = Color::from_hex(part).filter(|_| part.starts_with('#')) {
            color = c;
        } else if let Some(l) = border_line_from_odf(part) {
            line = l;
        } else if let Some(pt) = length_to_points(part) {
            weight = BORDER_WIDTHS
                .iter()
                .min_by(|a, b| (a.1 - pt).abs().total_cmp(&(b.1 - pt).abs()))
                .map_or(1, |(w, _)| *w);
        } else if part == "none" {
            return None;
        }
    }
    Some(BorderEdge::new(line, weight, color))
}

/// Apply `style:table-cell-properties`
pub(crate) fn apply_cell_properties(style: &mut Style, attrs: &[(String, String)]) {
    if let Some(all) = get(attrs, "fo:border") {
        for position in BorderPosition::ALL {
            style.border.set_edge(position, parse_border(all));
        }
    }
    for position in BorderPosition::ALL {
        if let Some(value) = get(attrs, border_attr(position)) {
            style.border.set_edge(position, parse_border(value));
        }
    }
    if let Some(bg) = get(attrs, "fo:background-color") {
        style.fill = match bg {
            "transparent" => FillStyle::None,
            hex => match Color::from_hex(hex) {
                Some(color) => FillStyle::solid(color),
                None => {
                    log::warn!("unrecognized background color '{}'", hex);
                    FillStyle::None
                }
            },
        };
    }
    let al = &mut style.alignment;
    if let Some(v) = get(attrs, "style:vertical-align") {
        match vertical_from_odf(v) {
            Some(v) => al.vertical = v,
            None => log::warn!("unknown vertical alignment '{}'", v),
        }
    }
    if let Some(wrap) = get(attrs, "fo:wrap-option") {
        al.wrap_text = wrap == "wrap";
    }
    if let Some(shrink) = get(attrs, "style:shrink-to-fit") {
        al.shrink_to_fit = shrink == "true";
    }
    if let Some(angle) = get(attrs, "style:rotation-angle") {
        let degrees = angle
            .trim_end_matches("deg")
            .parse::<f64>()
            .map(|a| a.round() as i32)
            .unwrap_or(0)
            .rem_euclid(360);
        al.rotation = if degrees > 180 { degrees - 360 } else { degrees } as i16;
    }
}

/// Apply `style:paragraph-properties`
pub(crate) fn apply_paragraph_properties(style: &mut Style, attrs: &[(String, String)]) {
    if let Some(align) = get(attrs, "fo:text-align") {
        match horizontal_from_odf(align) {
            Some(h) => style.alignment.horizontal = h,
            None => log::warn!("unknown text alignment '{}'", align),
        }
    }
    if let Some(margin) = get(attrs, "fo:margin-left").and_then(length_to_points) {
        style.alignment.indent = (margin / INDENT_POINTS).round().clamp(0.0, 255.0) as u8;
    }
}

/// Apply `style:text-properties`
pub(crate) fn apply_text_properties(style: &mut Style, attrs: &[(String, String)]) {
    let font = &mut style.font;
    if let Some(name) = get(attrs, "style:font-name").or_else(|| get(attrs, "fo:font-family")) {
        font.name = name.trim_matches('\'').to_string();
    }
    if let Some(size) = get(attrs, "fo:font-size").and_then(length_to_points) {
        font.size = size;
    }
    if let Some(weight) = get(attrs, "fo:font-weight") {
        font.bold = weight == "bold" || weight.parse::<u32>().map_or(false, |w| w >= 600);
    }
    if let Some(slant) = get(attrs, "fo:font-style") {
        font.italic = slant == "italic" || slant == "oblique";
    }
    if let Some(line) = get(attrs, "style:text-underline-style") {
        font.underline = underline_from_odf(line, get(attrs, "style:text-underline-type"));
    }
    if let Some(line) = get(attrs, "style:text-line-through-style") {
        font.strikethrough = line != "none";
    }
    if let Some(position) = get(attrs, "style:text-position") {
        font.vertical_align = text_position_from_odf(position);
    }
    if let Some(color) = get(attrs, "fo:color") {
        font.color = Color::from_hex(color).unwrap_or(Color::Auto);
    }
}
