//! `Styles` section read/write helpers

use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::{XmlssError, XmlssResult};
use bandsheet_core::style::{
    style_name, BorderEdge, BorderLineStyle, BorderPosition, BorderStyle, Color, FillStyle,
    FontStyle, FontVerticalAlign, HorizontalAlignment, NumberFormat, PatternType, Style, StyleId,
    Underline, VerticalAlignment,
};
use bandsheet_core::value::format_number;

// === Attribute helpers ===

/// Attributes of an element keyed by local name (`ss:Index` -> `Index`)
pub(crate) fn attributes(e: &BytesStart<'_>) -> XmlssResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

pub(crate) fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

pub(crate) fn parse_f64(name: &str, value: &str) -> XmlssResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| XmlssError::Parse(format!("{}=\"{}\" is not a number", name, value)))
}

pub(crate) fn parse_u32(name: &str, value: &str) -> XmlssResult<u32> {
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| XmlssError::Parse(format!("{}=\"{}\" is not a count", name, value)))
}

fn parse_color(value: &str) -> Color {
    Color::from_hex(value).unwrap_or_else(|| {
        log::warn!("unrecognized color '{}', using automatic", value);
        Color::Auto
    })
}

// === Writing ===

pub(crate) fn write_style<W: Write>(
    xml: &mut Writer<W>,
    id: StyleId,
    style: &Style,
) -> XmlssResult<()> {
    let name = style_name(id);
    let mut start = BytesStart::new("Style");
    start.push_attribute(("ss:ID", name.as_str()));
    if id == 0 {
        start.push_attribute(("ss:Name", "Normal"));
    }
    xml.write_event(Event::Start(start))?;

    write_alignment(xml, style)?;
    write_borders(xml, &style.border)?;
    write_font(xml, &style.font)?;
    write_interior(xml, &style.fill)?;
    if !style.number_format.is_general() {
        let mut e = BytesStart::new("NumberFormat");
        e.push_attribute(("ss:Format", style.number_format.code()));
        xml.write_event(Event::Empty(e))?;
    }

    xml.write_event(Event::End(BytesEnd::new("Style")))?;
    Ok(())
}

fn write_alignment<W: Write>(xml: &mut Writer<W>, style: &Style) -> XmlssResult<()> {
    let al = &style.alignment;
    if al.is_default() {
        return Ok(());
    }
    let mut e = BytesStart::new("Alignment");
    if al.horizontal != HorizontalAlignment::General {
        e.push_attribute(("ss:Horizontal", al.horizontal.xmlss_name()));
    }
    e.push_attribute(("ss:Vertical", al.vertical.xmlss_name()));
    if al.wrap_text {
        e.push_attribute(("ss:WrapText", "1"));
    }
    if al.shrink_to_fit {
        e.push_attribute(("ss:ShrinkToFit", "1"));
    }
    if al.indent > 0 {
        e.push_attribute(("ss:Indent", al.indent.to_string().as_str()));
    }
    if al.rotation != 0 {
        e.push_attribute(("ss:Rotate", al.rotation.to_string().as_str()));
    }
    xml.write_event(Event::Empty(e))?;
    Ok(())
}

fn write_borders<W: Write>(xml: &mut Writer<W>, border: &BorderStyle) -> XmlssResult<()> {
    if border.is_empty() {
        return Ok(());
    }
    xml.write_event(Event::Start(BytesStart::new("Borders")))?;
    for (position, edge) in border.edges() {
        let mut e = BytesStart::new("Border");
        e.push_attribute(("ss:Position", position.xmlss_name()));
        e.push_attribute(("ss:LineStyle", edge.line.xmlss_name()));
        e.push_attribute(("ss:Weight", edge.weight.to_string().as_str()));
        if !edge.color.is_auto() {
            e.push_attribute(("ss:Color", edge.color.to_hex().as_str()));
        }
        xml.write_event(Event::Empty(e))?;
    }
    xml.write_event(Event::End(BytesEnd::new("Borders")))?;
    Ok(())
}

fn write_font<W: Write>(xml: &mut Writer<W>, font: &FontStyle) -> XmlssResult<()> {
    let mut e = BytesStart::new("Font");
    e.push_attribute(("ss:FontName", font.name.as_str()));
    e.push_attribute(("ss:Size", format_number(font.size).as_str()));
    if font.bold {
        e.push_attribute(("ss:Bold", "1"));
    }
    if font.italic {
        e.push_attribute(("ss:Italic", "1"));
    }
    if font.underline != Underline::None {
        e.push_attribute(("ss:Underline", font.underline.xmlss_name()));
    }
    if font.strikethrough {
        e.push_attribute(("ss:StrikeThrough", "1"));
    }
    if font.vertical_align != FontVerticalAlign::Baseline {
        e.push_attribute(("ss:VerticalAlign", font.vertical_align.xmlss_name()));
    }
    if !font.color.is_auto() {
        e.push_attribute(("ss:Color", font.color.to_hex().as_str()));
    }
    xml.write_event(Event::Empty(e))?;
    Ok(())
}

fn write_interior<W: Write>(xml: &mut Writer<W>, fill: &FillStyle) -> XmlssResult<()> {
    let mut e = BytesStart::new("Interior");
    match fill {
        FillStyle::None => return Ok(()),
        FillStyle::Solid { color } => {
            e.push_attribute(("ss:Color", color.to_hex().as_str()));
            e.push_attribute(("ss:Pattern", "Solid"));
        }
        FillStyle::Pattern {
            pattern,
            foreground,
            background,
        } => {
            if !background.is_auto() {
                e.push_attribute(("ss:Color", background.to_hex().as_str()));
            }
            e.push_attribute(("ss:Pattern", pattern.xmlss_name()));
            if !foreground.is_auto() {
                e.push_attribute(("ss:PatternColor", foreground.to_hex().as_str()));
            }
        }
    }
    xml.write_event(Event::Empty(e))?;
    Ok(())
}

// === Reading ===

/// Apply an `Alignment` element onto a style
pub(crate) fn apply_alignment(style: &mut Style, attrs: &[(String, String)]) -> XmlssResult<()> {
    let al = &mut style.alignment;
    for (key, value) in attrs {
        match key.as_str() {
            "Horizontal" => match HorizontalAlignment::from_xmlss_name(value) {
                Some(h) => al.horizontal = h,
                None => log::warn!("unknown horizontal alignment '{}'", value),
            },
            "Vertical" => match VerticalAlignment::from_xmlss_name(value) {
                Some(v) => al.vertical = v,
                None => log::warn!("unknown vertical alignment '{}'", value),
            },
            "WrapText" => al.wrap_text = parse_bool(value),
            "ShrinkToFit" => al.shrink_to_fit = parse_bool(value),
            "Indent" => al.indent = parse_u32(key, value)?.min(u8::MAX as u32) as u8,
            "Rotate" => al.rotation = parse_f64(key, value)?.clamp(-90.0, 90.0) as i16,
            _ => {}
        }
    }
    Ok(())
}

/// Apply a `Border` element onto a border set
pub(crate) fn apply_border(border: &mut BorderStyle, attrs: &[(String, String)]) -> XmlssResult<()> {
    let mut position = None;
    let mut line = None;
    let mut weight = 0u8;
    let mut color = Color::Auto;
    for (key, value) in attrs {
        match key.as_str() {
            "Position" => position = BorderPosition::from_xmlss_name(value),
            "LineStyle" => line = BorderLineStyle::from_xmlss_name(value),
            "Weight" => weight = parse_f64(key, value)?.clamp(0.0, 3.0) as u8,
            "Color" => color = parse_color(value),
            _ => {}
        }
    }
    match (position, line) {
        (Some(position), Some(line)) => {
            border.set_edge(position, Some(BorderEdge::new(line, weight, color)));
        }
        (Some(position), None) => border.set_edge(position, None),
        (None, _) => log::warn!("border without a known ss:Position ignored"),
    }
    Ok(())
}

/// Apply a `Font` element onto a style
pub(crate) fn apply_font(style: &mut Style, attrs: &[(String, String)]) -> XmlssResult<()> {
    let font = &mut style.font;
    for (key, value) in attrs {
        match key.as_str() {
            "FontName" => font.name = value.clone(),
            "Size" => font.size = parse_f64(key, value)?,
            "Bold" => font.bold = parse_bool(value),
            "Italic" => font.italic = parse_bool(value),
            "Underline" => font.underline = Underline::from_xmlss_name(value).unwrap_or_default(),
            "StrikeThrough" => font.strikethrough = parse_bool(value),
            "VerticalAlign" => {
                font.vertical_align = FontVerticalAlign::from_xmlss_name(value).unwrap_or_default()
            }
            "Color" => font.color = parse_color(value),
            _ => {}
        }
    }
    Ok(())
}

/// Apply an `Interior` element onto a style
pub(crate) fn apply_interior(style: &mut Style, attrs: &[(String, String)]) {
    let mut color = None;
    let mut pattern = None;
    let mut pattern_color = Color::Auto;
    for (key, value) in attrs {
        match key.as_str() {
            "Color" => color = Some(parse_color(value)),
            "Pattern" => pattern = Some(value.as_str()),
            "PatternColor" => pattern_color = parse_color(value),
            _ => {}
        }
    }
    style.fill = match (pattern, color) {
        (Some("None"), _) | (None, None) => FillStyle::None,
        (Some("Solid"), color) | (None, color) => FillStyle::solid(color.unwrap_or(Color::Auto)),
        (Some(name), color) => match PatternType::from_xmlss_name(name) {
            Some(p) => FillStyle::pattern(p, pattern_color, color.unwrap_or(Color::Auto)),
            None => {
                log::warn!("unknown interior pattern '{}', using a solid fill", name);
                FillStyle::solid(color.unwrap_or(Color::Auto))
            }
        },
    };
}

/// Apply a `NumberFormat` element onto a style
pub(crate) fn apply_number_format(style: &mut Style, attrs: &[(String, String)]) {
    style.number_format = attrs
        .iter()
        .find(|(k, _)| k == "Format")
        .map(|(_, v)| NumberFormat::from_xmlss(v))
        .unwrap_or_default();
}
