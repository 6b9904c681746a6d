//! ODF number styles synthesized from compact formats

use bandsheet_core::style::{CompactFormat, NumberFormat};

/// `number:number-style` / `number:percentage-style` element for a format
pub(crate) fn number_style_xml(name: &str, format: &CompactFormat) -> String {
    let number = format!(
        "<number:number number:decimal-places=\"{d}\" number:min-decimal-places=\"{d}\" number:min-integer-digits=\"1\"{}/>",
        if format.grouping { " number:grouping=\"true\"" } else { "" },
        d = format.decimals,
    );
    if format.percent {
        format!(
            "<number:percentage-style style:name=\"{}\">{}<number:text>%</number:text></number:percentage-style>",
            name, number
        )
    } else {
        format!(
            "<number:number-style style:name=\"{}\">{}</number:number-style>",
            name, number
        )
    }
}

/// Number style being rebuilt from `content.xml`
#[derive(Debug, Default)]
pub(crate) struct NumberStyleBuilder {
    pub name: String,
    percent: bool,
    format: Option<CompactFormat>,
    /// Set for date, time, currency and other styles with no compact form
    unsupported: bool,
}

impl NumberStyleBuilder {
    /// Start a style from its element name (`number:number-style`, ...)
    pub fn start(element: &[u8], name: String) -> Self {
        Self {
            name,
            percent: element == b"number:percentage-style",
            unsupported: !matches!(
                element,
                b"number:number-style" | b"number:percentage-style"
            ),
            ..Self::default()
        }
    }

    /// Record a `number:number` child
    pub fn number(&mut self, attrs: &[(String, String)]) {
        let mut format = CompactFormat {
            percent: self.percent,
            ..CompactFormat::default()
        };
        for (key, value) in attrs {
            match key.as_str() {
                "number:decimal-places" => format.decimals = value.parse().unwrap_or(0),
                "number:grouping" => format.grouping = value == "true",
                _ => {}
            }
        }
        self.format = Some(format);
    }

    pub fn finish(self) -> NumberFormat {
        match (self.unsupported, self.format) {
            (false, Some(format)) => NumberFormat::from_compact(format),
            _ => {
                log::debug!("number style {} has no compact form, read as General", self.name);
                NumberFormat::General
            }
        }
    }
}
