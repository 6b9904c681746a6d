//! Cell tag language
//!
//! A template cell's text is split in one pass into literal runs and tags.
//! Each tag kind has its own bracket pair:
//!
//! | Source | Tag |
//! |---|---|
//! | `['field']` | [`Tag::Field`] |
//! | `[@pkg.fn(args)@]` | [`Tag::Func`] |
//! | `[~rec: expr~]` | [`Tag::Lambda`] |
//! | `[&name&]` | [`Tag::Var`] |
//! | `[=code=]` | [`Tag::Exec`] |
//! | `[^SUM(expr)^]`, `[^AVG(expr)^]`, `[^N^]` | [`Tag::Sys`] |
//! | `[*style*]` | [`Tag::Style`] |
//! | `[$name$]` | [`Tag::SubReport`] |
//!
//! Unterminated or malformed tags stay literal text.

/// Running aggregate requested by a `[^...^]` tag
#[derive(Debug, Clone, PartialEq)]
pub enum SysTag {
    Sum(String),
    Avg(String),
    /// Row counter
    Count,
}

/// One piece of a tokenized cell text
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Literal(String),
    Field(String),
    Func { name: String, args: String },
    Lambda { param: String, body: String },
    Var(String),
    Exec(String),
    Sys(SysTag),
    Style(String),
    SubReport(String),
}

impl Tag {
    /// Whether the tag renders a value into the cell
    pub fn produces_value(&self) -> bool {
        !matches!(self, Tag::Literal(_) | Tag::Style(_) | Tag::SubReport(_))
    }
}

/// Closing delimiter for each opening sigil
fn closer(sigil: char) -> Option<&'static str> {
    Some(match sigil {
        '\'' => "']",
        '@' => "@]",
        '~' => "~]",
        '&' => "&]",
        '=' => "=]",
        '^' => "^]",
        '*' => "*]",
        '$' => "$]",
        _ => return None,
    })
}

fn build(sigil: char, body: &str) -> Option<Tag> {
    let trimmed = body.trim();
    Some(match sigil {
        '\'' => Tag::Field(trimmed.to_string()),
        '@' => {
            let open = trimmed.find('(')?;
            let args = trimmed[open + 1..].strip_suffix(')')?;
            Tag::Func {
                name: trimmed[..open].trim().to_string(),
                args: args.to_string(),
            }
        }
        '~' => {
            let (param, expr) = trimmed.split_once(':')?;
            Tag::Lambda {
                param: param.trim().to_string(),
                body: expr.trim().to_string(),
            }
        }
        '&' => Tag::Var(trimmed.to_string()),
        '=' => Tag::Exec(body.to_string()),
        '^' => Tag::Sys(parse_sys(trimmed)?),
        '*' => Tag::Style(trimmed.to_string()),
        '$' => Tag::SubReport(trimmed.to_string()),
        _ => return None,
    })
}

fn parse_sys(body: &str) -> Option<SysTag> {
    if body.eq_ignore_ascii_case("N") {
        return Some(SysTag::Count);
    }
    let open = body.find('(')?;
    let inner = body[open + 1..].strip_suffix(')')?.trim().to_string();
    match body[..open].trim().to_ascii_uppercase().as_str() {
        "SUM" => Some(SysTag::Sum(inner)),
        "AVG" => Some(SysTag::Avg(inner)),
        _ => None,
    }
}

/// Split a cell text into literals and tags
pub fn tokenize(text: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let parsed = after.chars().next().and_then(|sigil| {
            let close = closer(sigil)?;
            let body_start = sigil.len_utf8();
            let end = after[body_start..].find(close)?;
            let body = &after[body_start..body_start + end];
            let tag = build(sigil, body)?;
            Some((tag, open + 1 + body_start + end + close.len()))
        });
        match parsed {
            Some((tag, consumed)) => {
                literal.push_str(&rest[..open]);
                if !literal.is_empty() {
                    tags.push(Tag::Literal(std::mem::take(&mut literal)));
                }
                tags.push(tag);
                rest = &rest[consumed..];
            }
            None => {
                literal.push_str(&rest[..=open]);
                rest = &rest[open + 1..];
            }
        }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        tags.push(Tag::Literal(literal));
    }
    tags
}

/// Check whether a text contains any tag
pub fn has_tags(text: &str) -> bool {
    text.contains('[') && tokenize(text).iter().any(|t| !matches!(t, Tag::Literal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_tag_kind() {
        let tags = tokenize(
            "['name'][@fmt.money(amount, 2)@][~r: r.amount * 2~][&title&][=value = 1=][^SUM(amount)^][^N^][*bold*][$lines$]",
        );
        assert_eq!(
            tags,
            vec![
                Tag::Field("name".into()),
                Tag::Func {
                    name: "fmt.money".into(),
                    args: "amount, 2".into()
                },
                Tag::Lambda {
                    param: "r".into(),
                    body: "r.amount * 2".into()
                },
                Tag::Var("title".into()),
                Tag::Exec("value = 1".into()),
                Tag::Sys(SysTag::Sum("amount".into())),
                Tag::Sys(SysTag::Count),
                Tag::Style("bold".into()),
                Tag::SubReport("lines".into()),
            ]
        );
    }

    #[test]
    fn test_literals_around_tags() {
        assert_eq!(
            tokenize("Total: [^SUM(x)^] EUR"),
            vec![
                Tag::Literal("Total: ".into()),
                Tag::Sys(SysTag::Sum("x".into())),
                Tag::Literal(" EUR".into()),
            ]
        );
    }

    #[test]
    fn test_malformed_tags_stay_literal() {
        assert_eq!(
            tokenize("[note] ['open [^MAX(x)^]"),
            vec![Tag::Literal("[note] ['open [^MAX(x)^]".into())]
        );
        assert!(!has_tags("[header]"));
        assert!(has_tags("x ['f']"));
    }
}
