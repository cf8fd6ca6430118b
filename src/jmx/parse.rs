//! Reader for the JMX subset this crate writes.
//!
//! Handles the XML declaration, comments, elements, quoted attributes, text
//! and entity references. DTDs, CDATA and processing instructions past the
//! prolog are rejected; JMeter never writes them into test plans.
use super::Element;
use anyhow::{anyhow, bail, Context, Result};

/// Parse a whole document and return its root element.
pub fn parse_document(input: &str) -> Result<Element> {
    let mut cursor = Cursor { input, pos: 0 };
    cursor.skip_prolog()?;
    let root = cursor.parse_element().context("parse root element")?;
    cursor.skip_misc()?;
    if !cursor.at_end() {
        bail!("unexpected content after root element at byte {}", cursor.pos);
    }
    Ok(root)
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if !self.rest().starts_with(token) {
            bail!("expected {token:?} at byte {}", self.pos);
        }
        self.pos += token.len();
        Ok(())
    }

    fn skip_until(&mut self, token: &str) -> Result<()> {
        let idx = self
            .rest()
            .find(token)
            .ok_or_else(|| anyhow!("unterminated construct, missing {token:?}"))?;
        self.pos += idx + token.len();
        Ok(())
    }

    fn skip_prolog(&mut self) -> Result<()> {
        if self.rest().starts_with('\u{feff}') {
            self.pos += '\u{feff}'.len_utf8();
        }
        self.skip_whitespace();
        if self.rest().starts_with("<?xml") {
            self.skip_until("?>")?;
        }
        self.skip_misc()
    }

    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<!--") {
                self.skip_until("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_name(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '=' | '>' | '/'))
            .unwrap_or(rest.len());
        if len == 0 {
            bail!("expected a name at byte {}", self.pos);
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn parse_element(&mut self) -> Result<Element> {
        if self.rest().starts_with("<!") || self.rest().starts_with("<?") {
            bail!("unsupported markup at byte {}", self.pos);
        }
        self.expect("<")?;
        let mut element = Element::new(self.parse_name()?);
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }
            let name = self.parse_name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.parse_quoted()?;
            element.attrs.push((name.to_string(), value));
        }
        self.parse_content(&mut element)?;
        Ok(element)
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = self
            .rest()
            .chars()
            .next()
            .filter(|ch| *ch == '"' || *ch == '\'')
            .ok_or_else(|| anyhow!("expected quoted attribute value at byte {}", self.pos))?;
        self.pos += 1;
        let end = self
            .rest()
            .find(quote)
            .ok_or_else(|| anyhow!("unterminated attribute value"))?;
        let raw = &self.rest()[..end];
        self.pos += end + 1;
        unescape(raw)
    }

    fn parse_content(&mut self, element: &mut Element) -> Result<()> {
        let mut text = String::new();
        loop {
            if self.at_end() {
                bail!("unterminated element <{}>", element.tag);
            }
            let rest = self.rest();
            if rest.starts_with("</") {
                self.pos += 2;
                let name = self.parse_name()?;
                if name != element.tag {
                    bail!("mismatched closing tag </{name}> for <{}>", element.tag);
                }
                self.skip_whitespace();
                self.expect(">")?;
                break;
            }
            if rest.starts_with("<!--") {
                self.skip_until("-->")?;
                continue;
            }
            if rest.starts_with('<') {
                let child = self.parse_element()?;
                element.children.push(child);
                continue;
            }
            let end = rest.find('<').unwrap_or(rest.len());
            text.push_str(&unescape(&rest[..end])?);
            self.pos += end;
        }
        if element.children.is_empty() {
            element.text = Some(text);
        } else if !text.trim().is_empty() {
            bail!("mixed content in <{}> is not supported", element.tag);
        }
        Ok(())
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| anyhow!("unterminated entity in {raw:?}"))?;
        let entity = &after[..end];
        out.push(decode_entity(entity)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn decode_entity(entity: &str) -> Result<char> {
    let ch = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                None
            };
            code.and_then(char::from_u32)
                .ok_or_else(|| anyhow!("unknown entity &{entity};"))?
        }
    };
    Ok(ch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jmx::write::render_document;
    use crate::jmx::{bool_prop, string_prop};

    #[test]
    fn reads_back_rendered_tree() {
        let root = Element::new("jmeterTestPlan")
            .with_attr("jmeter", "3.3")
            .with_child(
                Element::new("hashTree")
                    .with_child(string_prop("a", "x < y & \"z\""))
                    .with_child(string_prop("empty", ""))
                    .with_child(bool_prop("b", true))
                    .with_child(Element::new("hashTree")),
            );
        let parsed = parse_document(&render_document(&root)).expect("parse rendered");
        assert_eq!(parsed, root);
    }

    #[test]
    fn accepts_comments_single_quotes_and_numeric_entities() {
        let doc = "<?xml version='1.0'?>\n<!-- generated -->\n<a k='v&#10;w'><!-- c --><b>&#x41;&#66;</b></a>\n";
        let parsed = parse_document(doc).expect("parse");
        assert_eq!(parsed.attr("k"), Some("v\nw"));
        assert_eq!(parsed.children[0].text.as_deref(), Some("AB"));
    }

    #[test]
    fn rejects_mismatched_tags() {
        let err = parse_document("<a><b></a></b>").expect_err("mismatch");
        assert!(format!("{err:#}").contains("mismatched closing tag"));
    }

    #[test]
    fn rejects_trailing_content() {
        parse_document("<a/><b/>").expect_err("two roots");
    }
}
