//! Token model shared by the input and output sides of a conversion.
//!
//! Input is pulled one token at a time from a [`TokenSource`]; output is
//! pushed one token at a time into a [`TokenSink`]. [`XmlDecoder`] is the
//! quick-xml backed source used for topic files.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::error::ConvertError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    pub name: String,
    pub attrs: Vec<Attr>,
    /// The source wrote this element as `<name/>`; the matching end token
    /// still follows.
    pub self_closing: bool,
}

impl StartTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            self_closing: false,
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Attribute value, or `""` when the attribute is absent.
    pub fn attr(&self, name: &str) -> &str {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
            .unwrap_or("")
    }

    /// Sets an attribute; an empty value removes it.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.attrs.retain(|a| a.name != name);
            return;
        }
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value.to_string(),
            None => self.attrs.push(Attr {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start(StartTag),
    End(String),
    /// Character data, still escaped as it appeared in the source.
    Text(String),
    CData(String),
    Comment(String),
    Eof,
}

impl Token {
    /// Text token from plain (unescaped) text.
    pub fn text(plain: &str) -> Self {
        Token::Text(quick_xml::escape::escape(plain).into_owned())
    }
}

/// Pull side of the token stream.
pub trait TokenSource {
    /// Next token; `Token::Eof` once the input is exhausted.
    fn next_token(&mut self) -> Result<Token, ConvertError>;
}

/// Push side of the token stream.
pub trait TokenSink {
    fn write_token(&mut self, token: Token);
}

impl TokenSink for Vec<Token> {
    fn write_token(&mut self, token: Token) {
        self.push(token);
    }
}

impl TokenSource for std::vec::IntoIter<Token> {
    fn next_token(&mut self) -> Result<Token, ConvertError> {
        Ok(self.next().unwrap_or(Token::Eof))
    }
}

/// Streams tokens out of an XML document.
///
/// Self-closing elements are reported as a start tag (flagged
/// `self_closing`) followed by an end tag. End tags are checked against the
/// open elements; a mismatch is a fatal [`ConvertError`]. Declarations,
/// processing instructions and the doctype are not content and are skipped.
pub struct XmlDecoder<'i> {
    reader: XmlReader<&'i [u8]>,
    open: Vec<String>,
    pending_end: Option<String>,
}

impl<'i> XmlDecoder<'i> {
    pub fn new(input: &'i str) -> Self {
        let mut reader = XmlReader::from_str(input);
        reader.config_mut().check_end_names = false;
        Self {
            reader,
            open: Vec::new(),
            pending_end: None,
        }
    }
}

impl TokenSource for XmlDecoder<'_> {
    fn next_token(&mut self) -> Result<Token, ConvertError> {
        if let Some(name) = self.pending_end.take() {
            return Ok(Token::End(name));
        }
        loop {
            let token = match self.reader.read_event()? {
                Event::Start(e) => {
                    let tag = decode_start(&e, false)?;
                    self.open.push(tag.name.clone());
                    Token::Start(tag)
                }
                Event::Empty(e) => {
                    let tag = decode_start(&e, true)?;
                    self.pending_end = Some(tag.name.clone());
                    Token::Start(tag)
                }
                Event::End(e) => {
                    let found = lossy(e.name().as_ref());
                    match self.open.pop() {
                        None => return Err(ConvertError::UnmatchedEnd { found }),
                        Some(expected) if expected != found => {
                            return Err(ConvertError::MismatchedEnd { expected, found })
                        }
                        Some(_) => Token::End(found),
                    }
                }
                Event::Text(e) => Token::Text(lossy(e.as_ref())),
                Event::GeneralRef(e) => Token::Text(format!("&{};", lossy(e.as_ref()))),
                Event::CData(e) => Token::CData(lossy(e.as_ref())),
                Event::Comment(e) => Token::Comment(lossy(e.as_ref())),
                Event::Eof => match self.open.last() {
                    Some(open) => {
                        return Err(ConvertError::UnexpectedEof { open: open.clone() })
                    }
                    None => Token::Eof,
                },
                _ => continue,
            };
            return Ok(token);
        }
    }
}

fn decode_start(e: &BytesStart<'_>, self_closing: bool) -> Result<StartTag, ConvertError> {
    let mut tag = StartTag::new(lossy(e.name().as_ref()));
    tag.self_closing = self_closing;
    for a in e.attributes() {
        let a = a.map_err(|err| ConvertError::Attribute(err.to_string()))?;
        let name = lossy(a.key.as_ref());
        let value = match a.unescape_value() {
            Ok(val) => val.into_owned(),
            // unknown entities (e.g. &nbsp;) are kept verbatim
            Err(_) => lossy(a.value.as_ref()),
        };
        tag.attrs.push(Attr { name, value });
    }
    Ok(tag)
}

fn lossy(bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<Token>, ConvertError> {
        let mut dec = XmlDecoder::new(xml);
        let mut out = Vec::new();
        loop {
            let token = dec.next_token()?;
            if token == Token::Eof {
                return Ok(out);
            }
            out.push(token);
        }
    }

    #[test]
    fn self_closing_element_yields_start_and_end() {
        let tokens = collect(r#"<p><image href="a.png"/></p>"#).unwrap();
        assert_eq!(tokens.len(), 4);
        let Token::Start(img) = &tokens[1] else {
            panic!("expected start tag");
        };
        assert_eq!(img.name, "image");
        assert!(img.self_closing);
        assert_eq!(img.attr("href"), "a.png");
        assert_eq!(tokens[2], Token::End("image".into()));
    }

    #[test]
    fn skips_prolog_declarations() {
        let xml = "<?xml version=\"1.0\"?>\n<!DOCTYPE concept SYSTEM \"concept.dtd\">\n<concept/>";
        let tokens = collect(xml).unwrap();
        assert!(matches!(tokens.last(), Some(Token::End(name)) if name == "concept"));
        assert!(tokens.iter().all(|t| !matches!(t, Token::Comment(_))));
    }

    #[test]
    fn mismatched_end_is_fatal() {
        let err = collect("<a><b></a>").unwrap_err();
        assert!(matches!(
            err,
            ConvertError::MismatchedEnd { ref expected, ref found } if expected == "b" && found == "a"
        ));
    }

    #[test]
    fn unclosed_element_is_fatal() {
        let err = collect("<a><b></b>").unwrap_err();
        assert!(matches!(err, ConvertError::UnexpectedEof { ref open } if open == "a"));
    }

    #[test]
    fn set_attr_with_empty_value_removes() {
        let mut tag = StartTag::new("a").with_attr("scope", "external");
        tag.set_attr("href", "x");
        assert_eq!(tag.attr("scope"), "external");
        tag.set_attr("scope", "");
        assert_eq!(tag.attr("scope"), "");
        assert_eq!(tag.attrs.len(), 1);
    }

    #[test]
    fn plain_text_is_escaped() {
        assert_eq!(Token::text("a < b & c"), Token::Text("a &lt; b &amp; c".into()));
    }
}
