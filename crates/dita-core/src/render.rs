use std::fmt::Write as _;

use quick_xml::escape::escape;

use crate::token::{StartTag, Token, TokenSink};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Converted output of one topic: an ordered run of output tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    tokens: Vec<Token>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Serializes the fragment as HTML. Void elements without children are
    /// self-closed; CDATA is written as escaped text.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let mut tokens = self.tokens.iter().peekable();
        while let Some(token) = tokens.next() {
            match token {
                Token::Start(tag) => {
                    let empty = matches!(tokens.peek(), Some(Token::End(name)) if *name == tag.name);
                    if empty && is_void(&tag.name) {
                        write_start(&mut out, tag, "/>");
                        tokens.next();
                    } else {
                        write_start(&mut out, tag, ">");
                    }
                }
                Token::End(name) => {
                    let _ = write!(out, "</{}>", name);
                }
                Token::Text(text) => out.push_str(text),
                Token::CData(text) => out.push_str(&escape(text.as_str())),
                Token::Comment(text) => {
                    let _ = write!(out, "<!--{}-->", text);
                }
                Token::Eof => {}
            }
        }
        out
    }
}

impl TokenSink for Fragment {
    fn write_token(&mut self, token: Token) {
        self.tokens.push(token);
    }
}

fn write_start(out: &mut String, tag: &StartTag, close: &str) {
    out.push('<');
    out.push_str(&tag.name);
    for attr in &tag.attrs {
        let _ = write!(out, " {}=\"{}\"", attr.name, escape(attr.value.as_str()));
    }
    out.push_str(close);
}
