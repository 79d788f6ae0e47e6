//! Single-pass streaming rewriter.
//!
//! A [`Context`] pulls tokens from a [`TokenSource`], classifies each start
//! tag with the [`Rules`] table and writes the rewritten stream into its
//! [`Fragment`]. Handlers registered by output tag name take over emission of
//! their element, using the `emit_*`/`write_*` primitives.

use std::{collections::HashMap, rc::Rc};

use crate::error::{ConvertError, Diagnostic};
use crate::render::Fragment;
use crate::rules::{Action, Rules};
use crate::token::{StartTag, Token, TokenSink, TokenSource};

/// Custom emission for one output tag.
///
/// Receives the start tag (already renamed by the table) with the stream
/// positioned just after it, and must consume everything up to and including
/// the matching end token.
pub trait Handler {
    fn handle(
        &self,
        ctx: &mut Context<'_>,
        dec: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError>;
}

impl<F> Handler for F
where
    F: Fn(&mut Context<'_>, &mut dyn TokenSource, StartTag) -> Result<(), ConvertError>,
{
    fn handle(
        &self,
        ctx: &mut Context<'_>,
        dec: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        self(ctx, dec, start)
    }
}

/// Resolved treatment of one input element.
pub enum Plan<'a> {
    Remove,
    Unwrap,
    /// Default emission under the given output name.
    Emit(String),
    /// A handler is registered for the output name.
    Custom(String, Rc<dyn Handler + 'a>),
}

pub struct Context<'a> {
    rules: &'a Rules,
    handlers: HashMap<String, Rc<dyn Handler + 'a>>,
    /// Canonical path of the topic being decoded; relative references
    /// resolve against its directory.
    pub decoding_path: String,
    pub output: Fragment,
    pub diagnostics: Vec<Diagnostic>,
    /// Input names of the elements being rewritten, innermost last.
    open: Vec<String>,
}

fn is_body_tag(name: &str) -> bool {
    name.contains("body")
}

impl<'a> Context<'a> {
    pub fn new(rules: &'a Rules, decoding_path: impl Into<String>) -> Self {
        Self {
            rules,
            handlers: HashMap::new(),
            decoding_path: decoding_path.into(),
            output: Fragment::new(),
            diagnostics: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Registers a handler for an output tag name, replacing any previous one.
    pub fn register(&mut self, tag: &str, handler: impl Handler + 'a) {
        self.handlers.insert(tag.to_string(), Rc::new(handler));
    }

    pub fn plan(&self, name: &str) -> Plan<'a> {
        let rules = self.rules;
        let output = match rules.action(name) {
            Action::Remove => return Plan::Remove,
            Action::Unwrap => return Plan::Unwrap,
            Action::Translate(to) => to,
            Action::Identity => name,
        };
        match self.handlers.get(output) {
            Some(handler) => Plan::Custom(output.to_string(), Rc::clone(handler)),
            None => Plan::Emit(output.to_string()),
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Rewrites the whole stream.
    pub fn convert(&mut self, dec: &mut dyn TokenSource) -> Result<(), ConvertError> {
        loop {
            match dec.next_token()? {
                Token::Eof => return Ok(()),
                Token::Start(start) => self.handle_start(dec, start)?,
                Token::End(found) => return Err(ConvertError::UnmatchedEnd { found }),
                token => self.output.write_token(token),
            }
        }
    }

    /// Rewrites only the content of body elements, reading the rest of the
    /// stream to its end without emitting it.
    pub fn run(&mut self, dec: &mut dyn TokenSource) -> Result<(), ConvertError> {
        let mut open: Vec<String> = Vec::new();
        loop {
            match dec.next_token()? {
                Token::Eof => {
                    return match open.pop() {
                        Some(open) => Err(ConvertError::UnexpectedEof { open }),
                        None => Ok(()),
                    }
                }
                Token::Start(start) if is_body_tag(&start.name) => {
                    self.open.push(start.name);
                    let body = self.emit_children(dec);
                    self.open.clear();
                    body?;
                }
                Token::Start(start) => open.push(start.name),
                Token::End(found) => match open.pop() {
                    None => return Err(ConvertError::UnmatchedEnd { found }),
                    Some(expected) if expected != found => {
                        return Err(ConvertError::MismatchedEnd { expected, found })
                    }
                    Some(_) => {}
                },
                _ => {}
            }
        }
    }

    /// Processes the element whose start tag was just read.
    pub fn handle_start(
        &mut self,
        dec: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let depth = self.open.len();
        self.open.push(start.name.clone());
        let result = match self.plan(&start.name) {
            Plan::Remove => self.skip_children(dec),
            Plan::Unwrap => self.emit_children(dec),
            Plan::Emit(name) => {
                start.name = name;
                self.emit_with_children(dec, start)
            }
            Plan::Custom(name, handler) => {
                start.name = name;
                handler.handle(self, dec, start)
            }
        };
        self.open.truncate(depth);
        result
    }

    /// Writes `start`, rewrites its children, then writes the end tag.
    pub fn emit_with_children(
        &mut self,
        dec: &mut dyn TokenSource,
        start: StartTag,
    ) -> Result<(), ConvertError> {
        let name = start.name.clone();
        self.output.write_token(Token::Start(start));
        self.emit_children(dec)?;
        self.write_end(&name);
        Ok(())
    }

    /// Rewrites tokens up to and including the end of the innermost open
    /// element; the end token itself is not written.
    pub fn emit_children(&mut self, dec: &mut dyn TokenSource) -> Result<(), ConvertError> {
        loop {
            match dec.next_token()? {
                Token::Start(start) => self.handle_start(dec, start)?,
                Token::End(found) => return self.close(found),
                Token::Eof => {
                    return Err(ConvertError::UnexpectedEof {
                        open: self.innermost(),
                    })
                }
                token => self.output.write_token(token),
            }
        }
    }

    /// Consumes tokens up to and including the end of the innermost open
    /// element.
    pub fn skip_children(&mut self, dec: &mut dyn TokenSource) -> Result<(), ConvertError> {
        let mut nested: Vec<String> = Vec::new();
        loop {
            match dec.next_token()? {
                Token::Start(start) => nested.push(start.name),
                Token::End(found) => match nested.pop() {
                    None => return self.close(found),
                    Some(expected) if expected != found => {
                        return Err(ConvertError::MismatchedEnd { expected, found })
                    }
                    Some(_) => {}
                },
                Token::Eof => {
                    return Err(ConvertError::UnexpectedEof {
                        open: nested.pop().unwrap_or_else(|| self.innermost()),
                    })
                }
                _ => {}
            }
        }
    }

    /// Checks an end token against the innermost open input element.
    fn close(&self, found: String) -> Result<(), ConvertError> {
        match self.open.last() {
            Some(expected) if *expected != found => Err(ConvertError::MismatchedEnd {
                expected: expected.clone(),
                found,
            }),
            _ => Ok(()),
        }
    }

    fn innermost(&self) -> String {
        self.open.last().cloned().unwrap_or_default()
    }

    /// Writes a synthetic start tag that is not present in the input.
    pub fn write_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        let mut tag = StartTag::new(name);
        for (key, value) in attrs {
            tag.set_attr(key, value);
        }
        self.output.write_token(Token::Start(tag));
    }

    pub fn write_end(&mut self, name: &str) {
        self.output.write_token(Token::End(name.to_string()));
    }

    pub fn write_text(&mut self, plain: &str) {
        self.output.write_token(Token::text(plain));
    }

    pub fn finish(self) -> (Fragment, Vec<Diagnostic>) {
        (self.output, self.diagnostics)
    }
}
