//! Cross-topic reference resolution and the link handler built on it.

use quick_xml::escape::unescape;
use tracing::trace;

use crate::config::ConvertConfig;
use crate::context::{Context, Handler};
use crate::error::{ConvertError, Diagnostic};
use crate::index::Index;
use crate::mapping::Mapping;
use crate::paths::{is_absolute_url, join_relative, split_link};
use crate::render::Fragment;
use crate::selector::extract_title;
use crate::token::{StartTag, Token, TokenSink, TokenSource, XmlDecoder};
use crate::xmltext::collapse_whitespace;

/// Outcome of resolving one reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkInfo {
    /// Rewritten reference; empty when the target could not be mapped.
    pub href: String,
    pub title: String,
    pub synopsis: String,
    /// The reference points into the page store.
    pub internal: bool,
}

impl LinkInfo {
    fn external(href: &str) -> Self {
        Self {
            href: href.to_string(),
            ..Self::default()
        }
    }
}

/// Resolves references against a frozen index and mapping.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    index: &'a Index,
    mapping: &'a Mapping,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a Index, mapping: &'a Mapping) -> Self {
        Self { index, mapping }
    }

    /// Resolves `reference` as written inside the topic `ctx` is decoding.
    /// Problems are reported on `ctx` and never abort the conversion.
    pub fn resolve(&self, ctx: &mut Context<'_>, reference: &str) -> LinkInfo {
        if is_absolute_url(reference) {
            return LinkInfo::external(reference);
        }

        let (target, selector) = split_link(reference);
        if target.is_empty() {
            return LinkInfo {
                href: format!("#{}", selector),
                internal: true,
                ..LinkInfo::default()
            };
        }

        let path = join_relative(&ctx.decoding_path, target);
        let Some(topic) = self.index.get(&path) else {
            ctx.report(Diagnostic::TopicNotFound {
                source_path: ctx.decoding_path.clone(),
                reference: reference.to_string(),
                path,
            });
            return LinkInfo::default();
        };

        let mut info = LinkInfo::default();
        if !selector.is_empty() {
            match extract_title(&topic.raw, selector) {
                Ok(title) => info.title = title,
                Err(err) => ctx.report(Diagnostic::SelectorTitle {
                    source_path: ctx.decoding_path.clone(),
                    reference: reference.to_string(),
                    path: path.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        if info.title.is_empty() && topic.parsed {
            info.title = topic.title.clone();
            if selector.is_empty() {
                info.synopsis = topic.synopsis.clone();
            }
        }

        let Some(slug) = self.mapping.slug_of(&topic.path) else {
            ctx.report(Diagnostic::UnresolvedMapping {
                source_path: ctx.decoding_path.clone(),
                reference: reference.to_string(),
                path: topic.path.clone(),
            });
            return info;
        };

        info.href = if selector.is_empty() {
            slug.to_string()
        } else {
            format!("{}#{}", slug, selector)
        };
        info.internal = true;
        trace!(reference, href = %info.href, "resolved link");
        info
    }

    /// Renders `links` as a `<ul class="related-links">` list of anchors.
    /// Links whose target cannot be resolved are left out; the result is
    /// empty when nothing remains.
    pub fn related_links_html(&self, ctx: &mut Context<'_>, links: &[RelatedLink]) -> String {
        let mut items = Fragment::new();
        for link in links {
            let info = self.resolve(ctx, &link.href);
            if info.href.is_empty() {
                continue;
            }
            let text = [&link.text, &info.title, &link.href]
                .into_iter()
                .find(|t| !t.is_empty())
                .map_or("", |t| t.as_str());
            let mut anchor = StartTag::new("a").with_attr("href", &info.href);
            anchor.set_attr("title", &info.synopsis);
            if !info.internal {
                anchor.set_attr("target", "_blank");
            }
            items.write_token(Token::Start(StartTag::new("li")));
            items.write_token(Token::Start(anchor));
            items.write_token(Token::text(text));
            items.write_token(Token::End("a".into()));
            items.write_token(Token::End("li".into()));
        }
        if items.is_empty() {
            return String::new();
        }
        format!(r#"<ul class="related-links">{}</ul>"#, items.to_html())
    }
}

/// One `<link>` of a topic's `<related-links>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedLink {
    pub href: String,
    /// Plain text of the `<linktext>` child; empty when absent.
    pub text: String,
}

/// Collects the `<link>` elements inside `<related-links>`, including those
/// grouped under `<linkpool>`/`<linklist>`. Links without `href` are skipped.
pub fn related_links(raw: &str) -> Result<Vec<RelatedLink>, ConvertError> {
    let mut dec = XmlDecoder::new(raw);
    let mut links = Vec::new();
    // depth inside <related-links>, 0 outside
    let mut depth = 0usize;
    let mut current: Option<RelatedLink> = None;
    let mut in_text = false;
    loop {
        match dec.next_token()? {
            Token::Eof => return Ok(links),
            Token::Start(tag) => {
                if depth == 0 {
                    if tag.name == "related-links" {
                        depth = 1;
                    }
                    continue;
                }
                depth += 1;
                match tag.name.as_str() {
                    "link" => {
                        current = Some(RelatedLink {
                            href: tag.attr("href").to_string(),
                            text: String::new(),
                        })
                    }
                    "linktext" => in_text = current.is_some(),
                    _ => {}
                }
            }
            Token::End(name) if depth > 0 => {
                depth -= 1;
                match name.as_str() {
                    "link" => {
                        if let Some(mut link) = current.take() {
                            link.text = collapse_whitespace(&link.text);
                            if !link.href.is_empty() {
                                links.push(link);
                            }
                        }
                    }
                    "linktext" => in_text = false,
                    _ => {}
                }
            }
            Token::Text(text) if in_text => {
                if let Some(link) = current.as_mut() {
                    match unescape(&text) {
                        Ok(plain) => link.text.push_str(&plain),
                        Err(_) => link.text.push_str(&text),
                    }
                }
            }
            Token::CData(text) if in_text => {
                if let Some(link) = current.as_mut() {
                    link.text.push_str(&text);
                }
            }
            _ => {}
        }
    }
}

/// Rewrites `<a>` elements: resolves `href`, fills in `title` from the
/// target's synopsis and applies the download/new-window policy for
/// `format` links.
pub struct LinkHandler<'a> {
    resolver: Resolver<'a>,
    config: &'a ConvertConfig,
}

impl<'a> LinkHandler<'a> {
    pub fn new(resolver: Resolver<'a>, config: &'a ConvertConfig) -> Self {
        Self { resolver, config }
    }
}

fn base_name(href: &str) -> &str {
    let (path, _) = split_link(href);
    path.rsplit('/').next().unwrap_or(path)
}

impl Handler for LinkHandler<'_> {
    fn handle(
        &self,
        ctx: &mut Context<'_>,
        dec: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let reference = start.attr("href").to_string();
        let mut info = LinkInfo::default();
        if !reference.is_empty() {
            info = self.resolver.resolve(ctx, &reference);
            start.set_attr("href", &info.href);
        }

        if !info.synopsis.is_empty() && start.attr("title").is_empty() {
            start.set_attr("title", &info.synopsis);
        }
        start.set_attr("scope", "");

        if !start.attr("format").is_empty() && !info.href.is_empty() {
            start.set_attr("format", "");
            if self.config.is_download(&info.href) {
                start.set_attr("download", base_name(&info.href));
            } else {
                start.set_attr("target", "_blank");
            }
        }

        if !start.self_closing || info.title.is_empty() {
            return ctx.emit_with_children(dec, start);
        }

        // empty link: the target's title becomes the text
        let name = start.name.clone();
        start.self_closing = false;
        ctx.output.write_token(Token::Start(start));
        ctx.write_text(&info.title);
        ctx.emit_children(dec)?;
        ctx.write_end(&name);
        Ok(())
    }
}
