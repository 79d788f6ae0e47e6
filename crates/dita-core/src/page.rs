//! Page model and per-topic/corpus conversion.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::ConvertConfig;
use crate::context::Context;
use crate::error::{ConvertError, Diagnostic};
use crate::index::{Index, Topic};
use crate::mapping::Mapping;
use crate::media::{ImageHandler, MediaInliner};
use crate::resolve::{related_links, LinkHandler, Resolver};
use crate::rules::Rules;
use crate::slug::Slug;
use crate::token::XmlDecoder;

/// One story item of a wiki page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Html { id: String, text: String },
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Html { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub slug: Slug,
    pub title: String,
    pub modified: DateTime<Utc>,
    pub synopsis: String,
    #[serde(default)]
    pub story: Vec<Item>,
}

impl Page {
    pub fn new(slug: Slug, title: &str, modified: DateTime<Utc>, synopsis: &str) -> Self {
        Self {
            slug,
            title: title.to_string(),
            modified,
            synopsis: synopsis.to_string(),
            story: Vec::new(),
        }
    }

    fn next_id(&self) -> String {
        let digest = Sha256::digest(format!("{}:{}", self.slug, self.story.len()).as_bytes());
        format!("{:x}", digest)[..16].to_string()
    }

    pub fn push_html(&mut self, text: String) {
        let id = self.next_id();
        self.story.push(Item::Html { id, text });
    }

    pub fn entry(&self) -> PageEntry {
        PageEntry {
            slug: self.slug.clone(),
            title: self.title.clone(),
            synopsis: self.synopsis.clone(),
        }
    }
}

/// Row of the page listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    pub slug: Slug,
    pub title: String,
    pub synopsis: String,
}

/// Everything a topic conversion reads. Shared read-only across workers.
#[derive(Clone, Copy)]
pub struct PageConversion<'a> {
    pub rules: &'a Rules,
    pub index: &'a Index,
    pub mapping: &'a Mapping,
    pub config: &'a ConvertConfig,
    pub inliner: &'a dyn MediaInliner,
}

impl<'a> PageConversion<'a> {
    /// Converts the body of `topic` into a page, followed by its related
    /// links when there are any. Diagnostics are returned with the page; a
    /// structural error in the source aborts the topic.
    pub fn convert(
        &self,
        slug: &Slug,
        topic: &Topic,
    ) -> Result<(Page, Vec<Diagnostic>), ConvertError> {
        let resolver = Resolver::new(self.index, self.mapping);
        let mut ctx = Context::new(self.rules, topic.path.as_str());
        ctx.register("a", LinkHandler::new(resolver, self.config));
        ctx.register("img", ImageHandler::new(self.inliner, &topic.filename));
        ctx.run(&mut XmlDecoder::new(&topic.raw))?;
        let related = related_links(&topic.raw)?;
        let related = resolver.related_links_html(&mut ctx, &related);
        let (fragment, diagnostics) = ctx.finish();

        let mut page = Page::new(slug.clone(), &topic.title, topic.modified, &topic.synopsis);
        page.push_html(fragment.to_html());
        if !related.is_empty() {
            page.push_html(related);
        }
        debug!(path = %topic.path, slug = %slug, diagnostics = diagnostics.len(), "converted topic");
        Ok((page, diagnostics))
    }
}

/// Result of converting one mapped topic.
#[derive(Debug)]
pub struct ConversionOutcome {
    pub path: String,
    pub slug: Slug,
    pub result: Result<Page, ConvertError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConversionOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Converts every mapped topic on `workers` threads. Outcomes are ordered
/// by topic path.
pub fn convert_corpus(conversion: &PageConversion<'_>, workers: usize) -> Vec<ConversionOutcome> {
    let jobs = conversion.mapping.topics_sorted(conversion.index);
    let next = AtomicUsize::new(0);
    let workers = workers.clamp(1, jobs.len().max(1));

    let mut outcomes: Vec<ConversionOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut done = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::Relaxed);
                        let Some((slug, topic)) = jobs.get(i) else {
                            break;
                        };
                        let (result, diagnostics) = match conversion.convert(slug, topic) {
                            Ok((page, diagnostics)) => (Ok(page), diagnostics),
                            Err(err) => (Err(err), Vec::new()),
                        };
                        done.push(ConversionOutcome {
                            path: topic.path.clone(),
                            slug: (*slug).clone(),
                            result,
                            diagnostics,
                        });
                    }
                    done
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        converted = outcomes.len() - failed,
        failed,
        workers,
        "corpus conversion finished"
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;
    use crate::slug::slugify;

    struct NoMedia;

    impl MediaInliner for NoMedia {
        fn inlined_image_url(&self, _: &str, reference: &str) -> Result<String, MediaError> {
            Ok(format!("/media/{}", reference))
        }
    }

    const INSTALL: &str = r#"<?xml version="1.0"?>
<task id="install">
  <title>Install</title>
  <shortdesc>Getting it running.</shortdesc>
  <taskbody>
    <steps><step><cmd>Read <xref href="overview.dita"/></cmd></step></steps>
    <image href="shot.png" placement="break"/>
  </taskbody>
</task>"#;

    const OVERVIEW: &str = r#"<concept id="overview"><title>Overview</title><conbody><p>Hi</p></conbody></concept>"#;

    fn corpus() -> Index {
        let mut index = Index::new();
        for (path, raw) in [("install.dita", INSTALL), ("overview.dita", OVERVIEW)] {
            let topic = Topic::parse(path, raw.to_string(), DateTime::<Utc>::UNIX_EPOCH).unwrap();
            index.insert(topic);
        }
        index
    }

    #[test]
    fn converts_topic_body_into_html_item() {
        let mut index = corpus();
        let (mapping, _) = Mapping::build(&mut index);
        let rules = Rules::html();
        let config = ConvertConfig::default();
        let conversion = PageConversion {
            rules: &rules,
            index: &index,
            mapping: &mapping,
            config: &config,
            inliner: &NoMedia,
        };
        let topic = index.get("install.dita").unwrap();
        let (page, diags) = conversion.convert(&slugify("Install"), topic).unwrap();
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(page.title, "Install");
        assert_eq!(page.synopsis, "Getting it running.");
        assert_eq!(page.story.len(), 1);
        let Item::Html { text, .. } = &page.story[0];
        assert!(text.contains(r#"<ol><li><span>Read <a href="overview">Overview</a></span></li></ol>"#));
        assert!(text.contains(r#"<p class="image"><img src="/media/shot.png"/></p>"#));
        assert!(!text.contains("Getting it running."));
    }

    #[test]
    fn related_links_become_a_second_html_item() {
        let mut index = corpus();
        index.insert(
            Topic::parse(
                "tasks/upgrade.dita",
                r#"<task id="upgrade"><title>Upgrade</title><taskbody><p>x</p></taskbody>
                <related-links><link href="../install.dita"/><link href="../nope.dita"><linktext>Nope</linktext></link></related-links>
                </task>"#
                    .to_string(),
                DateTime::<Utc>::UNIX_EPOCH,
            )
            .unwrap(),
        );
        let (mapping, _) = Mapping::build(&mut index);
        let rules = Rules::html();
        let config = ConvertConfig::default();
        let conversion = PageConversion {
            rules: &rules,
            index: &index,
            mapping: &mapping,
            config: &config,
            inliner: &NoMedia,
        };
        let topic = index.get("tasks/upgrade.dita").unwrap();
        let (page, diags) = conversion.convert(&slugify("Upgrade"), topic).unwrap();
        assert_eq!(page.story.len(), 2);
        let Item::Html { text, .. } = &page.story[0];
        assert_eq!(text.trim(), "<p>x</p>");
        let Item::Html { text, .. } = &page.story[1];
        assert_eq!(
            text,
            r#"<ul class="related-links"><li><a href="install" title="Getting it running.">Install</a></li></ul>"#
        );
        assert!(matches!(
            diags.as_slice(),
            [Diagnostic::TopicNotFound { reference, .. }] if reference == "../nope.dita"
        ));
    }

    #[test]
    fn corpus_outcomes_are_sorted_and_isolated() {
        let mut index = corpus();
        index.insert(
            Topic::new("broken.dita", "Broken")
                .with_raw("<topic><title>Broken</title><body><p>open</body></topic>"),
        );
        let (mapping, _) = Mapping::build(&mut index);
        let rules = Rules::html();
        let config = ConvertConfig::default();
        let conversion = PageConversion {
            rules: &rules,
            index: &index,
            mapping: &mapping,
            config: &config,
            inliner: &NoMedia,
        };
        let outcomes = convert_corpus(&conversion, 4);
        let paths: Vec<&str> = outcomes.iter().map(|o| o.path.as_str()).collect();
        assert_eq!(paths, vec!["broken.dita", "install.dita", "overview.dita"]);
        assert!(matches!(
            outcomes[0].result,
            Err(ConvertError::MismatchedEnd { .. })
        ));
        assert!(outcomes[1].is_ok() && outcomes[2].is_ok());
    }

    #[test]
    fn page_serializes_with_typed_items() {
        let mut page = Page::new(slugify("Install"), "Install", DateTime::<Utc>::UNIX_EPOCH, "");
        page.push_html("<p>x</p>".into());
        page.push_html("<p>y</p>".into());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["slug"], "install");
        assert_eq!(json["modified"], "1970-01-01T00:00:00Z");
        assert_eq!(json["story"][0]["type"], "html");
        assert_eq!(json["story"][1]["text"], "<p>y</p>");
        assert_ne!(page.story[0].id(), page.story[1].id());
        let back: Page = serde_json::from_value(json).unwrap();
        assert_eq!(back, page);
    }
}
