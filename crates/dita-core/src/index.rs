//! Topic index: the corpus a conversion run reads from.
//!
//! Topics are keyed by canonical path and kept in insertion order, which is
//! the order the slug mapper registers them in.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::paths::{canonical_path, clean_path};
use crate::xmltext::{collapse_whitespace, event_text, local_name};

const TOPIC_EXTENSIONS: &[&str] = &["dita", "xml"];

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    /// Canonical source path; the topic's identity.
    pub path: String,
    /// Path relative to the source root as found on disk.
    pub filename: String,
    pub title: String,
    pub short_title: String,
    pub modified: DateTime<Utc>,
    pub synopsis: String,
    /// Serialized source, used for selector lookups.
    pub raw: String,
    /// Content was parsed, so title and synopsis come from the document.
    pub parsed: bool,
}

impl Topic {
    pub fn new(path: &str, title: &str) -> Self {
        Self {
            path: canonical_path(path),
            filename: clean_path(path),
            title: title.to_string(),
            short_title: String::new(),
            modified: DateTime::<Utc>::UNIX_EPOCH,
            synopsis: String::new(),
            raw: String::new(),
            parsed: true,
        }
    }

    pub fn with_short_title(mut self, short_title: &str) -> Self {
        self.short_title = short_title.to_string();
        self
    }

    pub fn with_synopsis(mut self, synopsis: &str) -> Self {
        self.synopsis = synopsis.to_string();
        self
    }

    pub fn with_raw(mut self, raw: &str) -> Self {
        self.raw = raw.to_string();
        self
    }

    /// Marks the topic as known by path only.
    pub fn unparsed(mut self) -> Self {
        self.parsed = false;
        self
    }

    /// Builds a topic from its source, reading title, alternate titles and
    /// short description.
    pub fn parse(path: &str, raw: String, modified: DateTime<Utc>) -> Result<Self, IndexError> {
        let meta = read_meta(&raw).map_err(|message| IndexError::Parse {
            path: path.to_string(),
            message,
        })?;
        Ok(Self {
            path: canonical_path(path),
            filename: clean_path(path),
            title: meta.title,
            short_title: meta.short_title,
            modified,
            synopsis: meta.synopsis,
            raw,
            parsed: true,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Index {
    topics: HashMap<String, Topic>,
    order: Vec<String>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a topic, replacing any topic with the same path (which keeps its
    /// original position).
    pub fn insert(&mut self, topic: Topic) -> Option<Topic> {
        let key = topic.path.clone();
        let previous = self.topics.insert(key.clone(), topic);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    pub fn get(&self, path: &str) -> Option<&Topic> {
        self.topics
            .get(path)
            .or_else(|| self.topics.get(&canonical_path(path)))
    }

    pub(crate) fn get_mut(&mut self, path: &str) -> Option<&mut Topic> {
        self.topics.get_mut(path)
    }

    /// Canonical paths in insertion order.
    pub fn paths(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Indexes every topic file under `root` in canonical path order. Files
    /// that fail to parse are logged and skipped.
    pub fn load_dir(root: &Path) -> Result<Self, IndexError> {
        let mut files = Vec::new();
        collect_topic_files(root, &mut files)?;
        let mut files: Vec<(String, String, PathBuf)> = files
            .into_iter()
            .map(|file| {
                let rel = file
                    .strip_prefix(root)
                    .unwrap_or(&file)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                (canonical_path(&rel), rel, file)
            })
            .collect();
        // clash winners follow canonical path order
        files.sort_by(|a, b| a.0.cmp(&b.0));

        let mut index = Index::new();
        for (_, rel, file) in files {
            let raw = fs::read_to_string(&file)?;
            let modified = fs::metadata(&file)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            match Topic::parse(&rel, raw, DateTime::<Utc>::from(modified)) {
                Ok(topic) => {
                    debug!(path = %topic.path, title = %topic.title, "indexed topic");
                    index.insert(topic);
                }
                Err(err) => warn!(error = %err, "skipping topic"),
            }
        }
        Ok(index)
    }
}

fn collect_topic_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), IndexError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_topic_files(&path, out)?;
            continue;
        }
        let is_topic = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                TOPIC_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false);
        if is_topic {
            out.push(path);
        }
    }
    Ok(())
}

#[derive(Default)]
struct TopicMeta {
    title: String,
    short_title: String,
    synopsis: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    NavTitle,
    SearchTitle,
    ShortDesc,
}

fn read_meta(raw: &str) -> Result<TopicMeta, String> {
    let mut reader = XmlReader::from_str(raw);
    let mut meta = TopicMeta::default();
    let mut search_title = String::new();
    let mut depth = 0usize;
    // field being captured and the depth of its element
    let mut capture: Option<(Field, usize)> = None;
    let mut buf = String::new();

    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match &event {
            Event::Start(e) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let local = local_name(&name);
                // metadata precedes the body
                if local.contains("body") {
                    break;
                }
                if capture.is_none() {
                    let field = match local {
                        "title" if meta.title.is_empty() => Some(Field::Title),
                        "navtitle" if meta.short_title.is_empty() => Some(Field::NavTitle),
                        "searchtitle" if search_title.is_empty() => Some(Field::SearchTitle),
                        "shortdesc" if meta.synopsis.is_empty() => Some(Field::ShortDesc),
                        _ => None,
                    };
                    if let Some(field) = field {
                        capture = Some((field, depth));
                        buf.clear();
                    }
                }
            }
            Event::End(_) => {
                if let Some((field, at)) = capture {
                    if at == depth {
                        let text = collapse_whitespace(&buf);
                        match field {
                            Field::Title => meta.title = text,
                            Field::NavTitle => meta.short_title = text,
                            Field::SearchTitle => search_title = text,
                            Field::ShortDesc => meta.synopsis = text,
                        }
                        capture = None;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            other => {
                if capture.is_some() {
                    if let Some(text) = event_text(other) {
                        buf.push_str(&text);
                    }
                }
            }
        }
    }

    if meta.short_title.is_empty() {
        meta.short_title = search_title;
    }
    Ok(meta)
}
