//! Image inlining: maps a media reference in a topic to a servable URL.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use sha2::{Digest, Sha256};

use crate::context::{Context, Handler};
use crate::error::{ConvertError, Diagnostic, MediaError};
use crate::paths::{clean_path, is_absolute_url, join_relative};
use crate::token::{StartTag, TokenSource};

/// Content-inlining collaborator shared by all conversion workers.
pub trait MediaInliner: Sync {
    /// URL under which the image `reference`, found in the topic stored at
    /// `topic_file`, is served.
    fn inlined_image_url(&self, topic_file: &str, reference: &str) -> Result<String, MediaError>;
}

/// A media file to be published under its content address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub source: PathBuf,
    pub file_name: String,
}

/// Serves images under `<url_prefix>/<sha256 hex><.ext>` and remembers every
/// file it has addressed.
pub struct ContentAddressedMedia {
    root: PathBuf,
    url_prefix: String,
    assets: Mutex<BTreeMap<String, PathBuf>>,
}

impl ContentAddressedMedia {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            assets: Mutex::new(BTreeMap::new()),
        }
    }

    /// Assets addressed so far, ordered by file name.
    pub fn assets(&self) -> Vec<MediaAsset> {
        let assets = self.assets.lock().unwrap_or_else(|p| p.into_inner());
        assets
            .iter()
            .map(|(file_name, source)| MediaAsset {
                source: source.clone(),
                file_name: file_name.clone(),
            })
            .collect()
    }

    /// Copies every addressed asset into `dir`.
    pub fn publish(&self, dir: &Path) -> Result<usize, MediaError> {
        fs::create_dir_all(dir)?;
        let assets = self.assets();
        for asset in &assets {
            fs::copy(&asset.source, dir.join(&asset.file_name))?;
        }
        Ok(assets.len())
    }
}

fn content_name(data: &[u8], reference: &str) -> String {
    let digest = Sha256::digest(data);
    let ext = Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{:x}{}", digest, ext)
}

impl MediaInliner for ContentAddressedMedia {
    fn inlined_image_url(&self, topic_file: &str, reference: &str) -> Result<String, MediaError> {
        if is_absolute_url(reference) {
            return Ok(reference.to_string());
        }
        let rel = clean_path(&join_relative(topic_file, reference));
        let source = self.root.join(&rel);
        let data = fs::read(&source)?;
        let file_name = content_name(&data, &rel);

        let mut assets = self.assets.lock().unwrap_or_else(|p| p.into_inner());
        assets.entry(file_name.clone()).or_insert(source);
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }
}

/// Rewrites `<img>` elements to point at inlined media. `placement="break"`
/// images are wrapped in `<p class="image">`.
pub struct ImageHandler<'a> {
    inliner: &'a dyn MediaInliner,
    topic_file: &'a str,
}

impl<'a> ImageHandler<'a> {
    pub fn new(inliner: &'a dyn MediaInliner, topic_file: &'a str) -> Self {
        Self { inliner, topic_file }
    }
}

impl Handler for ImageHandler<'_> {
    fn handle(
        &self,
        ctx: &mut Context<'_>,
        dec: &mut dyn TokenSource,
        mut start: StartTag,
    ) -> Result<(), ConvertError> {
        let reference = start.attr("href").to_string();
        if !reference.is_empty() {
            let src = match self.inliner.inlined_image_url(self.topic_file, &reference) {
                Ok(url) => url,
                Err(err) => {
                    ctx.report(Diagnostic::MediaUnavailable {
                        source_path: ctx.decoding_path.clone(),
                        reference: reference.clone(),
                        reason: err.to_string(),
                    });
                    reference
                }
            };
            start.set_attr("src", &src);
            start.set_attr("href", "");
        }

        let wrap = start.attr("placement") == "break";
        start.set_attr("placement", "");
        if wrap {
            ctx.write_tag("p", &[("class", "image")]);
        }
        ctx.emit_with_children(dec, start)?;
        if wrap {
            ctx.write_end("p");
        }
        Ok(())
    }
}
