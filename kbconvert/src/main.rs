mod settings;

use std::{
    env, fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use dita_core::{
    config::ConvertConfig,
    convert_corpus,
    media::ContentAddressedMedia,
    Index, IndexError, Mapping, MediaError, PageConversion, PageEntry, Rules,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use settings::ConfigError;

#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Indexing failed: {0}")]
    Index(#[from] IndexError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

struct Summary {
    pages: usize,
    failed: usize,
    media: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Optional config path; otherwise the per-user kbconvert.toml
    let explicit = env::args().nth(1).map(PathBuf::from);
    let result = settings::load(explicit.as_deref())
        .map_err(RunError::from)
        .and_then(|config| run(&config));

    match result {
        Ok(summary) => {
            info!(
                pages = summary.pages,
                failed = summary.failed,
                media = summary.media,
                "done"
            );
            if summary.failed > 0 {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ConvertConfig) -> Result<Summary, RunError> {
    let rules = Rules::html().with_overrides(&config.rules);

    let mut index = Index::load_dir(&config.source_dir)?;
    info!(topics = index.len(), source = %config.source_dir.display(), "indexed topics");

    let (mapping, errors) = Mapping::build(&mut index);
    info!(mapped = mapping.len(), errors = errors.len(), "assigned slugs");

    let media = ContentAddressedMedia::new(&config.source_dir, &config.media_url);
    let conversion = PageConversion {
        rules: &rules,
        index: &index,
        mapping: &mapping,
        config,
        inliner: &media,
    };
    let outcomes = convert_corpus(&conversion, config.worker_count());

    fs::create_dir_all(&config.output_dir)?;
    let mut listing: Vec<PageEntry> = Vec::with_capacity(outcomes.len());
    let mut failed = 0;
    for outcome in &outcomes {
        for diagnostic in &outcome.diagnostics {
            warn!(
                source = diagnostic.source_path(),
                reference = diagnostic.reference(),
                "{}",
                diagnostic
            );
        }
        match &outcome.result {
            Ok(page) => {
                let file = config.output_dir.join(format!("{}.json", page.slug));
                write_json(&file, page)?;
                listing.push(page.entry());
            }
            Err(err) => {
                failed += 1;
                error!(path = %outcome.path, slug = %outcome.slug, "conversion failed: {}", err);
            }
        }
    }
    write_json(&config.output_dir.join("pages.json"), &listing)?;

    let copied = media.publish(&config.output_dir.join("media"))?;
    Ok(Summary {
        pages: listing.len(),
        failed,
        media: copied,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), RunError> {
    let text = serde_json::to_string_pretty(value)?;
    let mut f = fs::File::create(path)?;
    f.write_all(text.as_bytes())?;
    Ok(())
}
