pub mod config;
pub mod context;
pub mod error;
pub mod index;
pub mod mapping;
pub mod media;
pub mod page;
pub mod paths;
pub mod render;
pub mod resolve;
pub mod rules;
pub mod selector;
pub mod slug;
pub mod token;

mod xmltext;

pub use config::ConvertConfig;
pub use context::{Context, Handler};
pub use error::{ConvertError, Diagnostic, IndexError, MappingError, MediaError};
pub use index::{Index, Topic};
pub use mapping::Mapping;
pub use page::{convert_corpus, ConversionOutcome, Page, PageConversion, PageEntry};
pub use rules::Rules;
pub use slug::{slugify, Slug};
