use std::fmt;

use serde::{Deserialize, Serialize};

/// Page identifier. A valid slug is a fixed point of [`slugify`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Converts text to a slug.
///
/// * letters and numbers are kept, lowercased
/// * `/` and `=` are kept and swallow the dash that would follow
/// * `-`, `,`, `.`, space and `_` separate words with a single `-`
/// * other symbols are spelled by their HTML entity name, when one exists
/// * everything else separates words
///
/// `"&Hello_世界/+!"` becomes `amp-hello-世界/plus-excl`.
pub fn slugify(text: &str) -> Slug {
    let mut cutdash = true;
    let mut emitdash = false;
    let mut slug = String::with_capacity(text.len());

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if emitdash && !cutdash {
                slug.push('-');
            }
            slug.extend(ch.to_lowercase());
            emitdash = false;
            cutdash = false;
            continue;
        }
        match ch {
            '/' | '=' => {
                slug.push(ch);
                emitdash = false;
                cutdash = true;
            }
            '-' | ',' | '.' | ' ' | '_' => emitdash = true,
            _ => {
                if let Some(name) = symbol_name(ch) {
                    if !cutdash {
                        slug.push('-');
                    }
                    slug.push_str(name);
                    cutdash = false;
                }
                emitdash = true;
            }
        }
    }

    if slug.is_empty() {
        return Slug("-".to_string());
    }
    Slug(slug)
}

/// Checks that `slug` is non-empty and unchanged by [`slugify`].
pub fn validate_slug(slug: &str) -> Result<Slug, SlugError> {
    if slug.is_empty() {
        return Err(SlugError::Empty);
    }
    let converted = slugify(slug);
    if converted.as_str() != slug {
        return Err(SlugError::NotCanonical(converted));
    }
    Ok(converted)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slugification modified the slug (to \"{0}\")")]
    NotCanonical(Slug),
}

/// Human-readable title guessed from a slug.
pub fn slug_to_title(slug: &Slug) -> String {
    slug.as_str()
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn symbol_name(ch: char) -> Option<&'static str> {
    let name = match ch {
        '!' => "excl",
        '"' => "quot",
        '#' => "num",
        '$' => "dollar",
        '%' => "percnt",
        '&' => "amp",
        '\'' => "apos",
        '(' => "lpar",
        ')' => "rpar",
        '*' => "ast",
        '+' => "plus",
        ':' => "colon",
        ';' => "semi",
        '<' => "lt",
        '>' => "gt",
        '?' => "quest",
        '@' => "commat",
        '[' => "lsqb",
        '\\' => "bsol",
        ']' => "rsqb",
        '^' => "hat",
        '`' => "grave",
        '{' => "lcub",
        '|' => "vert",
        '}' => "rcub",
        '~' => "tilde",
        '\u{A1}' => "iexcl",
        '\u{A2}' => "cent",
        '\u{A3}' => "pound",
        '\u{A4}' => "curren",
        '\u{A5}' => "yen",
        '\u{A6}' => "brvbar",
        '\u{A7}' => "sect",
        '\u{A8}' => "uml",
        '\u{A9}' => "copy",
        '\u{AB}' => "laquo",
        '\u{AC}' => "not",
        '\u{AE}' => "reg",
        '\u{AF}' => "macr",
        '\u{B0}' => "deg",
        '\u{B1}' => "pm",
        '\u{B4}' => "acute",
        '\u{B6}' => "para",
        '\u{B7}' => "middot",
        '\u{B8}' => "cedil",
        '\u{BB}' => "raquo",
        '\u{BF}' => "iquest",
        '\u{D7}' => "times",
        '\u{F7}' => "div",
        '\u{2010}' => "dash",
        '\u{2013}' => "ndash",
        '\u{2014}' => "mdash",
        '\u{2015}' => "horbar",
        '\u{2016}' => "vert",
        '\u{2018}' => "lsquo",
        '\u{2019}' => "rsquo",
        '\u{201A}' => "sbquo",
        '\u{201C}' => "ldquo",
        '\u{201D}' => "rdquo",
        '\u{201E}' => "bdquo",
        '\u{2020}' => "dagger",
        '\u{2021}' => "ddagger",
        '\u{2022}' => "bull",
        '\u{2026}' => "hellip",
        '\u{2030}' => "permil",
        '\u{2032}' => "prime",
        '\u{20AC}' => "euro",
        '\u{2122}' => "trade",
        '\u{2190}' => "larr",
        '\u{2191}' => "uarr",
        '\u{2192}' => "rarr",
        '\u{2193}' => "darr",
        '\u{2194}' => "harr",
        '\u{21D2}' => "rarr",
        '\u{2212}' => "minus",
        '\u{221E}' => "infin",
        '\u{2248}' => "asymp",
        '\u{2260}' => "ne",
        '\u{2264}' => "le",
        '\u{2265}' => "ge",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_examples() {
        assert_eq!(slugify("&Hello_世界/+!").as_str(), "amp-hello-世界/plus-excl");
        assert_eq!(slugify("Hello  World  /  Test").as_str(), "hello-world/test");
        assert_eq!(slugify("Setup and Install").as_str(), "setup-and-install");
        assert_eq!(slugify("C++ API (v2)").as_str(), "c-plus-plus-api-lpar-v2-rpar");
    }

    #[test]
    fn slugify_empty_and_separator_only() {
        assert_eq!(slugify("").as_str(), "-");
        assert_eq!(slugify(" - _ ").as_str(), "-");
    }

    #[test]
    fn slugify_is_idempotent() {
        for text in ["Getting Started", "Q&A: Tips", "a=b/c", "Ünïcode Straße"] {
            let once = slugify(text);
            assert_eq!(slugify(once.as_str()), once, "{text}");
        }
    }

    #[test]
    fn validate_rejects_non_canonical() {
        assert!(validate_slug("getting-started").is_ok());
        assert_eq!(validate_slug(""), Err(SlugError::Empty));
        assert!(matches!(
            validate_slug("Getting Started"),
            Err(SlugError::NotCanonical(ref s)) if s.as_str() == "getting-started"
        ));
    }

    #[test]
    fn title_from_slug() {
        assert_eq!(slug_to_title(&slugify("getting started")), "Getting Started");
    }
}
