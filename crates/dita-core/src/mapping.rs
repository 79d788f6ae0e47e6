//! Title to slug assignment for a whole corpus.
//!
//! Topics are registered in the index's insertion order and the first topic
//! to claim a slug keeps it; callers that want stable results across runs
//! must insert topics in a stable order (`Index::load_dir` sorts by path).

use bimap::BiMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::MappingError;
use crate::index::{Index, Topic};
use crate::slug::{slugify, Slug};

static OR_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?/ ?").expect("static pattern"));
static AND_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\^]) ?& ?").expect("static pattern"));

/// Spells out `/` and `&` so they do not collide with slug separators.
/// An escaped `^&` is left alone.
pub fn titleize(title: &str) -> String {
    let title = OR_SEPARATOR.replace_all(title, " or ");
    let title = AND_SEPARATOR.replace_all(&title, "${1} and ");
    title.trim().to_string()
}

/// Bidirectional slug/topic assignment. Every slug names exactly one topic
/// path and every mapped topic has exactly one slug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    slugs: BiMap<Slug, String>,
}

impl Mapping {
    /// Assigns slugs to every topic in `index`, normalizing titles in place.
    ///
    /// Topics with a missing or clashing title are reported and left
    /// unmapped. Afterwards each mapped topic whose short title is shorter
    /// and still free is promoted to it.
    pub fn build(index: &mut Index) -> (Self, Vec<MappingError>) {
        let mut errors = Vec::new();
        let mut slugs: BiMap<Slug, String> = BiMap::with_capacity(index.len());
        let paths = index.paths().to_vec();

        for path in &paths {
            let Some(topic) = index.get_mut(path) else {
                continue;
            };
            topic.title = titleize(&topic.title);
            topic.short_title = titleize(&topic.short_title);

            if topic.title.is_empty() {
                let err = MappingError::TitleMissing { path: path.clone() };
                warn!(error = %err, "topic left unmapped");
                errors.push(err);
                continue;
            }

            let slug = slugify(&topic.title);
            if let Some(other) = slugs.get_by_left(&slug) {
                let err = MappingError::ClashingTitle {
                    title: topic.title.clone(),
                    path: path.clone(),
                    other: other.clone(),
                };
                warn!(error = %err, "topic left unmapped");
                errors.push(err);
                continue;
            }
            slugs.insert(slug, path.clone());
        }

        for path in &paths {
            let Some(topic) = index.get_mut(path) else {
                continue;
            };
            let Some(current) = slugs.get_by_right(path).cloned() else {
                continue;
            };
            if !wants_promotion(topic) {
                continue;
            }
            let short = slugify(&topic.short_title);
            if slugs.contains_left(&short) {
                continue;
            }
            debug!(path = %path, from = %current, to = %short, "promoted to short title");
            topic.title = std::mem::take(&mut topic.short_title);
            slugs.remove_by_left(&current);
            slugs.insert(short, path.clone());
        }

        (Self { slugs }, errors)
    }

    /// Slug assigned to the topic at `path`.
    pub fn slug_of(&self, path: &str) -> Option<&Slug> {
        self.slugs.get_by_right(path)
    }

    /// Path of the topic owning `slug`.
    pub fn path_of(&self, slug: &Slug) -> Option<&str> {
        self.slugs.get_by_left(slug).map(String::as_str)
    }

    pub fn topic<'i>(&self, index: &'i Index, slug: &Slug) -> Option<&'i Topic> {
        self.path_of(slug).and_then(|path| index.get(path))
    }

    /// Mapped topics with their slugs, ordered by path. Used for listings
    /// only; slug assignment follows index order.
    pub fn topics_sorted<'i>(&self, index: &'i Index) -> Vec<(&Slug, &'i Topic)> {
        let mut topics: Vec<(&Slug, &'i Topic)> = self
            .slugs
            .iter()
            .filter_map(|(slug, path)| index.get(path).map(|topic| (slug, topic)))
            .collect();
        topics.sort_by(|a, b| a.1.path.cmp(&b.1.path));
        topics
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.slugs.contains_right(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Slug, &str)> {
        self.slugs.iter().map(|(slug, path)| (slug, path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }
}

fn wants_promotion(topic: &Topic) -> bool {
    !topic.short_title.is_empty()
        && topic.short_title.chars().count() < topic.title.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(topics: Vec<Topic>) -> Index {
        let mut index = Index::new();
        for topic in topics {
            index.insert(topic);
        }
        index
    }

    fn slug(text: &str) -> Slug {
        slugify(text)
    }

    #[test]
    fn titleize_spells_out_separators() {
        assert_eq!(titleize("Setup / Install"), "Setup or Install");
        assert_eq!(titleize("Setup/Install"), "Setup or Install");
        assert_eq!(titleize("Setup & Install"), "Setup and Install");
        assert_eq!(titleize("R&D"), "R and D");
        assert_eq!(titleize("Escaped ^& kept"), "Escaped ^& kept");
    }

    #[test]
    fn assigns_slugs_from_titles() {
        let mut index = index_of(vec![
            Topic::new("a.dita", "Getting Started"),
            Topic::new("b.dita", "Q/A"),
        ]);
        let (mapping, errors) = Mapping::build(&mut index);
        assert!(errors.is_empty());
        assert_eq!(mapping.slug_of("a.dita"), Some(&slug("getting-started")));
        assert_eq!(mapping.slug_of("b.dita"), Some(&slug("q-or-a")));
        assert_eq!(index.get("b.dita").map(|t| t.title.as_str()), Some("Q or A"));
    }

    #[test]
    fn clash_keeps_first_registration() {
        let mut index = index_of(vec![
            Topic::new("one.dita", "Setup & Install"),
            Topic::new("two.dita", "Setup and Install"),
        ]);
        let (mapping, errors) = Mapping::build(&mut index);
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.slug_of("one.dita"), Some(&slug("setup-and-install")));
        assert_eq!(mapping.slug_of("two.dita"), None);
        assert_eq!(
            errors,
            vec![MappingError::ClashingTitle {
                title: "Setup and Install".into(),
                path: "two.dita".into(),
                other: "one.dita".into(),
            }]
        );
    }

    #[test]
    fn missing_title_is_reported_and_excluded() {
        let mut index = index_of(vec![Topic::new("empty.dita", "  "), Topic::new("ok.dita", "Ok")]);
        let (mapping, errors) = Mapping::build(&mut index);
        assert_eq!(
            errors,
            vec![MappingError::TitleMissing {
                path: "empty.dita".into()
            }]
        );
        assert!(!mapping.contains_path("empty.dita"));
        assert!(mapping.contains_path("ok.dita"));
    }

    #[test]
    fn promotes_free_short_titles() {
        let mut index = index_of(vec![
            Topic::new("install.dita", "Installing the Server").with_short_title("Install"),
        ]);
        let (mapping, _) = Mapping::build(&mut index);
        assert_eq!(mapping.slug_of("install.dita"), Some(&slug("install")));
        assert_eq!(mapping.path_of(&slug("install")), Some("install.dita"));
        assert_eq!(mapping.path_of(&slug("installing-the-server")), None);
        let topic = index.get("install.dita").unwrap();
        assert_eq!(topic.title, "Install");
        assert!(topic.short_title.is_empty());
    }

    #[test]
    fn promotion_skips_taken_short_titles() {
        let mut index = index_of(vec![
            Topic::new("overview.dita", "Overview"),
            Topic::new("server.dita", "Server Overview").with_short_title("Overview"),
        ]);
        let (mapping, errors) = Mapping::build(&mut index);
        assert!(errors.is_empty());
        assert_eq!(mapping.slug_of("server.dita"), Some(&slug("server-overview")));
        assert_eq!(mapping.slug_of("overview.dita"), Some(&slug("overview")));
        assert_eq!(index.get("server.dita").unwrap().short_title, "Overview");
    }

    #[test]
    fn longer_short_title_is_not_promoted() {
        let mut index = index_of(vec![
            Topic::new("faq.dita", "FAQ").with_short_title("Frequently asked"),
        ]);
        let (mapping, _) = Mapping::build(&mut index);
        assert_eq!(mapping.slug_of("faq.dita"), Some(&slug("faq")));
    }

    #[test]
    fn sorted_listing_ignores_registration_order() {
        let mut index = index_of(vec![
            Topic::new("zeta.dita", "Zeta"),
            Topic::new("alpha.dita", "Alpha"),
            Topic::new("mid/x.dita", "Zeta"),
        ]);
        let (mapping, _) = Mapping::build(&mut index);
        let listed: Vec<&str> = mapping
            .topics_sorted(&index)
            .iter()
            .map(|(_, topic)| topic.path.as_str())
            .collect();
        assert_eq!(listed, vec!["alpha.dita", "zeta.dita"]);
    }

    #[test]
    fn mapping_is_a_bijection_and_repeatable() {
        let topics = vec![
            Topic::new("a.dita", "Alpha"),
            Topic::new("b.dita", "Beta Topic").with_short_title("Beta"),
            Topic::new("c.dita", "Alpha"),
            Topic::new("d.dita", "Gamma / Delta"),
        ];
        let (first, _) = Mapping::build(&mut index_of(topics.clone()));
        let (second, _) = Mapping::build(&mut index_of(topics));
        assert_eq!(first, second);
        for (slug, path) in first.iter() {
            assert_eq!(first.slug_of(path), Some(slug));
            assert_eq!(first.path_of(slug), Some(path));
        }
        let mut seen: Vec<&Slug> = first.iter().map(|(slug, _)| slug).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), first.len());
        assert_eq!(first.len(), 3);
    }
}
