use std::collections::{HashMap, HashSet};

use crate::config::RuleOverrides;

/// Tag-level rewrite table for one target dialect.
///
/// Built once and shared read-only by every conversion run. Per-tag custom
/// logic is not part of the table; it is registered on each
/// [`Context`](crate::context::Context) as a handler keyed by output tag name.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    pub translate: HashMap<String, String>,
    pub remove: HashSet<String>,
    pub unwrap: HashSet<String>,
}

/// What the table decides for an input tag, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'r> {
    /// Drop the tag and its whole subtree.
    Remove,
    /// Drop the tag, keep its children in place.
    Unwrap,
    /// Rename the tag.
    Translate(&'r str),
    /// Emit the tag as-is.
    Identity,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(mut self, from: &str, to: &str) -> Self {
        self.translate.insert(from.to_string(), to.to_string());
        self
    }

    pub fn remove(mut self, name: &str) -> Self {
        self.remove.insert(name.to_string());
        self
    }

    pub fn unwrap(mut self, name: &str) -> Self {
        self.unwrap.insert(name.to_string());
        self
    }

    pub fn action(&self, name: &str) -> Action<'_> {
        if self.remove.contains(name) {
            return Action::Remove;
        }
        if self.unwrap.contains(name) {
            return Action::Unwrap;
        }
        match self.translate.get(name) {
            Some(to) => Action::Translate(to),
            None => Action::Identity,
        }
    }

    /// Output tag name for an input tag that is emitted.
    pub fn output_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.translate.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Merges configured overrides on top of this table.
    pub fn with_overrides(mut self, overrides: &RuleOverrides) -> Self {
        for (from, to) in &overrides.translate {
            self.translate.insert(from.clone(), to.clone());
        }
        self.remove.extend(overrides.remove.iter().cloned());
        self.unwrap.extend(overrides.unwrap.iter().cloned());
        self
    }

    /// DITA topic content to HTML.
    pub fn html() -> Self {
        const TRANSLATE: &[(&str, &str)] = &[
            // links
            ("xref", "a"),
            ("link", "a"),
            // lists
            ("choices", "ul"),
            ("choice", "li"),
            ("steps-unordered", "ul"),
            ("steps", "ol"),
            ("step", "li"),
            ("i", "em"),
            ("lines", "pre"),
            ("codeblock", "code"),
            // inline
            ("codeph", "span"),
            ("cmdname", "span"),
            ("cmd", "span"),
            ("secright", "span"),
            ("shortcut", "span"),
            ("wintitle", "span"),
            ("filepath", "span"),
            ("userinput", "span"),
            ("menucascade", "span"),
            ("synph", "span"),
            ("delim", "span"),
            ("sep", "span"),
            ("parmname", "span"),
            ("uicontrol", "span"),
            ("image", "img"),
            // blocks
            ("example", "div"),
            ("context", "div"),
            ("substeps", "div"),
            ("substep", "div"),
            ("result", "div"),
            ("stepresult", "div"),
            ("stepxmp", "div"),
            ("info", "div"),
            ("note", "div"),
            ("refsyn", "div"),
            ("bodydiv", "div"),
            ("fig", "div"),
            ("prereq", "div"),
            ("postreq", "div"),
            // tables
            ("simpletable", "table"),
            ("sthead", "thead"),
            ("strow", "tr"),
            ("stentry", "td"),
            ("colspec", "colgroup"),
            ("row", "tr"),
            ("entry", "td"),
        ];
        let mut rules = Rules::new()
            .remove("br")
            .remove("draft-comment")
            .remove("colspec")
            .unwrap("dlentry")
            .unwrap("tgroup");
        for (from, to) in TRANSLATE {
            rules = rules.translate(from, to);
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_takes_precedence_over_translate() {
        let rules = Rules::html();
        assert_eq!(rules.translate.get("colspec").map(String::as_str), Some("colgroup"));
        assert_eq!(rules.action("colspec"), Action::Remove);
    }

    #[test]
    fn unwrap_takes_precedence_over_translate() {
        let rules = Rules::new().translate("y", "div").unwrap("y");
        assert_eq!(rules.action("y"), Action::Unwrap);
    }

    #[test]
    fn unknown_tags_are_identity() {
        let rules = Rules::html();
        assert_eq!(rules.action("p"), Action::Identity);
        assert_eq!(rules.action("xref"), Action::Translate("a"));
        assert_eq!(rules.output_name("p"), "p");
        assert_eq!(rules.output_name("image"), "img");
    }

    #[test]
    fn overrides_extend_the_table() {
        let overrides = RuleOverrides {
            translate: [("note".to_string(), "aside".to_string())].into_iter().collect(),
            remove: vec!["indexterm".into()],
            unwrap: vec!["ph".into()],
        };
        let rules = Rules::html().with_overrides(&overrides);
        assert_eq!(rules.action("note"), Action::Translate("aside"));
        assert_eq!(rules.action("indexterm"), Action::Remove);
        assert_eq!(rules.action("ph"), Action::Unwrap);
        assert_eq!(rules.action("br"), Action::Remove);
    }
}
