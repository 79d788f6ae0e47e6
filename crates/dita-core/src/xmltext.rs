use quick_xml::escape::unescape;
use quick_xml::events::Event;

/// Plain text carried by a character-data event, if any.
pub(crate) fn event_text(event: &Event<'_>) -> Option<String> {
    match event {
        Event::Text(t) => {
            let raw = String::from_utf8_lossy(t.as_ref());
            Some(
                unescape(&raw)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| raw.to_string()),
            )
        }
        Event::GeneralRef(r) => {
            let raw = format!("&{};", String::from_utf8_lossy(r.as_ref()));
            Some(
                unescape(&raw)
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| raw.clone()),
            )
        }
        Event::CData(t) => Some(String::from_utf8_lossy(t.as_ref()).to_string()),
        _ => None,
    }
}

pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\t b  c "), "a b c");
    }

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name("ditaarch:topic"), "topic");
        assert_eq!(local_name("title"), "title");
    }
}
