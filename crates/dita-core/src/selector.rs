use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::error::SelectorError;
use crate::xmltext::{collapse_whitespace, event_text, local_name};

/// Title of the element addressed by `selector` inside `raw`.
///
/// The selector is `topicid` or `topicid/elementid`; the element whose `id`
/// equals the last segment is located and the text of its first direct
/// `<title>` child returned.
pub fn extract_title(raw: &str, selector: &str) -> Result<String, SelectorError> {
    let target = selector.rsplit('/').next().unwrap_or(selector);
    let mut reader = XmlReader::from_str(raw);
    let mut depth = 0usize;
    let mut found_at: Option<usize> = None;
    let mut title_at: Option<usize> = None;
    let mut buf = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SelectorError::Xml(e.to_string()))?;
        match &event {
            Event::Start(e) => {
                depth += 1;
                match found_at {
                    None if has_id(e, target) => found_at = Some(depth),
                    Some(at) if title_at.is_none() && depth == at + 1 && is_title(e) => {
                        title_at = Some(depth);
                        buf.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if found_at.is_none() && has_id(e, target) {
                    return Err(SelectorError::TitleMissing(target.to_string()));
                }
            }
            Event::End(_) => {
                if title_at == Some(depth) {
                    let title = collapse_whitespace(&buf);
                    if title.is_empty() {
                        return Err(SelectorError::TitleMissing(target.to_string()));
                    }
                    return Ok(title);
                }
                if found_at == Some(depth) {
                    return Err(SelectorError::TitleMissing(target.to_string()));
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Err(SelectorError::ElementNotFound(target.to_string())),
            other => {
                if title_at.is_some() {
                    if let Some(text) = event_text(other) {
                        buf.push_str(&text);
                    }
                }
            }
        }
    }
}

fn has_id(e: &BytesStart<'_>, id: &str) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"id" && a.value.as_ref() == id.as_bytes())
}

fn is_title(e: &BytesStart<'_>) -> bool {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    local_name(&name) == "title"
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = r#"<concept id="setup">
  <title>Setup</title>
  <conbody>
    <section id="intro"><title>Before you <b>begin</b></title><p>text</p></section>
    <section id="untitled"><p><title>nested, not direct</title></p></section>
    <fig id="f1"><title>Figure one</title><image href="a.png"/></fig>
    <p id="empty-one"/>
  </conbody>
</concept>"#;

    #[test]
    fn finds_section_title() {
        assert_eq!(extract_title(TOPIC, "setup/intro").unwrap(), "Before you begin");
        assert_eq!(extract_title(TOPIC, "setup/f1").unwrap(), "Figure one");
    }

    #[test]
    fn topic_id_alone_addresses_topic_title() {
        assert_eq!(extract_title(TOPIC, "setup").unwrap(), "Setup");
    }

    #[test]
    fn reports_missing_element_and_title() {
        assert_eq!(
            extract_title(TOPIC, "setup/nope"),
            Err(SelectorError::ElementNotFound("nope".into()))
        );
        assert_eq!(
            extract_title(TOPIC, "setup/untitled"),
            Err(SelectorError::TitleMissing("untitled".into()))
        );
        assert_eq!(
            extract_title(TOPIC, "setup/empty-one"),
            Err(SelectorError::TitleMissing("empty-one".into()))
        );
    }
}
