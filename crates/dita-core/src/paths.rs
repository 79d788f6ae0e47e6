/// Splits a reference into its path part and in-document selector.
pub fn split_link(href: &str) -> (&str, &str) {
    href.split_once('#').unwrap_or((href, ""))
}

/// Whether the reference carries a URL scheme (`http:`, `mailto:`, ...).
///
/// Single letters are treated as drive letters, not schemes.
pub fn is_absolute_url(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && scheme.len() > 1
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Forward slashes, `.` and `..` resolved, no leading slash. `..` never
/// climbs above the root.
pub fn clean_path(name: &str) -> String {
    let name = name.replace('\\', "/");
    let mut out: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            _ => out.push(segment),
        }
    }
    out.join("/")
}

/// Key under which a topic is stored in the index: the cleaned path,
/// lowercased.
pub fn canonical_path(name: &str) -> String {
    clean_path(name).to_lowercase()
}

/// Directory part of a canonical path (`""` at the root).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolves `reference` (without selector) against the directory of
/// `base_file`, keeping the original case.
pub fn join_relative(base_file: &str, reference: &str) -> String {
    let base_dir = parent_dir(base_file);
    if reference.is_empty() {
        return base_file.to_string();
    }
    if base_dir.is_empty() {
        reference.to_string()
    } else {
        format!("{}/{}", base_dir, reference)
    }
}
