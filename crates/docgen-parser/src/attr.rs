//! Substring-level attribute lookup for `.tscn` lines.
//!
//! Values are always double-quoted in scene files. No escape handling is done:
//! a value containing `\"` is cut at that quote.

/// Return the quoted value following `key="` on `line`, if present.
///
/// An occurrence that starts the line or follows whitespace or `[` is
/// preferred, so `id` does not pick up `uid="..."`. If there is none, the first
/// raw occurrence is used. A missing closing quote runs the value to the end of
/// the line.
pub fn extract<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{key}=\"");
    let start = find_delimited(line, &needle).or_else(|| line.find(&needle))? + needle.len();
    let rest = &line[start..];
    Some(rest.find('"').map_or(rest, |end| &rest[..end]))
}

fn find_delimited(line: &str, needle: &str) -> Option<usize> {
    line.match_indices(needle).map(|(i, _)| i).find(|&i| {
        line[..i]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == '[')
    })
}

/// Parse the resource id out of a `script = ExtResource("<id>")` property line.
///
/// Also accepts the Godot 3 form `script = ExtResource( 1 )`.
pub fn script_resource_id(line: &str) -> Option<&str> {
    let rest = line
        .trim()
        .strip_prefix("script")?
        .trim_start()
        .strip_prefix('=')?
        .trim_start()
        .strip_prefix("ExtResource(")?;
    let inner = &rest[..rest.find(')')?];
    let id = inner.trim().trim_matches('"');
    (!id.is_empty()).then_some(id)
}

/// Name of the direct parent from a node's `parent` ancestry (`"A/B/C"` → `"C"`).
pub fn parent_name(ancestry: &str) -> &str {
    ancestry.rsplit('/').next().unwrap_or(ancestry)
}
