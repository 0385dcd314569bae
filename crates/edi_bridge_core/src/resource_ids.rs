//! `KEY=VALUE` resource-id files written by setup and read at deploy time.

use std::collections::BTreeMap;

pub const RESOURCE_IDS_FILE_NAME: &str = ".resource_ids";

/// Parses `KEY=VALUE` lines; blank lines and `#` comments are skipped, and
/// surrounding quotes on values are removed.
pub fn parse_resource_ids(contents: &str) -> BTreeMap<String, String> {
    let mut entries = BTreeMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        entries.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    entries
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

pub fn render_resource_ids(entries: &BTreeMap<String, String>) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{key}={value}\n"))
        .collect()
}
