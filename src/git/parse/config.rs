//! git::parse::config
//!
//! Line-oriented parser for git's ini-style config files, used to read
//! remotes from `.git/config` and submodules from `.gitmodules` without
//! spawning git.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{Remote, Submodule};

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\[\s*([^\]]+?)\s*("[^"]+")*\]\s*$"#).expect("static section pattern")
});
static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^=]+?)\s*=\s*(.*)$").expect("static property pattern"));

/// One `[name "subsection"]` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSection {
    pub name: String,
    pub subsection: Option<String>,
    pub properties: HashMap<String, String>,
}

impl ConfigSection {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Parse config text into sections in file order.
///
/// Within a section the first occurrence of a key wins. Properties before
/// the first header, comments and blank lines are ignored.
pub fn parse_config(raw: &str) -> Vec<ConfigSection> {
    let mut sections: Vec<ConfigSection> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(caps) = SECTION.captures(line) {
            sections.push(ConfigSection {
                name: caps[1].to_string(),
                subsection: caps
                    .get(2)
                    .map(|m| m.as_str().trim_matches('"').to_string()),
                properties: HashMap::new(),
            });
            continue;
        }

        if let (Some(section), Some(caps)) = (sections.last_mut(), PROPERTY.captures(line)) {
            section
                .properties
                .entry(caps[1].to_string())
                .or_insert_with(|| caps[2].to_string());
        }
    }
    sections
}

fn is_disabled_push(url: &str) -> bool {
    url == "DISABLE" || url == "no_push"
}

/// Remotes declared in a repository config.
pub fn parse_remotes_from_config(raw: &str) -> Vec<Remote> {
    parse_config(raw)
        .into_iter()
        .filter(|s| s.name == "remote")
        .filter_map(|s| {
            let name = s.subsection.clone()?;
            let fetch_url = s.get("url").map(str::to_string);
            let push_url = s.get("pushurl").map(str::to_string).or_else(|| fetch_url.clone());
            let is_read_only = push_url.as_deref().is_some_and(is_disabled_push);
            Some(Remote {
                name,
                fetch_url,
                push_url,
                is_read_only,
            })
        })
        .collect()
}

/// Submodules declared in `.gitmodules`. Entries without a path or URL are
/// skipped.
pub fn parse_gitmodules(raw: &str) -> Vec<Submodule> {
    parse_config(raw)
        .into_iter()
        .filter(|s| s.name == "submodule")
        .filter_map(|s| {
            Some(Submodule {
                name: s.subsection.clone()?,
                path: s.get("path")?.to_string(),
                url: s.get("url")?.to_string(),
            })
        })
        .collect()
}
