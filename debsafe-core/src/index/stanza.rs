use super::types::PackageRecord;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ParsedIndex {
    pub records: Vec<PackageRecord>,
    pub skipped: usize,
}

/// Parses a `Packages` document into records.
///
/// Stanzas missing `Package`, `Version`, `Architecture` or `Filename` are
/// counted in `skipped` and never affect their neighbours.
pub fn parse_index(text: &str) -> ParsedIndex {
    let mut parsed = ParsedIndex::default();
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    let mut current_key: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_stanza(&mut fields, &mut parsed);
            current_key = None;
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation. Descriptions only keep their synopsis line.
            if let Some(key) = current_key.as_deref()
                && key != "Description"
                && let Some(value) = fields.get_mut(key)
            {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(line.trim());
            }
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) => {
                let key = key.trim().to_string();
                fields.insert(key.clone(), value.trim().to_string());
                current_key = Some(key);
            }
            None => {
                debug!("ignoring malformed index line: {line}");
                current_key = None;
            }
        }
    }

    flush_stanza(&mut fields, &mut parsed);

    if parsed.skipped > 0 {
        warn!(
            "skipped {} incomplete index stanza(s), kept {}",
            parsed.skipped,
            parsed.records.len()
        );
    }

    parsed
}

fn flush_stanza(fields: &mut BTreeMap<String, String>, parsed: &mut ParsedIndex) {
    if fields.is_empty() {
        return;
    }

    let stanza = std::mem::take(fields);
    match build_record(stanza) {
        Some(record) => parsed.records.push(record),
        None => parsed.skipped += 1,
    }
}

fn build_record(mut fields: BTreeMap<String, String>) -> Option<PackageRecord> {
    let mut required = |key: &str| fields.remove(key).filter(|value| !value.is_empty());

    let name = required("Package")?;
    let version = required("Version")?;
    let architecture = required("Architecture")?;
    let filename = required("Filename")?;

    let optional = |key: &str| {
        fields
            .get(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    Some(PackageRecord {
        depends: optional("Depends").unwrap_or_default(),
        pre_depends: optional("Pre-Depends").unwrap_or_default(),
        size: optional("Size")
            .and_then(|value| value.parse().ok())
            .unwrap_or(0),
        sha256: optional("SHA256").map(|value| value.to_ascii_lowercase()),
        essential: optional("Essential").is_some_and(|value| value.eq_ignore_ascii_case("yes")),
        priority: optional("Priority"),
        section: optional("Section"),
        description: optional("Description"),
        name,
        version,
        architecture,
        filename,
    })
}
