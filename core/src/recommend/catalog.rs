//! API catalog: the read-only list of operations a recommendation can choose from.
//!
//! Loaded once at startup from a markdown document:
//!
//! ```text
//! ### Req Issue
//! **Path:** /v1/issue
//! **Method:** POST
//! **Description:** Issue a tokenized asset
//! **Fields:**
//! - name: id type: string description: Asset identifier
//! - name: value  type: string  description: Face value
//! ```
//!
//! or from a JSON array of entries (`.json` extension).

use crate::{AssistError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^###\s*(.+)").expect("static regex"));
static PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*Path:\*\*\s*(.+)").expect("static regex"));
static METHOD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*Method:\*\*\s*(.+)").expect("static regex"));
static DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*Description:\*\*\s*(.+)").expect("static regex"));
static INLINE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-\s*name:\s*(\S+)\s*type:\s*(\S+)\s*description:\s*(.+)").expect("static regex")
});
static SPLIT_PARTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("static regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub description: String,
}

impl ApiField {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCatalogEntry {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<ApiField>,
}

impl ApiCatalogEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: ApiField) -> Self {
        self.fields.push(field);
        self
    }
}

/// Ordered, immutable catalog. Indices are only meaningful within one recommendation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<ApiCatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<ApiCatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load from a markdown document, or a JSON array when the extension is `.json`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AssistError::Catalog(format!("read {}: {e}", path.display())))?;
        let catalog = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Self::from_json(&text)?
        } else {
            Self::from_markdown(&text)
        };
        info!(target = "catalog", path = %path.display(), entries = catalog.len(), "API catalog loaded");
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let entries: Vec<ApiCatalogEntry> = serde_json::from_str(text)
            .map_err(|e| AssistError::Catalog(format!("invalid JSON catalog: {e}")))?;
        Ok(Self::new(entries))
    }

    pub fn from_markdown(text: &str) -> Self {
        let mut entries = Vec::new();
        let mut current: Option<ApiCatalogEntry> = None;
        let mut in_fields = false;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("---") {
                continue;
            }

            if let Some(c) = HEADER.captures(line) {
                entries.extend(current.take());
                current = Some(ApiCatalogEntry::new(c[1].trim(), ""));
                in_fields = false;
                continue;
            }
            let Some(entry) = current.as_mut() else {
                continue;
            };

            if let Some(c) = PATH.captures(line) {
                entry.path = c[1].trim().to_string();
            } else if let Some(c) = METHOD.captures(line) {
                entry.method = c[1].trim().to_string();
            } else if let Some(c) = DESCRIPTION.captures(line) {
                entry.description = c[1].trim().to_string();
            } else if line.starts_with("**Fields:**") {
                in_fields = true;
            } else if in_fields && line.starts_with('-') {
                if let Some(field) = parse_field(line) {
                    entry.fields.push(field);
                }
            }
        }
        entries.extend(current);
        debug!(target = "catalog", entries = entries.len(), "parsed markdown catalog");
        Self::new(entries)
    }

    pub fn entries(&self) -> &[ApiCatalogEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ApiCatalogEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_field(line: &str) -> Option<ApiField> {
    if let Some(c) = INLINE_FIELD.captures(line) {
        return Some(ApiField::new(&c[1], &c[2], c[3].trim()));
    }

    // parts separated by two or more spaces
    let mut field = ApiField::default();
    for part in SPLIT_PARTS.split(line.trim_start_matches('-')) {
        let part = part.trim();
        if let Some(v) = part.strip_prefix("name:") {
            field.name = v.trim().to_string();
        } else if let Some(v) = part.strip_prefix("type:") {
            field.field_type = v.trim().to_string();
        } else if let Some(v) = part.strip_prefix("description:") {
            field.description = v.trim().to_string();
        }
    }
    (!field.name.is_empty()).then_some(field)
}
