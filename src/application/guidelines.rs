//! Guideline and worked-example text per `(element, level)`.
//!
//! The table is an explicit value handed to the expander; the built-in
//! entries ship as an embedded TOML asset and can be replaced per entry from
//! a user file.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ExpansionLevel, LegalElement};

const BUILTIN_GUIDELINES: &str = include_str!("../../assets/guidelines.toml");

/// Worked example shown to the producer alongside the guideline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineExample {
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub example_tree: Vec<String>,
    #[serde(default)]
    pub example_node_completion: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guideline {
    pub guideline: String,
    #[serde(default)]
    pub example: GuidelineExample,
}

impl Guideline {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            guideline: text.into(),
            example: GuidelineExample::default(),
        }
    }
}

/// On-disk shape: `[<element>.<level>]` tables.
type RawTable = BTreeMap<String, BTreeMap<String, Guideline>>;

#[derive(Debug, Clone, Default)]
pub struct GuidelineTable {
    entries: HashMap<(LegalElement, ExpansionLevel), Guideline>,
}

impl GuidelineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six entries compiled into the binary.
    pub fn builtin() -> ApplicationResult<Self> {
        Self::from_toml(BUILTIN_GUIDELINES)
    }

    pub fn from_toml(content: &str) -> ApplicationResult<Self> {
        let raw: RawTable = toml::from_str(content).map_err(|e| ApplicationError::Config {
            message: format!("invalid guideline table: {e}"),
        })?;
        let mut table = Self::new();
        for (element_key, levels) in raw {
            let element = parse_element(&element_key)?;
            for (level_key, guideline) in levels {
                let level = parse_level(&level_key)?;
                table.insert(element, level, guideline);
            }
        }
        debug!("from_toml: loaded {} guideline entries", table.len());
        Ok(table)
    }

    pub fn with(mut self, element: LegalElement, level: ExpansionLevel, guideline: Guideline) -> Self {
        self.insert(element, level, guideline);
        self
    }

    pub fn insert(&mut self, element: LegalElement, level: ExpansionLevel, guideline: Guideline) {
        self.entries.insert((element, level), guideline);
    }

    /// Entries of `other` replace entries of `self` with the same key.
    pub fn merge(mut self, other: GuidelineTable) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, element: LegalElement, level: ExpansionLevel) -> Option<&Guideline> {
        self.entries.get(&(element, level))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_element(key: &str) -> ApplicationResult<LegalElement> {
    LegalElement::ALL
        .into_iter()
        .find(|e| e.key() == key)
        .ok_or_else(|| ApplicationError::Config {
            message: format!("unknown legal element in guideline table: {key}"),
        })
}

fn parse_level(key: &str) -> ApplicationResult<ExpansionLevel> {
    [ExpansionLevel::L1L2, ExpansionLevel::L2L3]
        .into_iter()
        .find(|l| l.key() == key)
        .ok_or_else(|| ApplicationError::Config {
            message: format!("unknown expansion level in guideline table: {key}"),
        })
}
