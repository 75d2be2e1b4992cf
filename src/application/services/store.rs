//! JSON files for cases, trees and dataset records

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::application::error_ext::{IoResultExt, JsonResultExt};
use crate::application::ApplicationResult;
use crate::domain::{CaseInfo, DomainError, LogicTree, TreeExport};
use crate::infrastructure::traits::FileSystem;

/// A case file holds either one case or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CaseFile {
    Many(Vec<CaseInfo>),
    One(Box<CaseInfo>),
}

#[derive(Clone)]
pub struct JsonStore {
    fs: Arc<dyn FileSystem>,
}

impl JsonStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn load_cases(&self, path: &Path) -> ApplicationResult<Vec<CaseInfo>> {
        let cases = match self.read_json::<CaseFile>(path)? {
            CaseFile::Many(cases) => cases,
            CaseFile::One(case) => vec![*case],
        };
        debug!("load_cases: {} cases from {}", cases.len(), path.display());
        Ok(cases)
    }

    pub fn load_tree(&self, path: &Path) -> ApplicationResult<LogicTree> {
        let export: TreeExport = self.read_json(path)?;
        if export.nodes.is_empty() {
            return Err(DomainError::InvalidTree(format!("{}: no root nodes", path.display())).into());
        }
        Ok(LogicTree::import(&export))
    }

    /// Pretty JSON, creating parent directories as needed.
    pub fn write_json<T: Serialize + ?Sized>(&self, value: &T, path: &Path) -> ApplicationResult<()> {
        let content = serde_json::to_string_pretty(value)
            .with_json_context(format!("serialize {}", path.display()))?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create parent directory", path)?;
        self.fs
            .write(path, &content)
            .with_path_context("write", path)?;
        info!("wrote {}", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> ApplicationResult<T> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read", path)?;
        serde_json::from_str(&content).with_json_context(format!("parse {}", path.display()))
    }
}
