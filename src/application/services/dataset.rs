//! End-to-end dataset records: skeleton, expansion, chapter filtering

use std::path::Path;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::application::services::{ChapterService, ExpansionReport, ExpansionService, JsonStore};
use crate::application::ApplicationResult;
use crate::domain::{make_root_tree, CaseInfo, LogicTree, StructureBuilder, TreeExport};

/// One generated case: the expanded tree and everything derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRecord {
    pub case_info: CaseInfo,
    pub tree: TreeExport,
    pub correct_tree: TreeExport,
    pub incorrect_tree: TreeExport,
    /// Explicit leaf facts for the narrative writer
    pub facts: Vec<String>,
    pub report: ExpansionReport,
}

pub struct DatasetService {
    store: JsonStore,
    builder: StructureBuilder,
    expander: ExpansionService,
    chapters: ChapterService,
}

impl DatasetService {
    pub fn new(store: JsonStore, builder: StructureBuilder, expander: ExpansionService) -> Self {
        Self {
            store,
            builder,
            expander,
            chapters: ChapterService::new(),
        }
    }

    /// Root conclusion and level-1 claims with empty slots below.
    pub fn skeleton<R: Rng + ?Sized>(&self, case: &CaseInfo, rng: &mut R) -> ApplicationResult<LogicTree> {
        debug!("skeleton: taxpayer={}", case.taxpayer);
        let roots = make_root_tree(case);
        Ok(self.builder.build(&roots, rng)?)
    }

    pub fn run_case<R: Rng + ?Sized>(&self, case: &CaseInfo, rng: &mut R) -> ApplicationResult<DatasetRecord> {
        debug!("run_case: taxpayer={}", case.taxpayer);
        let mut tree = self.skeleton(case, rng)?;
        let report = self.expander.expand(&mut tree, &case.description())?;
        if !report.is_clean() {
            warn!(
                "case {}: {} killed branches, {} fill errors, {} skipped nodes",
                case.taxpayer,
                report.killed.len(),
                report.fill_errors.len(),
                report.skipped.len()
            );
        }
        let chapters = self.chapters.create_chapter_trees(&tree, rng);
        info!("case {} expanded with {} requests", case.taxpayer, report.requests);

        Ok(DatasetRecord {
            case_info: case.clone(),
            facts: chapters.correct_tree.facts(false),
            tree: tree.export(),
            correct_tree: chapters.correct_tree.export(),
            incorrect_tree: chapters.incorrect_tree.export(),
            report,
        })
    }

    /// Cases run one after another; the first transport failure aborts the batch.
    pub fn run_cases<R: Rng + ?Sized>(
        &self,
        cases: &[CaseInfo],
        rng: &mut R,
    ) -> ApplicationResult<Vec<DatasetRecord>> {
        debug!("run_cases: count={}", cases.len());
        cases
            .iter()
            .map(|case| self.run_case(case, &mut *rng))
            .collect()
    }

    /// Each case becomes an accept-with-conditions and a fully-reject variant,
    /// both built and expanded in full.
    pub fn run_paired<R: Rng + ?Sized>(
        &self,
        cases: &[CaseInfo],
        rng: &mut R,
    ) -> ApplicationResult<Vec<DatasetRecord>> {
        debug!("run_paired: count={}", cases.len());
        let mut records = Vec::with_capacity(cases.len() * 2);
        for case in cases {
            for variant in case.contrasting_pair(&mut *rng) {
                info!("case {} variant: {} -> {}", variant.taxpayer, variant.states(), variant.final_decision);
                records.push(self.run_case(&variant, &mut *rng)?);
            }
        }
        Ok(records)
    }

    /// Write records as one pretty JSON array.
    pub fn write_records(&self, records: &[DatasetRecord], path: &Path) -> ApplicationResult<()> {
        self.store.write_json(records, path)
    }
}
