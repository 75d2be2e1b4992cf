//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::services::{DatasetService, ExpansionService, JsonStore};
use crate::application::validators::SemanticValidator;
use crate::application::{ApplicationError, GuidelineTable};
use crate::config::Settings;
use crate::domain::StructureBuilder;
use crate::infrastructure::traits::{
    CommandJudge, CommandProducer, CommandRunner, ContentProducer, FileSystem, RealCommandRunner,
    RealFileSystem, ScriptedProducer, SemanticJudge,
};
use crate::infrastructure::{InfraError, InfraResult};

/// Container holding settings, I/O boundaries and the guideline table.
///
/// Producers and services are built on demand since they depend on
/// per-command flags.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Built-in guidelines with `guidelines_file` entries applied
    pub guidelines: Arc<GuidelineTable>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(RealCommandRunner))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        cmd: Arc<dyn CommandRunner>,
    ) -> InfraResult<Self> {
        let mut guidelines = GuidelineTable::builtin()?;
        if let Some(path) = &settings.guidelines_file {
            debug!("with_deps: guideline overrides from {}", path.display());
            let content = fs
                .read_to_string(path)
                .map_err(|e| InfraError::io(format!("read guidelines {}", path.display()), e))?;
            guidelines = guidelines.merge(GuidelineTable::from_toml(&content)?);
        }

        Ok(Self {
            settings: Arc::new(settings),
            fs,
            cmd,
            guidelines: Arc::new(guidelines),
        })
    }

    /// Replay script when given, otherwise the configured producer command.
    pub fn producer(&self, replay: Option<&Path>) -> InfraResult<Arc<dyn ContentProducer>> {
        if let Some(path) = replay {
            debug!("producer: replaying {}", path.display());
            let script = self
                .fs
                .read_to_string(path)
                .map_err(|e| InfraError::io(format!("read replay script {}", path.display()), e))?;
            return Ok(Arc::new(ScriptedProducer::from_script(&script)?));
        }
        let config = &self.settings.producer;
        let command = config.command.as_deref().ok_or_else(|| ApplicationError::Config {
            message: "no producer command configured (set [producer] command or pass --replay)"
                .to_string(),
        })?;
        Ok(Arc::new(CommandProducer::new(
            self.cmd.clone(),
            command,
            config.args.clone(),
            config.transport_attempts,
        )))
    }

    /// Semantic validator from the `[judge]` section, `None` when disabled.
    pub fn semantic_validator(&self, enabled: bool) -> InfraResult<Option<SemanticValidator>> {
        if !enabled {
            return Ok(None);
        }
        let judge = &self.settings.judge;
        let attempts = self.settings.producer.transport_attempts;
        let command = judge.command.as_deref().ok_or_else(|| ApplicationError::Config {
            message: "model validator enabled but no [judge] command configured".to_string(),
        })?;
        let primary: Arc<dyn SemanticJudge> = Arc::new(CommandJudge::new(
            self.cmd.clone(),
            command,
            judge.args.clone(),
            attempts,
        ));
        let early_escape = judge.early_escape_command.as_deref().map(|cmd| {
            Arc::new(CommandJudge::new(
                self.cmd.clone(),
                cmd,
                judge.early_escape_args.clone(),
                attempts,
            )) as Arc<dyn SemanticJudge>
        });
        Ok(Some(SemanticValidator::new(primary, early_escape)))
    }

    pub fn store(&self) -> JsonStore {
        JsonStore::new(self.fs.clone())
    }

    pub fn structure_builder(&self) -> StructureBuilder {
        let structure = &self.settings.structure;
        StructureBuilder::new(structure.depth, structure.branching_policy(), structure.prune)
    }

    pub fn expansion_service(
        &self,
        producer: Arc<dyn ContentProducer>,
        semantic: Option<SemanticValidator>,
    ) -> ExpansionService {
        let expansion = &self.settings.expansion;
        ExpansionService::new(producer, self.guidelines.clone())
            .with_semantic(semantic)
            .with_max_retries(expansion.max_retries)
            .with_max_depth(expansion.max_depth)
    }

    /// Dataset service wired with the producer and optional judge.
    pub fn dataset_service(
        &self,
        producer: Arc<dyn ContentProducer>,
        use_model_validator: bool,
    ) -> InfraResult<DatasetService> {
        let semantic = self.semantic_validator(use_model_validator)?;
        Ok(DatasetService::new(
            self.store(),
            self.structure_builder(),
            self.expansion_service(producer, semantic),
        ))
    }

    /// Seeded from `settings.seed` when set.
    pub fn rng(&self) -> StdRng {
        match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
