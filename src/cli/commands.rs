//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use itertools::Itertools;
use tracing::debug;

use crate::application::services::{ChapterService, DatasetRecord};
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings, LOCAL_CONFIG_FILE};
use crate::domain::{make_root_tree, LogicTree};
use crate::infrastructure::di::ServiceContainer;

/// Default record file name inside `output_dir`.
pub const DATASET_FILE: &str = "dataset.json";

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    debug!("execute_command: {:?}", cli.command);
    match &cli.command {
        Commands::Completion { shell } => {
            completion(*shell);
            Ok(())
        }
        Commands::Config { command } => config_command(cli, command),
        Commands::Skeleton { case, out } => skeleton(&container(cli)?, case, out.as_deref()),
        Commands::Build {
            case,
            out,
            use_model_validator,
            replay,
            paired,
        } => build(
            &container(cli)?,
            case,
            out.as_deref(),
            *use_model_validator,
            replay.as_deref(),
            *paired,
        ),
        Commands::Filter { tree, out_dir } => filter(&container(cli)?, tree, out_dir.as_deref()),
        Commands::Show { tree, facts } => show(&container(cli)?, tree, *facts),
    }
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let settings = Settings::load(cli.config.as_deref())?;
    Ok(ServiceContainer::new(settings)?)
}

fn completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no home directory; global config disabled"),
            }
            let local = cli
                .config
                .clone()
                .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));
            output::action("local", &local.display());
        }
    }
    Ok(())
}

fn skeleton(container: &ServiceContainer, case: &Path, out: Option<&Path>) -> CliResult<()> {
    let store = container.store();
    let cases = store.load_cases(case)?;
    let first = cases
        .first()
        .ok_or_else(|| CliError::InvalidArgs(format!("no case in {}", case.display())))?;

    let mut rng = container.rng();
    let tree = container
        .structure_builder()
        .build(&make_root_tree(first), &mut rng)
        .map_err(ApplicationError::from)?;

    match out {
        Some(path) => {
            store.write_json(&tree.export(), path)?;
            output::success(&format!("skeleton with {} nodes written to {}", tree.len(), path.display()));
        }
        None => print_tree(&tree),
    }
    Ok(())
}

fn build(
    container: &ServiceContainer,
    case: &Path,
    out: Option<&Path>,
    use_model_validator: bool,
    replay: Option<&Path>,
    paired: bool,
) -> CliResult<()> {
    let cases = container.store().load_cases(case)?;
    if cases.is_empty() {
        return Err(CliError::InvalidArgs(format!("no case in {}", case.display())));
    }

    let producer = container.producer(replay)?;
    let use_model_validator =
        use_model_validator || container.settings.expansion.use_model_validator;
    let service = container.dataset_service(producer, use_model_validator)?;

    let mut rng = container.rng();
    let records = if paired {
        service.run_paired(&cases, &mut rng)?
    } else {
        service.run_cases(&cases, &mut rng)?
    };

    let path = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| container.settings.output_dir.join(DATASET_FILE));
    service.write_records(&records, &path)?;

    for record in &records {
        report_record(record);
    }
    output::success(&format!("{} records written to {}", records.len(), path.display()));
    Ok(())
}

fn report_record(record: &DatasetRecord) {
    let report = &record.report;
    output::header(&record.case_info.taxpayer);
    output::detail(&format!(
        "{} -> {}",
        record.case_info.states(),
        record.case_info.final_decision
    ));
    output::detail(&format!(
        "{} requests, {} nodes filled, {} facts",
        report.requests,
        report.filled,
        record.facts.len()
    ));
    if !report.killed.is_empty() {
        output::failure(&format!(
            "killed: {}",
            report.killed.iter().map(|k| &k.node).join(" | ")
        ));
    }
    if !report.fill_errors.is_empty() {
        output::failure(&format!(
            "fill errors: {}",
            report.fill_errors.iter().map(|e| &e.message).join(" | ")
        ));
    }
    if !report.skipped.is_empty() {
        output::warning(&format!("skipped: {}", report.skipped.iter().join(" | ")));
    }
}

fn filter(container: &ServiceContainer, tree: &Path, out_dir: Option<&Path>) -> CliResult<()> {
    let store = container.store();
    let source = store.load_tree(tree)?;
    let mut rng = container.rng();
    let chapters = ChapterService::new().create_chapter_trees(&source, &mut rng);

    let dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| container.settings.output_dir.clone());
    let correct = dir.join("correct_tree.json");
    let incorrect = dir.join("incorrect_tree.json");
    store.write_json(&chapters.correct_tree.export(), &correct)?;
    store.write_json(&chapters.incorrect_tree.export(), &incorrect)?;

    output::success(&format!("correct tree: {}", correct.display()));
    output::success(&format!("incorrect tree: {}", incorrect.display()));
    Ok(())
}

fn show(container: &ServiceContainer, tree: &Path, facts: bool) -> CliResult<()> {
    let tree = container.store().load_tree(tree)?;
    print_tree(&tree);
    if facts {
        output::header("Facts");
        for (i, fact) in tree.facts(false).iter().enumerate() {
            output::detail(&format!("{}. {}", i + 1, fact));
        }
    }
    Ok(())
}

fn print_tree(tree: &LogicTree) {
    for display in tree.to_termtree() {
        output::info(&display);
    }
}
