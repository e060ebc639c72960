//! One complete editing run: load, edit, validate, save, record.

use std::path::{Path, PathBuf};

use ddlgraph_changelog::{follow_history, ChangeLog, ChangeLogStore, FileChangeLogStore};
use ddlgraph_core::config::DdlConfig;
use ddlgraph_rdf::{DataGraph, KnowledgeGraph, Ontology, Shapes};

use crate::edit::Edit;
use crate::error::Result;
use crate::manipulator::Manipulator;

/// Inputs of a run, usually merged from config and command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub graph_path: PathBuf,
    /// Defaults to overwriting `graph_path`.
    pub output_path: Option<PathBuf>,
    pub base_uri: String,
    pub edits: Vec<Edit>,
    pub intent: String,
    pub validate: bool,
    /// Bundled ddl shapes when unset.
    pub shapes_path: Option<PathBuf>,
    pub changelog_dir: PathBuf,
}

impl RunOptions {
    pub fn from_config(config: &DdlConfig, graph_path: PathBuf) -> Self {
        Self {
            graph_path,
            output_path: config.output_path.as_ref().map(PathBuf::from),
            base_uri: config.base_uri.clone(),
            edits: Vec::new(),
            intent: String::new(),
            validate: config.validate,
            shapes_path: config.shapes_path.as_ref().map(PathBuf::from),
            changelog_dir: PathBuf::from(&config.changelog_dir),
        }
    }
}

/// Apply every edit in order and persist the result.
///
/// Nothing is written unless every edit succeeds and, when requested, the
/// edited graph conforms to its shapes.
pub fn run(options: &RunOptions) -> Result<ChangeLog> {
    let graph = KnowledgeGraph::from_path(&options.graph_path, &options.base_uri)?;
    let mut manipulator = Manipulator::new(graph);

    for edit in &options.edits {
        let recorded = manipulator.apply(edit)?;
        tracing::info!(%edit, changes = recorded, "Applied edit");
    }

    let (graph, log) = manipulator.finish(&options.intent);
    let knowledge = KnowledgeGraph::new(options.base_uri.clone(), graph)?;

    if options.validate {
        validate(&knowledge, options)?;
    }
    let output = options.output_path.as_ref().unwrap_or(&options.graph_path);
    knowledge.save(output)?;

    let store = FileChangeLogStore::new(&options.changelog_dir)?;
    let stored = store.save(&log)?;

    tracing::info!(
        changelog_id = %log.id,
        path = %stored.display(),
        edits = options.edits.len(),
        changes = log.changes.len(),
        "Run complete"
    );
    Ok(log)
}

fn validate(graph: &KnowledgeGraph, options: &RunOptions) -> Result<()> {
    Ontology::ddl()?.check_vocabulary()?;
    let shapes = match &options.shapes_path {
        Some(path) => Shapes::from_path(path)?,
        None => Shapes::ddl()?,
    };
    DataGraph::new(graph.clone()).validate(&shapes)?;
    Ok(())
}

/// Every change log recorded for the graph at `base_uri`, oldest first.
pub fn history(changelog_dir: &Path, base_uri: &str) -> Result<Vec<ChangeLog>> {
    if !changelog_dir.is_dir() {
        return Ok(Vec::new());
    }
    Ok(FileChangeLogStore::new(changelog_dir)?.history(base_uri)?)
}

/// The IRI `uri` has now, after every recorded edit of its graph.
pub fn follow(changelog_dir: &Path, base_uri: &str, uri: &str) -> Result<String> {
    let logs = history(changelog_dir, base_uri)?;
    Ok(follow_history(&logs, uri))
}
