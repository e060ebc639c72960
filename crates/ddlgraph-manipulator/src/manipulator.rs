//! Identity-preserving edits of a persisted schema graph.
//!
//! Moving or renaming a structure changes its IRI and the IRI of everything
//! below it. The manipulator re-points every triple mentioning an affected
//! IRI and records one [`Change`] per affected entity, so consumers holding
//! old IRIs can follow them.
//!
//! Every check and the full rewrite are computed before the graph is
//! touched: a rejected edit leaves the graph exactly as it was.

use std::collections::HashMap;

use ddlgraph_changelog::{Change, ChangeLog, ChangeSession};
use ddlgraph_core::{Database, Identity, NodeIndex, StructureRef};
use ddlgraph_rdf::vocab::ddl;
use ddlgraph_rdf::{construct, KnowledgeGraph};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{
    Graph, Literal, NamedNode, NamedNodeRef, Subject, SubjectRef, Term, TermRef, Triple,
    TripleRef,
};

use crate::error::{ManipulatorError, Result};

/// Applies MOVE and RENAME edits to a schema graph.
#[derive(Debug, Clone)]
pub struct Manipulator {
    base_uri: String,
    graph: Graph,
    changes: Vec<Change>,
}

/// Everything one edit will do to the graph.
struct Plan {
    /// The edit itself first, then one MOVE per descendant.
    changes: Vec<Change>,
    node: NamedNode,
    parent_edge: Option<(NamedNode, NamedNode)>,
    new_name: Option<String>,
}

impl Manipulator {
    pub fn new(graph: KnowledgeGraph) -> Self {
        Self {
            base_uri: graph.base_uri().to_string(),
            graph: graph.into_graph(),
            changes: Vec::new(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// The graph with every edit so far applied.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Changes recorded so far, in application order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn change_strings(&self) -> Vec<String> {
        self.changes.iter().map(ToString::to_string).collect()
    }

    /// Rebuild the tree the current graph describes.
    pub fn snapshot(&self) -> Result<Database> {
        Ok(construct(&self.graph)?)
    }

    /// Re-parent `old` to where `new` sits.
    ///
    /// `old` must come from a tree whose identities match the graph and
    /// `new` from the edited tree. Does nothing when both resolve to the
    /// same IRI.
    pub fn move_structure(&mut self, old: StructureRef<'_>, new: StructureRef<'_>) -> Result<()> {
        let from = old.uri()?;
        let to = new.uri()?;
        if from == to {
            tracing::debug!(uri = %from, "Move leaves identity unchanged");
            return Ok(());
        }
        if old.is_root() {
            return Err(ManipulatorError::RootMutation { uri: from });
        }
        self.require_subject(&from)?;
        if old.name() != new.name() {
            return Err(ManipulatorError::IntentConflict {
                from,
                to,
                old_name: old.name().to_string(),
                new_name: new.name().to_string(),
            });
        }

        let new_parent = new
            .parent()
            .ok_or_else(|| ManipulatorError::UnknownParent { uri: to.clone() })?
            .uri()?;
        if !self.is_subject(&new_parent) {
            return Err(ManipulatorError::UnknownParent { uri: to });
        }
        let parent_edge = match old.parent() {
            Some(old_parent) => Some((iri(old_parent.uri()?)?, iri(new_parent)?)),
            None => None,
        };

        let mut changes = vec![Change::Move {
            from,
            to: to.clone(),
        }];
        cascade(old, new.identity(), new.database().base_uri(), &mut changes)?;

        self.apply_plan(Plan {
            changes,
            node: iri(to)?,
            parent_edge,
            new_name: None,
        })
    }

    /// Give `old` the name `new` has, under the same parent.
    ///
    /// Does nothing when both resolve to the same IRI.
    pub fn rename(&mut self, old: StructureRef<'_>, new: StructureRef<'_>) -> Result<()> {
        let from = old.uri()?;
        let to = new.uri()?;
        if from == to {
            tracing::debug!(uri = %from, "Rename leaves identity unchanged");
            return Ok(());
        }
        if old.is_root() {
            return Err(ManipulatorError::RootMutation { uri: from });
        }
        self.require_subject(&from)?;
        if old.parent().map(|p| p.id().clone()) != new.parent().map(|p| p.id().clone()) {
            return Err(ManipulatorError::ParentMismatch { from, to });
        }

        let mut changes = vec![Change::Rename {
            from,
            to: to.clone(),
        }];
        cascade(old, new.identity(), new.database().base_uri(), &mut changes)?;

        self.apply_plan(Plan {
            changes,
            node: iri(to)?,
            parent_edge: None,
            new_name: Some(new.name().to_string()),
        })
    }

    /// Seal the recorded changes into a finalized change log.
    pub fn finish(self, intent: &str) -> (Graph, ChangeLog) {
        let mut session = ChangeSession::new(&self.base_uri, intent);
        session.extend(self.changes);
        let log = session.finalize();
        tracing::debug!(changelog_id = %log.id, changes = log.changes.len(), "Finished editing");
        (self.graph, log)
    }

    fn is_subject(&self, uri: &str) -> bool {
        NamedNodeRef::new(uri).is_ok_and(|node| {
            self.graph
                .objects_for_subject_predicate(node, rdf::TYPE)
                .next()
                .is_some()
        })
    }

    fn require_subject(&self, uri: &str) -> Result<()> {
        if self.is_subject(uri) {
            Ok(())
        } else {
            Err(ManipulatorError::UnknownTarget {
                uri: uri.to_string(),
            })
        }
    }

    fn apply_plan(&mut self, plan: Plan) -> Result<()> {
        let mut renamed: HashMap<String, NamedNode> = HashMap::new();
        for change in &plan.changes {
            if self.is_subject(change.new_uri()) && !plan_moves_away(&plan, change.new_uri()) {
                return Err(ManipulatorError::TargetExists {
                    uri: change.new_uri().to_string(),
                });
            }
            renamed.insert(change.old_uri().to_string(), iri(change.new_uri().to_string())?);
        }

        // Nothing below can fail.
        let affected: Vec<Triple> = self
            .graph
            .iter()
            .filter(|t| mentions(*t, &renamed))
            .map(|t| t.into_owned())
            .collect();
        for triple in &affected {
            self.graph.remove(triple);
        }
        for triple in affected {
            self.graph.insert(&repoint(triple, &renamed));
        }

        if let Some((old_parent, new_parent)) = &plan.parent_edge {
            self.graph
                .remove(TripleRef::new(old_parent, ddl::HAS_STRUCTURE, &plan.node));
            self.graph
                .insert(TripleRef::new(new_parent, ddl::HAS_STRUCTURE, &plan.node));
        }

        if let Some(name) = &plan.new_name {
            let stale: Vec<Term> = self
                .graph
                .objects_for_subject_predicate(&plan.node, ddl::HAS_NAME)
                .map(TermRef::into_owned)
                .collect();
            for old_name in &stale {
                self.graph
                    .remove(TripleRef::new(&plan.node, ddl::HAS_NAME, old_name));
            }
            let literal = Literal::new_simple_literal(name);
            self.graph
                .insert(TripleRef::new(&plan.node, ddl::HAS_NAME, &literal));
        }

        tracing::debug!(
            change = %plan.changes[0],
            cascaded = plan.changes.len() - 1,
            rewritten = renamed.len(),
            "Applied edit"
        );
        self.changes.extend(plan.changes);
        Ok(())
    }
}

/// Append one MOVE per descendant of `old`, in document order, computing
/// each new identity from `new_identity` down.
fn cascade(
    old: StructureRef<'_>,
    new_identity: &Identity,
    base_uri: Option<&str>,
    changes: &mut Vec<Change>,
) -> Result<()> {
    let mut identities: HashMap<NodeIndex, Identity> = HashMap::new();
    identities.insert(old.index(), new_identity.clone());

    for descendant in old.descendants() {
        let parent = descendant
            .parent()
            .and_then(|p| identities.get(&p.index()))
            .ok_or_else(|| ManipulatorError::UnknownParent {
                uri: descendant.hashed_from().to_string(),
            })?;
        let identity = parent.child(descendant.name());
        changes.push(Change::Move {
            from: descendant.uri()?,
            to: identity.uri(base_uri)?,
        });
        identities.insert(descendant.index(), identity);
    }
    Ok(())
}

fn plan_moves_away(plan: &Plan, uri: &str) -> bool {
    plan.changes.iter().any(|c| c.old_uri() == uri)
}

fn iri(uri: String) -> Result<NamedNode> {
    NamedNode::new(uri.clone()).map_err(|e| ManipulatorError::InvalidIri {
        iri: uri,
        reason: e.to_string(),
    })
}

fn mentions(triple: TripleRef<'_>, renamed: &HashMap<String, NamedNode>) -> bool {
    let subject = matches!(triple.subject, SubjectRef::NamedNode(n) if renamed.contains_key(n.as_str()));
    let object = matches!(triple.object, TermRef::NamedNode(n) if renamed.contains_key(n.as_str()));
    subject || object
}

fn repoint(triple: Triple, renamed: &HashMap<String, NamedNode>) -> Triple {
    let subject = match triple.subject {
        Subject::NamedNode(n) => Subject::NamedNode(renamed.get(n.as_str()).cloned().unwrap_or(n)),
        other => other,
    };
    let object = match triple.object {
        Term::NamedNode(n) => Term::NamedNode(renamed.get(n.as_str()).cloned().unwrap_or(n)),
        other => other,
    };
    Triple::new(subject, triple.predicate, object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddlgraph_core::ColumnData;
    use ddlgraph_rdf::to_graph;

    const BASE: &str = "http://test.com/";

    /// Sqlite { main { Users(id, name), Orders(id, user_id -> Users.id) }, archive {} }
    fn sample() -> Database {
        let mut db = Database::new("Sqlite");
        db.update_base_uri(BASE);
        let main = db.create_schema("main");
        let archive = db.create_schema("archive");
        db.add_structure(NodeIndex::ROOT, main);
        db.add_structure(NodeIndex::ROOT, archive);

        let users = db.create_table("Users");
        let users_id = db.create_column_with(
            "id",
            ColumnData {
                data_type: "INTEGER".into(),
                is_not_null: true,
                options: String::new(),
            },
        );
        let users_name = db.create_column("name");
        db.add_structure(main, users);
        db.add_structure(users, users_id);
        db.add_structure(users, users_name);
        db.add_primary_key(users, users_id);

        let orders = db.create_table("Orders");
        let orders_id = db.create_column("id");
        let user_id = db.create_column("user_id");
        db.add_structure(main, orders);
        db.add_structure(orders, orders_id);
        db.add_structure(orders, user_id);
        db.add_foreign_key(orders, user_id, users_id, None, None)
            .unwrap();
        db
    }

    fn manipulator(db: &Database) -> Manipulator {
        Manipulator::new(KnowledgeGraph::new(BASE, to_graph(db).unwrap()).unwrap())
    }

    fn lines(graph: &Graph) -> Vec<String> {
        let mut v: Vec<String> = graph.iter().map(|t| t.to_string()).collect();
        v.sort();
        v
    }

    fn node(uri: String) -> NamedNode {
        NamedNode::new(uri).unwrap()
    }

    fn path(db: &Database, path: &[&str]) -> NodeIndex {
        db.find_path(path).unwrap()
    }

    #[test]
    fn test_move_table_cascades_to_columns() {
        let mut m = manipulator(&sample());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let users = path(&edited, &["main", "Users"]);
        let archive = path(&edited, &["archive"]);
        assert!(edited.add_structure(archive, users));

        m.move_structure(old.structure(users), edited.structure(users))
            .unwrap();

        let old_users = old.structure(users).uri().unwrap();
        let new_users = edited.structure(users).uri().unwrap();
        assert_eq!(m.changes().len(), 3);
        assert_eq!(m.change_strings()[0], format!("MOVE({old_users},{new_users})"));
        assert!(m.changes().iter().all(|c| matches!(c, Change::Move { .. })));

        let main_iri = node(old.structure(path(&old, &["main"])).uri().unwrap());
        let archive_iri = node(old.structure(archive).uri().unwrap());
        let new_users_iri = node(new_users);
        let graph = m.graph();
        assert!(!graph.contains(TripleRef::new(&main_iri, ddl::HAS_STRUCTURE, &new_users_iri)));
        assert!(graph.contains(TripleRef::new(&archive_iri, ddl::HAS_STRUCTURE, &new_users_iri)));
        assert!(!lines(graph).iter().any(|l| l.contains(&old_users)));

        let rebuilt = m.snapshot().unwrap();
        assert!(rebuilt.find_path(&["archive", "Users", "id"]).is_some());
        assert!(rebuilt.find_path(&["main", "Users"]).is_none());
    }

    #[test]
    fn test_move_repoints_foreign_key_columns() {
        let mut m = manipulator(&sample());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let users = path(&edited, &["main", "Users"]);
        edited.add_structure(path(&edited, &["archive"]), users);

        m.move_structure(old.structure(users), edited.structure(users))
            .unwrap();

        let rebuilt = m.snapshot().unwrap();
        let orders = rebuilt
            .as_table(path(&rebuilt, &["main", "Orders"]))
            .unwrap();
        let fk = &rebuilt.table(orders).foreign_keys()[0];
        let target = rebuilt.structure(fk.to());
        assert_eq!(target.parent().unwrap().name(), "Users");
        assert_eq!(target.parent().unwrap().parent().unwrap().name(), "archive");
    }

    #[test]
    fn test_rename_schema_cascades_to_subtree() {
        let mut m = manipulator(&sample());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let main = path(&edited, &["main"]);
        edited.update_name(main, "core");

        m.rename(old.structure(main), edited.structure(main)).unwrap();

        // RENAME of the schema, then MOVE for 2 tables and 4 columns.
        assert_eq!(m.changes().len(), 7);
        assert!(matches!(m.changes()[0], Change::Rename { .. }));
        assert!(m.changes()[1..].iter().all(|c| matches!(c, Change::Move { .. })));

        let core = node(edited.structure(main).uri().unwrap());
        let name = Literal::new_simple_literal("core");
        assert!(m.graph().contains(TripleRef::new(&core, ddl::HAS_NAME, &name)));
        assert_eq!(
            m.graph()
                .objects_for_subject_predicate(&core, ddl::HAS_NAME)
                .count(),
            1
        );

        let rebuilt = m.snapshot().unwrap();
        assert!(rebuilt.find_path(&["core", "Orders", "user_id"]).is_some());
    }

    #[test]
    fn test_changes_follow_document_order() {
        let mut m = manipulator(&sample());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let main = path(&edited, &["main"]);
        edited.update_name(main, "core");
        m.rename(old.structure(main), edited.structure(main)).unwrap();

        let expected: Vec<String> = old
            .structure(main)
            .descendants()
            .iter()
            .map(|d| d.uri().unwrap())
            .collect();
        let froms: Vec<&str> = m.changes()[1..].iter().map(|c| c.old_uri()).collect();
        assert_eq!(froms, expected);
    }

    #[test]
    fn test_same_identity_is_noop() {
        let mut m = manipulator(&sample());
        let before = lines(m.graph());
        let old = m.snapshot().unwrap();
        let users = path(&old, &["main", "Users"]);

        m.move_structure(old.structure(users), old.structure(users))
            .unwrap();
        m.rename(old.structure(users), old.structure(users)).unwrap();
        m.move_structure(old.root(), old.root()).unwrap();

        assert!(m.changes().is_empty());
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_root_cannot_be_renamed() {
        let mut m = manipulator(&sample());
        let before = lines(m.graph());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        edited.update_name(NodeIndex::ROOT, "Postgres");

        let err = m.rename(old.root(), edited.root()).unwrap_err();
        assert!(matches!(err, ManipulatorError::RootMutation { .. }));
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut m = manipulator(&sample());
        let before = lines(m.graph());
        let mut old = m.snapshot().unwrap();
        let ghost = old.create_table("Ghost");
        old.add_structure(path(&old, &["main"]), ghost);
        let mut edited = old.clone();
        edited.add_structure(path(&edited, &["archive"]), ghost);

        let err = m
            .move_structure(old.structure(ghost), edited.structure(ghost))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::UnknownTarget { .. }));
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_move_that_renames_is_intent_conflict() {
        let mut m = manipulator(&sample());
        let before = lines(m.graph());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let users = path(&edited, &["main", "Users"]);
        edited.add_structure(path(&edited, &["archive"]), users);
        edited.update_name(users, "People");

        let err = m
            .move_structure(old.structure(users), edited.structure(users))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::IntentConflict { .. }));
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_move_under_unknown_parent_rejected() {
        let mut m = manipulator(&sample());
        let before = lines(m.graph());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let staging = edited.create_schema("staging");
        edited.add_structure(NodeIndex::ROOT, staging);
        let users = path(&edited, &["main", "Users"]);
        edited.add_structure(staging, users);

        let err = m
            .move_structure(old.structure(users), edited.structure(users))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::UnknownParent { .. }));
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_move_of_detached_node_rejected() {
        let mut m = manipulator(&sample());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let users = path(&edited, &["main", "Users"]);
        edited.detach(users);

        let err = m
            .move_structure(old.structure(users), edited.structure(users))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::UnknownParent { .. }));
    }

    #[test]
    fn test_rename_that_moves_is_parent_mismatch() {
        let mut m = manipulator(&sample());
        let before = lines(m.graph());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let users = path(&edited, &["main", "Users"]);
        edited.add_structure(path(&edited, &["archive"]), users);
        edited.update_name(users, "People");

        let err = m
            .rename(old.structure(users), edited.structure(users))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::ParentMismatch { .. }));
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_move_onto_existing_structure_rejected() {
        let mut db = sample();
        let archive = db.as_schema(path(&db, &["archive"])).unwrap();
        let archived_users = db.create_table("Users");
        db.add_structure(archive, archived_users);

        let mut m = manipulator(&db);
        let before = lines(m.graph());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        edited.detach(path(&edited, &["archive", "Users"]));
        let users = path(&edited, &["main", "Users"]);
        assert!(edited.add_structure(path(&edited, &["archive"]), users));

        let err = m
            .move_structure(old.structure(users), edited.structure(users))
            .unwrap_err();
        assert!(matches!(err, ManipulatorError::TargetExists { .. }));
        assert_eq!(lines(m.graph()), before);
    }

    #[test]
    fn test_finish_seals_changelog() {
        let mut m = manipulator(&sample());
        let old = m.snapshot().unwrap();
        let mut edited = old.clone();
        let users = path(&edited, &["main", "Users"]);
        edited.update_name(users, "People");
        m.rename(old.structure(users), edited.structure(users))
            .unwrap();

        let strings = m.change_strings();
        let (graph, log) = m.finish("rename Users");
        assert_eq!(log.change_strings(), strings);
        assert_eq!(log.base_uri, BASE);
        assert_eq!(log.intent, "rename Users");
        assert!(log.verify_integrity());
        assert!(construct(&graph).unwrap().find_path(&["main", "People"]).is_some());
    }
}
