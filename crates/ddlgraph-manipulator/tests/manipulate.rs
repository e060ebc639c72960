//! End-to-end runs of ddlgraph-manipulator against graph files on disk.

use std::path::Path;

use ddlgraph_changelog::{Change, ChangeLogStore, FileChangeLogStore};
use ddlgraph_core::{Database, NodeIndex};
use ddlgraph_manipulator::{follow, history, run, Edit, ManipulatorError, RunOptions};
use ddlgraph_rdf::vocab::ddl;
use ddlgraph_rdf::{construct, foreign_key_iri, to_graph, KnowledgeGraph};
use oxigraph::model::{NamedNode, TripleRef};

const BASE: &str = "http://test.com/";

/// Sqlite { main { Users { id }, Orders { user_id -> Users.id } }, archive {} }
fn sqlite() -> Database {
    let mut db = Database::new("Sqlite");
    db.update_base_uri(BASE);
    let main = db.create_schema("main");
    let archive = db.create_schema("archive");
    let users = db.create_table("Users");
    let id = db.create_column("id");
    db.add_structure(NodeIndex::ROOT, main);
    db.add_structure(NodeIndex::ROOT, archive);
    db.add_structure(main, users);
    db.add_structure(users, id);
    db.add_primary_key(users, id);

    let orders = db.create_table("Orders");
    let user_id = db.create_column("user_id");
    db.add_structure(main, orders);
    db.add_structure(orders, user_id);
    db.add_foreign_key(orders, user_id, id, None, None).unwrap();
    db
}

fn orders_foreign_key(db: &Database) -> NamedNode {
    let orders = db
        .as_table(db.find_path(&["main", "Orders"]).unwrap())
        .unwrap();
    let key = &db.table(orders).foreign_keys()[0];
    NamedNode::new(foreign_key_iri(db, key).unwrap()).unwrap()
}

fn write_graph(db: &Database, path: &Path) {
    KnowledgeGraph::new(BASE, to_graph(db).unwrap())
        .unwrap()
        .save(path)
        .unwrap();
}

fn uri(db: &Database, path: &[&str]) -> String {
    db.structure(db.find_path(path).unwrap()).uri().unwrap()
}

fn options(dir: &Path, edits: Vec<Edit>) -> RunOptions {
    RunOptions {
        graph_path: dir.join("schema.ttl"),
        output_path: Some(dir.join("out.ttl")),
        base_uri: BASE.to_string(),
        edits,
        intent: "archive users".to_string(),
        validate: true,
        shapes_path: None,
        changelog_dir: dir.join("changelogs"),
    }
}

/// The same tree with Users under archive, for expected IRIs.
fn archived() -> Database {
    let mut db = sqlite();
    let users = db.find_path(&["main", "Users"]).unwrap();
    let archive = db.find_path(&["archive"]).unwrap();
    db.add_structure(archive, users);
    db
}

#[test]
fn test_move_table_between_schemas() {
    let dir = tempfile::tempdir().unwrap();
    let before = sqlite();
    write_graph(&before, &dir.path().join("schema.ttl"));

    let edit = Edit::parse_move("main/Users=archive/Users").unwrap();
    let log = run(&options(dir.path(), vec![edit])).unwrap();

    let after = archived();
    assert_eq!(
        log.changes,
        vec![
            Change::Move {
                from: uri(&before, &["main", "Users"]),
                to: uri(&after, &["archive", "Users"]),
            },
            Change::Move {
                from: uri(&before, &["main", "Users", "id"]),
                to: uri(&after, &["archive", "Users", "id"]),
            },
        ]
    );

    let out = KnowledgeGraph::from_path(dir.path().join("out.ttl"), BASE).unwrap();
    let main = NamedNode::new(uri(&before, &["main"])).unwrap();
    let archive = NamedNode::new(uri(&before, &["archive"])).unwrap();
    let users = NamedNode::new(uri(&after, &["archive", "Users"])).unwrap();
    assert!(!out
        .graph()
        .contains(TripleRef::new(&main, ddl::HAS_STRUCTURE, &users)));
    assert!(out
        .graph()
        .contains(TripleRef::new(&archive, ddl::HAS_STRUCTURE, &users)));

    let fk = orders_foreign_key(&before);
    let old_target = NamedNode::new(uri(&before, &["main", "Users", "id"])).unwrap();
    let new_target = NamedNode::new(uri(&after, &["archive", "Users", "id"])).unwrap();
    assert!(out
        .graph()
        .contains(TripleRef::new(&fk, ddl::TO_COLUMN, &new_target)));
    assert!(!out
        .graph()
        .contains(TripleRef::new(&fk, ddl::TO_COLUMN, &old_target)));

    let rebuilt = construct(out.graph()).unwrap();
    assert!(rebuilt.find_path(&["archive", "Users", "id"]).is_some());
    let orders = rebuilt
        .as_table(rebuilt.find_path(&["main", "Orders"]).unwrap())
        .unwrap();
    let target = rebuilt.structure(rebuilt.table(orders).foreign_keys()[0].to());
    assert_eq!(target.uri().unwrap(), new_target.as_str());
}

#[test]
fn test_changelog_is_stored_and_verifiable() {
    let dir = tempfile::tempdir().unwrap();
    write_graph(&sqlite(), &dir.path().join("schema.ttl"));

    let edit = Edit::parse_rename("main/Users=Customers").unwrap();
    let log = run(&options(dir.path(), vec![edit])).unwrap();

    assert_eq!(log.changes.len(), 2);
    assert!(log.change_strings()[0].starts_with("RENAME("));
    assert!(log.change_strings()[1].starts_with("MOVE("));

    let store = FileChangeLogStore::new(dir.path().join("changelogs")).unwrap();
    let stored = store.get(BASE, log.id).unwrap();
    assert_eq!(stored, log);
    assert_eq!(stored.intent, "archive users");
}

#[test]
fn test_edits_apply_in_sequence() {
    let dir = tempfile::tempdir().unwrap();
    write_graph(&sqlite(), &dir.path().join("schema.ttl"));

    let edits = vec![
        Edit::parse_move("main/Users=archive/Users").unwrap(),
        Edit::parse_rename("archive/Users=People").unwrap(),
    ];
    let log = run(&options(dir.path(), edits)).unwrap();
    assert_eq!(log.changes.len(), 4);

    let out = KnowledgeGraph::from_path(dir.path().join("out.ttl"), BASE).unwrap();
    let rebuilt = construct(out.graph()).unwrap();
    assert!(rebuilt.find_path(&["archive", "People", "id"]).is_some());
}

#[test]
fn test_failed_edit_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_graph(&sqlite(), &dir.path().join("schema.ttl"));

    let edits = vec![
        Edit::parse_move("main/Users=archive/Users").unwrap(),
        Edit::parse_move("main/Users=archive/Users").unwrap(),
    ];
    let err = run(&options(dir.path(), edits)).unwrap_err();

    assert!(matches!(err, ManipulatorError::UnknownPath { .. }));
    assert!(!dir.path().join("out.ttl").exists());
    assert!(!dir.path().join("changelogs").exists());
}

#[test]
fn test_move_onto_existing_table_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = sqlite();
    let archive = db.find_path(&["archive"]).unwrap();
    let archived_users = db.create_table("Users");
    db.add_structure(archive, archived_users);
    write_graph(&db, &dir.path().join("schema.ttl"));

    let edit = Edit::parse_move("main/Users=archive/Users").unwrap();
    let err = run(&options(dir.path(), vec![edit])).unwrap_err();

    assert!(matches!(err, ManipulatorError::TargetExists { .. }));
    assert!(!dir.path().join("out.ttl").exists());
    assert!(!dir.path().join("changelogs").exists());
}

#[test]
fn test_move_below_itself_fails_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    write_graph(&sqlite(), &dir.path().join("schema.ttl"));

    let edit = Edit::parse_move("main=main/Users/main").unwrap();
    let err = run(&options(dir.path(), vec![edit])).unwrap_err();

    assert!(matches!(err, ManipulatorError::InvalidEdit { .. }));
    assert!(!dir.path().join("out.ttl").exists());
    assert!(!dir.path().join("changelogs").exists());
}

#[test]
fn test_move_with_new_name_is_intent_conflict() {
    let dir = tempfile::tempdir().unwrap();
    write_graph(&sqlite(), &dir.path().join("schema.ttl"));

    let edit = Edit::parse_move("main/Users=archive/People").unwrap();
    let err = run(&options(dir.path(), vec![edit])).unwrap_err();
    assert!(matches!(err, ManipulatorError::IntentConflict { .. }));
}

#[test]
fn test_moving_database_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_graph(&sqlite(), &dir.path().join("schema.ttl"));

    let edit = Edit::parse_rename("=Postgres").unwrap();
    let err = run(&options(dir.path(), vec![edit])).unwrap_err();
    assert!(matches!(err, ManipulatorError::RootMutation { .. }));
}

#[test]
fn test_output_defaults_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("schema.ttl");
    write_graph(&sqlite(), &input);

    let mut opts = options(dir.path(), vec![Edit::parse_rename("archive=old").unwrap()]);
    opts.output_path = None;
    opts.validate = false;
    run(&opts).unwrap();

    let rebuilt = construct(KnowledgeGraph::from_path(&input, BASE).unwrap().graph()).unwrap();
    assert!(rebuilt.find_path(&["old"]).is_some());
    assert!(rebuilt.find_path(&["archive"]).is_none());
}

#[test]
fn test_history_follows_iris_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let before = sqlite();
    write_graph(&before, &dir.path().join("schema.ttl"));

    let mut first = options(dir.path(), vec![Edit::parse_move("main/Users=archive/Users").unwrap()]);
    first.output_path = None;
    run(&first).unwrap();
    let mut second = options(dir.path(), vec![Edit::parse_rename("archive/Users=People").unwrap()]);
    second.output_path = None;
    second.intent = "rename users".to_string();
    run(&second).unwrap();

    let changelogs = dir.path().join("changelogs");
    let logs = history(&changelogs, BASE).unwrap();
    let intents: Vec<&str> = logs.iter().map(|l| l.intent.as_str()).collect();
    assert_eq!(intents, vec!["archive users", "rename users"]);

    let now = construct(
        KnowledgeGraph::from_path(dir.path().join("schema.ttl"), BASE)
            .unwrap()
            .graph(),
    )
    .unwrap();
    let old_id = uri(&before, &["main", "Users", "id"]);
    assert_eq!(
        follow(&changelogs, BASE, &old_id).unwrap(),
        uri(&now, &["archive", "People", "id"])
    );
    assert!(history(&changelogs, "http://other.com/").unwrap().is_empty());
}
