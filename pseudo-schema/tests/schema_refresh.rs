//! Refreshing a project's schemas from files in the store.

use pseudo_core::{ContentKind, FileStore, ProcessingMode, ProjectId, SchemaStore};
use pseudo_schema::{build_messages, refresh, ContextFile, TemplateValues, SCHEMA_EDITOR};

fn proj() -> ProjectId {
    ProjectId::from("app")
}

const DOCS_SCHEMA: &str = r#"name: docs
settings:
  processing_mode: per_file
  input_extension: .dart
  purpose: Write API docs
sections:
  - kind: system
    template: You write documentation.
  - kind: user
    template: |
      ⟪prompt⟫
      File ⟪path⟫:
      ⟪content⟫
"#;

#[test]
fn project_file_schemas_are_loaded_next_to_builtins() {
    let files = FileStore::new();
    let schemas = SchemaStore::new();
    files
        .write_file(&proj(), "/schemas/docs.schema.yaml", DOCS_SCHEMA, ContentKind::Schema)
        .expect("write schema");

    let report = refresh(&files, &schemas, &proj()).expect("refresh");
    assert!(report.rejected.is_empty());
    assert!(report.loaded.contains(&"docs".to_string()));
    assert!(report.loaded.contains(&SCHEMA_EDITOR.to_string()));

    let settings = schemas.settings(&proj(), "docs").unwrap().expect("docs settings");
    assert_eq!(settings.processing_mode, ProcessingMode::PerFile);
    assert_eq!(settings.input_extension.as_deref(), Some(".dart"));
}

#[test]
fn project_file_overrides_builtin_of_same_name() {
    let files = FileStore::new();
    let schemas = SchemaStore::new();
    let custom = "name: to-raw\nsettings:\n  processing_mode: sync_raw\n  purpose: custom\nsections: []\n";
    files
        .write_file(&proj(), "/to-raw.schema.yaml", custom, ContentKind::Schema)
        .unwrap();

    refresh(&files, &schemas, &proj()).unwrap();
    let settings = schemas.settings(&proj(), "to-raw").unwrap().unwrap();
    assert_eq!(settings.purpose, "custom");
}

#[test]
fn invalid_schema_is_rejected_alone() {
    let files = FileStore::new();
    let schemas = SchemaStore::new();
    files
        .write_file(&proj(), "/docs.schema.yaml", DOCS_SCHEMA, ContentKind::Schema)
        .unwrap();
    files
        .write_file(
            &proj(),
            "/bad.schema.yaml",
            "name: bad\nsections:\n  - kind: user\n    template: \"⟪token⟫\"\n",
            ContentKind::Schema,
        )
        .unwrap();

    let report = refresh(&files, &schemas, &proj()).unwrap();
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].0, "/bad.schema.yaml");
    assert!(schemas.schema(&proj(), "bad").unwrap().is_none());
    assert!(schemas.schema(&proj(), "docs").unwrap().is_some());
}

#[test]
fn loaded_schema_builds_messages() {
    let files = FileStore::new();
    let schemas = SchemaStore::new();
    files
        .write_file(&proj(), "/docs.schema.yaml", DOCS_SCHEMA, ContentKind::Schema)
        .unwrap();
    refresh(&files, &schemas, &proj()).unwrap();

    let schema = schemas.schema(&proj(), "docs").unwrap().unwrap();
    let settings = schemas.settings(&proj(), "docs").unwrap().unwrap();
    let values = TemplateValues::for_schema(&settings)
        .with("prompt", "Document it")
        .with("path", "/lib/a.dart")
        .with("content", "int a() => 1;");
    let messages = build_messages(&schema, &values, &[ContextFile::new("/x.pseudo", "- x")]).unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "You write documentation.");
    assert_eq!(messages[1].text, "Document it\nFile /lib/a.dart:\nint a() => 1;");
}
