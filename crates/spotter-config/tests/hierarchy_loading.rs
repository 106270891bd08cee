// crates/spotter-config/tests/hierarchy_loading.rs
// ============================================================================
// Module: Hierarchy Loading Tests
// Description: Strict and lenient hierarchy parsing across formats.
// Purpose: Ensure id derivation, validation, and default fallback behave.
// ============================================================================
//! Hierarchy loading tests for spotter-config.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;

use spotter_config::HierarchyFormat;
use spotter_config::HierarchyLoadError;
use spotter_config::hierarchy_toml_example;
use spotter_config::load_hierarchy;
use spotter_config::parse_hierarchy;
use spotter_config::read_hierarchy;
use spotter_config::render_tree;
use spotter_core::HierarchyError;
use spotter_core::ProblemHierarchy;
use spotter_core::ProblemId;

fn ids(hierarchy: &ProblemHierarchy) -> Vec<String> {
    hierarchy.preorder().iter().map(|node| node.unique_id.to_string()).collect()
}

/// Tests that the example hierarchy parses with derived ids.
#[test]
fn toml_example_parses_with_derived_ids() {
    let hierarchy = parse_hierarchy(&hierarchy_toml_example(), HierarchyFormat::Toml).unwrap();
    assert_eq!(ids(&hierarchy), vec!["root", "slow-response", "slow-response/ramp", "unstable-throughput"]);
    let slow = hierarchy.find(&ProblemId::new("slow-response")).unwrap();
    assert_eq!(slow.extension_name.as_deref(), Some("threshold"));
    assert_eq!(slow.config_value("threshold"), Some("100"));
    assert_eq!(slow.config_value("reuse_scope"), Some("response"));
    assert!(!hierarchy.root().is_detectable());
}

/// Tests the JSON and YAML readers produce the same tree.
#[test]
fn json_and_yaml_documents_agree() {
    let json = r#"{
        "name": "Root",
        "children": [
            {"name": "Slow DB", "extension": "threshold", "config": {"threshold": 5, "detectable": true}},
            {"id": "gc", "name": "GC", "config": {"detectable": false}}
        ]
    }"#;
    let yaml = "name: Root\nchildren:\n  - name: Slow DB\n    extension: threshold\n    config:\n      threshold: 5\n      detectable: true\n  - id: gc\n    name: GC\n    config:\n      detectable: false\n";
    let from_json = parse_hierarchy(json, HierarchyFormat::Json).unwrap();
    let from_yaml = parse_hierarchy(yaml, HierarchyFormat::Yaml).unwrap();
    assert_eq!(from_json, from_yaml);
    assert_eq!(ids(&from_json), vec!["root", "root/slow-db", "gc"]);
    let db = from_json.find(&ProblemId::new("root/slow-db")).unwrap();
    assert_eq!(db.config_value("threshold"), Some("5"));
    assert!(db.is_detectable());
}

#[test]
fn duplicate_ids_fail_strict_parsing() {
    let toml = "name = \"Root\"\n[[children]]\nid = \"x\"\nname = \"A\"\n[[children]]\nid = \"x\"\nname = \"B\"\n";
    let err = parse_hierarchy(toml, HierarchyFormat::Toml).unwrap_err();
    assert_eq!(err, HierarchyLoadError::Hierarchy(HierarchyError::DuplicateId(ProblemId::new("x"))));
}

#[test]
fn malformed_documents_fail_with_parse_error() {
    let err = parse_hierarchy("{\"children\": []}", HierarchyFormat::Json).unwrap_err();
    assert!(matches!(err, HierarchyLoadError::Parse(_)));
}

#[test]
fn format_follows_file_extension() {
    assert_eq!(HierarchyFormat::from_path(Path::new("tree.JSON")), HierarchyFormat::Json);
    assert_eq!(HierarchyFormat::from_path(Path::new("tree.yml")), HierarchyFormat::Yaml);
    assert_eq!(HierarchyFormat::from_path(Path::new("tree.toml")), HierarchyFormat::Toml);
    assert_eq!(HierarchyFormat::from_path(Path::new("tree")), HierarchyFormat::Toml);
}

/// Tests that the lenient loader falls back on every kind of failure.
#[test]
fn lenient_loader_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let default = ProblemHierarchy::default_hierarchy();

    assert_eq!(load_hierarchy(None), default);
    assert_eq!(load_hierarchy(Some(&dir.path().join("missing.toml"))), default);

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    assert_eq!(load_hierarchy(Some(&broken)), default);

    let duplicate = dir.path().join("dup.toml");
    fs::write(&duplicate, "id = \"a\"\nname = \"A\"\n[[children]]\nid = \"a\"\nname = \"Again\"\n").unwrap();
    assert!(read_hierarchy(&duplicate).is_err());
    assert_eq!(load_hierarchy(Some(&duplicate)), default);
}

#[test]
fn files_are_read_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.yaml");
    fs::write(&path, "name: Root\nchildren:\n  - name: Leaf\n    extension: threshold\n").unwrap();
    let hierarchy = load_hierarchy(Some(&path));
    assert_eq!(ids(&hierarchy), vec!["root", "root/leaf"]);
}

/// Tests the tree rendering used by the CLI.
#[test]
fn tree_rendering_marks_extensions() {
    let hierarchy = parse_hierarchy(&hierarchy_toml_example(), HierarchyFormat::Toml).unwrap();
    let text = render_tree(&hierarchy);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Performance Problems [root]");
    assert_eq!(lines[1], "  Slow Response Times [slow-response] -> threshold");
    assert_eq!(lines[2], "    Ramp [slow-response/ramp] -> scalability");
}
