//! Analysis outputs are plain serializable values.

use heapscope::{
    analysis::{AnalysisOptions, AnalysisResult, AnalysisSession, Diagnostic, PressureLevel},
    snapshot::{Address, MemorySnapshotBuilder, RootKind},
    Error, Result,
};
use serde_json::json;

#[test]
fn result_serializes_to_json() -> Result<()> {
    let holder = Address::new(0x10);
    let mut builder = MemorySnapshotBuilder::new()
        .object(holder, "App.Registry", 24)
        .root(holder, RootKind::StaticVariable);
    for i in 0..50u64 {
        let entry = Address::new(0x1000 + i * 0x20);
        builder = builder
            .object(entry, "App.Entry", 64)
            .reference(holder, entry);
    }

    let session = AnalysisSession::new(builder.build(), AnalysisOptions::default())?;
    let result = session.execute()?;
    let value = serde_json::to_value(&result).expect("serializable");

    assert_eq!(value["pattern"], json!("StaticReference"));
    assert_eq!(value["confidence"], json!(0.98));
    assert!(value["root_cause"].as_str().unwrap().contains("App.Entry"));
    assert!(value["retained_sizes"].as_array().unwrap().len() >= 1);
    Ok(())
}

#[test]
fn diagnostics_are_tagged_by_kind() {
    let diagnostic = Diagnostic::PinnedObjects {
        count: 72,
        pressure: PressureLevel::High,
    };
    let value = serde_json::to_value(&diagnostic).expect("serializable");

    assert_eq!(
        value,
        json!({ "kind": "PinnedObjects", "count": 72, "pressure": "High" })
    );
}

#[test]
fn retention_path_serializes_addresses_as_numbers() -> Result<()> {
    let (root, leaf) = (Address::new(0x100), Address::new(0x200));
    let snapshot = MemorySnapshotBuilder::new()
        .object(root, "App.Program", 16)
        .object(leaf, "App.Leaf", 16)
        .reference(root, leaf)
        .root(root, RootKind::Stack)
        .build();
    let session = AnalysisSession::new(snapshot, AnalysisOptions::default())?;

    let path = session.retention_path(leaf)?.expect("rooted");
    let value = serde_json::to_value(&path).expect("serializable");

    assert_eq!(value["object_address"], json!(0x200));
    assert_eq!(value["chain"], json!([0x200, 0x100]));
    assert_eq!(
        value["steps"],
        json!(["App.Leaf → field (0x200)", "GC ROOT → Stack (0x100)"])
    );
    Ok(())
}

#[test]
fn degraded_result_serializes() {
    let result = AnalysisResult::degraded(&Error::Cancelled);
    let value = serde_json::to_value(&result).expect("serializable");

    assert_eq!(value["confidence"], json!(0.0));
    assert_eq!(value["pattern"], json!(null));
    assert_eq!(value["diagnostics"], json!([]));
}
