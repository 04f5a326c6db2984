//! End-to-end tests over the public API.
//!
//! The fixture graph is the canonical small heap:
//!
//! ```text
//! R1 (root) -> O1 -> O2 -> O1      O3 (unreachable)
//! ```

use heapscope::{
    analysis::{AnalysisLimits, AnalysisOptions, AnalysisSession, LeakPattern},
    graph::{algorithms::find_cycles, ObjectGraphIndex},
    snapshot::{Address, MemorySnapshot, MemorySnapshotBuilder, RootKind},
    utils::CancellationToken,
    Result,
};

const R1: Address = Address::new(0x100);
const O1: Address = Address::new(0x200);
const O2: Address = Address::new(0x300);
const O3: Address = Address::new(0x400);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fixture() -> MemorySnapshot {
    MemorySnapshotBuilder::new()
        .object(R1, "App.Program", 32)
        .object(O1, "App.Node", 64)
        .object(O2, "App.Node", 64)
        .object(O3, "App.Orphan", 128)
        .reference(R1, O1)
        .reference(O1, O2)
        .reference(O2, O1)
        .root(R1, RootKind::Stack)
        .build()
}

#[test]
fn retention_paths_end_at_roots() -> Result<()> {
    init_logging();
    let session = AnalysisSession::new(fixture(), AnalysisOptions::default())?;

    for reachable in [R1, O1, O2] {
        let path = session
            .retention_path(reachable)?
            .unwrap_or_else(|| panic!("{reachable} should be rooted"));
        assert_eq!(path.root_address(), Some(R1));
        assert_eq!(path.root_step(), Some("GC ROOT → Stack (0x100)"));
    }

    assert_eq!(session.retention_path(O3)?, None);
    Ok(())
}

#[test]
fn single_cycle_is_found() -> Result<()> {
    let session = AnalysisSession::new(fixture(), AnalysisOptions::default())?;
    let cycles = session.cycles()?;

    assert_eq!(cycles.len(), 1);
    let cycle = &cycles[0];
    assert!(cycle.len() >= 2);
    assert!(cycle.contains(O1) && cycle.contains(O2));

    let index = session.graph_index()?;
    let nodes = cycle.addresses();
    assert!(index
        .forward_references_of(nodes[nodes.len() - 1])
        .contains(&nodes[0]));
    Ok(())
}

#[test]
fn unreachable_objects_are_not_retained_size_candidates() -> Result<()> {
    let session = AnalysisSession::new(fixture(), AnalysisOptions::default())?;
    let sizes = session.retained_sizes()?;

    assert!(!sizes.is_empty());
    assert!(sizes.iter().all(|size| size.address != O3));
    Ok(())
}

#[test]
fn index_build_is_deterministic() -> Result<()> {
    let snapshot = fixture();
    let cancel = CancellationToken::new();

    let first = ObjectGraphIndex::build(&snapshot, [R1], &cancel)?;
    let second = ObjectGraphIndex::build(&snapshot, [R1], &cancel)?;

    assert_eq!(first, second);
    for address in [R1, O1, O2, O3] {
        assert_eq!(
            first.forward_references_of(address),
            second.forward_references_of(address)
        );
        assert_eq!(
            first.back_references_of(address),
            second.back_references_of(address)
        );
    }
    assert_eq!(first.reference_count_of(O1), 2);
    assert!(!first.contains(O3));
    Ok(())
}

#[test]
fn cycles_on_a_dense_graph_are_valid() -> Result<()> {
    let mut builder = MemorySnapshotBuilder::new();
    for i in 1..=40u64 {
        builder = builder.object(Address::new(i), "Node", 8);
    }
    for i in 1..=40u64 {
        builder = builder
            .reference(Address::new(i), Address::new(i % 40 + 1))
            .reference(Address::new(i), Address::new((i * 7) % 40 + 1));
    }
    let snapshot = builder.root(Address::new(1), RootKind::Stack).build();
    let cancel = CancellationToken::new();
    let index = ObjectGraphIndex::build(&snapshot, [Address::new(1)], &cancel)?;

    let cycles = find_cycles(&index, 25, &cancel)?;

    assert!(!cycles.is_empty());
    assert!(cycles.len() <= 25);
    for cycle in &cycles {
        let nodes = cycle.addresses();
        assert!(nodes.len() >= 2);
        for pair in nodes.windows(2) {
            assert!(index.forward_references_of(pair[0]).contains(&pair[1]));
        }
        assert!(index
            .forward_references_of(nodes[nodes.len() - 1])
            .contains(&nodes[0]));
    }
    Ok(())
}

#[test]
fn event_handler_leak_is_diagnosed() -> Result<()> {
    init_logging();
    let window = Address::new(0x10);
    let mut builder = MemorySnapshotBuilder::new()
        .object(window, "App.MainWindow", 2_000)
        .root(window, RootKind::StrongHandle);
    for i in 0..10_000u64 {
        let handler = Address::new(0x10_0000 + i * 0x40);
        builder = builder
            .object(handler, "App.MainWindow+<>c__DisplayClass12_0", 8)
            .reference(window, handler);
    }
    for i in 0..60u64 {
        let buffer = Address::new(0x100_0000 + i * 0x1000);
        builder = builder
            .object(buffer, "System.Byte[]", 300)
            .pinned_root(buffer, RootKind::PinnedHandle);
    }

    let session = AnalysisSession::new(builder.build(), AnalysisOptions::default())?;
    let result = session.execute()?;

    assert_eq!(result.pattern, Some(LeakPattern::ClosureCapture));
    assert!(result.confidence >= 0.9);
    assert!(result.root_cause.contains("closure"));
    assert_eq!(result.diagnostics.len(), 1);
    assert!(!result.retained_sizes.is_empty());
    Ok(())
}

#[test]
fn capped_index_degrades_to_approximate() -> Result<()> {
    let mut builder = MemorySnapshotBuilder::new()
        .object(Address::new(1), "App.Head", 16)
        .root(Address::new(1), RootKind::Stack);
    for i in 2..=10u64 {
        builder = builder
            .object(Address::new(i), "App.Link", 16)
            .reference(Address::new(i - 1), Address::new(i));
    }
    let options =
        AnalysisOptions::default().with_limits(AnalysisLimits::default().with_max_index_nodes(3));
    let session = AnalysisSession::new(builder.build(), options)?;

    assert!(session.is_approximate()?);
    for i in 1..=10u64 {
        let path = session
            .retention_path(Address::new(i))?
            .unwrap_or_else(|| panic!("0x{i:X} is reachable"));
        assert_eq!(path.root_address(), Some(Address::new(1)));
    }
    assert!(session
        .retained_sizes()?
        .iter()
        .all(|size| size.approximate));
    Ok(())
}

#[test]
fn unwalkable_snapshot_is_reported() {
    let snapshot = MemorySnapshotBuilder::new().not_walkable().build();
    let err = AnalysisSession::new(snapshot, AnalysisOptions::default())
        .err()
        .expect("session must not start");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("not ready"));
}
