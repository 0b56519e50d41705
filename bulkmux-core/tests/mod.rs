use bulkmux_core::registry::MAX_SESSION_ID;
use bulkmux_core::{
    BulkConfig, BulkError, ConsoleTarget, SessionId, SessionRegistry, SharedBuffer, Status,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;

struct Harness {
    dir: tempfile::TempDir,
    console: SharedBuffer,
    registry: SessionRegistry,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let console = SharedBuffer::new();
    let config = BulkConfig::default()
        .with_output_dir(dir.path())
        .with_console(ConsoleTarget::Buffer(console.clone()));
    let registry = SessionRegistry::new(config).unwrap();
    Harness {
        dir,
        console,
        registry,
    }
}

fn send_all(registry: &SessionRegistry, id: SessionId, script: &[&str]) {
    for text in script {
        assert_eq!(registry.receive(id, *text), Status::Ok);
    }
}

/// Contents of every artifact for `id`, sorted.
fn artifact_bodies(dir: &Path, id: SessionId) -> Vec<String> {
    let prefix = format!("bulk_{}_", id);
    let mut bodies: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(&prefix)
        })
        .map(|path| fs::read_to_string(path).unwrap())
        .collect();
    bodies.sort();
    bodies
}

/// Raw bytes of every artifact for `id`, sorted.
fn artifact_raw(dir: &Path, id: SessionId) -> Vec<Vec<u8>> {
    let prefix = format!("bulk_{}_", id);
    let mut bodies: Vec<Vec<u8>> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(&prefix)
        })
        .map(|path| fs::read(path).unwrap())
        .collect();
    bodies.sort();
    bodies
}

fn log_lines_for(console: &SharedBuffer, id: SessionId) -> Vec<String> {
    let tag = format!("bulk_{}: ", id);
    console
        .lines()
        .into_iter()
        .filter_map(|line| line.strip_prefix(&tag).map(str::to_string))
        .collect()
}

// ============================================================================
// Status Tests
// ============================================================================

#[test]
fn test_status_codes() {
    assert_eq!(Status::Ok.as_code(), 0);
    assert_eq!(Status::ContextNotFound.as_code(), 1);
    assert!(Status::Ok.is_ok());
    assert!(!Status::ContextNotFound.is_ok());
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    let config = BulkConfig::default();
    assert_eq!(config.log_prefix, "bulk");
    assert_eq!(config.output_dir, Path::new("."));
    assert!(matches!(config.console, ConsoleTarget::Stdout));
}

#[test]
fn test_config_deserialize_partial() {
    let config: BulkConfig = serde_json::from_str(r#"{"output_dir": "/tmp/bulks"}"#).unwrap();
    assert_eq!(config.output_dir, Path::new("/tmp/bulks"));
    assert_eq!(config.log_prefix, "bulk");
}

#[test]
fn test_registry_creates_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let config = BulkConfig::default()
        .with_output_dir(&nested)
        .with_console(ConsoleTarget::Buffer(SharedBuffer::new()));
    let _registry = SessionRegistry::new(config).unwrap();
    assert!(nested.is_dir());
}

#[test]
fn test_registry_rejects_unusable_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("plain-file");
    fs::write(&blocker, b"not a directory").unwrap();

    let config = BulkConfig::default()
        .with_output_dir(blocker.join("bulks"))
        .with_console(ConsoleTarget::Buffer(SharedBuffer::new()));
    let err = SessionRegistry::new(config).unwrap_err();
    assert!(matches!(err, BulkError::OutputDir { path, .. } if path == blocker.join("bulks")));
}

// ============================================================================
// Registry Lifecycle Tests
// ============================================================================

#[test]
fn test_connect_rejects_zero_pool_size() {
    let h = harness();
    let err = h.registry.connect(0).unwrap_err();
    assert!(matches!(err, BulkError::ZeroPoolSize));
    assert!(h.registry.is_empty());
}

#[test]
fn test_connect_returns_id_in_range() {
    let h = harness();
    let id = h.registry.connect(3).unwrap();
    assert!(id.get() >= 1 && id.get() <= MAX_SESSION_ID);
    assert!(h.registry.contains(id));
    assert_eq!(h.registry.session_ids(), vec![id]);
}

#[test]
fn test_unknown_session_is_not_found() {
    let h = harness();
    let ghost = SessionId::new(0);
    assert_eq!(h.registry.receive(ghost, "cmd"), Status::ContextNotFound);
    assert_eq!(h.registry.disconnect(ghost), Status::ContextNotFound);
}

#[test]
fn test_disconnected_session_is_not_found() {
    let h = harness();
    let id = h.registry.connect(2).unwrap();
    assert_eq!(h.registry.disconnect(id), Status::Ok);
    assert_eq!(h.registry.receive(id, "cmd"), Status::ContextNotFound);
    assert_eq!(h.registry.disconnect(id), Status::ContextNotFound);
    assert!(!h.registry.contains(id));
}

#[test]
fn test_receive_bytes_keeps_raw_payload() {
    let h = harness();
    let id = h.registry.connect(1).unwrap();
    assert_eq!(h.registry.receive_bytes(id, b"ok\xff"), Status::Ok);
    h.registry.disconnect(id);

    // Only the console line is lossy; the artifact holds the exact bytes.
    assert_eq!(log_lines_for(&h.console, id), vec!["ok\u{fffd}"]);
    assert_eq!(artifact_raw(h.dir.path(), id), vec![vec![0x6f, 0x6b, 0xff]]);
}

#[test]
fn test_raw_bytes_joined_with_separator() {
    let h = harness();
    let id = h.registry.connect(2).unwrap();
    assert_eq!(h.registry.receive_bytes(id, b"\xfe\x00"), Status::Ok);
    assert_eq!(h.registry.receive(id, "tail"), Status::Ok);
    h.registry.disconnect(id);

    assert_eq!(artifact_raw(h.dir.path(), id), vec![b"\xfe\x00, tail".to_vec()]);
}

#[test]
fn test_disconnect_frees_id_for_reuse() {
    let h = harness();
    let id = h.registry.connect(1).unwrap();
    send_all(&h.registry, id, &["a"]);
    assert_eq!(h.registry.disconnect(id), Status::Ok);

    // Writers are joined by now, so nothing from `id` is still in flight.
    assert!(!h.registry.contains(id));
    assert_eq!(artifact_bodies(h.dir.path(), id), vec!["a"]);
}

// ============================================================================
// Batching Tests
// ============================================================================

#[test]
fn test_static_bulk_of_n() {
    let h = harness();
    let id = h.registry.connect(3).unwrap();
    send_all(&h.registry, id, &["a", "b", "c"]);
    h.registry.disconnect(id);

    assert_eq!(log_lines_for(&h.console, id), vec!["a, b, c"]);
    assert_eq!(artifact_bodies(h.dir.path(), id), vec!["a, b, c"]);
}

#[test]
fn test_eof_flushes_partial_bulk() {
    let h = harness();
    let id = h.registry.connect(10).unwrap();
    send_all(&h.registry, id, &["a", "EOF", "b"]);
    h.registry.disconnect(id);

    // "b" comes out through the drain-on-close flush.
    assert_eq!(log_lines_for(&h.console, id), vec!["a, EOF", "b"]);
}

#[test]
fn test_nested_blocks_flush_once() {
    let h = harness();
    let id = h.registry.connect(1).unwrap();
    send_all(&h.registry, id, &["{", "a", "{", "b", "}", "c", "}"]);
    h.registry.disconnect(id);

    assert_eq!(log_lines_for(&h.console, id), vec!["a, b, c"]);
    assert_eq!(artifact_bodies(h.dir.path(), id), vec!["a, b, c"]);
}

#[test]
fn test_eof_inside_block_discards_block() {
    let h = harness();
    let id = h.registry.connect(2).unwrap();
    send_all(&h.registry, id, &["{", "lost1", "lost2", "EOF", "x", "y"]);
    h.registry.disconnect(id);

    // Block dropped; what follows is static mode again.
    assert_eq!(log_lines_for(&h.console, id), vec!["x, y"]);
    assert_eq!(artifact_bodies(h.dir.path(), id), vec!["x, y"]);
}

#[test]
fn test_empty_commands_fill_slots_but_write_nothing() {
    let h = harness();
    let id = h.registry.connect(2).unwrap();
    send_all(&h.registry, id, &["", ""]);
    h.registry.disconnect(id);

    assert!(log_lines_for(&h.console, id).is_empty());
    assert!(artifact_bodies(h.dir.path(), id).is_empty());
}

#[test]
fn test_disconnect_drains_static_pool() {
    let h = harness();
    let id = h.registry.connect(5).unwrap();
    send_all(&h.registry, id, &["a", "b"]);
    assert_eq!(h.registry.disconnect(id), Status::Ok);

    // disconnect returned: output is already complete.
    assert_eq!(log_lines_for(&h.console, id), vec!["a, b"]);
    assert_eq!(artifact_bodies(h.dir.path(), id), vec!["a, b"]);
}

#[test]
fn test_rapid_batches_each_get_an_artifact() {
    let h = harness();
    let id = h.registry.connect(1).unwrap();
    send_all(&h.registry, id, &["b1", "b2", "b3", "b4"]);
    h.registry.disconnect(id);

    assert_eq!(
        artifact_bodies(h.dir.path(), id),
        vec!["b1", "b2", "b3", "b4"]
    );
}

#[test]
fn test_disconnect_drops_open_block() {
    let h = harness();
    let id = h.registry.connect(5).unwrap();
    send_all(&h.registry, id, &["{", "a", "b"]);
    h.registry.disconnect(id);

    assert!(log_lines_for(&h.console, id).is_empty());
    assert!(artifact_bodies(h.dir.path(), id).is_empty());
}

#[test]
fn test_reference_script() {
    let h = harness();
    let id = h.registry.connect(2).unwrap();

    send_all(&h.registry, id, &["cmd1", "cmd2"]);
    send_all(&h.registry, id, &["cmd3", ""]);
    send_all(&h.registry, id, &["{", "cmd1", "cmd2", "cmd3", "", "}"]);
    send_all(&h.registry, id, &["{", "cmd2", "EOF"]);
    assert_eq!(h.registry.disconnect(id), Status::Ok);

    assert_eq!(
        log_lines_for(&h.console, id),
        vec!["cmd1, cmd2", "cmd3", "cmd1, cmd2, cmd3"]
    );
    assert_eq!(
        artifact_bodies(h.dir.path(), id),
        vec!["cmd1, cmd2", "cmd1, cmd2, cmd3", "cmd3"]
    );
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[test]
fn test_concurrent_connects_get_unique_ids() {
    let h = harness();
    let registry = Arc::new(h.registry);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..16)
                    .map(|_| registry.connect(4).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: Vec<SessionId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<SessionId> = ids.iter().copied().collect();

    assert_eq!(ids.len(), 128);
    assert_eq!(unique.len(), 128);
    assert_eq!(registry.len(), 128);

    registry.shutdown();
    assert!(registry.is_empty());
}

#[test]
fn test_concurrent_producers_keep_sessions_isolated() {
    let h = harness();
    let registry = Arc::new(h.registry);

    let handles: Vec<_> = (0..3)
        .map(|n| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let id = registry.connect(2).unwrap();
                let a = format!("p{n}a");
                let b = format!("p{n}b");
                assert_eq!(registry.receive(id, a.as_str()), Status::Ok);
                assert_eq!(registry.receive(id, b.as_str()), Status::Ok);
                assert_eq!(registry.disconnect(id), Status::Ok);
                (n, id)
            })
        })
        .collect();

    for handle in handles {
        let (n, id) = handle.join().unwrap();
        assert_eq!(
            log_lines_for(&h.console, id),
            vec![format!("p{n}a, p{n}b")]
        );
        assert_eq!(
            artifact_bodies(h.dir.path(), id),
            vec![format!("p{n}a, p{n}b")]
        );
    }
}

#[test]
fn test_registry_drop_drains_live_sessions() {
    let h = harness();
    let id = h.registry.connect(10).unwrap();
    send_all(&h.registry, id, &["pending"]);
    drop(h.registry);

    assert_eq!(log_lines_for(&h.console, id), vec!["pending"]);
    assert_eq!(artifact_bodies(h.dir.path(), id), vec!["pending"]);
}
