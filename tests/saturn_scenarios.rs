//! End-to-end scenario tests driving a task all the way from a queue
//! message through the scaffold recipe to the final report, against a
//! fake control plane and fake `git`/`python3` toolchain.

mod support;

use saturn::app::Dispatcher;
use saturn::reporter::{GcpTokenedReporter, StaticToken};
use saturn::task::run_task;
use saturn_protocol::{Episode, Language, TaskMetadata, TaskPayload};
use saturn_scaffold::{LangConfig, ScaffoldMultiplexer};
use saturn_storage::archive::pack_archive;
use saturn_storage::{LocalFsStorage, StorageClient};
use std::collections::HashMap;
use std::sync::Arc;
use support::{path_mutation_guard, MockServer, Toolchain};
use tokio_util::sync::CancellationToken;

fn submission(bucket_src: &str, name_src: &str, bucket_bin: &str, name_bin: &str, team: &str, package: &str) -> serde_json::Value {
    serde_json::json!({
        "source": {"bucket": bucket_src, "name": name_src},
        "binary": {"bucket": bucket_bin, "name": name_bin},
        "team-name": team,
        "package": package,
    })
}

fn details_map(value: serde_json::Value) -> HashMap<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => panic!("details must be an object"),
    }
}

fn compile_payload(report_url: String, details: serde_json::Value) -> TaskPayload {
    TaskPayload {
        episode: Episode {
            name: "bc24".to_string(),
            language: Language::Python3,
            scaffold: "https://example.com/bc24.git".to_string(),
        },
        metadata: TaskMetadata { report_url, task_type: "compile".to_string() },
        details: details_map(details),
    }
}

fn execute_payload(report_url: String, details: serde_json::Value) -> TaskPayload {
    TaskPayload {
        episode: Episode {
            name: "bc24".to_string(),
            language: Language::Python3,
            scaffold: "https://example.com/bc24.git".to_string(),
        },
        metadata: TaskMetadata { report_url, task_type: "execute".to_string() },
        details: details_map(details),
    }
}

fn build_dispatcher(root: std::path::PathBuf, python_bin: &str) -> Arc<Dispatcher> {
    let lang_config = LangConfig {
        java_home: "/opt/jdk-21".to_string(),
        python_bin: python_bin.to_string(),
        on_saturn: false,
    };
    Arc::new(Dispatcher::new(ScaffoldMultiplexer::new(root, None, lang_config)))
}

fn reporter_for(_server: &MockServer) -> Arc<GcpTokenedReporter> {
    Arc::new(GcpTokenedReporter::new(
        Arc::new(StaticToken("dev-token".to_string())),
        "saturn",
        "saturn-tests",
    ))
}

fn valid_empty_zip() -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    pack_archive(dir.path()).unwrap()
}

fn path_escaping_zip() -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::FileOptions::default();
        writer.start_file("../etc/passwd", options).unwrap();
        std::io::Write::write_all(&mut writer, b"pwned").unwrap();
        writer.finish().unwrap();
    }
    buf
}

#[tokio::test]
async fn compile_accepted() {
    let _guard = path_mutation_guard().lock().unwrap();
    let toolchain = Toolchain::install();
    toolchain.prepend_to_path();

    let server = MockServer::start();
    server.queue_response(200, "{}"); // initial RUN report
    server.queue_response(200, "{}"); // final report

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));
    storage.upload_file("src-bucket", "s.zip", valid_empty_zip()).await.unwrap();

    let scaffold_root = tempfile::tempdir().unwrap();
    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), &toolchain.python_bin);
    let reporter = reporter_for(&server);

    let details = submission("src-bucket", "s.zip", "bin-bucket", "b.zip", "T", "com.t");
    let payload = compile_payload(server.url("/1"), details);

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage.clone() as Arc<dyn StorageClient>,
        reporter,
        CancellationToken::new(),
    )
    .await;

    assert!(acked, "a successful compile should ack the message");

    let requests = server.requests();
    assert_eq!(requests.len(), 2, "expected an initial and a final report");
    let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["invocation"]["status"], "RUN");
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["invocation"]["status"], "OK!");
    assert_eq!(second["accepted"], true);

    let uploaded = storage.get_file("bin-bucket", "b.zip").await.unwrap();
    assert!(!uploaded.is_empty());
}

#[tokio::test]
async fn malformed_details_are_acked_without_redelivery() {
    let _guard = path_mutation_guard().lock().unwrap();
    let toolchain = Toolchain::install();
    toolchain.prepend_to_path();

    let server = MockServer::start();
    server.queue_response(200, "{}");
    server.queue_response(200, "{}");

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));

    let scaffold_root = tempfile::tempdir().unwrap();
    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), &toolchain.python_bin);
    let reporter = reporter_for(&server);

    // Missing "package" — `CompileRequest` fails to deserialize, which
    // would fail identically on every redelivery.
    let details = serde_json::json!({
        "source": {"bucket": "src-bucket", "name": "s.zip"},
        "binary": {"bucket": "bin-bucket", "name": "b.zip"},
        "team-name": "T",
    });
    let payload = compile_payload(server.url("/1"), details);

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage as Arc<dyn StorageClient>,
        reporter,
        CancellationToken::new(),
    )
    .await;

    assert!(acked, "a non-retryable decode failure should ack, not loop forever on redelivery");

    let requests = server.requests();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["invocation"]["status"], "TRY");
}

#[tokio::test]
async fn compile_rejected_on_bad_build() {
    let _guard = path_mutation_guard().lock().unwrap();
    let toolchain = Toolchain::install();
    toolchain.prepend_to_path();

    let server = MockServer::start();
    server.queue_response(200, "{}");
    server.queue_response(200, "{}");

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));
    storage.upload_file("src-bucket", "s.zip", valid_empty_zip()).await.unwrap();

    let scaffold_root = tempfile::tempdir().unwrap();
    let worker_root = scaffold_root.path().join("bc24");
    std::fs::create_dir_all(&worker_root).unwrap();
    std::fs::write(worker_root.join("REJECT_VERIFY"), b"").unwrap();

    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), &toolchain.python_bin);
    let reporter = reporter_for(&server);

    let details = submission("src-bucket", "s.zip", "bin-bucket", "b.zip", "T", "com.t");
    let payload = compile_payload(server.url("/1"), details);

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage.clone() as Arc<dyn StorageClient>,
        reporter,
        CancellationToken::new(),
    )
    .await;

    assert!(acked);
    let requests = server.requests();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["invocation"]["status"], "OK!");
    assert_eq!(second["accepted"], false);
    assert!(storage.get_file("bin-bucket", "b.zip").await.is_err(), "no binary should be uploaded on rejection");
}

#[tokio::test]
async fn execute_reports_scores() {
    let _guard = path_mutation_guard().lock().unwrap();
    let toolchain = Toolchain::install();
    toolchain.prepend_to_path();

    let server = MockServer::start();
    server.queue_response(200, "{}");
    server.queue_response(200, "{}");

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));
    storage.upload_file("bin-bucket", "a.zip", valid_empty_zip()).await.unwrap();
    storage.upload_file("bin-bucket", "b.zip", valid_empty_zip()).await.unwrap();

    let scaffold_root = tempfile::tempdir().unwrap();
    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), &toolchain.python_bin);
    let reporter = reporter_for(&server);

    let details = serde_json::json!({
        "a": submission("src-bucket", "a-src.zip", "bin-bucket", "a.zip", "TeamA", "com.a"),
        "b": submission("src-bucket", "b-src.zip", "bin-bucket", "b.zip", "TeamB", "com.b"),
        "maps": ["map1"],
        "replay": {"bucket": "replay-bucket", "name": "r.bin"},
        "alternate-order": false,
    });
    let payload = execute_payload(server.url("/1"), details);

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage.clone() as Arc<dyn StorageClient>,
        reporter,
        CancellationToken::new(),
    )
    .await;

    assert!(acked);
    let requests = server.requests();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["invocation"]["status"], "OK!");
    assert_eq!(second["scores"], serde_json::json!([2, 0]));
    assert!(storage.get_file("replay-bucket", "r.bin").await.is_ok());
}

#[tokio::test]
async fn external_abort_skips_pipeline() {
    let server = MockServer::start();
    server.queue_response(409, "{}");

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));
    let scaffold_root = tempfile::tempdir().unwrap();
    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), "fake-python3");
    let reporter = reporter_for(&server);

    let details = submission("src-bucket", "s.zip", "bin-bucket", "b.zip", "T", "com.t");
    let payload = compile_payload(server.url("/1"), details);

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage as Arc<dyn StorageClient>,
        reporter,
        CancellationToken::new(),
    )
    .await;

    assert!(acked, "a 409 on the initial report still acks the message");
    assert_eq!(server.requests().len(), 1, "no final report should follow an external abort");
}

#[tokio::test]
async fn shutdown_mid_match_is_interrupted_and_nacked() {
    let _guard = path_mutation_guard().lock().unwrap();
    let toolchain = Toolchain::install();
    toolchain.prepend_to_path();

    let server = MockServer::start();
    server.queue_response(200, "{}");
    server.queue_response(200, "{}");

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));
    storage.upload_file("bin-bucket", "a.zip", valid_empty_zip()).await.unwrap();
    storage.upload_file("bin-bucket", "b.zip", valid_empty_zip()).await.unwrap();

    let scaffold_root = tempfile::tempdir().unwrap();
    let worker_root = scaffold_root.path().join("bc24");
    std::fs::create_dir_all(&worker_root).unwrap();
    std::fs::write(worker_root.join("HANG_FOREVER"), b"").unwrap();

    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), &toolchain.python_bin);
    let reporter = reporter_for(&server);

    let details = serde_json::json!({
        "a": submission("src-bucket", "a-src.zip", "bin-bucket", "a.zip", "TeamA", "com.a"),
        "b": submission("src-bucket", "b-src.zip", "bin-bucket", "b.zip", "TeamB", "com.b"),
        "maps": ["map1"],
        "replay": {"bucket": "replay-bucket", "name": "r.bin"},
        "alternate-order": false,
    });
    let payload = execute_payload(server.url("/1"), details);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        cancel_clone.cancel();
    });

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage as Arc<dyn StorageClient>,
        reporter,
        cancel,
    )
    .await;

    assert!(!acked, "an interrupted task should be nacked for redelivery");
    let requests = server.requests();
    let last: serde_json::Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    assert_eq!(last["invocation"]["status"], "TRY");
    assert_eq!(last["invocation"]["interrupted"], true);
}

#[tokio::test]
async fn malformed_queue_message_is_skipped() {
    let queue = Arc::new(saturn::InMemoryQueue::new());
    queue.push(b"not json at all".to_vec()).await;

    struct NeverCalled(std::sync::atomic::AtomicUsize);
    #[async_trait::async_trait]
    impl saturn::TaskHandler for NeverCalled {
        async fn handle(&self, _payload: TaskPayload) -> bool {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            true
        }
    }

    let handler = Arc::new(NeverCalled(std::sync::atomic::AtomicUsize::new(0)));
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        cancel_clone.cancel();
    });

    use saturn::QueueClient;
    queue.subscribe(cancel, handler.clone()).await.unwrap();
    assert_eq!(handler.0.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn archive_with_path_escaping_entry_is_rejected_without_retry() {
    let _guard = path_mutation_guard().lock().unwrap();
    let toolchain = Toolchain::install();
    toolchain.prepend_to_path();

    let server = MockServer::start();
    server.queue_response(200, "{}");
    server.queue_response(200, "{}");

    let storage_dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalFsStorage::new(storage_dir.path()));
    storage.upload_file("src-bucket", "s.zip", path_escaping_zip()).await.unwrap();

    let scaffold_root = tempfile::tempdir().unwrap();
    let dispatcher = build_dispatcher(scaffold_root.path().to_path_buf(), &toolchain.python_bin);
    let reporter = reporter_for(&server);

    let details = submission("src-bucket", "s.zip", "bin-bucket", "b.zip", "T", "com.t");
    let payload = compile_payload(server.url("/1"), details);

    let acked = run_task(
        payload,
        dispatcher as Arc<dyn saturn::task::TaskRunner>,
        storage.clone() as Arc<dyn StorageClient>,
        reporter,
        CancellationToken::new(),
    )
    .await;

    assert!(acked);
    let requests = server.requests();
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["accepted"], false);

    let escaped = scaffold_root.path().join("bc24").join("etc").join("passwd");
    assert!(!escaped.exists(), "a path-escaping entry must never be written to disk");
}
