mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use common::{docx_with_paragraphs, pdf_with_pages};

const KEY_ENV: &str = "DOCRAG_IT_API_KEY";

fn docrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("docrag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    setup_test_env_with_completion("http://127.0.0.1:9")
}

fn setup_test_env_with_completion(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("letters.docx"),
        docx_with_paragraphs(&["AAAA BBBB CCCC"]),
    )
    .unwrap();
    fs::write(
        docs.join("guide.pdf"),
        pdf_with_pages(&["Oxford teaching began in 1096", "The Bodleian Library"]),
    )
    .unwrap();
    fs::write(docs.join("blank.docx"), docx_with_paragraphs(&[])).unwrap();
    fs::write(docs.join("broken.pdf"), b"this is not a pdf").unwrap();
    fs::write(docs.join("notes.txt"), b"plain text notes").unwrap();

    let config_content = format!(
        r#"[store]
path = "{}/data/docrag.sqlite"

[chunking]
chunk_size = 500

[retrieval]
collection = "default"
k = 4

[completion]
base_url = "{}"
model = "mock-model"
api_key_env = "{}"
timeout_secs = 5

[embedding]
provider = "disabled"

[server]
bind = "127.0.0.1:7349"
"#,
        root.display(),
        base_url,
        KEY_ENV
    );

    let config_path = config_dir.join("docrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn docs_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("docs")
}

fn run_docrag_with_env(
    config_path: &Path,
    args: &[&str],
    key: Option<&str>,
) -> (String, String, bool) {
    let binary = docrag_binary();
    let mut cmd = Command::new(&binary);
    cmd.current_dir(config_path.parent().unwrap())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove(KEY_ENV);
    if let Some(key) = key {
        cmd.env(KEY_ENV, key);
    }
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run docrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_docrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_docrag_with_env(config_path, args, None)
}

fn doc(config_path: &Path, name: &str) -> String {
    docs_dir(config_path).join(name).to_str().unwrap().to_string()
}

#[test]
fn test_init_creates_store() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_docrag(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/docrag.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_docrag(&config_path, &["init"]);
    assert!(success1, "First init failed");
    let (_, _, success2) = run_docrag(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_index_docx_fixed_width() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "letters.docx");
    let (stdout, stderr, success) = run_docrag(
        &config_path,
        &["index", &file, "--collection", "letters", "--chunk-size", "5"],
    );
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("3 chunks"), "stdout={}", stdout);

    let (stdout, _, success) = run_docrag(&config_path, &["collections"]);
    assert!(success);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("letters"))
        .expect("collection listed");
    assert!(line.contains(" 3 "), "line={}", line);
    assert!(line.contains("keyword"));
}

#[test]
fn test_index_pdf() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "guide.pdf");
    let (stdout, stderr, success) = run_docrag(&config_path, &["index", &file]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("collection 'default'"));
}

#[test]
fn test_index_empty_document_warns() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "blank.docx");
    let (stdout, stderr, success) =
        run_docrag(&config_path, &["index", &file, "--collection", "blank"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("no text could be extracted"));

    let (stdout, _, _) = run_docrag(&config_path, &["collections"]);
    assert!(stdout.contains("No collections indexed."));
}

#[test]
fn test_index_broken_pdf_fails() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "broken.pdf");
    let (_, stderr, success) = run_docrag(&config_path, &["index", &file]);
    assert!(!success, "broken PDF should fail");
    assert!(stderr.contains("PDF extraction failed"), "stderr={}", stderr);
}

#[test]
fn test_index_unknown_type_fails() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "notes.txt");
    let (_, stderr, success) = run_docrag(&config_path, &["index", &file]);
    assert!(!success);
    assert!(stderr.contains("--content-type"), "stderr={}", stderr);
}

#[test]
fn test_reindex_replaces_collection() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "letters.docx");
    run_docrag(&config_path, &["index", &file, "--chunk-size", "2"]);
    let (stdout, _, success) = run_docrag(&config_path, &["index", &file, "--chunk-size", "100"]);
    assert!(success);
    assert!(stdout.contains("1 chunks"));

    let (stdout, _, _) = run_docrag(&config_path, &["collections"]);
    let line = stdout.lines().find(|l| l.starts_with("default")).unwrap();
    assert!(line.contains(" 1 "), "line={}", line);
}

#[test]
fn test_ask_missing_collection() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_docrag_with_env(
        &config_path,
        &["ask", "X?", "--collection", "T"],
        Some("test-secret"),
    );
    assert!(!success);
    assert!(stderr.contains("collection 'T' not found"), "stderr={}", stderr);
}

#[test]
fn test_ask_without_credential_fails() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "letters.docx");
    run_docrag(&config_path, &["index", &file]);

    let (_, stderr, success) = run_docrag(&config_path, &["ask", "What letters?"]);
    assert!(!success);
    assert!(stderr.contains(KEY_ENV), "stderr={}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ask_end_to_end_with_mock_service() {
    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    let app = Router::new().route(
        "/chat/completions",
        post(|Json(body): Json<Value>| async move {
            let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
            let answer = if prompt.contains("BBBB") {
                "The letters are A, B and C."
            } else {
                "I don't have this information yet."
            };
            Json(json!({"choices": [{"message": {"content": answer}}]}))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (_tmp, config_path) = setup_test_env_with_completion(&format!("http://{}", addr));
    let file = doc(&config_path, "letters.docx");

    let (stdout, stderr, success) = tokio::task::spawn_blocking(move || {
        run_docrag(&config_path, &["index", &file]);
        run_docrag_with_env(
            &config_path,
            &["ask", "Which letters appear?", "--show-context", "-k", "2"],
            Some("test-secret"),
        )
    })
    .await
    .unwrap();

    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("AAAA BBBB CCCC"), "context not shown: {}", stdout);
    assert!(stdout.trim_end().ends_with("The letters are A, B and C."));
}

#[test]
fn test_drop_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let file = doc(&config_path, "letters.docx");
    run_docrag(&config_path, &["index", &file, "--collection", "gone"]);

    let (stdout, _, success) = run_docrag(&config_path, &["drop", "gone"]);
    assert!(success);
    assert!(stdout.contains("Dropped collection 'gone'"));

    let (stdout, _, success) = run_docrag(&config_path, &["drop", "gone"]);
    assert!(success, "second drop should succeed");
    assert!(stdout.contains("does not exist"));
}

#[test]
fn test_status_never_prints_credential() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_docrag(&config_path, &["status"]);
    assert!(success);
    assert!(stdout.contains(KEY_ENV));
    assert!(stdout.contains("NOT SET"));
    assert!(stdout.contains("not initialized"));

    let (stdout, _, success) =
        run_docrag_with_env(&config_path, &["status"], Some("super-secret-value"));
    assert!(success);
    assert!(stdout.contains("(set)"));
    assert!(!stdout.contains("super-secret-value"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");
    let (_, stderr, success) = run_docrag(&missing, &["collections"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr={}", stderr);
}
