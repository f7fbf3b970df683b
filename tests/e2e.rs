//! End-to-end integration tests for edgequake-essay2txt.
//!
//! These tests use real scans in `./test_cases/` and make live LLM API
//! calls (plus libpdfium for PDFs). They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. cargo test --test e2e -- --nocapture
//!
//! With the Tesseract fallback linked in:
//!   E2E_ENABLED=1 cargo test --features tesseract --test e2e -- --nocapture

use edgequake_essay2txt::{
    extract_from_path, validate_essay_text, EssayReviewer, ExtractionConfig,
    ExtractionProgressCallback, ExtractionRoute, NoopProgressCallback, NormalizationMode,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Checks every cleaned text must pass regardless of route.
fn assert_clean_text(text: &str, context: &str) {
    assert_eq!(text, text.trim(), "[{context}] text must be trimmed");
    assert!(
        !text.contains("\n\n\n"),
        "[{context}] paragraphs must be separated by a single blank line"
    );
    assert!(
        !text.starts_with("```"),
        "[{context}] output must not start with a code fence"
    );
    assert_eq!(
        edgequake_essay2txt::clean_ocr_text(text),
        text,
        "[{context}] noise filter must be idempotent"
    );
}

// ── Live extraction ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_extract_handwritten_photo() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("handwritten_ruled.jpg"));

    let config = ExtractionConfig::default();
    let output = extract_from_path(path.to_str().unwrap(), None, &config)
        .await
        .expect("extraction should succeed");

    println!("route={} engine={:?} {}ms", output.route, output.engine, output.duration_ms);
    assert!(matches!(
        output.route,
        ExtractionRoute::Primary | ExtractionRoute::Fallback
    ));
    assert!(output.normalized, "a decodable photo must be normalised");
    assert_clean_text(&output.text, "handwritten_ruled.jpg");
    validate_essay_text(&output.text, config.min_essay_chars).expect("essay text expected");

    println!("--- BEGIN OUTPUT ---\n{}\n--- END OUTPUT ---", output.text);
}

#[tokio::test]
async fn test_extract_clean_scan_gentle() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("flatbed_scan.png"));

    let config = ExtractionConfig::builder()
        .normalization(NormalizationMode::Gentle)
        .build()
        .unwrap();
    let output = extract_from_path(path.to_str().unwrap(), None, &config)
        .await
        .expect("extraction should succeed");

    assert_clean_text(&output.text, "flatbed_scan.png");
    assert!(!output.text.is_empty());
}

#[tokio::test]
async fn test_extract_typed_pdf_uses_native_text() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("typed_essay.pdf"));

    let output = extract_from_path(path.to_str().unwrap(), None, &ExtractionConfig::default())
        .await
        .expect("extraction should succeed");

    assert_eq!(output.route, ExtractionRoute::NativeText);
    assert_eq!(output.engine, None);
    assert_clean_text(&output.text, "typed_essay.pdf");
}

#[tokio::test]
async fn test_extract_scanned_pdf_rasterises_first_page() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("scanned_essay.pdf"));

    let output = extract_from_path(path.to_str().unwrap(), None, &ExtractionConfig::default())
        .await
        .expect("extraction should succeed");

    assert_ne!(output.route, ExtractionRoute::NativeText);
    assert_clean_text(&output.text, "scanned_essay.pdf");
}

#[tokio::test]
async fn test_extract_json_serialisable() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("handwritten_ruled.jpg"));

    let output = extract_from_path(path.to_str().unwrap(), None, &ExtractionConfig::default())
        .await
        .expect("extraction should succeed");

    let json = serde_json::to_value(&output).expect("output must serialise");
    assert!(json["text"].is_string());
    assert!(json["route"].is_string());
}

#[tokio::test]
async fn test_review_live() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("typed_essay.pdf"));

    let config = ExtractionConfig::default();
    let output = extract_from_path(path.to_str().unwrap(), None, &config)
        .await
        .expect("extraction should succeed");

    let reviewer = EssayReviewer::from_config(&config)
        .await
        .expect("provider must be configured");
    let report = reviewer
        .review(&output.text, Some("Desafios da mobilidade urbana no Brasil"))
        .await
        .expect("review should succeed");

    assert!(!report.rewritten_text.is_empty());
    if let Some(cmp) = report.comparison {
        assert_eq!(cmp.competencies.len(), 5);
        assert_eq!(cmp.total_delta, cmp.total_rewritten - cmp.total_original);
        println!("{}", cmp.summary);
    }
}

// ── Offline checks (no LLM calls, always run) ────────────────────────────────

#[tokio::test]
async fn test_missing_input_is_reported() {
    let err = extract_from_path("/no/such/redacao.jpg", None, &ExtractionConfig::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("File not found"), "got: {err}");
}

/// Callbacks are stored as `Arc<dyn …>` and must move into spawned tasks.
#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    let cb: Arc<dyn ExtractionProgressCallback> = Arc::new(NoopProgressCallback);
    tokio::spawn(async move {
        cb.on_extraction_complete(ExtractionRoute::Fallback, 0);
    })
    .await
    .expect("spawn must succeed");
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
}
