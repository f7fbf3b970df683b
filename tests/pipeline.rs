//! Pipeline integration tests with deterministic stand-ins.
//!
//! No network, no libpdfium and no Tesseract: the PDF reader, both
//! transcription engines and the LLM completer are in-process stubs that
//! record how they were called.

use async_trait::async_trait;
use edgequake_essay2txt::prompts::REWRITE_SYSTEM_PROMPT;
use edgequake_essay2txt::{
    AssessmentOutcome, Document, EssayError, EssayReviewer, ExtractionConfig, ExtractionProgressCallback,
    ExtractionRoute, Extractor, MediaKind, NormalizationMode, NormalizedImage, PdfReader,
    ReviewError, Stage, TextCompleter, TranscriptionEngine,
};
use image::{DynamicImage, GrayImage, Luma};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Stubs ────────────────────────────────────────────────────────────────────

struct StubEngine {
    name: &'static str,
    answer: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<(Vec<u8>, MediaKind)>>,
}

impl StubEngine {
    fn new(name: &'static str, answer: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name,
            answer: answer.into(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionEngine for StubEngine {
    fn name(&self) -> &str {
        self.name
    }

    async fn transcribe(&self, image: &NormalizedImage) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((image.bytes().to_vec(), image.kind()));
        self.answer.clone()
    }
}

enum PdfBehaviour {
    Pages(Vec<&'static str>),
    Corrupt,
}

struct StubPdf {
    behaviour: PdfBehaviour,
    renders: AtomicUsize,
}

impl StubPdf {
    fn new(behaviour: PdfBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            renders: AtomicUsize::new(0),
        })
    }
}

impl PdfReader for StubPdf {
    fn page_texts(&self, _pdf: &[u8]) -> Result<Vec<String>, EssayError> {
        match &self.behaviour {
            PdfBehaviour::Pages(p) => Ok(p.iter().map(|s| s.to_string()).collect()),
            PdfBehaviour::Corrupt => Err(EssayError::CorruptPdf {
                detail: "bad xref".into(),
            }),
        }
    }

    fn render_first_page(
        &self,
        _pdf: &[u8],
        _dpi: u32,
        _max_pixels: u32,
    ) -> Result<DynamicImage, EssayError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicImage::ImageLuma8(page_image()))
    }
}

/// White page with a dark block of "writing".
fn page_image() -> GrayImage {
    GrayImage::from_fn(80, 80, |x, y| {
        if (30..60).contains(&y) && (10..70).contains(&x) && x % 4 != 0 {
            Luma([20])
        } else {
            Luma([235])
        }
    })
}

fn png_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(page_image())
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

const LONG_ESSAY: &str = "A mobilidade urbana no Brasil enfrenta desafios históricos \
que afetam milhões de trabalhadores todos os dias.";

fn extractor(
    pdf: Arc<StubPdf>,
    primary: Arc<StubEngine>,
    secondary: Arc<StubEngine>,
) -> Extractor {
    Extractor::new(pdf, primary, secondary, ExtractionConfig::default())
}

fn no_pdf() -> Arc<StubPdf> {
    StubPdf::new(PdfBehaviour::Pages(vec![]))
}

// ── Classification routes ────────────────────────────────────────────────────

#[tokio::test]
async fn native_text_pdf_never_reaches_an_engine() {
    let pdf = StubPdf::new(PdfBehaviour::Pages(vec![
        "Redação\n\n####!!",
        "xyzw casa",
    ]));
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let secondary = StubEngine::new("tesseract", "");
    let ex = extractor(pdf.clone(), primary.clone(), secondary.clone());

    let out = ex
        .extract(&Document::new(b"%PDF-1.7".to_vec(), MediaKind::Pdf))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::NativeText);
    assert_eq!(out.raw_text, "Redação\n\n####!!\nxyzw casa");
    assert_eq!(out.text, "Redação\n\ncasa");
    assert_eq!(out.engine, None);
    assert_eq!(primary.calls(), 0);
    assert_eq!(secondary.calls(), 0);
    assert_eq!(pdf.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scanned_pdf_is_rasterised_and_transcribed() {
    let pdf = StubPdf::new(PdfBehaviour::Pages(vec!["  ", "\n"]));
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let secondary = StubEngine::new("tesseract", "");
    let ex = extractor(pdf.clone(), primary.clone(), secondary.clone());

    let out = ex
        .extract(&Document::new(b"%PDF-1.4".to_vec(), MediaKind::Pdf))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Primary);
    assert_eq!(out.text, LONG_ESSAY);
    assert!(out.normalized);
    assert_eq!(pdf.renders.load(Ordering::SeqCst), 1);
    let seen = primary.seen.lock().unwrap();
    assert_eq!(seen[0].1, MediaKind::Png);
    assert_eq!(MediaKind::sniff(&seen[0].0), MediaKind::Png);
}

#[tokio::test]
async fn corrupt_pdf_is_empty_and_unreadable() {
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let secondary = StubEngine::new("tesseract", LONG_ESSAY);
    let ex = extractor(
        StubPdf::new(PdfBehaviour::Corrupt),
        primary.clone(),
        secondary.clone(),
    );

    let out = ex
        .extract(&Document::new(b"%PDF-garbage".to_vec(), MediaKind::Pdf))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Unreadable);
    assert!(out.is_empty());
    assert_eq!(primary.calls() + secondary.calls(), 0);
}

#[tokio::test]
async fn unsupported_media_is_empty_with_no_engine_calls() {
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let secondary = StubEngine::new("tesseract", LONG_ESSAY);
    let ex = extractor(no_pdf(), primary.clone(), secondary.clone());

    let doc = Document::from_content_type(b"just some text".to_vec(), "text/plain");
    let out = ex.extract(&doc).await.unwrap();

    assert_eq!(out.route, ExtractionRoute::Unsupported);
    assert_eq!(out.text, "");
    assert_eq!(primary.calls() + secondary.calls(), 0);
}

#[tokio::test]
async fn empty_payload_is_unsupported() {
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let ex = extractor(no_pdf(), primary.clone(), StubEngine::new("tesseract", ""));

    let out = ex
        .extract(&Document::new(Vec::new(), MediaKind::Jpeg))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Unsupported);
    assert_eq!(primary.calls(), 0);
}

// ── Normalisation passthrough ────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_image_reaches_engine_unchanged() {
    let garbage = b"\xFF\xD8\xFFnot really a jpeg".to_vec();
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let ex = extractor(no_pdf(), primary.clone(), StubEngine::new("tesseract", ""));

    let out = ex
        .extract(&Document::new(garbage.clone(), MediaKind::Jpeg))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Primary);
    assert!(!out.normalized);
    let seen = primary.seen.lock().unwrap();
    assert_eq!(seen[0].0, garbage);
    assert_eq!(seen[0].1, MediaKind::Jpeg);
}

#[tokio::test]
async fn gentle_mode_keeps_dimensions() {
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let config = ExtractionConfig::builder()
        .normalization(NormalizationMode::Gentle)
        .build()
        .unwrap();
    let ex = Extractor::new(no_pdf(), primary.clone(), StubEngine::new("tesseract", ""), config);

    let out = ex
        .extract(&Document::new(png_bytes(), MediaKind::Png))
        .await
        .unwrap();

    assert!(out.normalized);
    let seen = primary.seen.lock().unwrap();
    let img = image::load_from_memory(&seen[0].0).unwrap();
    assert_eq!((img.width(), img.height()), (80, 80));
}

// ── Quality gate ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn long_primary_answer_skips_fallback() {
    let primary = StubEngine::new("vision", "x".repeat(51));
    let secondary = StubEngine::new("tesseract", "never used");
    let ex = extractor(no_pdf(), primary.clone(), secondary.clone());

    let out = ex
        .extract(&Document::new(png_bytes(), MediaKind::Png))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Primary);
    assert_eq!(out.engine.as_deref(), Some("vision"));
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);
}

#[tokio::test]
async fn short_primary_answer_returns_fallback_even_when_empty() {
    let primary = StubEngine::new("vision", format!("  {}  ", "palavra ".repeat(6).trim()));
    let secondary = StubEngine::new("tesseract", "");
    let ex = extractor(no_pdf(), primary.clone(), secondary.clone());

    let out = ex
        .extract(&Document::new(png_bytes(), MediaKind::Png))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Fallback);
    assert_eq!(out.engine.as_deref(), Some("tesseract"));
    assert_eq!(out.text, "");
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 1);
}

#[tokio::test]
async fn fallback_text_is_noise_filtered() {
    let primary = StubEngine::new("vision", "");
    let secondary = StubEngine::new("tesseract", "~~~~----\nO texto da redação\n\n\n\nsgnd prgrf");
    let ex = extractor(no_pdf(), primary, secondary);

    let out = ex
        .extract(&Document::new(png_bytes(), MediaKind::Png))
        .await
        .unwrap();

    assert_eq!(out.route, ExtractionRoute::Fallback);
    assert_eq!(out.text, "O texto da redação");
    assert!(out.raw_text.contains("sgnd"));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    stages: Mutex<Vec<Stage>>,
    engines: Mutex<Vec<(String, usize)>>,
    done: Mutex<Option<(ExtractionRoute, usize)>>,
}

impl ExtractionProgressCallback for Recorder {
    fn on_stage(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }
    fn on_engine_complete(&self, engine: &str, chars: usize) {
        self.engines.lock().unwrap().push((engine.to_string(), chars));
    }
    fn on_extraction_complete(&self, route: ExtractionRoute, chars: usize) {
        *self.done.lock().unwrap() = Some((route, chars));
    }
}

#[tokio::test]
async fn progress_follows_the_fallback_path() {
    let recorder = Arc::new(Recorder::default());
    let config = ExtractionConfig::builder()
        .progress_callback(recorder.clone() as Arc<dyn ExtractionProgressCallback>)
        .build()
        .unwrap();
    let ex = Extractor::new(
        no_pdf(),
        StubEngine::new("vision", "curto"),
        StubEngine::new("tesseract", "texto"),
        config,
    );

    ex.extract(&Document::new(png_bytes(), MediaKind::Png))
        .await
        .unwrap();

    assert_eq!(
        *recorder.stages.lock().unwrap(),
        vec![
            Stage::Classify,
            Stage::Normalize,
            Stage::PrimaryOcr,
            Stage::QualityGate,
            Stage::SecondaryOcr,
            Stage::Clean,
        ]
    );
    assert_eq!(
        *recorder.engines.lock().unwrap(),
        vec![("vision".to_string(), 5), ("tesseract".to_string(), 5)]
    );
    assert_eq!(
        *recorder.done.lock().unwrap(),
        Some((ExtractionRoute::Fallback, 5))
    );
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn one_extractor_serves_concurrent_documents() {
    let primary = StubEngine::new("vision", LONG_ESSAY);
    let ex = extractor(no_pdf(), primary.clone(), StubEngine::new("tesseract", ""));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ex = ex.clone();
            tokio::spawn(async move {
                ex.extract(&Document::new(png_bytes(), MediaKind::Png))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.await.unwrap().route, ExtractionRoute::Primary);
    }
    assert_eq!(primary.calls(), 4);
}

// ── Review flow ──────────────────────────────────────────────────────────────

const REWRITTEN: &str = "A mobilidade urbana no Brasil enfrenta desafios históricos.";

/// Scores the original at 480 and the rewrite at 560.
struct StubCompleter {
    scoring_answer_for_original: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl TextCompleter for StubCompleter {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReviewError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if system == REWRITE_SYSTEM_PROMPT {
            return Ok(format!("```\n{REWRITTEN}\n```"));
        }
        if prompt.contains(REWRITTEN) {
            Ok(r#"{"competencias": {"comp1": {"nota": 160, "justificativa": "ok"}}, "nota_total": 560}"#.into())
        } else {
            Ok(self.scoring_answer_for_original.into())
        }
    }
}

#[tokio::test]
async fn review_compares_original_and_rewrite() {
    let completer = Arc::new(StubCompleter {
        scoring_answer_for_original: r#"{"competencias": {"comp1": {"nota": 80, "justificativa": "desvios"}}, "nota_total": 480}"#,
        calls: AtomicUsize::new(0),
    });
    let reviewer = EssayReviewer::new(completer.clone());

    let report = reviewer
        .review("A mobilidade urbana no brasil enfrenta desafios historicos", None)
        .await
        .unwrap();

    assert_eq!(report.rewritten_text, REWRITTEN);
    let cmp = report.comparison.expect("both assessments parsed");
    assert_eq!(cmp.total_original, 480);
    assert_eq!(cmp.total_rewritten, 560);
    assert_eq!(cmp.total_delta, 80);
    assert_eq!(cmp.competencies["comp1"].delta, 80);
    assert_eq!(completer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn uninterpretable_score_is_reported_without_comparison() {
    let completer = Arc::new(StubCompleter {
        scoring_answer_for_original: "Desculpe, não posso avaliar.",
        calls: AtomicUsize::new(0),
    });
    let reviewer = EssayReviewer::new(completer);

    let report = reviewer.review("Um texto qualquer.", Some("Tema")).await.unwrap();

    assert!(report.comparison.is_none());
    assert!(report.original.assessment().is_none());
    assert_eq!(report.rewritten.assessment().map(|a| a.total), Some(560));
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(
        json["avaliacao_original"]["raw_response"],
        "Desculpe, não posso avaliar."
    );
    assert!(json.get("comparativo").is_none());
}

#[tokio::test]
async fn empty_json_score_is_not_a_zero_assessment() {
    let completer = Arc::new(StubCompleter {
        scoring_answer_for_original: "{}",
        calls: AtomicUsize::new(0),
    });
    let reviewer = EssayReviewer::new(completer);

    let report = reviewer.review("Um texto qualquer.", None).await.unwrap();

    match &report.original {
        AssessmentOutcome::Failed { raw_response, .. } => assert_eq!(raw_response, "{}"),
        other => panic!("expected a failed outcome, got {other:?}"),
    }
    assert!(report.comparison.is_none());
}
