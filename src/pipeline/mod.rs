//! Pipeline stages for essay text extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ classify ──▶ normalize ──▶ orchestrate ──▶ postprocess
//! (path/URL) (pdf/image)  (deskew, bw)  (AI → OCR)      (noise filter)
//!               │
//!               └──▶ native PDF text ─────────────────▶ postprocess
//! ```
//!
//! 1. [`input`]     — read a local file or download a URL into a `Document`
//! 2. [`classify`]  — native PDF text, first-page rasterisation via [`render`],
//!    or image passthrough
//! 3. [`normalize`] — aggressive or gentle cleanup of the page image; CPU
//!    bound, run in `spawn_blocking`
//! 4. [`orchestrate`] — primary transcription with quality gate and fallback;
//!    images reach the engines through [`encode`]
//! 5. [`postprocess`] — drop vowel-less tokens and symbol-only lines

pub mod classify;
pub mod encode;
pub mod input;
pub mod normalize;
pub mod orchestrate;
pub mod postprocess;
pub mod render;
