//! Essay review: score the essay, rewrite it, score the rewrite, compare.
//!
//! ```text
//! text ──▶ clean_ocr_text ──▶ score ──────────────────────┐
//!                   │                                     ├──▶ compare
//!                   └──▶ rewrite ──▶ score ───────────────┘
//! ```
//!
//! The steps run sequentially. A score the model answered but we could not
//! interpret is kept in the report (with the raw answer) instead of
//! aborting, and no comparison is made against it.

use crate::compare::{compare_assessments, Comparison};
use crate::config::ExtractionConfig;
use crate::error::{EssayError, ReviewError};
use crate::extract::resolve_provider;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::rewrite::GrammarRewriter;
use crate::scoring::{Assessment, EssayScorer, LlmCompleter, TextCompleter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// A scoring result as it appears in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssessmentOutcome {
    // Listed first: an `Assessment` accepts any object, so untagged
    // deserialisation must try the stricter shape before it.
    Failed { error: String, raw_response: String },
    Scored(Assessment),
}

impl AssessmentOutcome {
    pub fn assessment(&self) -> Option<&Assessment> {
        match self {
            AssessmentOutcome::Scored(a) => Some(a),
            AssessmentOutcome::Failed { .. } => None,
        }
    }
}

/// Everything produced by one review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    #[serde(rename = "texto_original")]
    pub original_text: String,
    #[serde(rename = "avaliacao_original")]
    pub original: AssessmentOutcome,
    #[serde(rename = "texto_corrigido")]
    pub rewritten_text: String,
    #[serde(rename = "avaliacao_corrigida")]
    pub rewritten: AssessmentOutcome,
    #[serde(rename = "comparativo", skip_serializing_if = "Option::is_none", default)]
    pub comparison: Option<Comparison>,
}

/// Drives the review flow over one [`TextCompleter`].
#[derive(Clone)]
pub struct EssayReviewer {
    scorer: EssayScorer,
    rewriter: GrammarRewriter,
}

impl EssayReviewer {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self {
            scorer: EssayScorer::new(Arc::clone(&completer)),
            rewriter: GrammarRewriter::new(completer),
        }
    }

    /// Use the same provider resolution as extraction.
    pub async fn from_config(config: &ExtractionConfig) -> Result<Self, EssayError> {
        let provider = resolve_provider(config).await?;
        let completer = LlmCompleter::new(provider, config.temperature, config.max_tokens);
        Ok(Self::new(Arc::new(completer)))
    }

    /// Review `text`, optionally against a stated `topic`.
    ///
    /// Provider failures abort the review. Uninterpretable scores become
    /// [`AssessmentOutcome::Failed`].
    pub async fn review(
        &self,
        text: &str,
        topic: Option<&str>,
    ) -> Result<ReviewReport, ReviewError> {
        let original_text = clean_ocr_text(text);

        info!("Scoring original essay ({} chars)", original_text.chars().count());
        let original = self.score(&original_text, topic).await?;

        let rewritten_text = self.rewriter.rewrite(&original_text).await?;

        info!("Scoring rewritten essay ({} chars)", rewritten_text.chars().count());
        let rewritten = self.score(&rewritten_text, topic).await?;

        let comparison = match (original.assessment(), rewritten.assessment()) {
            (Some(a), Some(b)) => Some(compare_assessments(a, b)),
            _ => {
                warn!("Skipping comparison: an assessment could not be interpreted");
                None
            }
        };

        if let Some(ref c) = comparison {
            info!(
                "Review complete: {} → {} ({:+})",
                c.total_original, c.total_rewritten, c.total_delta
            );
        }

        Ok(ReviewReport {
            original_text,
            original,
            rewritten_text,
            rewritten,
            comparison,
        })
    }

    async fn score(
        &self,
        text: &str,
        topic: Option<&str>,
    ) -> Result<AssessmentOutcome, ReviewError> {
        match self.scorer.score(text, topic).await {
            Ok(a) => Ok(AssessmentOutcome::Scored(a)),
            Err(ReviewError::Interpretation {
                message,
                raw_response,
            }) => Ok(AssessmentOutcome::Failed {
                error: message,
                raw_response,
            }),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_serialises_like_an_error_object() {
        let outcome = AssessmentOutcome::Failed {
            error: "Falha ao interpretar JSON de avaliação".into(),
            raw_response: "oops".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["raw_response"], "oops");
        assert!(outcome.assessment().is_none());
    }

    #[test]
    fn scored_outcome_serialises_as_the_assessment() {
        let outcome = AssessmentOutcome::Scored(Assessment {
            total: 720,
            ..Default::default()
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["nota_total"], 720);
    }
}
