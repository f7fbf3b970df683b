//! Grammar rewrite into standard Brazilian Portuguese.

use crate::error::ReviewError;
use crate::pipeline::postprocess::strip_code_fences;
use crate::prompts::{rewrite_prompt, REWRITE_SYSTEM_PROMPT};
use crate::scoring::TextCompleter;
use std::sync::Arc;
use tracing::debug;

/// Rewrites an essay fixing spelling, agreement, punctuation and regency
/// while keeping its meaning and paragraphs.
#[derive(Clone)]
pub struct GrammarRewriter {
    completer: Arc<dyn TextCompleter>,
}

impl GrammarRewriter {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self { completer }
    }

    /// Return the rewritten essay, trimmed.
    ///
    /// An empty answer is an [`ReviewError::Interpretation`]: scoring an empty
    /// rewrite would report a meaningless drop to zero.
    pub async fn rewrite(&self, essay: &str) -> Result<String, ReviewError> {
        let raw = self
            .completer
            .complete(REWRITE_SYSTEM_PROMPT, &rewrite_prompt(essay))
            .await?;
        let text = strip_code_fences(&raw).trim().to_string();
        if text.is_empty() {
            return Err(ReviewError::Interpretation {
                message: "resposta vazia do revisor gramatical".into(),
                raw_response: raw,
            });
        }
        debug!(
            "Rewrite: {} → {} chars",
            essay.chars().count(),
            text.chars().count()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Canned(&'static str);

    #[async_trait]
    impl TextCompleter for Canned {
        async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReviewError> {
            assert_eq!(system, REWRITE_SYSTEM_PROMPT);
            assert!(prompt.ends_with("\"\"\"A gente vai.\"\"\""));
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn trims_answer() {
        let rewriter = GrammarRewriter::new(Arc::new(Canned("\n  Nós vamos.  \n")));
        assert_eq!(rewriter.rewrite("A gente vai.").await.unwrap(), "Nós vamos.");
    }

    #[tokio::test]
    async fn blank_answer_is_an_interpretation_error() {
        let rewriter = GrammarRewriter::new(Arc::new(Canned("   ")));
        let err = rewriter.rewrite("A gente vai.").await.unwrap_err();
        assert_eq!(err.raw_response(), Some("   "));
    }
}
