//! ENEM rubric scoring through an LLM.
//!
//! The model is asked for a fixed JSON shape (Portuguese field names, kept
//! as-is on the wire). Models are sloppy with it: scores arrive as `160`,
//! `160.0` or `"160"`, answers get wrapped in code fences, and sometimes
//! there is no JSON at all. Parsing tolerates the first two. Anything else,
//! including a JSON value without the rubric fields or with a score like
//! `"boa"`, is reported as [`ReviewError::Interpretation`] with the raw
//! answer attached.

use crate::error::ReviewError;
use crate::pipeline::postprocess::strip_code_fences;
use crate::prompts::{assessment_prompt, ASSESSMENT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The five ENEM competency keys, in rubric order.
pub const COMPETENCIES: [&str; 5] = ["comp1", "comp2", "comp3", "comp4", "comp5"];

/// Text-in, text-out access to a language model.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    /// One completion for `prompt` under the `system` instruction.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReviewError>;
}

/// [`TextCompleter`] over an `edgequake_llm` provider.
pub struct LlmCompleter {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmCompleter {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            options: CompletionOptions {
                temperature: Some(temperature),
                max_tokens: Some(max_tokens),
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl TextCompleter for LlmCompleter {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReviewError> {
        let messages = vec![ChatMessage::system(system), ChatMessage::user(prompt)];
        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ReviewError::Provider {
                message: e.to_string(),
            })?;
        debug!(
            "Completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Score and justification for one competency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetencyScore {
    #[serde(rename = "nota", deserialize_with = "lenient_score")]
    pub score: i64,
    #[serde(rename = "justificativa", default, deserialize_with = "lenient_text")]
    pub justification: String,
}

/// A rubric assessment of one essay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "competencias")]
    pub competencies: BTreeMap<String, CompetencyScore>,
    #[serde(rename = "nota_total", deserialize_with = "lenient_score")]
    pub total: i64,
    #[serde(rename = "comentario_geral", default, deserialize_with = "lenient_text")]
    pub general_comment: String,
    #[serde(rename = "sugestoes_reescrita", default)]
    pub suggestions: Vec<String>,
}

impl Assessment {
    /// Score for `competency`, 0 when the model left it out.
    pub fn score_of(&self, competency: &str) -> i64 {
        self.competencies
            .get(competency)
            .map(|c| c.score)
            .unwrap_or(0)
    }
}

/// Accept integers, floats (rounded) and numeric strings.
fn lenient_score<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let score = match &value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64),
        _ => None,
    };
    score.ok_or_else(|| D::Error::custom(format!("score is not numeric: {}", value)))
}

/// Accept a string or `null`.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse a model answer into an [`Assessment`].
///
/// Code fences are stripped; when prose surrounds the JSON object, the
/// outermost `{…}` span is tried as well.
pub fn parse_assessment(raw: &str) -> Result<Assessment, ReviewError> {
    let unfenced = strip_code_fences(raw);
    let candidate = unfenced.trim();

    let first_err = match from_object(candidate) {
        Ok(a) => return Ok(a),
        Err(e) => e,
    };

    if let (Some(open), Some(close)) = (candidate.find('{'), candidate.rfind('}')) {
        if open < close {
            if let Ok(a) = from_object(&candidate[open..=close]) {
                return Ok(a);
            }
        }
    }

    Err(ReviewError::Interpretation {
        message: format!("Falha ao interpretar JSON de avaliação: {}", first_err),
        raw_response: raw.to_string(),
    })
}

/// Deserialize an [`Assessment`] from a top-level JSON object only.
fn from_object(json: &str) -> Result<Assessment, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_object() {
        return Err(serde_json::Error::custom(format!(
            "expected a JSON object, found {}",
            value
        )));
    }
    serde_json::from_value(value)
}

/// Scores essays against the ENEM rubric.
#[derive(Clone)]
pub struct EssayScorer {
    completer: Arc<dyn TextCompleter>,
}

impl EssayScorer {
    pub fn new(completer: Arc<dyn TextCompleter>) -> Self {
        Self { completer }
    }

    /// Score `essay`, optionally against a stated `topic`.
    pub async fn score(&self, essay: &str, topic: Option<&str>) -> Result<Assessment, ReviewError> {
        let prompt = assessment_prompt(essay, topic);
        let raw = self
            .completer
            .complete(ASSESSMENT_SYSTEM_PROMPT, &prompt)
            .await?;
        parse_assessment(&raw).inspect_err(|e| warn!("{}", e))
    }
}
