//! Side-by-side comparison of two assessments of the same essay.

use crate::scoring::{Assessment, COMPETENCIES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Score movement for one competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    #[serde(rename = "nota_original")]
    pub original: i64,
    #[serde(rename = "nota_corrigida")]
    pub rewritten: i64,
    #[serde(rename = "ganho")]
    pub delta: i64,
}

impl ScoreDelta {
    pub fn new(original: i64, rewritten: i64) -> Self {
        Self {
            original,
            rewritten,
            delta: rewritten - original,
        }
    }
}

/// Original vs rewritten assessment, per competency and in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(rename = "nota_total_original")]
    pub total_original: i64,
    #[serde(rename = "nota_total_corrigida")]
    pub total_rewritten: i64,
    #[serde(rename = "ganho_total")]
    pub total_delta: i64,
    #[serde(rename = "deltas_competencias")]
    pub competencies: BTreeMap<String, ScoreDelta>,
    #[serde(rename = "analise_textual")]
    pub summary: String,
}

/// Compare two assessments. Missing scores count as 0.
pub fn compare_assessments(original: &Assessment, rewritten: &Assessment) -> Comparison {
    let competencies = COMPETENCIES
        .iter()
        .map(|c| {
            (
                c.to_string(),
                ScoreDelta::new(original.score_of(c), rewritten.score_of(c)),
            )
        })
        .collect();

    let total_delta = rewritten.total - original.total;
    let summary = format!(
        "A nota total do texto original foi {}, enquanto a nota estimada para o texto \
gramaticalmente corrigido foi {}, resultando em um ganho de {} pontos. Observe \
principalmente as competências em que o ganho foi maior para orientar seus estudos.",
        original.total, rewritten.total, total_delta
    );

    Comparison {
        total_original: original.total,
        total_rewritten: rewritten.total,
        total_delta,
        competencies,
        summary,
    }
}

impl Comparison {
    /// Competency with the largest gain, if any gained at all.
    pub fn largest_gain(&self) -> Option<(&str, i64)> {
        self.competencies
            .iter()
            .filter(|(_, d)| d.delta > 0)
            .max_by_key(|(_, d)| d.delta)
            .map(|(c, d)| (c.as_str(), d.delta))
    }
}
