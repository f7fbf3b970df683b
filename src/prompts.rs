//! Prompts for transcription, scoring and grammar rewriting.
//!
//! Every prompt lives here so wording changes touch exactly one file and unit
//! tests can inspect prompts without a live provider. Essays are written in
//! Brazilian Portuguese, so the prompts are too.
//!
//! Callers can override the transcription instruction via
//! [`crate::config::ExtractionConfig::transcription_prompt`].

/// System message for the AI transcription engine.
pub const TRANSCRIPTION_SYSTEM_PROMPT: &str =
    "Você é um OCR avançado especializado em redações manuscritas.";

/// Default instruction sent with the essay image.
pub const DEFAULT_TRANSCRIPTION_PROMPT: &str = r#"Você está vendo a imagem de uma redação manuscrita do ENEM.

Regras:
- Ignore completamente cabeçalho, logos, margens, sombras e teclado.
- Leia SOMENTE as linhas manuscritas do corpo do texto.
- As linhas do caderno (linhas vermelhas ou cinzas) NÃO são texto.
- Preserve os parágrafos exatamente como aparecem (linha em branco entre eles).
- Se alguma palavra estiver pouco legível, tente inferir sem inventar frases inteiras.
- Não adicione comentários, títulos ou observações.
- Retorne APENAS o texto puro da redação em português."#;

/// System message for the scoring collaborator.
pub const ASSESSMENT_SYSTEM_PROMPT: &str = r#"Você é um corretor especialista em redações do ENEM.
Avalie a redação de acordo com as 5 competências do ENEM (0 a 200 cada):

Comp 1: domínio da norma padrão.
Comp 2: compreensão da proposta e organização das ideias.
Comp 3: seleção e organização de argumentos.
Comp 4: coesão e coerência na articulação do texto.
Comp 5: proposta de intervenção detalhada, respeitando direitos humanos.

Regras:
- Seja objetivo e técnico, mas em linguagem acessível ao estudante.
- Pode citar trechos da redação quando necessário.
- Sempre responda em JSON exatamente no formato solicitado."#;

const ASSESSMENT_FORMAT: &str = r#"{
  "competencias": {
    "comp1": {"nota": 0, "justificativa": "..."},
    "comp2": {"nota": 0, "justificativa": "..."},
    "comp3": {"nota": 0, "justificativa": "..."},
    "comp4": {"nota": 0, "justificativa": "..."},
    "comp5": {"nota": 0, "justificativa": "..."}
  },
  "nota_total": 0,
  "comentario_geral": "...",
  "sugestoes_reescrita": ["...", "...", "..."]
}"#;

/// Build the scoring request for an essay and optional topic.
pub fn assessment_prompt(essay: &str, topic: Option<&str>) -> String {
    let topic_line = match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!("TEMA: {t}\n\n"),
        None => String::new(),
    };
    format!(
        "{topic_line}REDAÇÃO DO ALUNO:\n\"\"\"{essay}\"\"\"\n\n\
TAREFA:\n\
1. Atribua uma nota (0 a 200) para cada competência.\n\
2. Justifique cada nota brevemente, apontando pontos fortes e pontos a melhorar.\n\
3. Calcule a nota total (soma das 5 competências).\n\
4. Dê um comentário geral.\n\
5. Sugira 3 ações concretas para o aluno melhorar na próxima redação.\n\n\
RESPONDA OBRIGATORIAMENTE EM JSON COM O SEGUINTE FORMATO:\n\n{ASSESSMENT_FORMAT}"
    )
}

/// System message for the grammar-rewrite collaborator.
pub const REWRITE_SYSTEM_PROMPT: &str =
    "Você reescreve textos em português do Brasil na norma-padrão.";

/// Build the grammar-rewrite request.
pub fn rewrite_prompt(essay: &str) -> String {
    format!(
        r#"Você é um revisor de textos em português do Brasil, especialista em norma-padrão.

Reescreva o texto abaixo, corrigindo:
- ortografia
- concordância verbal e nominal
- pontuação
- regência e colocação pronominal
- repetições muito evidentes, apenas quando necessário

Mantenha:
- o sentido original do texto
- a estrutura de parágrafos (linha em branco entre eles)
- o nível de linguagem típico de redação do ENEM (formal e claro)

NÃO explique, NÃO comente e NÃO faça lista.
Responda APENAS com o texto reescrito.

TEXTO DO ALUNO:
"""{essay}""""#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_prompt_includes_topic_when_present() {
        let p = assessment_prompt("Texto.", Some("Mobilidade urbana"));
        assert!(p.starts_with("TEMA: Mobilidade urbana"));
        assert!(p.contains("\"\"\"Texto.\"\"\""));
        assert!(p.contains("\"nota_total\""));
    }

    #[test]
    fn blank_topic_is_omitted() {
        let p = assessment_prompt("Texto.", Some("   "));
        assert!(p.starts_with("REDAÇÃO DO ALUNO"));
    }

    #[test]
    fn rewrite_prompt_wraps_essay() {
        let p = rewrite_prompt("eu vai");
        assert!(p.ends_with("\"\"\"eu vai\"\"\""));
        assert!(p.contains("estrutura de parágrafos"));
    }

    #[test]
    fn transcription_prompt_mentions_paragraphs_and_ruling() {
        assert!(DEFAULT_TRANSCRIPTION_PROMPT.contains("parágrafos"));
        assert!(DEFAULT_TRANSCRIPTION_PROMPT.contains("linhas do caderno"));
    }
}
