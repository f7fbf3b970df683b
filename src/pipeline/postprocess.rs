//! Post-processing: deterministic noise filter for transcribed essay text.
//!
//! Both engines leave characteristic debris behind. Tesseract turns ruling,
//! margins and smudges into lines of punctuation (`~~--__..`) and emits
//! vowel-less consonant clusters (`xtrmn`) when it cannot segment a word.
//! Vision models occasionally wrap the answer in a code fence. The rules
//! here remove that debris without touching genuine words.
//!
//! ## Idempotence
//!
//! `clean_ocr_text(clean_ocr_text(s)) == clean_ocr_text(s)` for every `s`.
//! The symbol-line rule is evaluated *after* token filtering, so a line that
//! only becomes pure punctuation once its garbage tokens are gone is dropped
//! in the same pass instead of the next one. A line emptied by the token
//! filter is dropped too; lines that were already blank stay as paragraph
//! breaks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines with no letters and more than this many symbols are artifacts.
const MAX_SYMBOLS_IN_LETTERLESS_LINE: usize = 3;

/// Tokens at least this long must contain a vowel to survive.
const MIN_TOKEN_LEN_FOR_VOWEL_CHECK: usize = 4;

/// Apply all noise-filter rules to raw transcribed text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF → LF) and strip invisible Unicode
/// 2. Per line: collapse runs of spaces/tabs to a single space
/// 3. Per line: drop tokens of 4+ characters with no vowel and no digit
/// 4. Per line: drop the line if the token filter emptied it, or if it has
///    no letters and more than 3 symbols
/// 5. Collapse runs of blank lines to one blank line (paragraph break)
/// 6. Trim the whole result
pub fn clean_ocr_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);

    let lines: Vec<String> = s
        .split('\n')
        .filter_map(|line| {
            let filtered = filter_tokens(line);
            let emptied = filtered.is_empty() && !line.trim().is_empty();
            (!emptied && !is_symbol_artifact(&filtered)).then_some(filtered)
        })
        .collect();

    let joined = lines.join("\n");
    let collapsed = collapse_blank_lines(&joined);
    collapsed.trim().to_string()
}

/// Strip one outer ```` ``` ```` fence (optionally tagged) around a response.
pub fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").unwrap());

// ── Rule 1: Line endings and invisible characters ────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rules 2–3: Whitespace collapse and token filter ──────────────────────────

fn filter_tokens(line: &str) -> String {
    line.split_whitespace()
        .filter(|token| keep_token(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A token survives if it is short, has a vowel, or has a digit.
///
/// The digit exemption keeps numbers and dates (`1988`, `2º`, `R$100`).
/// Long symbol runs (`----`, `####`) have neither and are dropped.
fn keep_token(token: &str) -> bool {
    if token.chars().count() < MIN_TOKEN_LEN_FOR_VOWEL_CHECK {
        return true;
    }
    token.chars().any(|c| c.is_numeric() || is_vowel(c))
}

fn is_vowel(c: char) -> bool {
    c.to_lowercase().any(|l| {
        matches!(
            l,
            'a' | 'e' | 'i' | 'o' | 'u'
                | 'á' | 'à' | 'â' | 'ã' | 'ä'
                | 'é' | 'è' | 'ê' | 'ë'
                | 'í' | 'ì' | 'î' | 'ï'
                | 'ó' | 'ò' | 'ô' | 'õ' | 'ö'
                | 'ú' | 'ù' | 'û' | 'ü'
        )
    })
}

// ── Rule 4: Symbol-only artifact lines ───────────────────────────────────────

fn is_symbol_artifact(line: &str) -> bool {
    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let symbols = line
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace())
        .count();
    letters == 0 && symbols > MAX_SYMBOLS_IN_LETTERLESS_LINE
}

// ── Rule 5: Paragraph breaks ─────────────────────────────────────────────────

static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUNS.replace_all(input, "\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_line_without_letters_is_dropped() {
        assert_eq!(clean_ocr_text("####!!"), "");
        assert_eq!(clean_ocr_text("Texto\n####!!\nfim"), "Texto\nfim");
    }

    #[test]
    fn symbol_line_with_one_letter_is_kept() {
        assert_eq!(clean_ocr_text("a####!!"), "a####!!");
    }

    #[test]
    fn three_symbols_are_tolerated() {
        assert_eq!(clean_ocr_text("..."), "...");
        assert_eq!(clean_ocr_text("— —"), "— —");
    }

    #[test]
    fn vowelless_long_token_is_dropped() {
        assert_eq!(clean_ocr_text("uma xyzw casa"), "uma casa");
    }

    #[test]
    fn short_tokens_survive_vowel_check() {
        assert_eq!(clean_ocr_text("xyz casa"), "xyz casa");
        assert_eq!(clean_ocr_text("e o cd"), "e o cd");
    }

    #[test]
    fn accented_vowels_anchor_tokens() {
        assert_eq!(clean_ocr_text("pôr trás"), "pôr trás");
        assert_eq!(clean_ocr_text("MÃES"), "MÃES");
    }

    #[test]
    fn numbers_are_not_consonant_clusters() {
        assert_eq!(clean_ocr_text("Em 1988 a lei"), "Em 1988 a lei");
    }

    #[test]
    fn long_symbol_runs_next_to_words_are_dropped() {
        assert_eq!(clean_ocr_text("casa ----"), "casa");
        assert_eq!(clean_ocr_text("casa ####"), "casa");
        assert_eq!(clean_ocr_text("a lei de 1988 ~~~~ vale"), "a lei de 1988 vale");
        assert_eq!(clean_ocr_text("R$100 --"), "R$100 --");
    }

    #[test]
    fn blank_lines_survive_but_emptied_lines_do_not() {
        assert_eq!(clean_ocr_text("um\n\ndois"), "um\n\ndois");
        assert_eq!(clean_ocr_text("um\nbcdf ----\ndois"), "um\ndois");
    }

    #[test]
    fn horizontal_whitespace_collapses_per_line() {
        assert_eq!(clean_ocr_text("a  \t b\nc    d"), "a b\nc d");
    }

    #[test]
    fn paragraph_breaks_are_preserved_and_normalised() {
        let input = "Primeiro parágrafo.\n\n\n\nSegundo parágrafo.\r\n\r\nTerceiro.";
        assert_eq!(
            clean_ocr_text(input),
            "Primeiro parágrafo.\n\nSegundo parágrafo.\n\nTerceiro."
        );
    }

    #[test]
    fn line_that_becomes_symbolic_after_filtering_is_dropped() {
        assert_eq!(clean_ocr_text("texto\nxyzw ####\nfim"), "texto\nfim");
    }

    #[test]
    fn invisible_chars_removed() {
        assert_eq!(clean_ocr_text("ca\u{200B}sa\u{FEFF}"), "casa");
    }

    #[test]
    fn idempotent_on_tricky_inputs() {
        let samples = [
            "",
            "   \n\n  ",
            "####!!\na####!!",
            "xyzw ####\n\n\n\nbcdf ghjk\tcasa",
            "  Primeiro   parágrafo  \n\n\n Segundo \r\n",
            "--- ~~~ ___\nxyz\n\n\n\n1988",
            "```\ncorpo da redação\n```",
        ];
        for s in samples {
            let once = clean_ocr_text(s);
            assert_eq!(clean_ocr_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn idempotent_on_generated_inputs() {
        const ALPHABET: &[char] = &[
            'a', 'e', 'ã', 'É', 'ô', 'u', 'b', 'c', 'x', 'y', 'z', 'w', 'R', 'ç', '1', '9', '0',
            '#', '!', '-', '~', '.', ',', '$', '—', ' ', ' ', '\t', '\n', '\n', '\r',
            '\u{200B}', '\u{FEFF}', '\u{00AD}',
        ];
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };
        for _ in 0..2000 {
            let len = (next() % 40) as usize;
            let s: String = (0..len)
                .map(|_| ALPHABET[(next() % ALPHABET.len() as u64) as usize])
                .collect();
            let once = clean_ocr_text(&s);
            assert_eq!(clean_ocr_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn strips_tagged_and_untagged_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\ntexto\n```\n"), "texto");
        assert_eq!(strip_code_fences("sem cerca"), "sem cerca");
    }
}
