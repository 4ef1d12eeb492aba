//! Field extractor for the N2 pass: one model response in, the four
//! canonical clause fields out.
//!
//! The grammar has three named rules that interact and therefore stay
//! explicit instead of collapsing into a single regex:
//! - label normalization (diacritics stripped, known misspellings mapped);
//! - scaffold-echo detection (a value that is just another empty label means
//!   the model echoed the prompt's answer scaffold);
//! - open-field continuation (lines without a label attach to the last field
//!   that was opened empty, until the next recognized label line).

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::dataset::FieldMap;

/// Leading answer label some models prepend ("Resposta:", "Saida:").
static RESPONSE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(resposta|saida)\s*:\s*").unwrap());

/// The four canonical fields, in prompt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Aplicabilidade,
    Selecao,
    Execao,
    Requisito,
}

impl Field {
    /// Map an already-normalized label to its field. Known misspellings of
    /// "execao" seen in model output are folded in; anything else is not a
    /// field.
    fn from_normalized(label: &str) -> Option<Self> {
        match label {
            "aplicabilidade" => Some(Self::Aplicabilidade),
            "selecao" => Some(Self::Selecao),
            "execao" | "excecao" | "execcao" => Some(Self::Execao),
            "requisito" => Some(Self::Requisito),
            _ => None,
        }
    }
}

/// Strip markdown fences and a leading answer label. Unlike the N1 cleaner
/// this keeps surrounding quotes: quoted field values are content here.
pub fn clean_output(text: &str) -> String {
    let cleaned = text.trim().replace("```", "");
    RESPONSE_LABEL.replace(cleaned.trim(), "").trim().to_string()
}

/// Strip diacritics (NFKD, non-ASCII dropped) and lowercase a raw label.
pub fn normalize_field_name(label: &str) -> String {
    label
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_lowercase()
}

/// Extract the four canonical fields from a model response.
///
/// Total function: all four keys are always present, unrecognized lines are
/// dropped, and running the extractor on its own well-formed output yields
/// the same record again.
pub fn extract_fields(text: &str) -> FieldMap {
    let cleaned = clean_output(text);
    let mut fields = FieldMap::default();
    let mut open: Option<Field> = None;

    for line in cleaned.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((raw_label, raw_value)) = split_label_line(line) {
            let Some(field) = Field::from_normalized(&normalize_field_name(raw_label)) else {
                // Unknown label: the whole line is dropped, the open field
                // (if any) is left as it was.
                continue;
            };

            let mut value = raw_value.trim().to_string();
            if is_scaffold_echo(&value) {
                value.clear();
            }

            open = value.is_empty().then_some(field);
            *slot(&mut fields, field) = value;
        } else if let Some(field) = open {
            let value = slot(&mut fields, field);
            value.push(' ');
            value.push_str(line);
        }
    }

    for field in [
        Field::Aplicabilidade,
        Field::Selecao,
        Field::Execao,
        Field::Requisito,
    ] {
        let value = slot(&mut fields, field);
        *value = value.trim().to_string();
    }
    fields
}

/// `label: value` with a non-empty label before the colon. The label ends at
/// the first colon that has at least one character before it.
fn split_label_line(line: &str) -> Option<(&str, &str)> {
    let idx = line.match_indices(':').map(|(i, _)| i).find(|&i| i > 0)?;
    Some((line[..idx].trim(), &line[idx + 1..]))
}

/// A value that is exactly one of the canonical labels followed by a colon:
/// the model echoed the next line of the prompt's empty answer scaffold.
fn is_scaffold_echo(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "aplicabilidade:" | "selecao:" | "execao:" | "requisito:"
    )
}

fn slot(fields: &mut FieldMap, field: Field) -> &mut String {
    match field {
        Field::Aplicabilidade => &mut fields.aplicabilidade,
        Field::Selecao => &mut fields.selecao,
        Field::Execao => &mut fields.execao,
        Field::Requisito => &mut fields.requisito,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Canonical extraction ────────────────────────────

    #[test]
    fn extracts_the_four_fields() {
        let fields = extract_fields(
            "aplicabilidade: As areas de qualquer espaco\n\
             selecao: uso publico ou coletivo\n\
             execao:\n\
             requisito: devem ser servidas de rotas acessiveis",
        );
        assert_eq!(fields.aplicabilidade, "As areas de qualquer espaco");
        assert_eq!(fields.selecao, "uso publico ou coletivo");
        assert_eq!(fields.execao, "");
        assert_eq!(fields.requisito, "devem ser servidas de rotas acessiveis");
    }

    #[test]
    fn extraction_is_idempotent_on_clean_output() {
        let clean = "aplicabilidade: As areas\nselecao: uso publico\nexecao:\nrequisito: devem";
        let first = extract_fields(clean);
        let rendered = format!(
            "aplicabilidade: {}\nselecao: {}\nexecao: {}\nrequisito: {}",
            first.aplicabilidade, first.selecao, first.execao, first.requisito,
        );
        assert_eq!(extract_fields(&rendered), first);
    }

    #[test]
    fn all_four_keys_present_for_any_input() {
        for input in ["", "nada util aqui", "só prosa\nem duas linhas", "::::"] {
            let fields = extract_fields(input);
            // Struct fields are total by construction; check they are all
            // reachable and empty for unusable input.
            assert!(fields.is_empty(), "expected empty for {input:?}");
        }
    }

    // ── Label normalization ─────────────────────────────

    #[test]
    fn accented_and_misspelled_labels_are_folded() {
        let fields = extract_fields(
            "Aplicabilidade: area\nSeleção: subconjunto\nExceção: caso raro\nRequisito: deve",
        );
        assert_eq!(fields.aplicabilidade, "area");
        assert_eq!(fields.selecao, "subconjunto");
        assert_eq!(fields.execao, "caso raro");
        assert_eq!(fields.requisito, "deve");

        let fields = extract_fields("execcao: outro caso\nrequisito: deve");
        assert_eq!(fields.execao, "outro caso");
    }

    #[test]
    fn normalize_strips_diacritics_and_case() {
        assert_eq!(normalize_field_name("Exceção"), "excecao");
        assert_eq!(normalize_field_name("SELEÇÃO"), "selecao");
        assert_eq!(normalize_field_name("Requisito"), "requisito");
    }

    #[test]
    fn unknown_labels_are_dropped() {
        let fields = extract_fields(
            "observacao: isto nao e um campo\nrequisito: deve ter rota\nnota: outra linha",
        );
        assert_eq!(fields.requisito, "deve ter rota");
        assert!(fields.aplicabilidade.is_empty());
    }

    // ── Scaffold echo ───────────────────────────────────

    #[test]
    fn scaffold_echo_value_is_empty() {
        // The model answered "aplicabilidade: selecao:", echoing the next
        // scaffold line instead of a value.
        let fields = extract_fields("aplicabilidade: selecao:\nrequisito: deve");
        assert_eq!(fields.aplicabilidade, "");
        assert_eq!(fields.requisito, "deve");
    }

    #[test]
    fn literal_quoted_empty_is_kept_verbatim() {
        // `execao: ""` is a value of two quote characters, not a scaffold
        // echo; it survives as-is.
        let fields = extract_fields("execao: \"\"\nrequisito: deve");
        assert_eq!(fields.execao, "\"\"");
    }

    // ── Open-field continuation ─────────────────────────

    #[test]
    fn continuation_lines_attach_to_the_open_field() {
        let fields = extract_fields(
            "requisito:\ndevem ser servidas\nde rotas acessiveis\naplicabilidade: areas",
        );
        assert_eq!(fields.requisito, "devem ser servidas de rotas acessiveis");
        assert_eq!(fields.aplicabilidade, "areas");
    }

    #[test]
    fn continuation_accumulates_multiple_lines() {
        // The open field keeps accepting lines until the next recognized
        // label, even after it has received content.
        let fields = extract_fields("execao:\nprimeira parte\nsegunda parte\nterceira parte");
        assert_eq!(fields.execao, "primeira parte segunda parte terceira parte");
    }

    #[test]
    fn field_with_value_at_label_time_is_closed() {
        let fields = extract_fields("requisito: deve ter rota\nlinha solta que nao anexa");
        assert_eq!(fields.requisito, "deve ter rota");
    }

    #[test]
    fn unknown_label_mid_continuation_is_dropped() {
        // An unknown `label:` line inside a continuation is silently dropped
        // and does not close the open field.
        let fields = extract_fields(
            "requisito:\ndevem ser servidas\nnota: linha descartada\nde rotas acessiveis",
        );
        assert_eq!(fields.requisito, "devem ser servidas de rotas acessiveis");
    }

    #[test]
    fn lines_before_any_field_are_dropped() {
        let fields = extract_fields("texto solto sem campo aberto\nrequisito: deve");
        assert_eq!(fields.requisito, "deve");
        assert!(fields.aplicabilidade.is_empty());
    }

    // ── Repeats and noise ───────────────────────────────

    #[test]
    fn repeated_label_last_occurrence_wins() {
        let fields = extract_fields("requisito: primeiro valor\nrequisito: segundo valor");
        assert_eq!(fields.requisito, "segundo valor");
    }

    #[test]
    fn fences_and_answer_label_are_stripped() {
        let fields = extract_fields("```\nResposta:\naplicabilidade: areas\nrequisito: deve\n```");
        assert_eq!(fields.aplicabilidade, "areas");
        assert_eq!(fields.requisito, "deve");
    }

    #[test]
    fn values_are_trimmed() {
        let fields = extract_fields("requisito:    deve ter rota   ");
        assert_eq!(fields.requisito, "deve ter rota");
    }
}
