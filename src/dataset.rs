//! Dataset and result data model for the staged RASE pipeline.
//!
//! The same shapes serve as input and output: an N1 run fills `texts_n1` on
//! each item, an N2 run fills the `operators_n2` envelopes, an N3 run fills
//! the nested `properties_n3`. Every envelope key is always present with an
//! empty-string default, so downstream stages never special-case missing
//! fields.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Input dataset
// ═══════════════════════════════════════════════════════════

/// Top-level dataset file: `{ "datas": [...] }`.
///
/// Deserializes both the gold dataset (`{"text": ...}` items) and a previous
/// stage's prediction file (which carries extra `counts`/`time` keys that are
/// simply ignored here).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub datas: Vec<TextItem>,
}

/// One normative text plus its per-stage decompositions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
    /// Atomic sentences produced by the N1 stage. Empty for raw N1 input.
    #[serde(default)]
    pub texts_n1: Vec<N1Entry>,
}

/// One atomic sentence with its N2 operator envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct N1Entry {
    pub text_n1: String,
    #[serde(default)]
    pub operators_n2: OperatorSet,
}

// ═══════════════════════════════════════════════════════════
// Operator envelopes
// ═══════════════════════════════════════════════════════════

/// The four RASE operators extracted from one atomic sentence.
///
/// The serialized key spellings (`requeriments`, `aplicability`) are part of
/// the wire format shared with the evaluation tooling and must not be
/// "fixed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorSet {
    #[serde(default)]
    pub requeriments: Operator,
    #[serde(default)]
    pub aplicability: Operator,
    #[serde(default)]
    pub selection: Operator,
    #[serde(default)]
    pub exception: Operator,
}

impl OperatorSet {
    /// Wrap extracted N2 fields into envelopes, seeding empty N3 slots.
    pub fn from_fields(fields: &FieldMap) -> Self {
        Self {
            requeriments: Operator::with_text(&fields.requisito),
            aplicability: Operator::with_text(&fields.aplicabilidade),
            selection: Operator::with_text(&fields.selecao),
            exception: Operator::with_text(&fields.execao),
        }
    }

    /// The four named operators in the order they are serialized.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut Operator)> {
        [
            ("requeriments", &mut self.requeriments),
            ("aplicability", &mut self.aplicability),
            ("selection", &mut self.selection),
            ("exception", &mut self.exception),
        ]
        .into_iter()
    }
}

/// One operator: the extracted clause text plus typed-property slots for the
/// next stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    #[serde(default)]
    pub text_n2: String,
    #[serde(default)]
    pub properties_n3: PropertySet,
}

impl Operator {
    fn with_text(text: &str) -> Self {
        Self {
            text_n2: text.to_string(),
            properties_n3: PropertySet::default(),
        }
    }
}

/// Typed comparison properties filled by the N3 stage. All strings, default
/// empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySet {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub comparation: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub unit: String,
}

// ═══════════════════════════════════════════════════════════
// N2 field record
// ═══════════════════════════════════════════════════════════

/// The four canonical N2 fields as extracted from one model response,
/// keyed by their Portuguese prompt labels. Intermediate: discarded once
/// wrapped into an [`OperatorSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    pub aplicabilidade: String,
    pub selecao: String,
    pub execao: String,
    pub requisito: String,
}

impl FieldMap {
    /// True when no field carries any content.
    pub fn is_empty(&self) -> bool {
        self.aplicabilidade.is_empty()
            && self.selecao.is_empty()
            && self.execao.is_empty()
            && self.requisito.is_empty()
    }
}
