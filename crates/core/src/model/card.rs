use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{CardId, CardType};

/// Every field a successful parse (§4.D) can populate for one card, before the
/// non-empty/NOT-NULL invariants of §3 are checked.
#[derive(Debug, Clone)]
#[allow(clippy::struct_field_names)]
pub struct CardFields {
    pub card_id: CardId,
    pub name: String,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
    pub card_type: CardType,
    pub raw_json: String,

    pub evolve_marker: Option<String>,
    pub regulation_mark: Option<String>,

    pub expansion_code: Option<String>,
    pub expansion_name: Option<String>,
    pub expansion_symbol_url: Option<String>,
    pub collector_number: Option<String>,
    pub illustrator: Option<String>,
    pub image_url: Option<String>,

    pub hp: Option<i64>,
    pub retreat_cost: Option<u32>,
    pub pokedex_no: Option<i64>,
    pub height_m: Option<f64>,
    pub weight_kg: Option<f64>,

    pub element_code: Option<String>,
    pub element: Option<String>,
    pub weakness_code: Option<String>,
    pub weakness_value: Option<String>,
    pub resistance_code: Option<String>,
    pub resistance_value: Option<String>,

    pub description: Option<String>,
}

/// A validated card record (§3). Constructed only through [`Card::new`], which
/// enforces the identity invariants that the `cards` table declares `NOT NULL`.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_field_names)]
pub struct Card {
    pub card_id: CardId,
    pub name: String,
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
    pub card_type: CardType,
    pub raw_json: String,

    pub evolve_marker: Option<String>,
    pub regulation_mark: Option<String>,

    pub expansion_code: Option<String>,
    pub expansion_name: Option<String>,
    pub expansion_symbol_url: Option<String>,
    pub collector_number: Option<String>,
    pub illustrator: Option<String>,
    pub image_url: Option<String>,

    pub hp: Option<i64>,
    pub retreat_cost: Option<u32>,
    pub pokedex_no: Option<i64>,
    pub height_m: Option<f64>,
    pub weight_kg: Option<f64>,

    pub element_code: Option<String>,
    pub element: Option<String>,
    pub weakness_code: Option<String>,
    pub weakness_value: Option<String>,
    pub resistance_code: Option<String>,
    pub resistance_value: Option<String>,

    pub description: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("card name must not be empty")]
    EmptyName,
    #[error("card source_url must not be empty")]
    EmptySourceUrl,
    #[error("card raw_json must not be empty")]
    EmptyRawJson,
}

impl Card {
    /// Validates `fields` against the §3 invariants and produces a [`Card`].
    ///
    /// # Errors
    ///
    /// Returns [`CardError`] if `name`, `source_url`, or `raw_json` is empty
    /// after trimming.
    pub fn new(fields: CardFields) -> Result<Self, CardError> {
        if fields.name.trim().is_empty() {
            return Err(CardError::EmptyName);
        }
        if fields.source_url.trim().is_empty() {
            return Err(CardError::EmptySourceUrl);
        }
        if fields.raw_json.trim().is_empty() {
            return Err(CardError::EmptyRawJson);
        }

        Ok(Self {
            card_id: fields.card_id,
            name: fields.name,
            source_url: fields.source_url,
            fetched_at: fields.fetched_at,
            card_type: fields.card_type,
            raw_json: fields.raw_json,
            evolve_marker: fields.evolve_marker,
            regulation_mark: fields.regulation_mark,
            expansion_code: fields.expansion_code,
            expansion_name: fields.expansion_name,
            expansion_symbol_url: fields.expansion_symbol_url,
            collector_number: fields.collector_number,
            illustrator: fields.illustrator,
            image_url: fields.image_url,
            hp: fields.hp,
            retreat_cost: fields.retreat_cost,
            pokedex_no: fields.pokedex_no,
            height_m: fields.height_m,
            weight_kg: fields.weight_kg,
            element_code: fields.element_code,
            element: fields.element,
            weakness_code: fields.weakness_code,
            weakness_value: fields.weakness_value,
            resistance_code: fields.resistance_code,
            resistance_value: fields.resistance_value,
            description: fields.description,
        })
    }

    /// `regulation_mark`, upper-cased for case-insensitive comparison against
    /// an allow-list (§4.F, §8 property 7). Returns `None` when no mark was
    /// parsed.
    #[must_use]
    pub fn regulation_mark_upper(&self) -> Option<String> {
        self.regulation_mark
            .as_ref()
            .map(|mark| mark.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str, source_url: &str, raw_json: &str) -> CardFields {
        CardFields {
            card_id: CardId::new(1),
            name: name.to_string(),
            source_url: source_url.to_string(),
            fetched_at: Utc::now(),
            card_type: CardType::Pokemon,
            raw_json: raw_json.to_string(),
            evolve_marker: None,
            regulation_mark: None,
            expansion_code: None,
            expansion_name: None,
            expansion_symbol_url: None,
            collector_number: None,
            illustrator: None,
            image_url: None,
            hp: Some(60),
            retreat_cost: Some(1),
            pokedex_no: None,
            height_m: None,
            weight_kg: None,
            element_code: None,
            element: None,
            weakness_code: None,
            weakness_value: None,
            resistance_code: None,
            resistance_value: None,
            description: None,
        }
    }

    #[test]
    fn rejects_empty_name() {
        let err = Card::new(fields("  ", "https://x", "{}")).unwrap_err();
        assert_eq!(err, CardError::EmptyName);
    }

    #[test]
    fn rejects_empty_source_url() {
        let err = Card::new(fields("A", " ", "{}")).unwrap_err();
        assert_eq!(err, CardError::EmptySourceUrl);
    }

    #[test]
    fn rejects_empty_raw_json() {
        let err = Card::new(fields("A", "https://x", "  ")).unwrap_err();
        assert_eq!(err, CardError::EmptyRawJson);
    }

    #[test]
    fn valid_fields_build_a_card() {
        let card = Card::new(fields("Pikachu", "https://x/detail/1/", "{\"a\":1}")).unwrap();
        assert_eq!(card.name, "Pikachu");
        assert_eq!(card.hp, Some(60));
    }

    #[test]
    fn regulation_mark_upper_compares_case_insensitively() {
        let mut f = fields("A", "https://x", "{}");
        f.regulation_mark = Some("h".to_string());
        let card = Card::new(f).unwrap();
        assert_eq!(card.regulation_mark_upper().as_deref(), Some("H"));
    }
}
