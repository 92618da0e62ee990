mod jp;
mod tw;

pub use jp::JpParser;
pub use tw::TwParser;

use cardex_core::{Card, CardFields, CardId, CardType, Skill};
use chrono::{DateTime, Utc};

use crate::error::ParseError;

/// One fully-parsed card, ready to hand to storage (§3, §4.D).
#[derive(Debug, Clone)]
pub struct ParsedCard {
    pub card: Card,
    pub skills: Vec<Skill>,
}

/// Turns one locale's detail-page HTML into a [`ParsedCard`] (§4.D). Each
/// locale's DOM shape differs enough — a flat `h2`/`h4`/`p` walk for `jp`
/// versus nested `div` blocks for `tw` — that a shared selector table would
/// be less readable than two small parsers behind this trait.
pub trait DetailParser {
    /// # Errors
    ///
    /// Returns [`ParseError`] if a required element is missing or the parsed
    /// fields fail [`Card`]'s validation.
    fn parse(&self, card_id: CardId, source_url: &str, html: &str, fetched_at: DateTime<Utc>) -> Result<ParsedCard, ParseError>;
}

/// Builds the `raw_json` column: a compact `serde_json` encoding of every
/// scraped field plus its skills, used for forward-compatible storage and
/// for diffing re-fetches (§3).
pub(crate) fn raw_json(fields: &CardFields, skills: &[Skill]) -> Result<String, ParseError> {
    #[derive(serde::Serialize)]
    struct RawCard<'a> {
        card_id: u64,
        name: &'a str,
        evolve_marker: &'a Option<String>,
        card_type: &'static str,
        hp: Option<i64>,
        element_code: &'a Option<String>,
        element: &'a Option<String>,
        regulation_mark: &'a Option<String>,
        collector_number: &'a Option<String>,
        expansion_code: &'a Option<String>,
        expansion_name: &'a Option<String>,
        expansion_symbol_url: &'a Option<String>,
        illustrator: &'a Option<String>,
        image_url: &'a Option<String>,
        weakness_code: &'a Option<String>,
        weakness_value: &'a Option<String>,
        resistance_code: &'a Option<String>,
        resistance_value: &'a Option<String>,
        retreat_cost: Option<u32>,
        pokedex_no: Option<i64>,
        height_m: Option<f64>,
        weight_kg: Option<f64>,
        description: &'a Option<String>,
        source_url: &'a str,
        fetched_at: DateTime<Utc>,
        skills: Vec<RawSkill<'a>>,
    }

    #[derive(serde::Serialize)]
    struct RawSkill<'a> {
        idx: u32,
        kind: &'a Option<String>,
        name: &'a Option<String>,
        cost: &'a [String],
        damage: &'a Option<String>,
        effect: &'a Option<String>,
    }

    let raw = RawCard {
        card_id: fields.card_id.value(),
        name: &fields.name,
        evolve_marker: &fields.evolve_marker,
        card_type: fields.card_type.as_str(),
        hp: fields.hp,
        element_code: &fields.element_code,
        element: &fields.element,
        regulation_mark: &fields.regulation_mark,
        collector_number: &fields.collector_number,
        expansion_code: &fields.expansion_code,
        expansion_name: &fields.expansion_name,
        expansion_symbol_url: &fields.expansion_symbol_url,
        illustrator: &fields.illustrator,
        image_url: &fields.image_url,
        weakness_code: &fields.weakness_code,
        weakness_value: &fields.weakness_value,
        resistance_code: &fields.resistance_code,
        resistance_value: &fields.resistance_value,
        retreat_cost: fields.retreat_cost,
        pokedex_no: fields.pokedex_no,
        height_m: fields.height_m,
        weight_kg: fields.weight_kg,
        description: &fields.description,
        source_url: &fields.source_url,
        fetched_at: fields.fetched_at,
        skills: skills
            .iter()
            .map(|s| RawSkill {
                idx: s.idx,
                kind: &s.kind,
                name: &s.name,
                cost: &s.cost,
                damage: &s.damage,
                effect: &s.effect,
            })
            .collect(),
    };

    serde_json::to_string(&raw).map_err(ParseError::RawJson)
}

/// Extracts the energy-type code from an icon image's `src`: the filename
/// stem, with no extension (§4.D grounding:
/// `scraper.py::_energy_code_from_img_src`).
#[must_use]
pub(crate) fn energy_code_from_img_src(src: Option<&str>) -> Option<String> {
    let src = src?;
    let path = src.split(['?', '#']).next().unwrap_or(src);
    let filename = path.rsplit('/').next()?;
    let stem = filename.split('.').next().unwrap_or(filename);
    if stem.is_empty() { None } else { Some(stem.to_string()) }
}

/// `None` for blank or absent text, mirroring `_safe_text`/`get_text(strip=True)`.
#[must_use]
pub(crate) fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

fn build_card(card_id: CardId, card_type: CardType, source_url: String, fetched_at: DateTime<Utc>, mut fields: PartialFields) -> Result<ParsedCard, ParseError> {
    let skills = std::mem::take(&mut fields.skills);
    let card_fields = CardFields {
        card_id,
        name: fields.name.unwrap_or_default(),
        source_url: source_url.clone(),
        fetched_at,
        card_type,
        raw_json: String::new(),
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
    };

    let mut card_fields = card_fields;
    card_fields.raw_json = raw_json(&card_fields, &skills)?;

    let card = Card::new(card_fields)?;
    Ok(ParsedCard { card, skills })
}

/// Loosely-typed scratch space a locale parser fills in as it walks the DOM,
/// handed to [`build_card`] once parsing is complete.
#[derive(Default)]
pub(crate) struct PartialFields {
    pub name: Option<String>,
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
    pub skills: Vec<Skill>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_code_takes_the_filename_stem() {
        assert_eq!(
            energy_code_from_img_src(Some("https://x/img/icon/lightning.png")),
            Some("lightning".to_string())
        );
    }

    #[test]
    fn energy_code_is_none_without_a_src() {
        assert_eq!(energy_code_from_img_src(None), None);
    }

    #[test]
    fn non_empty_trims_and_blanks_out_whitespace_only_text() {
        assert_eq!(non_empty("  hi  ".to_string()), Some("hi".to_string()));
        assert_eq!(non_empty("   ".to_string()), None);
    }
}
