use cardex_core::{Card, CardFields, CardId, CardType, Skill};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn card_id_to_i64(id: CardId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("card_id overflow".into()))
}

/// Reconstructs a [`Card`] from a `cards` row. `card_type` is stored as its
/// lowercase string form (§3); any other value is a corrupted row.
pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    let card_id: i64 = row.try_get("card_id").map_err(ser)?;
    let card_id = CardId::new(u64::try_from(card_id).map_err(ser)?);

    let card_type_raw: String = row.try_get("card_type").map_err(ser)?;
    let card_type: CardType = card_type_raw.parse().map_err(ser)?;

    let fetched_at: DateTime<Utc> = row.try_get("fetched_at").map_err(ser)?;

    let retreat_cost: Option<i64> = row.try_get("retreat_cost").map_err(ser)?;
    let retreat_cost = retreat_cost
        .map(u32::try_from)
        .transpose()
        .map_err(ser)?;

    let fields = CardFields {
        card_id,
        name: row.try_get("name").map_err(ser)?,
        source_url: row.try_get("source_url").map_err(ser)?,
        fetched_at,
        card_type,
        raw_json: row.try_get("raw_json").map_err(ser)?,
        evolve_marker: row.try_get("evolve_marker").map_err(ser)?,
        regulation_mark: row.try_get("regulation_mark").map_err(ser)?,
        expansion_code: row.try_get("expansion_code").map_err(ser)?,
        expansion_name: row.try_get("expansion_name").map_err(ser)?,
        expansion_symbol_url: row.try_get("expansion_symbol_url").map_err(ser)?,
        collector_number: row.try_get("collector_number").map_err(ser)?,
        illustrator: row.try_get("illustrator").map_err(ser)?,
        image_url: row.try_get("image_url").map_err(ser)?,
        hp: row.try_get("hp").map_err(ser)?,
        retreat_cost,
        pokedex_no: row.try_get("pokedex_no").map_err(ser)?,
        height_m: row.try_get("height_m").map_err(ser)?,
        weight_kg: row.try_get("weight_kg").map_err(ser)?,
        element_code: row.try_get("element_code").map_err(ser)?,
        element: row.try_get("element").map_err(ser)?,
        weakness_code: row.try_get("weakness_code").map_err(ser)?,
        weakness_value: row.try_get("weakness_value").map_err(ser)?,
        resistance_code: row.try_get("resistance_code").map_err(ser)?,
        resistance_value: row.try_get("resistance_value").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
    };

    Card::new(fields).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Reconstructs a [`Skill`] from a `skills` row. `cost_json`/`instructions_json`
/// round-trip through `serde_json` (§3).
pub(crate) fn map_skill_row(row: &SqliteRow) -> Result<Skill, StorageError> {
    let idx: i64 = row.try_get("idx").map_err(ser)?;
    let idx = u32::try_from(idx).map_err(ser)?;

    let cost_json: String = row.try_get("cost_json").map_err(ser)?;
    let cost: Vec<String> = serde_json::from_str(&cost_json).map_err(ser)?;

    let instructions_json: Option<String> = row.try_get("instructions_json").map_err(ser)?;
    let instructions = instructions_json
        .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
        .transpose()
        .map_err(ser)?;

    Ok(Skill::from_persisted(
        idx,
        row.try_get("kind").map_err(ser)?,
        row.try_get("name").map_err(ser)?,
        cost,
        row.try_get("damage").map_err(ser)?,
        row.try_get("effect").map_err(ser)?,
        row.try_get("effect_text_norm").map_err(ser)?,
        instructions,
    ))
}
