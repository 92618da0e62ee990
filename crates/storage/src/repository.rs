use async_trait::async_trait;
use cardex_core::{Card, CardId, Skill};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A card together with its skills, in document order, as persistence hands
/// it back (§3, §4.D).
#[derive(Debug, Clone, PartialEq)]
pub struct CardWithSkills {
    pub card: Card,
    pub skills: Vec<Skill>,
}

/// The storage contract a pipeline driver and the CLI depend on: idempotent
/// upsert, point lookup, name search, and the id scan that backs cross-store
/// copy (§4.F).
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Writes `card` and replaces its skill set in one transaction (§4.F).
    /// Calling this twice with the same `card.card_id` must leave the store in
    /// the same state as calling it once with the later values (§8 property 5).
    async fn upsert_card(&self, card: &Card, skills: &[Skill]) -> Result<(), StorageError>;

    /// Looks up one card by id, along with its skills ordered by `idx`.
    async fn get_card(&self, id: CardId) -> Result<Option<CardWithSkills>, StorageError>;

    /// `name LIKE %pattern%`, ordered by `card_id`, capped at `limit`.
    async fn query_by_name(&self, pattern: &str, limit: u32) -> Result<Vec<Card>, StorageError>;

    /// Every card id in the store, or only those whose `regulation_mark`
    /// (compared case-insensitively) is in `regulation_marks` when non-empty
    /// (§4.F, §8 property 7).
    async fn list_card_ids(&self, regulation_marks: &[String]) -> Result<Vec<CardId>, StorageError>;
}

/// Copies every card selected by `regulation_marks` from `source` into `dest`,
/// reusing `upsert_card` on the destination so the copy is itself idempotent.
/// Mirrors the original scraper's cross-store copy command (§4.F).
///
/// # Errors
///
/// Returns the first `StorageError` encountered reading from `source` or
/// writing to `dest`.
pub async fn copy_cards(
    source: &dyn CardStore,
    dest: &dyn CardStore,
    regulation_marks: &[String],
) -> Result<u32, StorageError> {
    let ids = source.list_card_ids(regulation_marks).await?;
    let mut copied = 0_u32;
    for id in ids {
        if let Some(with_skills) = source.get_card(id).await? {
            dest.upsert_card(&with_skills.card, &with_skills.skills)
                .await?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// In-memory `CardStore` used by unit tests that don't need a real `SQLite`
/// file.
#[derive(Default)]
pub struct InMemoryCardStore {
    cards: Mutex<HashMap<CardId, CardWithSkills>>,
}

impl InMemoryCardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn upsert_card(&self, card: &Card, skills: &[Skill]) -> Result<(), StorageError> {
        let mut guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(
            card.card_id,
            CardWithSkills {
                card: card.clone(),
                skills: skills.to_vec(),
            },
        );
        Ok(())
    }

    async fn get_card(&self, id: CardId) -> Result<Option<CardWithSkills>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn query_by_name(&self, pattern: &str, limit: u32) -> Result<Vec<Card>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let needle = pattern.to_lowercase();
        let mut matches: Vec<Card> = guard
            .values()
            .filter(|cws| cws.card.name.to_lowercase().contains(&needle))
            .map(|cws| cws.card.clone())
            .collect();
        matches.sort_by_key(|card| card.card_id.value());
        matches.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matches)
    }

    async fn list_card_ids(&self, regulation_marks: &[String]) -> Result<Vec<CardId>, StorageError> {
        let guard = self
            .cards
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let allow: Vec<String> = regulation_marks.iter().map(|m| m.to_uppercase()).collect();
        let mut ids: Vec<CardId> = guard
            .values()
            .filter(|cws| {
                allow.is_empty() || cws.card.regulation_mark_upper().is_some_and(|m| allow.contains(&m))
            })
            .map(|cws| cws.card.card_id)
            .collect();
        ids.sort_by_key(CardId::value);
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardex_core::{CardFields, CardType};
    use chrono::Utc;

    fn card(id: u64, name: &str, regulation_mark: Option<&str>) -> Card {
        Card::new(CardFields {
            card_id: CardId::new(id),
            name: name.to_string(),
            source_url: format!("https://x/detail/{id}/"),
            fetched_at: Utc::now(),
            card_type: CardType::Pokemon,
            raw_json: "{}".to_string(),
            evolve_marker: None,
            regulation_mark: regulation_mark.map(str::to_string),
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
        })
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = InMemoryCardStore::new();
        let card = card(1, "Pikachu", Some("h"));
        store.upsert_card(&card, &[]).await.unwrap();
        let found = store.get_card(CardId::new(1)).await.unwrap().unwrap();
        assert_eq!(found.card.name, "Pikachu");
    }

    #[tokio::test]
    async fn list_card_ids_filters_by_regulation_mark_case_insensitively() {
        let store = InMemoryCardStore::new();
        store.upsert_card(&card(1, "A", Some("h")), &[]).await.unwrap();
        store.upsert_card(&card(2, "B", Some("g")), &[]).await.unwrap();

        let ids = store
            .list_card_ids(&["H".to_string()])
            .await
            .unwrap();
        assert_eq!(ids, vec![CardId::new(1)]);
    }

    #[tokio::test]
    async fn copy_cards_copies_only_matching_marks() {
        let source = InMemoryCardStore::new();
        let dest = InMemoryCardStore::new();
        source.upsert_card(&card(1, "A", Some("h")), &[]).await.unwrap();
        source.upsert_card(&card(2, "B", Some("g")), &[]).await.unwrap();

        let copied = copy_cards(&source, &dest, &["h".to_string()]).await.unwrap();
        assert_eq!(copied, 1);
        assert!(dest.get_card(CardId::new(1)).await.unwrap().is_some());
        assert!(dest.get_card(CardId::new(2)).await.unwrap().is_none());
    }
}
