use cardex_core::{Card, CardId};

use super::SqliteRepository;
use super::mapping::{card_id_to_i64, map_card_row, map_skill_row};
use crate::repository::{CardStore, CardWithSkills, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl CardStore for SqliteRepository {
    async fn upsert_card(&self, card: &Card, skills: &[cardex_core::Skill]) -> Result<(), StorageError> {
        let card_id = card_id_to_i64(card.card_id)?;
        let mut tx = self.pool().begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO cards (
                card_id, name, evolve_marker, card_type, hp, element_code, element,
                regulation_mark, collector_number, expansion_code, expansion_name,
                expansion_symbol_url, illustrator, image_url, weakness_code, weakness_value,
                resistance_code, resistance_value, retreat_cost, pokedex_no, height_m,
                weight_kg, description, source_url, fetched_at, raw_json
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26)
            ON CONFLICT(card_id) DO UPDATE SET
                name = excluded.name,
                evolve_marker = excluded.evolve_marker,
                card_type = excluded.card_type,
                hp = excluded.hp,
                element_code = excluded.element_code,
                element = excluded.element,
                regulation_mark = excluded.regulation_mark,
                collector_number = excluded.collector_number,
                expansion_code = excluded.expansion_code,
                expansion_name = excluded.expansion_name,
                expansion_symbol_url = excluded.expansion_symbol_url,
                illustrator = excluded.illustrator,
                image_url = excluded.image_url,
                weakness_code = excluded.weakness_code,
                weakness_value = excluded.weakness_value,
                resistance_code = excluded.resistance_code,
                resistance_value = excluded.resistance_value,
                retreat_cost = excluded.retreat_cost,
                pokedex_no = excluded.pokedex_no,
                height_m = excluded.height_m,
                weight_kg = excluded.weight_kg,
                description = excluded.description,
                source_url = excluded.source_url,
                fetched_at = excluded.fetched_at,
                raw_json = excluded.raw_json
            ",
        )
        .bind(card_id)
        .bind(&card.name)
        .bind(&card.evolve_marker)
        .bind(card.card_type.as_str())
        .bind(card.hp)
        .bind(&card.element_code)
        .bind(&card.element)
        .bind(&card.regulation_mark)
        .bind(&card.collector_number)
        .bind(&card.expansion_code)
        .bind(&card.expansion_name)
        .bind(&card.expansion_symbol_url)
        .bind(&card.illustrator)
        .bind(&card.image_url)
        .bind(&card.weakness_code)
        .bind(&card.weakness_value)
        .bind(&card.resistance_code)
        .bind(&card.resistance_value)
        .bind(card.retreat_cost.map(i64::from))
        .bind(card.pokedex_no)
        .bind(card.height_m)
        .bind(card.weight_kg)
        .bind(&card.description)
        .bind(&card.source_url)
        .bind(card.fetched_at)
        .bind(&card.raw_json)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM skills WHERE card_id = ?1;")
            .bind(card_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for skill in skills {
            let cost_json = serde_json::to_string(&skill.cost).map_err(ser)?;
            let instructions_json = skill
                .instructions
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(ser)?;

            sqlx::query(
                r"
                INSERT INTO skills (
                    card_id, idx, kind, name, cost_json, damage, effect,
                    effect_text_norm, instructions_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(card_id)
            .bind(i64::from(skill.idx))
            .bind(&skill.kind)
            .bind(&skill.name)
            .bind(cost_json)
            .bind(&skill.damage)
            .bind(&skill.effect)
            .bind(&skill.effect_text_norm)
            .bind(instructions_json)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_card(&self, id: CardId) -> Result<Option<CardWithSkills>, StorageError> {
        let card_id = card_id_to_i64(id)?;

        let card_row = sqlx::query("SELECT * FROM cards WHERE card_id = ?1;")
            .bind(card_id)
            .fetch_optional(self.pool())
            .await
            .map_err(conn)?;
        let Some(card_row) = card_row else {
            return Ok(None);
        };
        let card = map_card_row(&card_row)?;

        let skill_rows = sqlx::query("SELECT * FROM skills WHERE card_id = ?1 ORDER BY idx;")
            .bind(card_id)
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;
        let skills = skill_rows
            .iter()
            .map(map_skill_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(CardWithSkills { card, skills }))
    }

    async fn query_by_name(&self, pattern: &str, limit: u32) -> Result<Vec<Card>, StorageError> {
        let like = format!("%{pattern}%");
        let rows = sqlx::query("SELECT * FROM cards WHERE name LIKE ?1 ORDER BY card_id LIMIT ?2;")
            .bind(like)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(conn)?;
        rows.iter().map(map_card_row).collect()
    }

    async fn list_card_ids(&self, regulation_marks: &[String]) -> Result<Vec<CardId>, StorageError> {
        let rows = if regulation_marks.is_empty() {
            sqlx::query_scalar::<_, i64>("SELECT card_id FROM cards ORDER BY card_id;")
                .fetch_all(self.pool())
                .await
                .map_err(conn)?
        } else {
            let marks: Vec<String> = regulation_marks.iter().map(|m| m.to_uppercase()).collect();
            let placeholders = marks
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT card_id FROM cards WHERE UPPER(regulation_mark) IN ({placeholders}) ORDER BY card_id;"
            );
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for mark in &marks {
                query = query.bind(mark);
            }
            query.fetch_all(self.pool()).await.map_err(conn)?
        };

        rows.into_iter()
            .map(|v| u64::try_from(v).map(CardId::new).map_err(ser))
            .collect()
    }
}
