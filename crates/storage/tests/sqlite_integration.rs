use cardex_core::{CardFields, CardId, CardType, Skill};
use cardex_core::time::fixed_now;
use cardex_storage::repository::{CardStore, copy_cards};
use cardex_storage::sqlite::SqliteRepository;

fn build_card(id: u64, name: &str, regulation_mark: Option<&str>) -> cardex_core::Card {
    cardex_core::Card::new(CardFields {
        card_id: CardId::new(id),
        name: name.to_string(),
        source_url: format!("https://www.pokemon-card.com/tw/card-search/detail/{id}/"),
        fetched_at: fixed_now(),
        card_type: CardType::Pokemon,
        raw_json: "{\"card_id\":1}".to_string(),
        evolve_marker: None,
        regulation_mark: regulation_mark.map(str::to_string),
        expansion_code: Some("SV1".to_string()),
        expansion_name: Some("Scarlet ex".to_string()),
        expansion_symbol_url: None,
        collector_number: Some("001/198".to_string()),
        illustrator: Some("Artist".to_string()),
        image_url: None,
        hp: Some(60),
        retreat_cost: Some(1),
        pokedex_no: Some(25),
        height_m: Some(0.4),
        weight_kg: Some(6.0),
        element_code: Some("lightning".to_string()),
        element: Some("Lightning".to_string()),
        weakness_code: Some("fighting".to_string()),
        weakness_value: Some("x2".to_string()),
        resistance_code: None,
        resistance_value: None,
        description: Some("A mouse pokemon.".to_string()),
    })
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect")
}

#[tokio::test]
async fn upsert_then_get_round_trips_card_and_skills() {
    let repo = connect("memdb_roundtrip").await;

    let card = build_card(1, "Pikachu", Some("H"));
    let skills = vec![
        Skill::new(
            0,
            Some("attack".into()),
            Some("Thunder Shock".into()),
            vec!["lightning".into(), "colorless".into()],
            Some("20".into()),
            Some("Flip a coin. If heads, the Defending Pokemon is now Paralyzed.".into()),
        ),
        Skill::new(1, Some("ability".into()), Some("Static".into()), vec![], None, None),
    ];
    repo.upsert_card(&card, &skills).await.expect("upsert");

    let found = repo
        .get_card(CardId::new(1))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(found.card.name, "Pikachu");
    assert_eq!(found.skills.len(), 2);
    assert_eq!(found.skills[0].idx, 0);
    assert_eq!(found.skills[0].cost, vec!["lightning", "colorless"]);
    assert_eq!(found.skills[1].name.as_deref(), Some("Static"));
}

#[tokio::test]
async fn upsert_is_idempotent_and_replaces_skills() {
    let repo = connect("memdb_idempotent").await;

    let card_v1 = build_card(2, "Raichu", Some("H"));
    let skills_v1 = vec![Skill::new(0, Some("attack".into()), Some("Spark".into()), vec![], None, None)];
    repo.upsert_card(&card_v1, &skills_v1).await.unwrap();

    let card_v2 = build_card(2, "Raichu (renamed)", Some("H"));
    let skills_v2 = vec![
        Skill::new(0, Some("attack".into()), Some("Thunder".into()), vec![], None, None),
        Skill::new(1, Some("attack".into()), Some("Agility".into()), vec![], None, None),
    ];
    repo.upsert_card(&card_v2, &skills_v2).await.unwrap();

    let found = repo.get_card(CardId::new(2)).await.unwrap().unwrap();
    assert_eq!(found.card.name, "Raichu (renamed)");
    assert_eq!(found.skills.len(), 2);
    assert_eq!(found.skills[0].name.as_deref(), Some("Thunder"));
}

#[tokio::test]
async fn query_by_name_matches_substrings() {
    let repo = connect("memdb_query").await;
    repo.upsert_card(&build_card(3, "Charmander", None), &[]).await.unwrap();
    repo.upsert_card(&build_card(4, "Charmeleon", None), &[]).await.unwrap();
    repo.upsert_card(&build_card(5, "Squirtle", None), &[]).await.unwrap();

    let hits = repo.query_by_name("Char", 10).await.unwrap();
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn copy_cards_filters_by_regulation_mark() {
    let source = connect("memdb_copy_src").await;
    let dest = connect("memdb_copy_dst").await;

    source.upsert_card(&build_card(6, "A", Some("g")), &[]).await.unwrap();
    source.upsert_card(&build_card(7, "B", Some("h")), &[]).await.unwrap();

    let copied = copy_cards(&source, &dest, &["h".to_string()]).await.unwrap();
    assert_eq!(copied, 1);
    assert!(dest.get_card(CardId::new(7)).await.unwrap().is_some());
    assert!(dest.get_card(CardId::new(6)).await.unwrap().is_none());
}
