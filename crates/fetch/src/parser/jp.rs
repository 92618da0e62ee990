use std::sync::LazyLock;

use cardex_core::{CardId, CardType, Skill};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{DetailParser, PartialFields, ParsedCard, build_card, non_empty};
use crate::error::ParseError;

/// Parses `www.pokemon-card.com` detail pages (§4.D, grounded on
/// `original_source/src/card_db/jp_scraper.py::parse_jp_card_detail_html`).
/// This locale never exposes a regulation mark on the detail page itself, so
/// `regulation_mark` is always `None` here.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpParser;

static HP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));
static COLLECTOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("valid regex"));
static POKEDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"No\.(\d+)").expect("valid regex"));
static HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\u{9AD8}\u{3055}[\u{FF1A}:]?\s*([0-9.]+)\s*m").expect("valid regex"));
static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\u{91CD}\u{3055}[\u{FF1A}:]?\s*([0-9.]+)\s*kg").expect("valid regex"));

/// `icon-<type>` CSS class suffix to energy code, mirroring the original
/// tool's `_ICON_TO_CODE` table (§6).
const ICON_TO_CODE: &[(&str, &str)] = &[
    ("grass", "grass"),
    ("fire", "fire"),
    ("water", "water"),
    ("electric", "lightning"),
    ("psychic", "psychic"),
    ("fighting", "fighting"),
    ("dark", "dark"),
    ("steel", "steel"),
    ("fairy", "fairy"),
    ("dragon", "dragon"),
    ("none", "colorless"),
];

fn icon_class_to_code(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find_map(|token| token.strip_prefix("icon-"))
        .and_then(|suffix| ICON_TO_CODE.iter().find(|(k, _)| *k == suffix).map(|(_, v)| (*v).to_string()))
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join("")
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

impl DetailParser for JpParser {
    fn parse(&self, card_id: CardId, source_url: &str, html: &str, fetched_at: DateTime<Utc>) -> Result<ParsedCard, ParseError> {
        let document = Html::parse_document(html);
        let mut fields = PartialFields::default();

        let heading_sel = sel("h1.Heading1");
        let heading = document.select(&heading_sel).next().ok_or(ParseError::MissingElement("h1.Heading1"))?;
        fields.name = non_empty(text_of(&heading));

        let image_sel = sel("img.fit");
        fields.image_url = document.select(&image_sel).next().and_then(|img| img.value().attr("src")).map(str::to_string);

        let subtext_sel = sel("div.subtext");
        if let Some(subtext) = document.select(&subtext_sel).next() {
            let regulation_img_sel = sel("img.img-regulation");
            fields.expansion_code = subtext.select(&regulation_img_sel).next().and_then(|img| img.value().attr("alt")).map(str::to_string);

            let text = text_of(&subtext);
            if let Some(caps) = COLLECTOR_RE.captures(&text) {
                fields.collector_number = Some(format!("{}/{}", &caps[1], &caps[2]));
            }
        }

        let expansion_link_sel = sel("section.SubSection a.Link");
        fields.expansion_name = document.select(&expansion_link_sel).next().map(|e| text_of(&e)).and_then(non_empty);

        let top_info_sel = sel("div.TopInfo");
        let top_info = document.select(&top_info_sel).next();
        if let Some(top_info) = &top_info {
            let hp_sel = sel("span.hp-num");
            fields.hp = top_info
                .select(&hp_sel)
                .next()
                .map(|e| text_of(&e))
                .and_then(|t| HP_RE.captures(&t).and_then(|c| c[1].parse::<i64>().ok()));

            let type_sel = sel("span.type");
            fields.evolve_marker = top_info.select(&type_sel).next().map(|e| text_of(&e)).and_then(non_empty);

            let adjacent_icon_sel = sel("span.hp-type + span[class*=\"icon-\"]");
            let icon_sel = sel("span[class*=\"icon-\"]");
            let icon_el = top_info
                .select(&adjacent_icon_sel)
                .next()
                .or_else(|| top_info.select(&icon_sel).next());
            fields.element_code = icon_el.and_then(|e| e.value().attr("class")).and_then(icon_class_to_code);
            fields.element = fields.element_code.clone();
        }

        let right_box_sel = sel("div.RightBox-inner");
        let right_box = document.select(&right_box_sel).next();
        let mut skills = Vec::new();
        if let Some(right_box) = &right_box {
            let mut current_kind: Option<String> = None;
            let mut current_name: Option<String> = None;
            let mut current_cost: Vec<String> = Vec::new();
            let mut current_damage: Option<String> = None;

            for child in right_box.children() {
                let Some(el) = ElementRef::wrap(child) else { continue };
                match el.value().name() {
                    "h2" => {
                        current_kind = non_empty(text_of(&el));
                    }
                    "h4" => {
                        let icon_sel = sel("span[class*=\"icon-\"]");
                        current_cost = el.select(&icon_sel).filter_map(|i| i.value().attr("class").and_then(icon_class_to_code)).collect();

                        let damage_sel = sel("span.f_right");
                        current_damage = el.select(&damage_sel).next().map(|e| text_of(&e)).and_then(non_empty);

                        let mut name_txt = String::new();
                        for name_child in el.children() {
                            if let Some(child_el) = ElementRef::wrap(name_child) {
                                let class = child_el.value().attr("class").unwrap_or("");
                                if class.contains("icon") || class.contains("f_right") {
                                    continue;
                                }
                                name_txt.push_str(&text_of(&child_el));
                            } else if let Some(text) = name_child.value().as_text() {
                                name_txt.push_str(text.trim());
                            }
                        }
                        current_name = non_empty(name_txt);
                    }
                    "p" => {
                        let effect = non_empty(el.text().collect::<Vec<_>>().join("\n"));
                        if current_name.is_some() || effect.is_some() {
                            skills.push(Skill::new(
                                skills.len() as u32,
                                current_kind.clone(),
                                current_name.take(),
                                std::mem::take(&mut current_cost),
                                current_damage.take(),
                                effect,
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }
        fields.skills = skills;

        let card_type = classify_card_type(top_info.is_some(), fields.hp.is_some(), &fields.skills);

        if let Some(right_box) = &right_box {
            let table_sel = sel("table");
            if let Some(table) = right_box.select(&table_sel).next() {
                let row_sel = sel("tr");
                let rows: Vec<_> = table.select(&row_sel).collect();
                if let Some(row) = rows.get(1) {
                    let cell_sel = sel("td");
                    let cells: Vec<_> = row.select(&cell_sel).collect();
                    let icon_sel = sel("span[class*=\"icon-\"]");

                    if let Some(cell) = cells.first() {
                        let (code, value) = parse_stat_cell(cell, &icon_sel);
                        fields.weakness_code = code;
                        fields.weakness_value = value;
                    }
                    if let Some(cell) = cells.get(1) {
                        let (code, value) = parse_stat_cell(cell, &icon_sel);
                        fields.resistance_code = code;
                        fields.resistance_value = value;
                    }
                    if let Some(cell) = cells.get(2) {
                        fields.retreat_cost = Some(u32::try_from(cell.select(&icon_sel).count()).unwrap_or(0));
                    }
                }
            }
        }

        let author_sel = sel("div.author a");
        fields.illustrator = document.select(&author_sel).next().map(|e| text_of(&e)).and_then(non_empty);

        let card_sel = sel("div.card");
        if let Some(card_div) = document.select(&card_sel).next() {
            let h4_sel = sel("h4");
            fields.pokedex_no = card_div
                .select(&h4_sel)
                .next()
                .map(|e| text_of(&e))
                .and_then(|t| POKEDEX_RE.captures(&t).and_then(|c| c[1].parse::<i64>().ok()));

            let p_sel = sel("p");
            let paragraphs: Vec<ElementRef> = card_div.select(&p_sel).collect();
            let mut description = None;
            for p in &paragraphs {
                let text = text_of(p);
                if let Some(caps) = HEIGHT_RE.captures(&text) {
                    fields.height_m = caps[1].parse::<f64>().ok();
                } else if let Some(caps) = WEIGHT_RE.captures(&text) {
                    fields.weight_kg = caps[1].parse::<f64>().ok();
                }
            }
            if paragraphs.len() >= 2 {
                let last_text = text_of(paragraphs.last().expect("checked len >= 2"));
                if !last_text.contains('\u{9AD8}') && !last_text.contains('\u{91CD}') {
                    description = non_empty(last_text);
                }
            }
            fields.description = description;
        }

        fields.regulation_mark = None;
        build_card(card_id, card_type, source_url.to_string(), fetched_at, fields)
    }
}

/// Weakness/resistance cell parsing, mirroring the original's "`--`means no
/// value" handling: when an energy icon is present the literal `--` is
/// stripped from the remaining text; otherwise the raw text is kept unless it
/// is exactly `--`.
fn parse_stat_cell(cell: &ElementRef, icon_sel: &Selector) -> (Option<String>, Option<String>) {
    let code = cell.select(icon_sel).next().and_then(|e| e.value().attr("class")).and_then(icon_class_to_code);
    let text = text_of(cell);
    let value = if code.is_some() {
        non_empty(text.replace("--", ""))
    } else if text != "--" {
        non_empty(text)
    } else {
        None
    };
    (code, value)
}

fn classify_card_type(has_top_info: bool, has_hp: bool, skills: &[Skill]) -> CardType {
    if has_top_info && has_hp {
        return CardType::Pokemon;
    }
    let all_kinds = skills.iter().filter_map(|s| s.kind.as_deref()).collect::<Vec<_>>().join(" ");
    if all_kinds.contains("\u{30A8}\u{30CD}\u{30EB}\u{30AE}\u{30FC}") {
        CardType::Energy
    } else if [
        "\u{30C8}\u{30EC}\u{30FC}\u{30CA}\u{30FC}\u{30BA}",
        "\u{30B0}\u{30C3}\u{30BA}",
        "\u{30B5}\u{30DD}\u{30FC}\u{30C8}",
        "\u{30B9}\u{30BF}\u{30B8}\u{30A2}\u{30E0}",
        "\u{30DD}\u{30B1}\u{30E2}\u{30F3}\u{306E}\u{3069}\u{3046}\u{3050}",
    ]
    .iter()
    .any(|kw| all_kinds.contains(kw))
    {
        CardType::Trainer
    } else {
        CardType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_html() -> &'static str {
        r#"
        <html><body>
            <h1 class="Heading1">Pikachu</h1>
            <img class="fit" src="https://x/card.png">
            <div class="subtext"><img class="img-regulation" alt="SV1"> 012/100</div>
            <section class="SubSection"><a class="Link">Scarlet ex</a></section>
            <div class="TopInfo">
                <span class="hp-num">60 HP</span>
                <span class="type">Basic</span>
                <span class="icon-electric"></span>
            </div>
            <div class="RightBox-inner">
                <h2>Attack</h2>
                <h4><span class="icon-electric"></span>Thunder Shock<span class="f_right">20</span></h4>
                <p>Flip a coin.</p>
                <table>
                    <tr><th>weakness</th><th>resistance</th><th>retreat</th></tr>
                    <tr>
                        <td><span class="icon-fire"></span>x2</td>
                        <td>--</td>
                        <td><span class="icon-colorless"></span></td>
                    </tr>
                </table>
            </div>
            <div class="author"><a>Someone</a></div>
            <div class="card">
                <h4>No.025</h4>
                <p>高さ0.4m</p>
                <p>重さ6.0kg</p>
                <p>A mouse pokemon.</p>
            </div>
        </body></html>
        "#
    }

    #[test]
    fn parses_a_full_pokemon_card() {
        let parser = JpParser;
        let parsed = parser
            .parse(CardId::new(1), "https://x/details.php/card/1/regu/ALL", sample_html(), Utc::now())
            .unwrap();
        assert_eq!(parsed.card.card_type, CardType::Pokemon);
        assert_eq!(parsed.card.hp, Some(60));
        assert_eq!(parsed.card.element_code.as_deref(), Some("lightning"));
        assert_eq!(parsed.card.regulation_mark, None);
        assert_eq!(parsed.card.expansion_code.as_deref(), Some("SV1"));
        assert_eq!(parsed.card.collector_number.as_deref(), Some("012/100"));
        assert_eq!(parsed.card.weakness_code.as_deref(), Some("fire"));
        assert_eq!(parsed.card.weakness_value.as_deref(), Some("x2"));
        assert_eq!(parsed.card.resistance_code, None);
        assert_eq!(parsed.card.resistance_value, None);
        assert_eq!(parsed.card.retreat_cost, Some(1));
        assert_eq!(parsed.card.pokedex_no, Some(25));
        assert_eq!(parsed.card.height_m, Some(0.4));
        assert_eq!(parsed.card.weight_kg, Some(6.0));
        assert_eq!(parsed.card.description.as_deref(), Some("A mouse pokemon."));
        assert_eq!(parsed.skills.len(), 1);
        assert_eq!(parsed.skills[0].cost, vec!["lightning".to_string()]);
        assert_eq!(parsed.skills[0].name.as_deref(), Some("Thunder Shock"));
        assert_eq!(parsed.skills[0].damage.as_deref(), Some("20"));
        assert_eq!(parsed.skills[0].kind.as_deref(), Some("Attack"));
    }

    #[test]
    fn missing_heading_is_an_error() {
        let parser = JpParser;
        let err = parser.parse(CardId::new(1), "https://x", "<html></html>", Utc::now()).unwrap_err();
        assert!(matches!(err, ParseError::MissingElement("h1.Heading1")));
    }
}
