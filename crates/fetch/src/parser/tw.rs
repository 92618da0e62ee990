use std::sync::LazyLock;

use cardex_core::{CardId, CardType, Skill};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{DetailParser, PartialFields, ParsedCard, build_card, energy_code_from_img_src, non_empty};
use crate::error::ParseError;

/// Parses `asia.pokemon-card.com` detail pages (§4.D, grounded on
/// `original_source/PTCG_card_data/ptcg_tw/scraper.py::parse_card_detail_html`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TwParser;

static POKEDEX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"No\.(\d+)").expect("valid regex"));
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid regex"));
static EXPANSION_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"expansionCodes=([^&]+)").expect("valid regex"));

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn text_of(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join("")
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("valid selector")
}

impl DetailParser for TwParser {
    fn parse(&self, card_id: CardId, source_url: &str, html: &str, fetched_at: DateTime<Utc>) -> Result<ParsedCard, ParseError> {
        let document = Html::parse_document(html);
        let mut fields = PartialFields::default();

        let header_sel = sel("h1.pageHeader.cardDetail");
        let header = document
            .select(&header_sel)
            .next()
            .ok_or(ParseError::MissingElement("h1.pageHeader.cardDetail"))?;

        let evolve_sel = sel("span.evolveMarker");
        fields.evolve_marker = header.select(&evolve_sel).next().map(|e| text_of(&e)).and_then(non_empty);

        let mut name_parts: Vec<String> = header.text().map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect();
        if fields.evolve_marker.is_some() && name_parts.first().map(String::as_str) == fields.evolve_marker.as_deref() {
            name_parts.remove(0);
        }
        let name = non_empty(name_parts.join("")).unwrap_or_default();

        let image_sel = sel("section.imageColumn img");
        fields.image_url = document
            .select(&image_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);

        let main_info_sel = sel("p.mainInfomation");
        let main_info = document.select(&main_info_sel).next();
        if let Some(main_info) = &main_info {
            let hp_sel = sel("span.number");
            fields.hp = main_info
                .select(&hp_sel)
                .next()
                .map(|e| text_of(&e).trim().to_string())
                .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
                .and_then(|t| t.parse::<i64>().ok());

            let type_sel = sel("span.type");
            fields.element = main_info.select(&type_sel).next().map(|e| text_of(&e)).and_then(non_empty);

            let img_sel = sel("img");
            fields.element_code = main_info.select(&img_sel).next().and_then(|img| energy_code_from_img_src(img.value().attr("src")));
        }

        let card_type = classify_card_type(&document, main_info.is_some());

        let mut skills = Vec::new();
        let skill_block_sel = sel("div.skillInformation");
        let header_sel = sel("h3.commonHeader");
        let skill_sel = sel("div.skill");
        for block in document.select(&skill_block_sel) {
            let kind = block.select(&header_sel).next().map(|h| text_of(&h)).and_then(non_empty);
            for skill in block.select(&skill_sel) {
                skills.push(parse_skill(&skill, skills.len() as u32, kind.clone()));
            }
        }
        fields.skills = skills;

        let sub_sel = sel("div.subInformation");
        if let Some(sub) = document.select(&sub_sel).next() {
            let weak_sel = sel("td.weakpoint");
            let resist_sel = sel("td.resist");
            let escape_sel = sel("td.escape");
            let img_sel = sel("img");

            if let Some(cell) = sub.select(&weak_sel).next() {
                let code = cell.select(&img_sel).next().and_then(|img| energy_code_from_img_src(img.value().attr("src")));
                let mut text = collapse_ws(&text_of(&cell));
                if let Some(code) = &code {
                    text = text.replace(code.as_str(), "").trim().to_string();
                }
                fields.weakness_code = code;
                fields.weakness_value = non_empty(text);
            }
            if let Some(cell) = sub.select(&resist_sel).next() {
                let code = cell.select(&img_sel).next().and_then(|img| energy_code_from_img_src(img.value().attr("src")));
                let mut text = collapse_ws(&text_of(&cell));
                if let Some(code) = &code {
                    text = text.replace(code.as_str(), "").trim().to_string();
                }
                fields.resistance_code = code;
                fields.resistance_value = non_empty(text);
            }
            if let Some(cell) = sub.select(&escape_sel).next() {
                fields.retreat_cost = Some(u32::try_from(cell.select(&img_sel).count()).unwrap_or(0));
            }
        }

        let expansion_col_sel = sel("section.expansionColumn");
        if let Some(col) = document.select(&expansion_col_sel).next() {
            let symbol_sel = sel("span.expansionSymbol img");
            fields.expansion_symbol_url = col.select(&symbol_sel).next().and_then(|img| img.value().attr("src")).map(str::to_string);

            let alpha_sel = sel("span.alpha");
            fields.regulation_mark = col.select(&alpha_sel).next().map(|e| text_of(&e)).and_then(non_empty);

            let cno_sel = sel("span.collectorNumber");
            fields.collector_number = col.select(&cno_sel).next().map(|e| collapse_ws(&text_of(&e))).and_then(non_empty);
        }

        let expansion_link_sel = sel("section.expansionLinkColumn a");
        if let Some(link) = document.select(&expansion_link_sel).next() {
            fields.expansion_name = non_empty(text_of(&link));
            if let Some(href) = link.value().attr("href") {
                fields.expansion_code = EXPANSION_CODE_RE
                    .captures(href)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string());
            }
        }

        let illustrator_sel = sel("div.illustrator a");
        fields.illustrator = document.select(&illustrator_sel).next().map(|e| text_of(&e)).and_then(non_empty);

        let extra_sel = sel("div.extraInformation");
        if let Some(extra) = document.select(&extra_sel).next() {
            let h3_sel = sel("h3");
            fields.pokedex_no = extra
                .select(&h3_sel)
                .next()
                .map(|e| text_of(&e))
                .and_then(|t| POKEDEX_RE.captures(&t).and_then(|c| c[1].parse::<i64>().ok()));

            let size_sel = sel("p.size");
            let value_sel = sel("span.value");
            if let Some(size) = extra.select(&size_sel).next() {
                let values: Vec<f64> = size
                    .select(&value_sel)
                    .filter_map(|v| NUMERIC_RE.find(&text_of(&v)).and_then(|m| m.as_str().parse::<f64>().ok()))
                    .collect();
                fields.height_m = values.first().copied();
                fields.weight_kg = values.get(1).copied();
            }

            let desc_sel = sel("p.discription");
            fields.description = extra.select(&desc_sel).next().map(|e| e.text().collect::<Vec<_>>().join("\n")).and_then(non_empty);
        }

        fields.name = Some(name);
        build_card(card_id, card_type, source_url.to_string(), fetched_at, fields)
    }
}

fn parse_skill(el: &ElementRef, idx: u32, kind: Option<String>) -> Skill {
    let name_sel = sel("span.skillName");
    let damage_sel = sel("span.skillDamage");
    let effect_sel = sel("p.skillEffect");
    let cost_sel = sel("span.skillCost img");

    let name = el.select(&name_sel).next().map(|e| text_of(&e)).and_then(non_empty);
    let damage = el.select(&damage_sel).next().map(|e| text_of(&e)).and_then(non_empty);
    let effect = el.select(&effect_sel).next().map(|e| e.text().collect::<Vec<_>>().join("\n")).and_then(non_empty);
    let cost: Vec<String> = el
        .select(&cost_sel)
        .filter_map(|img| energy_code_from_img_src(img.value().attr("src")))
        .collect();

    Skill::new(idx, kind, name, cost, damage, effect)
}

fn classify_card_type(document: &Html, has_main_info: bool) -> CardType {
    if has_main_info {
        return CardType::Pokemon;
    }
    let header_sel = sel("div.skillInformation h3.commonHeader");
    let headers: String = document.select(&header_sel).map(|h| text_of(&h)).collect::<Vec<_>>().join(" ");
    if headers.contains("\u{80FD}\u{91CF}") {
        CardType::Energy
    } else if ["\u{8A13}\u{7DF4}\u{5BB6}", "\u{7269}\u{54C1}", "\u{652F}\u{63F4}\u{8005}", "\u{5834}\u{5730}", "\u{5BF6}\u{53EF}\u{5922}\u{9053}\u{5177}"]
        .iter()
        .any(|kw| headers.contains(kw))
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
            <h1 class="pageHeader cardDetail"><span class="evolveMarker">Stage1</span>Pikachu</h1>
            <section class="imageColumn"><img src="https://x/card.png"></section>
            <p class="mainInfomation"><span class="number">70</span> HP <span class="type">Lightning</span><img src="https://x/icon/lightning.png"></p>
            <div class="skillInformation">
                <h3 class="commonHeader">Attack</h3>
                <div class="skill">
                    <span class="skillName">Thunder Shock</span>
                    <span class="skillDamage">20</span>
                    <p class="skillEffect">Flip a coin.</p>
                    <span class="skillCost"><img src="https://x/icon/lightning.png"></span>
                </div>
            </div>
            <div class="subInformation">
                <table><tr>
                    <td class="weakpoint"><img src="https://x/icon/fire.png">x2</td>
                    <td class="resist"></td>
                    <td class="escape"><img src="https://x/icon/colorless.png"></td>
                </tr></table>
            </div>
            <section class="expansionColumn">
                <span class="expansionSymbol"><img src="https://x/symbol.png"></span>
                <span class="alpha">H</span>
                <span class="collectorNumber">012/100</span>
            </section>
            <section class="expansionLinkColumn"><a href="/tw/card-search/list/?expansionCodes=SV1">Scarlet ex</a></section>
            <div class="illustrator"><a>Someone</a></div>
            <div class="extraInformation">
                <h3>No.025</h3>
                <p class="size"><span class="value">0.4m</span><span class="value">6.0kg</span></p>
                <p class="discription">A mouse pokemon.</p>
            </div>
        </body></html>
        "#
    }

    #[test]
    fn parses_a_full_pokemon_card() {
        let parser = TwParser;
        let parsed = parser
            .parse(CardId::new(1), "https://x/detail/1/", sample_html(), Utc::now())
            .unwrap();
        assert_eq!(parsed.card.card_type, CardType::Pokemon);
        assert_eq!(parsed.card.hp, Some(70));
        assert_eq!(parsed.card.element.as_deref(), Some("Lightning"));
        assert_eq!(parsed.card.element_code.as_deref(), Some("lightning"));
        assert_eq!(parsed.card.regulation_mark.as_deref(), Some("H"));
        assert_eq!(parsed.card.collector_number.as_deref(), Some("012/100"));
        assert_eq!(parsed.card.expansion_code.as_deref(), Some("SV1"));
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
    fn missing_header_is_an_error() {
        let parser = TwParser;
        let err = parser.parse(CardId::new(1), "https://x", "<html></html>", Utc::now()).unwrap_err();
        assert!(matches!(err, ParseError::MissingElement("h1.pageHeader.cardDetail")));
    }
}
