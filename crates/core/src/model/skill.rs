use serde::{Deserialize, Serialize};

use crate::text;

/// One ability, attack, or trainer/energy effect owned by a card, in document
/// order (§3, §4.D). `kind` distinguishes the section it came from; `idx` is
/// dense and 0-based across every section on the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub idx: u32,
    pub kind: Option<String>,
    pub name: Option<String>,
    /// Ordered energy-type codes; duplicates are meaningful (`[grass, grass, colorless]`).
    pub cost: Vec<String>,
    pub damage: Option<String>,
    pub effect: Option<String>,
    pub effect_text_norm: Option<String>,
    /// Structured decomposition of `effect`, produced out of core and persisted
    /// opaquely. Never populated by the fetch pipeline itself.
    pub instructions: Option<Vec<String>>,
}

impl Skill {
    /// Builds a skill from raw scraped fields, deriving `effect_text_norm` from
    /// `effect` via the shared whitespace-normalization rule (§4.D).
    #[must_use]
    pub fn new(
        idx: u32,
        kind: Option<String>,
        name: Option<String>,
        cost: Vec<String>,
        damage: Option<String>,
        effect: Option<String>,
    ) -> Self {
        let effect_text_norm = text::normalize(effect.as_deref());
        Self {
            idx,
            kind,
            name,
            cost,
            damage,
            effect,
            effect_text_norm,
            instructions: None,
        }
    }

    /// Reconstructs a skill as read back from storage, where `effect_text_norm`
    /// and `instructions` may already carry values written by the out-of-core
    /// skill-structurer.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        idx: u32,
        kind: Option<String>,
        name: Option<String>,
        cost: Vec<String>,
        damage: Option<String>,
        effect: Option<String>,
        effect_text_norm: Option<String>,
        instructions: Option<Vec<String>>,
    ) -> Self {
        Self {
            idx,
            kind,
            name,
            cost,
            damage,
            effect,
            effect_text_norm,
            instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_normalized_effect_text() {
        let skill = Skill::new(
            0,
            Some("attack".into()),
            Some("Hit".into()),
            vec!["colorless".into()],
            Some("10".into()),
            Some("Flip  a\r\n\r\ncoin.".into()),
        );
        assert_eq!(skill.effect_text_norm.as_deref(), Some("Flip a\ncoin."));
    }

    #[test]
    fn new_with_no_effect_has_no_normalized_text() {
        let skill = Skill::new(0, None, None, vec![], None, None);
        assert_eq!(skill.effect_text_norm, None);
    }

    #[test]
    fn cost_preserves_order_and_duplicates() {
        let skill = Skill::new(
            1,
            Some("attack".into()),
            None,
            vec!["grass".into(), "grass".into(), "colorless".into()],
            None,
            None,
        );
        assert_eq!(skill.cost, vec!["grass", "grass", "colorless"]);
    }
}
