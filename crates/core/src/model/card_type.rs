use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification assigned to a card during parsing (§4.D).
///
/// `Unknown` is a first-class, intentional value: a card whose skill-section
/// headers match none of the locale keywords is `Unknown`, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardType {
    Pokemon,
    Trainer,
    Energy,
    Unknown,
}

impl CardType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Pokemon => "pokemon",
            CardType::Trainer => "trainer",
            CardType::Energy => "energy",
            CardType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized card_type value: {0}")]
pub struct CardTypeParseError(String);

impl FromStr for CardType {
    type Err = CardTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pokemon" => Ok(CardType::Pokemon),
            "trainer" => Ok(CardType::Trainer),
            "energy" => Ok(CardType::Energy),
            "unknown" => Ok(CardType::Unknown),
            other => Err(CardTypeParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for ty in [
            CardType::Pokemon,
            CardType::Trainer,
            CardType::Energy,
            CardType::Unknown,
        ] {
            let parsed: CardType = ty.as_str().parse().unwrap();
            assert_eq!(parsed, ty);
        }
    }

    #[test]
    fn unknown_is_first_class_not_an_error() {
        assert_eq!("unknown".parse::<CardType>().unwrap(), CardType::Unknown);
    }

    #[test]
    fn rejects_unrecognized_token() {
        assert!("item".parse::<CardType>().is_err());
    }
}
