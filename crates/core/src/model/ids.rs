use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The upstream-assigned integer identifying a card across every locale site.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(u64);

impl CardId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardId({})", self.0)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a `CardId` cannot be parsed from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCardIdError;

impl fmt::Display for ParseCardIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse CardId from string")
    }
}

impl std::error::Error for ParseCardIdError {}

impl FromStr for CardId {
    type Err = ParseCardIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(CardId::new).map_err(|_| ParseCardIdError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_id_display() {
        assert_eq!(CardId::new(42).to_string(), "42");
    }

    #[test]
    fn card_id_from_str_roundtrip() {
        let id: CardId = "12345".parse().unwrap();
        assert_eq!(id, CardId::new(12345));
    }

    #[test]
    fn card_id_from_str_rejects_non_numeric() {
        assert!("abc".parse::<CardId>().is_err());
    }
}
