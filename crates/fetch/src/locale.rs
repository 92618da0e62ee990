/// `asia.pokemon-card.com`, Traditional Chinese (§6, §4.C/§4.D grounding:
/// `original_source/PTCG_card_data/ptcg_tw/scraper.py`).
pub const TW_BASE_URL: &str = "https://asia.pokemon-card.com";
pub const TW_LIST_PATH: &str = "/tw/card-search/list/";
pub const TW_DETAIL_PATH_PREFIX: &str = "/tw/card-search/detail/";

/// `www.pokemon-card.com`, Japanese (§6, §4.D grounding:
/// `original_source/src/card_db/jp_scraper.py`). There is no upstream search
/// endpoint for this locale in the original tool — only direct detail
/// fetches by id — so [`Locale::Jp`] never supports [`crate::discovery::Discovery`].
pub const JP_BASE_URL: &str = "https://www.pokemon-card.com";
pub const JP_DETAIL_PATH: &str = "/card-search/details.php/card/{card_id}/regu/ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    Tw,
    Jp,
}

impl Locale {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Tw => "tw",
            Locale::Jp => "jp",
        }
    }

    /// Whether this locale exposes a search/list endpoint discovery can walk
    /// (§4.C). Only `tw` does; `jp` requires an explicit id list.
    #[must_use]
    pub fn supports_discovery(self) -> bool {
        matches!(self, Locale::Tw)
    }

    /// The endpoint a search condition is POSTed to and list pages are later
    /// GET-ed from; the server remembers the condition via cookie (§4.C).
    ///
    /// # Panics
    ///
    /// Panics if called on [`Locale::Jp`]; check [`Locale::supports_discovery`]
    /// first.
    #[must_use]
    pub fn list_endpoint(self) -> String {
        assert!(self.supports_discovery(), "locale has no search endpoint");
        format!("{TW_BASE_URL}{TW_LIST_PATH}")
    }

    /// Builds the GET URL for page `page` of the search condition already
    /// established via [`Locale::list_endpoint`] (§4.C).
    ///
    /// # Panics
    ///
    /// Panics if called on [`Locale::Jp`]; check [`Locale::supports_discovery`]
    /// first.
    #[must_use]
    pub fn list_page_url(self, page: u32) -> String {
        format!("{}?pageNo={page}", self.list_endpoint())
    }

    /// Builds the detail-page URL for `card_id` in this locale.
    #[must_use]
    pub fn detail_url(self, card_id: u64) -> String {
        match self {
            Locale::Tw => format!("{TW_BASE_URL}{TW_DETAIL_PATH_PREFIX}{card_id}/"),
            Locale::Jp => format!("{JP_BASE_URL}{}", JP_DETAIL_PATH.replace("{card_id}", &card_id.to_string())),
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tw" => Ok(Locale::Tw),
            "jp" => Ok(Locale::Jp),
            other => Err(format!("unrecognized locale: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tw_detail_url_matches_upstream_shape() {
        assert_eq!(
            Locale::Tw.detail_url(12345),
            "https://asia.pokemon-card.com/tw/card-search/detail/12345/"
        );
    }

    #[test]
    fn jp_detail_url_matches_upstream_shape() {
        assert_eq!(
            Locale::Jp.detail_url(99),
            "https://www.pokemon-card.com/card-search/details.php/card/99/regu/ALL"
        );
    }

    #[test]
    fn jp_does_not_support_discovery() {
        assert!(!Locale::Jp.supports_discovery());
    }

    #[test]
    fn locale_round_trips_through_str() {
        assert_eq!("tw".parse::<Locale>().unwrap(), Locale::Tw);
        assert_eq!("jp".parse::<Locale>().unwrap(), Locale::Jp);
        assert!("xx".parse::<Locale>().is_err());
    }
}
