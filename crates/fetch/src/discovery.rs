use std::collections::BTreeMap;
use std::sync::LazyLock;

use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::DiscoveryError;
use crate::http_client::HttpClient;
use crate::locale::Locale;

/// Upstream search parameters (§4.C). `card_type` and `regulation` are the
/// raw upstream tokens (`"all" | "1" | "2" | "3"`); mapping human-facing
/// `--card-type pokemon|trainer|energy` onto these is the CLI layer's job.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub card_type: String,
    pub regulation: Option<String>,
}

impl SearchParams {
    #[must_use]
    pub fn new(keyword: Option<String>, card_type: impl Into<String>, regulation: Option<String>) -> Self {
        Self {
            keyword,
            card_type: card_type.into(),
            regulation,
        }
    }

    fn as_form(&self) -> Vec<(&str, &str)> {
        vec![
            ("keyword", self.keyword.as_deref().unwrap_or("")),
            ("cardType", self.card_type.as_str()),
            ("regulation", self.regulation.as_deref().unwrap_or("all")),
        ]
    }
}

/// Discovers every card id exposed by a search, one upstream list page at a
/// time, fanned out with bounded concurrency once the first page reveals how
/// many pages exist (§4.C).
pub struct Discovery {
    client: HttpClient,
    locale: Locale,
}

static LIST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/card-search/detail/(\d+)/").expect("valid regex"));
static PAGE_NO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pageNo=(\d+)").expect("valid regex"));
static TOTAL_PAGES_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)").expect("valid regex"));

impl Discovery {
    /// # Panics
    ///
    /// Panics if `locale` does not support discovery; check
    /// [`Locale::supports_discovery`] first.
    #[must_use]
    pub fn new(client: HttpClient, locale: Locale) -> Self {
        assert!(locale.supports_discovery(), "locale has no search endpoint");
        Self { client, locale }
    }

    /// Runs the full discovery protocol: seed with a POST to get page 1 and
    /// `total_pages`, resolve the page range (`end_page` given, else
    /// `total_pages`, else `start_page` alone), fetch the remaining pages
    /// concurrently (bounded by `list_workers`), and return every discovered
    /// card id in page order alongside `total_pages` (§4.C, §8 property 4,
    /// scenario 6).
    ///
    /// Page 1's ids are only kept when `start_page == 1`; otherwise the seed
    /// request still runs (it is how the search condition is established)
    /// but its ids are discarded, matching `_discover_card_ids` in
    /// `__main__.py`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if the first page cannot be fetched.
    pub async fn discover_card_ids(
        &self,
        params: &SearchParams,
        start_page: u32,
        end_page: Option<u32>,
        list_workers: usize,
    ) -> Result<(Vec<u64>, Option<u32>), DiscoveryError> {
        let start_page = start_page.max(1);
        let first_html = self
            .client
            .post_form(&self.locale.list_endpoint(), &params.as_form())
            .await?;
        let total_pages = extract_total_pages(&first_html);
        let end_page = end_page.or(total_pages).unwrap_or(start_page);

        let mut pages: BTreeMap<u32, Vec<u64>> = BTreeMap::new();
        if start_page == 1 {
            pages.insert(1, extract_card_ids(&first_html));
        }

        let first_fetch_page = if start_page == 1 { 2 } else { start_page };
        if end_page >= first_fetch_page {
            let client = self.client.clone();
            let locale = self.locale;
            let remaining: Vec<u32> = (first_fetch_page..=end_page).collect();
            let workers = list_workers.max(1);

            let fetched: Vec<(u32, Vec<u64>)> = stream::iter(remaining)
                .map(|page| {
                    let client = client.clone();
                    async move {
                        let url = locale.list_page_url(page);
                        client.get(&url).await.map(|html| (page, extract_card_ids(&html)))
                    }
                })
                .buffer_unordered(workers)
                .try_collect()
                .await?;

            for (page, ids) in fetched {
                pages.insert(page, ids);
            }
        }

        let mut seen = std::collections::HashSet::new();
        let mut ordered = Vec::new();
        for ids in pages.into_values() {
            for id in ids {
                if seen.insert(id) {
                    ordered.push(id);
                }
            }
        }
        Ok((ordered, total_pages))
    }
}

/// Extracts every distinct card id referenced by `/card-search/detail/<id>/`
/// links on a list page, preserving first-seen order (§4.C).
#[must_use]
pub fn extract_card_ids(list_html: &str) -> Vec<u64> {
    let mut seen = std::collections::HashSet::new();
    let mut ids = Vec::new();
    for caps in LIST_ID_RE.captures_iter(list_html) {
        if let Ok(id) = caps[1].parse::<u64>() {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Extracts the total page count: `p.resultTotalPages`'s last integer run
/// first, then the max `pageNo=` value among `nav.pagination a[href]`
/// links, else `None` (§4.C).
#[must_use]
pub fn extract_total_pages(list_html: &str) -> Option<u32> {
    let document = Html::parse_document(list_html);

    let total_selector = Selector::parse("p.resultTotalPages").ok()?;
    if let Some(el) = document.select(&total_selector).next() {
        let text: String = el.text().collect();
        if let Some(last) = TOTAL_PAGES_DIGITS_RE.find_iter(&text).last() {
            if let Ok(n) = last.as_str().parse::<u32>() {
                return Some(n);
            }
        }
    }

    let nav_selector = Selector::parse("nav.pagination a[href]").ok()?;
    let max_page = document
        .select(&nav_selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAGE_NO_RE.captures(href))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max();
    max_page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_preserving_order_and_deduping() {
        let html = r#"
            <a href="/tw/card-search/detail/10/">a</a>
            <a href="/tw/card-search/detail/20/">b</a>
            <a href="/tw/card-search/detail/10/">dup</a>
        "#;
        assert_eq!(extract_card_ids(html), vec![10, 20]);
    }

    #[test]
    fn total_pages_prefers_result_total_pages_element() {
        let html = r#"<p class="resultTotalPages">Page 1 of 7</p>"#;
        assert_eq!(extract_total_pages(html), Some(7));
    }

    #[test]
    fn total_pages_falls_back_to_pagination_links() {
        let html = r#"
            <nav class="pagination">
                <a href="?pageNo=2">2</a>
                <a href="?pageNo=5">5</a>
            </nav>
        "#;
        assert_eq!(extract_total_pages(html), Some(5));
    }

    #[test]
    fn total_pages_is_none_without_any_hint() {
        assert_eq!(extract_total_pages("<p>nothing here</p>"), None);
    }
}
