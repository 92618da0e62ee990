use std::collections::HashSet;
use std::sync::Arc;

use cardex_core::CardId;
use cardex_storage::CardStore;
use futures::stream::{self, StreamExt};

use crate::discovery::{Discovery, SearchParams};
use crate::error::{CardTaskError, DiscoveryError, FetchError};
use crate::http_client::HttpClient;
use crate::locale::Locale;
use crate::parser::DetailParser;

/// Tunable knobs for one `sync` run (§4.F).
pub struct PipelineConfig {
    pub start_page: u32,
    pub end_page: Option<u32>,
    pub workers: usize,
    pub list_workers: usize,
    pub allowed_regulation_marks: Option<Vec<String>>,
    pub skip_existing: bool,
    pub limit: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_page: 1,
            end_page: None,
            workers: 4,
            list_workers: 4,
            allowed_regulation_marks: None,
            skip_existing: true,
            limit: None,
        }
    }
}

/// Outcome of fetching, parsing, and (maybe) persisting one card (§4.F).
#[derive(Debug)]
pub enum CardOutcome {
    Upserted(CardId),
    SkippedByRegulation(CardId),
    NotFound(CardId),
    Failed(CardId, CardTaskError),
}

/// Final tally of one `sync` run; process exit status is `0` iff `fail == 0`
/// (§4.F). `total_pages` is `None` when the run used a `card_id` override
/// (no discovery ran) or the upstream page never reported a total.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ok: u32,
    pub skipped: u32,
    pub fail: u32,
    pub total_pages: Option<u32>,
}

/// Composes discovery, detail fetch, parse, and upsert for one `sync` run
/// (§4.F), grounded on
/// `__main__.py::cmd_sync`/`_discover_card_ids`/`_fetch_one`.
pub struct Pipeline {
    client: HttpClient,
    locale: Locale,
    parser: Arc<dyn DetailParser + Send + Sync>,
    store: Arc<dyn CardStore>,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: HttpClient, locale: Locale, parser: Arc<dyn DetailParser + Send + Sync>, store: Arc<dyn CardStore>) -> Self {
        Self { client, locale, parser, store }
    }

    /// Runs discovery (unless `card_id` overrides it), then fetches, parses,
    /// and persists each card through a bounded pool of `config.workers`
    /// tasks, reporting `ok` to `on_progress` every 50 successful upserts —
    /// matching the original's `if ok % 50 == 0`, not an arbitrary round
    /// number chosen fresh (§4.F).
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] if discovery itself cannot retrieve a first
    /// page. Per-card failures never abort the run; they are folded into the
    /// returned [`RunSummary`] instead.
    pub async fn run(
        &self,
        params: Option<&SearchParams>,
        card_id: Option<u64>,
        config: &PipelineConfig,
        mut on_progress: impl FnMut(u32),
    ) -> Result<RunSummary, DiscoveryError> {
        let existing: HashSet<u64> = if config.skip_existing {
            self.store
                .list_card_ids(&[])
                .await
                .map(|ids| ids.into_iter().map(|id| id.value()).collect())
                .unwrap_or_default()
        } else {
            HashSet::new()
        };

        let (mut discovered, total_pages) = if let Some(id) = card_id {
            (vec![id], None)
        } else {
            let params = params.expect("SearchParams is required when no card_id override is given");
            let discovery = Discovery::new(self.client.clone(), self.locale);
            discovery
                .discover_card_ids(params, config.start_page, config.end_page, config.list_workers)
                .await?
        };

        discovered.retain(|id| !existing.contains(id));
        if let Some(limit) = config.limit {
            discovered.truncate(limit);
        }

        let allowed_marks = config.allowed_regulation_marks.as_deref();
        let outcomes = stream::iter(discovered)
            .map(|id| self.fetch_one(id, allowed_marks))
            .buffer_unordered(config.workers.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut summary = RunSummary { total_pages, ..RunSummary::default() };
        for outcome in outcomes {
            match outcome {
                CardOutcome::Upserted(_) => {
                    summary.ok += 1;
                    if summary.ok % 50 == 0 {
                        on_progress(summary.ok);
                    }
                }
                CardOutcome::SkippedByRegulation(_) => summary.skipped += 1,
                CardOutcome::NotFound(_) | CardOutcome::Failed(_, _) => summary.fail += 1,
            }
        }

        Ok(summary)
    }

    async fn fetch_one(&self, card_id: u64, allowed_marks: Option<&[String]>) -> CardOutcome {
        let id = CardId::new(card_id);
        let url = self.locale.detail_url(card_id);

        let html = match self.fetch_detail(&url).await {
            Ok(html) => html,
            Err(FetchError::RedirectedToList { .. }) => return CardOutcome::NotFound(id),
            Err(err) => return CardOutcome::Failed(id, CardTaskError::Fetch(err)),
        };

        let parsed = match self.parser.parse(id, &url, &html, chrono::Utc::now()) {
            Ok(parsed) => parsed,
            Err(err) => return CardOutcome::Failed(id, CardTaskError::Parse(err)),
        };

        if let Some(allowed) = allowed_marks {
            let mark = parsed.card.regulation_mark_upper();
            let allowed_upper: Vec<String> = allowed.iter().map(|m| m.to_uppercase()).collect();
            let matches = matches!(&mark, Some(m) if allowed_upper.iter().any(|a| a == m));
            if !matches {
                return CardOutcome::SkippedByRegulation(id);
            }
        }

        match self.store.upsert_card(&parsed.card, &parsed.skills).await {
            Ok(()) => CardOutcome::Upserted(id),
            Err(err) => CardOutcome::Failed(id, CardTaskError::Storage(err)),
        }
    }

    /// Fetches the detail page, following redirects, and recognizes a
    /// redirect back to the list endpoint as "not found" rather than a
    /// transport failure (§4.D). Comparison trims a trailing slash from both
    /// sides, since upstream redirects are inconsistent about one.
    async fn fetch_detail(&self, url: &str) -> Result<String, FetchError> {
        let (final_url, html) = self.client.get_with_final_url(url).await?;
        if self.locale.supports_discovery() {
            let list_url = self.locale.list_endpoint();
            if final_url.trim_end_matches('/') == list_url.trim_end_matches('/') {
                return Err(FetchError::RedirectedToList { url: final_url });
            }
        }
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_summary_defaults_to_all_zero() {
        let summary = RunSummary::default();
        assert_eq!(summary, RunSummary { ok: 0, skipped: 0, fail: 0, total_pages: None });
    }
}
