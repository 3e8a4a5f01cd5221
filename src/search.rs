//! Search box and filter fields of a list screen.
//!
//! Free text is debounced; discrete filter fields commit immediately. Every
//! commit publishes a [`FilterQuery`] on a watch channel that the list's
//! table controller follows.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::filter::{FilterOption, FilterQuery, FilterState, FilterValue};

pub struct SearchFilterController {
    options: Vec<FilterOption>,
    search_term: String,
    filters: FilterState,
    debouncer: Debouncer,
    committed: Arc<watch::Sender<FilterQuery>>,
}

impl SearchFilterController {
    /// `options` describe the filter fields; `window` is the text debounce.
    pub fn new(options: Vec<FilterOption>, window: Duration) -> Self {
        let (tx, _) = watch::channel(FilterQuery::default());
        Self {
            options,
            search_term: String::new(),
            filters: FilterState::new(),
            debouncer: Debouncer::new(window),
            committed: Arc::new(tx),
        }
    }

    pub fn options(&self) -> &[FilterOption] {
        &self.options
    }

    /// Text as currently typed, committed or not.
    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// The last committed query.
    pub fn committed(&self) -> FilterQuery {
        self.committed.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterQuery> {
        self.committed.subscribe()
    }

    /// Whether a debounced text commit is still waiting.
    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Count of filter fields with a value. Display only.
    pub fn active_filter_count(&self) -> usize {
        self.filters.active_count()
    }

    /// Record typed text and commit it once typing settles.
    ///
    /// Must be called within a tokio runtime.
    pub fn set_search_term(&mut self, text: &str) {
        self.search_term = text.to_string();
        let query = self.snapshot();
        let committed = Arc::clone(&self.committed);
        self.debouncer.schedule(async move {
            publish(&committed, query);
        });
    }

    /// Apply raw input from the filter field `key` and commit if it changed.
    ///
    /// Returns `Ok(false)` when nothing was committed: the value did not
    /// change, or the input is a transient state such as a half-typed date.
    pub fn set_filter(&mut self, key: &str, raw: &str) -> Result<bool> {
        let option = self.option(key)?;
        match option.parse(raw) {
            Ok(value) => self.apply(key, value),
            Err(_) => {
                debug!(key, raw, "Ignoring transient filter input");
                Ok(false)
            }
        }
    }

    /// Set a typed value for `key` directly; `None` clears it.
    pub fn set_filter_value(&mut self, key: &str, value: Option<FilterValue>) -> Result<bool> {
        self.option(key)?;
        self.apply(key, value)
    }

    /// Reset text and filters and commit right away.
    pub fn clear_filters(&mut self) {
        self.debouncer.cancel();
        self.search_term.clear();
        self.filters.clear();
        self.committed.send_replace(FilterQuery::default());
        debug!("Filters cleared");
    }

    fn option(&self, key: &str) -> Result<&FilterOption> {
        self.options
            .iter()
            .find(|o| o.key == key)
            .ok_or_else(|| Error::UnknownFilter(key.to_string()))
    }

    fn apply(&mut self, key: &str, value: Option<FilterValue>) -> Result<bool> {
        if !self.filters.set(key, value) {
            return Ok(false);
        }
        // The commit carries the typed text, so a pending text commit is moot.
        self.debouncer.cancel();
        Ok(publish(&self.committed, self.snapshot()))
    }

    fn snapshot(&self) -> FilterQuery {
        FilterQuery {
            search_term: self.search_term.trim().to_string(),
            filters: self.filters.clone(),
        }
    }
}

fn publish(committed: &watch::Sender<FilterQuery>, query: FilterQuery) -> bool {
    committed.send_if_modified(|current| {
        if *current == query {
            return false;
        }
        debug!(
            search = %query.search_term,
            filters = query.filters.active_count(),
            "Filters committed"
        );
        *current = query;
        true
    })
}
