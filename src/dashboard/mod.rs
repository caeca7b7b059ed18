//! Dashboard list state.
//!
//! [`DashboardModel`] owns the query behind the problem list — which tab,
//! what search text, which page — and keeps the last fetched page alongside
//! it. Every query change starts a fresh fetch as a spawned task; the task
//! reports back through a [`DashboardEvent`] channel that the UI loop pumps
//! into [`DashboardModel::handle`].
//!
//! Fetches are never aborted. Instead each one carries a sequence number and
//! only the completion matching the latest issued sequence is applied, so a
//! slow response for an old query can never overwrite the page the user is
//! actually on.

pub mod heatmap;

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::models::{Problem, ProblemPage};
use crate::api::{ApiResult, RecallBackend};
use crate::config::DashboardConfig;

/// Which subset of problems the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Problems whose next review date has arrived. The review actions are
    /// offered here and nowhere else.
    Due,
    /// Every problem, searchable.
    All,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::Due => "Due Today",
            Scope::All => "All Problems",
        }
    }
}

/// The list query. Replaced wholesale on every interaction, never patched
/// field-by-field from two places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemQuery {
    pub scope: Scope,
    /// Sent to the backend only under [`Scope::All`], and only when
    /// non-empty.
    pub search: String,
    /// 1-based.
    pub page: u32,
}

/// Completion of a background dashboard call, delivered to the UI loop.
#[derive(Debug)]
pub enum DashboardEvent {
    /// A page fetch resolved; `seq` says which fetch it was.
    Page {
        seq: u64,
        result: ApiResult<ProblemPage>,
    },
    /// A review mutation resolved.
    Reviewed { result: ApiResult<Problem> },
}

/// State machine behind the problem list.
///
/// Lives on the UI thread; all mutation happens through `&mut self` calls
/// from that thread. Network work runs on spawned tasks that own only a
/// backend handle and the event sender.
pub struct DashboardModel {
    backend: Arc<dyn RecallBackend>,
    events: mpsc::UnboundedSender<DashboardEvent>,
    due_page_size: u32,
    all_page_size: u32,
    query: ProblemQuery,
    /// Sequence of the most recently issued fetch. Completions carrying
    /// anything older are discarded.
    seq: u64,
    page: Option<ProblemPage>,
    loading: bool,
    error: Option<String>,
}

impl DashboardModel {
    pub fn new(
        backend: Arc<dyn RecallBackend>,
        config: &DashboardConfig,
        events: mpsc::UnboundedSender<DashboardEvent>,
    ) -> Self {
        Self {
            backend,
            events,
            due_page_size: config.due_page_size,
            all_page_size: config.all_page_size,
            query: ProblemQuery {
                scope: Scope::Due,
                search: String::new(),
                page: 1,
            },
            seq: 0,
            page: None,
            loading: false,
            error: None,
        }
    }

    pub fn query(&self) -> &ProblemQuery {
        &self.query
    }

    /// The last page that belonged to the current query, if any. Kept on
    /// screen through fetch failures.
    pub fn page(&self) -> Option<&ProblemPage> {
        self.page.as_ref()
    }

    /// True while the newest fetch is still outstanding.
    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn page_size(&self) -> u32 {
        match self.query.scope {
            Scope::Due => self.due_page_size,
            Scope::All => self.all_page_size,
        }
    }

    /// Switch tabs. A scope change throws the whole query away: search
    /// clears and the page goes back to 1.
    pub fn set_scope(&mut self, scope: Scope) {
        if self.query.scope != scope {
            self.query = ProblemQuery {
                scope,
                search: String::new(),
                page: 1,
            };
        }
        self.start_fetch();
    }

    /// Change the search text; any change resets the page to 1.
    pub fn set_search(&mut self, search: &str) {
        if self.query.search != search {
            self.query.search = search.to_string();
            self.query.page = 1;
        }
        self.start_fetch();
    }

    /// Jump to a page. Re-setting the current page just refetches it.
    pub fn set_page(&mut self, page: u32) {
        self.query.page = page.max(1);
        self.start_fetch();
    }

    /// Refetch the current query unchanged.
    pub fn refresh(&mut self) {
        self.start_fetch();
    }

    /// Record a review outcome for one problem.
    ///
    /// The list is not patched locally. On success the current query is
    /// refetched so streaks and review dates come from the backend's
    /// scheduling, not a client-side guess; on failure the list stays as it
    /// is and only the error banner changes.
    pub fn review(&mut self, id: i64, is_easy: bool) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        tracing::debug!(problem_id = id, is_easy, "Submitting review");
        tokio::spawn(async move {
            let result = backend.review_problem(id, is_easy).await;
            let _ = events.send(DashboardEvent::Reviewed { result });
        });
    }

    /// Apply a completion delivered from a background task.
    pub fn handle(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::Page { seq, result } => {
                if seq != self.seq {
                    tracing::debug!(seq, latest = self.seq, "Dropping superseded page result");
                    return;
                }
                self.loading = false;
                match result {
                    Ok(page) => {
                        self.page = Some(page);
                        self.error = None;
                    }
                    Err(e) => {
                        // Keep showing the stale-but-valid page.
                        self.error = Some(e.to_string());
                    }
                }
            }
            DashboardEvent::Reviewed { result } => match result {
                Ok(problem) => {
                    tracing::debug!(problem_id = problem.id, "Review recorded, refetching");
                    self.start_fetch();
                }
                Err(e) => {
                    self.error = Some(e.to_string());
                }
            },
        }
    }

    fn start_fetch(&mut self) {
        self.seq += 1;
        self.loading = true;
        self.error = None;
        let backend = self.backend.clone();
        let events = self.events.clone();
        let seq = self.seq;
        let query = self.query.clone();
        let limit = self.page_size();
        tracing::debug!(seq, scope = ?query.scope, page = query.page, "Fetching problems");
        tokio::spawn(async move {
            let result = match query.scope {
                Scope::Due => backend.list_due(query.page, limit).await,
                Scope::All => backend.list_all(&query.search, query.page, limit).await,
            };
            let _ = events.send(DashboardEvent::Page { seq, result });
        });
    }
}

/// One cell of the pagination strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Num(u32),
    /// A run of skipped pages, rendered as an ellipsis.
    Gap,
}

/// Page numbers to offer for jumping: first and last always, a window of one
/// around the current page, a gap marker wherever pages are skipped.
pub fn page_strip(current: u32, total: u32) -> Vec<PageSlot> {
    let total = total.max(1);
    let current = current.clamp(1, total);
    let mut slots = vec![PageSlot::Num(1)];
    if total == 1 {
        return slots;
    }
    if current > 3 {
        slots.push(PageSlot::Gap);
    }
    for n in current.saturating_sub(1)..=current + 1 {
        if n > 1 && n < total {
            slots.push(PageSlot::Num(n));
        }
    }
    if current + 2 < total {
        slots.push(PageSlot::Gap);
    }
    slots.push(PageSlot::Num(total));
    slots
}
