use crate::error::BackendError;
use crate::pipeline::{FilterCriteria, FilterEngine, Identified, PaginationInfo, Paginator};

/// LoadStatus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Loaded,
    /// Load failed; the message is shown inline and the view stays usable.
    Failed(String),
}

/// LoadTicket
///
/// Issued when a load starts. Only the most recently issued ticket may apply its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// ListView
///
/// The state one list view owns exclusively: its loaded records, load status, filter
/// criteria and current page. The page is clamped back into range after every change
/// to records, criteria or page, so a shrinking subset never leaves the view on an
/// empty page while data exists.
///
/// A long-lived view (one kept across reloads) goes through `begin_load`/`finish_load`
/// so a superseded response is dropped. A view built for a single request has only
/// one load and uses `load`.
pub struct ListView<R> {
    engine: FilterEngine<R>,
    paginator: Paginator,
    records: Vec<R>,
    status: LoadStatus,
    criteria: FilterCriteria,
    current_page: usize,
    generation: u64,
}

impl<R> ListView<R> {
    pub fn new(engine: FilterEngine<R>, paginator: Paginator) -> Self {
        Self {
            engine,
            paginator,
            records: Vec::new(),
            status: LoadStatus::Loading,
            criteria: FilterCriteria::default(),
            current_page: 1,
            generation: 0,
        }
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        LoadTicket(self.generation)
    }

    /// Applies a load result. Returns false, leaving the view untouched, when a newer
    /// load has started since `ticket` was issued.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<R>, BackendError>) -> bool {
        if ticket.0 != self.generation {
            tracing::debug!(
                stale = ticket.0,
                current = self.generation,
                "dropping superseded list response"
            );
            return false;
        }

        match result {
            Ok(records) => {
                self.records = records;
                self.status = LoadStatus::Loaded;
            }
            Err(e) => {
                tracing::error!("list load failed: {}", e);
                self.status = LoadStatus::Failed(e.to_string());
            }
        }
        self.clamp_page();
        true
    }

    /// Applies the only load of a request-scoped view.
    pub fn load(&mut self, result: Result<Vec<R>, BackendError>) {
        let ticket = self.begin_load();
        self.finish_load(ticket, result);
    }

    /// Replaces the criteria and returns to the first page.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.current_page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page;
        self.clamp_page();
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn error(&self) -> Option<String> {
        match &self.status {
            LoadStatus::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn engine(&self) -> &FilterEngine<R> {
        &self.engine
    }

    /// The full filtered subset, which is also what exports operate on.
    pub fn filtered(&self) -> Vec<&R> {
        self.engine.apply(&self.records, &self.criteria)
    }

    pub fn page(&self) -> Vec<&R> {
        let filtered = self.filtered();
        self.paginator.slice(&filtered, self.current_page).to_vec()
    }

    pub fn pagination(&self) -> PaginationInfo {
        self.paginator.info(self.current_page, self.filtered().len())
    }

    fn clamp_page(&mut self) {
        let count = self.filtered().len();
        self.current_page = self.paginator.clamp(self.current_page, count);
    }
}

/// DetailView
///
/// Single-record view state keyed by the requested id. A response is applied only if
/// it belongs to the id currently requested, so a slow response for a record the
/// operator already navigated away from cannot overwrite the view.
pub struct DetailView<R: Identified> {
    requested: Option<R::Id>,
    record: Option<R>,
    status: LoadStatus,
}

impl<R: Identified> Default for DetailView<R> {
    fn default() -> Self {
        Self {
            requested: None,
            record: None,
            status: LoadStatus::Loading,
        }
    }
}

impl<R: Identified> DetailView<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, id: R::Id) {
        self.requested = Some(id);
        self.record = None;
        self.status = LoadStatus::Loading;
    }

    pub fn requested(&self) -> Option<&R::Id> {
        self.requested.as_ref()
    }

    /// Returns false when `id` is no longer the requested record, or when the returned
    /// record does not carry the requested id.
    pub fn apply(&mut self, id: &R::Id, result: Result<R, BackendError>) -> bool {
        if self.requested.as_ref() != Some(id) {
            tracing::debug!(?id, "dropping response for a record no longer requested");
            return false;
        }

        match result {
            Ok(record) if &record.id() == id => {
                self.record = Some(record);
                self.status = LoadStatus::Loaded;
            }
            Ok(record) => {
                tracing::warn!(expected = ?id, got = ?record.id(), "backend returned a different record");
                return false;
            }
            Err(e) => {
                self.status = LoadStatus::Failed(e.to_string());
            }
        }
        true
    }

    pub fn record(&self) -> Option<&R> {
        self.record.as_ref()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }
}
