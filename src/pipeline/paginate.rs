use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ts_rs::TS;
use utoipa::ToSchema;

/// PageState
///
/// `current_page` is 1-based. Construction normalises both fields to at least 1; the
/// upper bound depends on the subset and is enforced by `Paginator::clamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub current_page: usize,
    pub page_size: usize,
}

impl PageState {
    pub fn new(current_page: usize, page_size: usize) -> Self {
        Self {
            current_page: current_page.max(1),
            page_size: page_size.max(1),
        }
    }
}

/// PageIndex
///
/// One entry of the compact page-index display sequence. Serialises as the page number
/// or as the string `"..."`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageIndex {
    Page(usize),
    Ellipsis,
}

const ELLIPSIS_MARKER: &str = "...";

impl Serialize for PageIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageIndex::Page(n) => serializer.serialize_u64(*n as u64),
            PageIndex::Ellipsis => serializer.serialize_str(ELLIPSIS_MARKER),
        }
    }
}

impl<'de> Deserialize<'de> for PageIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Page(usize),
            Marker(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Page(n) => Ok(PageIndex::Page(n)),
            Repr::Marker(m) if m == ELLIPSIS_MARKER => Ok(PageIndex::Ellipsis),
            Repr::Marker(m) => Err(serde::de::Error::custom(format!(
                "invalid page index marker: {m}"
            ))),
        }
    }
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Returns the records `[(p-1)*size, p*size)` clamped to the subset bounds. A page past
/// the end is empty, never an error; callers clamp the page back into range whenever
/// the subset changes.
pub fn slice<'a, T>(subset: &'a [T], state: &PageState) -> &'a [T] {
    let start = state
        .current_page
        .saturating_sub(1)
        .saturating_mul(state.page_size);
    if start >= subset.len() {
        return &subset[..0];
    }
    let end = start.saturating_add(state.page_size).min(subset.len());
    &subset[start..end]
}

/// Builds the compact page-index sequence: first page, last page and the neighbours of
/// the current page, with an ellipsis wherever consecutive entries skip pages.
pub fn index_sequence(current_page: usize, total_pages: usize) -> Vec<PageIndex> {
    let mut candidates: Vec<usize> = [
        Some(1),
        current_page.checked_sub(1),
        Some(current_page),
        current_page.checked_add(1),
        Some(total_pages),
    ]
    .into_iter()
    .flatten()
    .filter(|p| (1..=total_pages).contains(p))
    .collect();
    candidates.sort_unstable();
    candidates.dedup();

    let mut sequence = Vec::with_capacity(candidates.len() * 2);
    let mut last = 0;
    for page in candidates {
        if page - last > 1 {
            sequence.push(PageIndex::Ellipsis);
        }
        sequence.push(PageIndex::Page(page));
        last = page;
    }
    sequence
}

/// PaginationInfo
///
/// Summary of one rendered page, handed to the front end together with the rows.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PaginationInfo {
    pub current_page: usize,
    pub total_pages: usize,
    /// Size of the filtered subset, not of the loaded collection.
    pub total_count: usize,
    pub page_size: usize,
    pub has_prev: bool,
    pub has_next: bool,
    #[ts(type = "Array<number | string>")]
    #[schema(value_type = Vec<Object>)]
    pub pages: Vec<PageIndex>,
}

/// Paginator
///
/// A fixed page size bound to the helpers above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self, count: usize) -> usize {
        total_pages(count, self.page_size)
    }

    /// Brings `page` into `1..=total_pages(count)`.
    pub fn clamp(&self, page: usize, count: usize) -> usize {
        page.clamp(1, self.total_pages(count))
    }

    pub fn state(&self, current_page: usize) -> PageState {
        PageState::new(current_page, self.page_size)
    }

    pub fn slice<'a, T>(&self, subset: &'a [T], current_page: usize) -> &'a [T] {
        slice(subset, &self.state(current_page))
    }

    pub fn info(&self, current_page: usize, count: usize) -> PaginationInfo {
        let total = self.total_pages(count);
        PaginationInfo {
            current_page,
            total_pages: total,
            total_count: count,
            page_size: self.page_size,
            has_prev: current_page > 1,
            has_next: current_page < total,
            pages: index_sequence(current_page, total),
        }
    }
}
