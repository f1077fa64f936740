use std::collections::BTreeMap;

/// A caller-supplied projection of one text field out of a record. `None` means the
/// field is missing and matches as an empty string.
pub type Projection<R> = Box<dyn Fn(&R) -> Option<String> + Send + Sync>;

/// CategoryFilter
///
/// The categorical half of the criteria. The sentinel `"all"` bypasses the predicate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub const ALL_SENTINEL: &'static str = "all";

    /// Parses a query parameter. Absent, empty and `"all"` all select every category.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => CategoryFilter::All,
            Some(v) if v.is_empty() || v == Self::ALL_SENTINEL => CategoryFilter::All,
            Some(v) => CategoryFilter::Only(v.to_string()),
        }
    }

    /// The value as the view echoes it back to the filter bar.
    pub fn as_param(&self) -> &str {
        match self {
            CategoryFilter::All => Self::ALL_SENTINEL,
            CategoryFilter::Only(v) => v,
        }
    }
}

/// FilterCriteria
///
/// Owned by the view and re-applied on every change; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub search_term: String,
    pub category: CategoryFilter,
}

impl FilterCriteria {
    pub fn new(search_term: impl Into<String>, category: CategoryFilter) -> Self {
        Self {
            search_term: search_term.into(),
            category,
        }
    }

    pub fn from_params(search: Option<String>, category: Option<&str>) -> Self {
        Self::new(search.unwrap_or_default(), CategoryFilter::parse(category))
    }
}

/// FilterEngine
///
/// Composes a free-text substring predicate and a categorical equality predicate over
/// any record shape. The engine is configured once per view with the fields to search
/// and the field to categorise by; `apply` is then a pure function of records and
/// criteria that keeps the original relative order.
///
/// No debouncing happens here. Callers that recompute on every keystroke throttle on
/// their side.
pub struct FilterEngine<R> {
    search_fields: Vec<Projection<R>>,
    category: Projection<R>,
}

impl<R> FilterEngine<R> {
    pub fn new<F>(category: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            search_fields: Vec::new(),
            category: Box::new(category),
        }
    }

    /// Appends a field to the searchable text. Fields are joined in the order added.
    pub fn search_field<F>(mut self, field: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        self.search_fields.push(Box::new(field));
        self
    }

    pub fn apply<'a>(&self, records: &'a [R], criteria: &FilterCriteria) -> Vec<&'a R> {
        let keyword = criteria.search_term.to_lowercase();
        records
            .iter()
            .filter(|record| self.matches_lowered(record, &keyword, &criteria.category))
            .collect()
    }

    pub fn matches(&self, record: &R, criteria: &FilterCriteria) -> bool {
        self.matches_lowered(record, &criteria.search_term.to_lowercase(), &criteria.category)
    }

    /// The lower-cased, single-space joined text the search term is tested against.
    pub fn haystack(&self, record: &R) -> String {
        self.search_fields
            .iter()
            .map(|field| field(record).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Distinct category values in first-seen order, for the filter dropdown.
    pub fn categories(&self, records: &[R]) -> Vec<String> {
        let mut seen = Vec::new();
        for value in records.iter().filter_map(|r| (self.category)(r)) {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen
    }

    /// Number of records per category value.
    pub fn category_counts(&self, records: &[R]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for value in records.iter().filter_map(|r| (self.category)(r)) {
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    }

    fn matches_lowered(&self, record: &R, keyword: &str, category: &CategoryFilter) -> bool {
        let text_match = keyword.is_empty() || self.haystack(record).contains(keyword);

        let category_match = match category {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => {
                (self.category)(record).is_some_and(|value| &value == wanted)
            }
        };

        text_match && category_match
    }
}
