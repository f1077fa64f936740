//! The tabular-data pipeline shared by every list view.
//!
//! A view loads a record collection, `filter` derives the visible subset from the
//! operator's criteria, `paginate` slices that subset into a page, and `export` turns
//! the whole filtered subset (never just the page) into a downloadable blob. Every
//! stage is generic over the record shape and pure with respect to its input.

pub mod export;
pub mod filter;
pub mod paginate;

pub use export::{Column, ExportBlob, SheetTable, SpreadsheetEncoder, XlsxEncoder};
pub use filter::{CategoryFilter, FilterCriteria, FilterEngine};
pub use paginate::{PageIndex, PageState, PaginationInfo, Paginator};

/// Identified
///
/// A record with a stable unique identifier. List views rely on it to key rows, detail
/// views use it to reject responses for a record that is no longer the one requested.
pub trait Identified {
    type Id: Clone + PartialEq + std::fmt::Debug;

    fn id(&self) -> Self::Id;
}
