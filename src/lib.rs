//! Fihrist - bibliographic search over the OpenITI corpus metadata
//!
//! Query construction, pagination, and result shaping for a catalog API
//! backed by a hosted search service. The service owns retrieval and
//! ranking; this crate owns everything around it.

pub mod backends;
pub mod client;
pub mod config;
pub mod documents;
pub mod error;
pub mod filters;
pub mod pagination;
pub mod query;
pub mod results;

pub use backends::{BackendKind, HttpPlan, PlanBody, SearchBackend, SearchRequest};
pub use client::{CatalogPage, FilterOptions, QuickSearchResults, SearchClient};
pub use config::AppConfig;
pub use documents::{AuthorRecord, BookRecord, AUTHORS_COLLECTION, BOOKS_COLLECTION};
pub use error::FihristError;
pub use filters::{AuthorFilters, BookFilters, FilterClause, SortKey, YearRange};
pub use pagination::{paginate, PageDescriptor, PageToken};
pub use query::{build_field_query, classify_script, FieldTier, Script, SearchQuery, WeightedFields};
pub use results::{merge_hits, Highlight, Hit, Identified, SearchPage};
