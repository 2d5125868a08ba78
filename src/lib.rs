//! # rtdocs
//!
//! A CLI utility for the ReadTheDocs.org v1 API: list every hosted
//! documentation project, or fetch the download links to a project's EPUB,
//! HTMLZip, and PDF documents and optionally save one of them.
//!
//! ## Usage
//!
//! ```bash
//! rtdocs list --verbose
//! rtdocs fetch -s zip -d docs requests flask
//! ```

mod api;
mod fetcher;
mod lister;

pub use api::{
    ApiClient, PageCursor, PageMeta, Project, ProjectLookup, ProjectPage, DEFAULT_BASE_URL,
};
pub use fetcher::DocFetcher;
pub use lister::ProjectLister;
