pub mod app;
pub mod crossref;
pub mod domain;
pub mod error;
pub mod formats;
pub mod metadata;
pub mod output;
pub mod receipt;
pub mod routing;
pub mod submit;
pub mod tabular;
pub mod transfer;
pub mod xml;
