//! Core types and trait definitions for the ForenSeek client.
//!
//! No HTTP and no database here. The case query engine in [`query`] is a
//! pure, synchronous transform over already-fetched [`case::Case`] records;
//! storage backends implement the traits in [`store`].

pub mod case;
pub mod case_form;
pub mod error;
pub mod evidence;
pub mod query;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use query::{CaseFilter, ColorToken, StatusFilter, query, status_color};
