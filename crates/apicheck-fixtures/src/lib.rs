//! # apicheck-fixtures: Fixture Files
//!
//! Data-driven suites keep their inputs in spreadsheets, either workbooks or
//! CSV exports. This crate turns those files into JSON rows
//! ([`read_structured_file`], [`read_structured_sheet`]),
//! request cases ([`DataDrivenCase`]) and login credentials
//! ([`load_login_credentials`]).

pub mod cases;
pub mod error;
pub mod reader;

pub use cases::{cases_from_rows, load_cases, load_login_credentials, DataDrivenCase, LoginCredentials};
pub use error::FixtureError;
pub use reader::{coerce_cell, read_structured, read_structured_file, read_structured_sheet};
