//! Development mode: serve rows from a local JSON fixture
//!
//! When the hosted backend is unavailable (or for demos and tests), load a
//! saved response of the list query and serve it through the same
//! `RowSource` trait as the live client. A fixture is a JSON array of rows
//! in exactly the shape the REST API returns.

use std::path::{Path, PathBuf};

use crate::ingest::{CompanyRow, RowSource};
use crate::logging::{self, Source};
use crate::model::BackendError;

/// Offline row source backed by a fixture file
pub struct DevMode {
    /// Where the rows came from, for log messages
    pub fixture_path: PathBuf,
    rows: Vec<CompanyRow>,
}

impl DevMode {
    /// Load a fixture file.
    ///
    /// The file is read once; later calls to `fetch_rows` return the same
    /// snapshot.
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Fixture(format!("cannot read {}: {}", path.display(), e)))?;
        let rows = Self::parse_rows(&text)
            .map_err(|e| BackendError::Fixture(format!("{}: {}", path.display(), e)))?;

        logging::info(
            Source::System,
            None,
            &format!("dev mode: loaded {} rows from {}", rows.len(), path.display()),
        );

        Ok(Self {
            fixture_path: path.to_path_buf(),
            rows,
        })
    }

    /// Build from rows already in memory
    pub fn from_rows(rows: Vec<CompanyRow>) -> Self {
        Self {
            fixture_path: PathBuf::from("<memory>"),
            rows,
        }
    }

    /// Parse a fixture document (a JSON array of rows)
    pub fn parse_rows(text: &str) -> Result<Vec<CompanyRow>, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for DevMode {
    fn fetch_rows(&self) -> Result<Vec<CompanyRow>, BackendError> {
        Ok(self.rows.clone())
    }

    fn fetch_row(&self, company_id: &str) -> Result<Option<CompanyRow>, BackendError> {
        Ok(self
            .rows
            .iter()
            .find(|row| row.company_id.as_deref() == Some(company_id))
            .cloned())
    }
}
