//! In-memory row store for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::domain::errors::DomainError;
use crate::domain::ports::{Row, RowStore};

/// Sheets held in memory. Clones share the same sheets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRowStore {
    sheets: Arc<RwLock<HashMap<String, Vec<Row>>>>,
}

impl InMemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of `sheet`, header included.
    pub fn rows(&self, sheet: &str) -> Result<Vec<Row>, DomainError> {
        let sheets = self
            .sheets
            .read()
            .map_err(|e| DomainError::Internal(format!("Failed to acquire read lock: {e}")))?;
        Ok(sheets.get(sheet).cloned().unwrap_or_default())
    }
}

impl RowStore for InMemoryRowStore {
    fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<(), DomainError> {
        let mut sheets = self
            .sheets
            .write()
            .map_err(|e| DomainError::Internal(format!("Failed to acquire write lock: {e}")))?;
        let rows = sheets.entry(sheet.to_string()).or_default();
        if rows.is_empty() {
            rows.push(header.iter().map(|h| Value::String(h.to_string())).collect());
        }
        Ok(())
    }

    fn append_row(&self, sheet: &str, cells: Row) -> Result<usize, DomainError> {
        let mut sheets = self
            .sheets
            .write()
            .map_err(|e| DomainError::Internal(format!("Failed to acquire write lock: {e}")))?;
        let rows = sheets.entry(sheet.to_string()).or_default();
        rows.push(cells);
        Ok(rows.len())
    }

    fn last_row(&self, sheet: &str) -> Result<usize, DomainError> {
        let sheets = self
            .sheets
            .read()
            .map_err(|e| DomainError::Internal(format!("Failed to acquire read lock: {e}")))?;
        Ok(sheets.get(sheet).map_or(0, Vec::len))
    }

    fn read_rows(
        &self,
        sheet: &str,
        start_row: usize,
        num_rows: usize,
    ) -> Result<Vec<Row>, DomainError> {
        if start_row == 0 {
            return Err(DomainError::Storage("rows are 1-indexed".to_string()));
        }
        let sheets = self
            .sheets
            .read()
            .map_err(|e| DomainError::Internal(format!("Failed to acquire read lock: {e}")))?;
        Ok(sheets
            .get(sheet)
            .map(|rows| {
                rows.iter()
                    .skip(start_row - 1)
                    .take(num_rows)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn delete_row(&self, sheet: &str, row: usize, expected: &[Value]) -> Result<bool, DomainError> {
        if row == 0 {
            return Err(DomainError::Storage("rows are 1-indexed".to_string()));
        }
        let mut sheets = self
            .sheets
            .write()
            .map_err(|e| DomainError::Internal(format!("Failed to acquire write lock: {e}")))?;
        let Some(rows) = sheets.get_mut(sheet) else {
            return Ok(false);
        };
        if rows.get(row - 1).map(Vec::as_slice) != Some(expected) {
            return Ok(false);
        }
        rows.remove(row - 1);
        Ok(true)
    }
}
