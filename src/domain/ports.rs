use serde_json::Value;

use super::errors::DomainError;

/// One stored row: an ordered list of cells.
pub type Row = Vec<Value>;

/// Row-oriented table store addressed by 1-indexed row positions.
///
/// Row 1 of every sheet holds its header. Deleting row `n` shifts every row
/// below it up by one. Writes to a sheet are serialized and committed before
/// the call returns, so a subsequent read always observes them.
pub trait RowStore: Send + Sync + 'static {
    /// Creates the sheet with `header` as row 1 if it has no header yet.
    fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<(), DomainError>;

    /// Appends `cells` after the last row and returns the new row's position.
    fn append_row(&self, sheet: &str, cells: Row) -> Result<usize, DomainError>;

    /// Position of the last occupied row, header included. `0` for an empty sheet.
    fn last_row(&self, sheet: &str) -> Result<usize, DomainError>;

    /// Reads up to `num_rows` rows starting at `start_row`.
    fn read_rows(&self, sheet: &str, start_row: usize, num_rows: usize)
        -> Result<Vec<Row>, DomainError>;

    /// Deletes `row` if it still holds `expected`, checked and removed as one
    /// step. Returns `false` when the row has since moved or is gone, which
    /// happens when another writer deleted rows above it.
    fn delete_row(&self, sheet: &str, row: usize, expected: &[Value]) -> Result<bool, DomainError>;
}

impl<S: RowStore + ?Sized> RowStore for Box<S> {
    fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<(), DomainError> {
        (**self).ensure_header(sheet, header)
    }

    fn append_row(&self, sheet: &str, cells: Row) -> Result<usize, DomainError> {
        (**self).append_row(sheet, cells)
    }

    fn last_row(&self, sheet: &str) -> Result<usize, DomainError> {
        (**self).last_row(sheet)
    }

    fn read_rows(
        &self,
        sheet: &str,
        start_row: usize,
        num_rows: usize,
    ) -> Result<Vec<Row>, DomainError> {
        (**self).read_rows(sheet, start_row, num_rows)
    }

    fn delete_row(&self, sheet: &str, row: usize, expected: &[Value]) -> Result<bool, DomainError> {
        (**self).delete_row(sheet, row, expected)
    }
}
