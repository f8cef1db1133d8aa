use diesel::dsl::{exists, max};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Text;
use serde_json::Value;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::{Row, RowStore};
use crate::schema::sheet_rows;

use super::models::{NewSheetRow, SheetRow};

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}

fn to_index(n: usize) -> Result<i32, DomainError> {
    i32::try_from(n).map_err(|_| DomainError::Storage(format!("row {n} is out of range")))
}

/// Blocks other writers of `sheet` until the surrounding transaction ends.
fn lock_sheet(conn: &mut PgConnection, sheet: &str) -> Result<(), DomainError> {
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1)::bigint)")
        .bind::<Text, _>(sheet)
        .execute(conn)?;
    Ok(())
}

/// Sheets kept in PostgreSQL, one `sheet_rows` record per row.
///
/// Every write runs in its own transaction, holds the sheet's advisory lock
/// and is committed on return. Positions are therefore handed out and shifted
/// by one writer at a time, across pool connections and processes.
pub struct DieselRowStore {
    pool: DbPool,
}

impl DieselRowStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RowStore for DieselRowStore {
    fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_sheet(conn, sheet)?;
            let present: bool = diesel::select(exists(
                sheet_rows::table
                    .filter(sheet_rows::sheet_name.eq(sheet))
                    .filter(sheet_rows::row_index.eq(1)),
            ))
            .get_result(conn)?;

            if !present {
                let cells = header.iter().map(|h| Value::String(h.to_string())).collect();
                diesel::insert_into(sheet_rows::table)
                    .values(&NewSheetRow {
                        sheet_name: sheet,
                        row_index: 1,
                        cells: Value::Array(cells),
                    })
                    .execute(conn)?;
                log::info!("created sheet '{}'", sheet);
            }
            Ok(())
        })
    }

    fn append_row(&self, sheet: &str, cells: Row) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_sheet(conn, sheet)?;
            let last: Option<i32> = sheet_rows::table
                .filter(sheet_rows::sheet_name.eq(sheet))
                .select(max(sheet_rows::row_index))
                .first(conn)?;
            let row_index = last.unwrap_or(0) + 1;

            diesel::insert_into(sheet_rows::table)
                .values(&NewSheetRow {
                    sheet_name: sheet,
                    row_index,
                    cells: Value::Array(cells),
                })
                .execute(conn)?;

            Ok(row_index as usize)
        })
    }

    fn last_row(&self, sheet: &str) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;

        let last: Option<i32> = sheet_rows::table
            .filter(sheet_rows::sheet_name.eq(sheet))
            .select(max(sheet_rows::row_index))
            .first(&mut conn)?;

        Ok(last.map_or(0, |n| n as usize))
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
        let start = to_index(start_row)?;
        let end = to_index(start_row.saturating_add(num_rows))?;
        let mut conn = self.pool.get()?;

        let rows = sheet_rows::table
            .filter(sheet_rows::sheet_name.eq(sheet))
            .filter(sheet_rows::row_index.ge(start))
            .filter(sheet_rows::row_index.lt(end))
            .order(sheet_rows::row_index.asc())
            .select(SheetRow::as_select())
            .load(&mut conn)?;

        Ok(rows.into_iter().map(SheetRow::into_cells).collect())
    }

    fn delete_row(&self, sheet: &str, row: usize, expected: &[Value]) -> Result<bool, DomainError> {
        if row == 0 {
            return Err(DomainError::Storage("rows are 1-indexed".to_string()));
        }
        let row_index = to_index(row)?;
        let expected = Value::Array(expected.to_vec());
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_sheet(conn, sheet)?;
            let deleted = diesel::delete(
                sheet_rows::table
                    .filter(sheet_rows::sheet_name.eq(sheet))
                    .filter(sheet_rows::row_index.eq(row_index))
                    .filter(sheet_rows::cells.eq(expected)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Ok(false);
            }

            // Close the gap: the position constraint is checked at commit.
            diesel::update(
                sheet_rows::table
                    .filter(sheet_rows::sheet_name.eq(sheet))
                    .filter(sheet_rows::row_index.gt(row_index)),
            )
            .set(sheet_rows::row_index.eq(sheet_rows::row_index - 1))
            .execute(conn)?;

            Ok(true)
        })
    }
}
