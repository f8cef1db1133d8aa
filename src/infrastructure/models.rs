use diesel::prelude::*;
use serde_json::Value;

use crate::schema::sheet_rows;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = sheet_rows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SheetRow {
    pub id: i64,
    pub sheet_name: String,
    pub row_index: i32,
    pub cells: Value,
}

impl SheetRow {
    pub fn into_cells(self) -> Vec<Value> {
        match self.cells {
            Value::Array(cells) => cells,
            other => vec![other],
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sheet_rows)]
pub struct NewSheetRow<'a> {
    pub sheet_name: &'a str,
    pub row_index: i32,
    pub cells: Value,
}
