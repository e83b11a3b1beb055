use thiserror::Error;

use crate::records::{RecordTable, SearchColumn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatementError {
    #[error("column `{column}` is not searchable on `{table}`")]
    ColumnNotSearchable {
        table: RecordTable,
        column: SearchColumn,
    },
}

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    UInt(u64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutateStatement {
    pub table: RecordTable,
    pub kind: MutationKind,
    pub sql: String,
    pub params: Vec<SqlParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStatement {
    pub table: RecordTable,
    pub column: SearchColumn,
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SearchStatement {
    #[must_use]
    pub fn pattern(&self) -> Option<&str> {
        self.params.first().and_then(|param| match param {
            SqlParam::Text(pattern) => Some(pattern.as_str()),
            SqlParam::Int(_) | SqlParam::UInt(_) => None,
        })
    }
}

#[must_use]
pub fn quote_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// New admins always start at level -1; only flags are operator-chosen.
#[must_use]
pub fn insert_admin_statement(ckey: &str, rank: &str, flags: u16) -> MutateStatement {
    MutateStatement {
        table: RecordTable::Admins,
        kind: MutationKind::Insert,
        sql: format!(
            "INSERT INTO {}(ckey, {}, level, flags) VALUES (?, ?, -1, ?)",
            RecordTable::Admins.table_name(),
            quote_identifier("rank")
        ),
        params: vec![
            SqlParam::Text(ckey.to_string()),
            SqlParam::Text(rank.to_string()),
            SqlParam::UInt(u64::from(flags)),
        ],
    }
}

#[must_use]
pub fn insert_whitelist_statement(ckey: &str, race: &str) -> MutateStatement {
    MutateStatement {
        table: RecordTable::Whitelist,
        kind: MutationKind::Insert,
        sql: format!(
            "INSERT INTO {}(ckey, race) VALUES (?, ?)",
            RecordTable::Whitelist.table_name()
        ),
        params: vec![
            SqlParam::Text(ckey.to_string()),
            SqlParam::Text(race.to_string()),
        ],
    }
}

#[must_use]
pub fn delete_whitelist_statement(id: i16) -> MutateStatement {
    MutateStatement {
        table: RecordTable::Whitelist,
        kind: MutationKind::Delete,
        sql: format!(
            "DELETE FROM {} WHERE id = ? LIMIT 1",
            RecordTable::Whitelist.table_name()
        ),
        params: vec![SqlParam::Int(i64::from(id))],
    }
}

/// The pattern is bound verbatim; callers add `%` themselves for partial matches.
pub fn search_statement(
    table: RecordTable,
    column: SearchColumn,
    pattern: &str,
) -> Result<SearchStatement, StatementError> {
    if !table.search_columns().contains(&column) {
        return Err(StatementError::ColumnNotSearchable { table, column });
    }

    let selected = table
        .columns()
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(SearchStatement {
        table,
        column,
        sql: format!(
            "SELECT {selected} FROM {} WHERE {} LIKE ?",
            quote_identifier(table.table_name()),
            quote_identifier(column.column_name())
        ),
        params: vec![SqlParam::Text(pattern.to_string())],
    })
}
