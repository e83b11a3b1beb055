use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::records::{DecodeError, RawRow, RecordRow, RecordTable};
use crate::statements::{MutateStatement, SearchStatement, SqlParam};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("backend failed: {0}")]
    Backend(#[source] BackendError),
    #[error("failed to decode `{table}` row: {source}")]
    Decode {
        table: RecordTable,
        #[source]
        source: DecodeError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}

#[async_trait]
pub trait RowStream: Send {
    async fn next_row(&mut self) -> Result<Option<RawRow>, BackendError>;
}

/// A relational store reachable through prepared statements.
#[async_trait]
pub trait RecordBackend {
    type Stream: RowStream + Send;

    async fn mutate(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<MutationOutcome, BackendError>;

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Self::Stream, BackendError>;

    async fn disconnect(&self) -> Result<(), BackendError>;
}

/// Rows of one search, decoded lazily in backend order.
#[derive(Debug)]
pub struct RowCursor<S> {
    table: RecordTable,
    stream: S,
}

impl<S: RowStream> RowCursor<S> {
    #[must_use]
    pub fn new(table: RecordTable, stream: S) -> Self {
        Self { table, stream }
    }

    #[must_use]
    pub fn table(&self) -> RecordTable {
        self.table
    }

    #[must_use]
    pub fn columns(&self) -> &'static [&'static str] {
        self.table.columns()
    }

    pub async fn next_record(&mut self) -> Result<Option<RecordRow>, ExecutorError> {
        let Some(raw) = self
            .stream
            .next_row()
            .await
            .map_err(ExecutorError::Backend)?
        else {
            return Ok(None);
        };

        RecordRow::decode(self.table, raw)
            .map(Some)
            .map_err(|source| ExecutorError::Decode {
                table: self.table,
                source,
            })
    }
}

#[derive(Debug)]
pub struct QueryExecutor<B: RecordBackend> {
    backend: B,
}

impl<B: RecordBackend> QueryExecutor<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn mutate(
        &self,
        statement: &MutateStatement,
    ) -> Result<MutationOutcome, ExecutorError> {
        info!(
            table = %statement.table,
            kind = ?statement.kind,
            "executing mutation"
        );
        let outcome = self
            .backend
            .mutate(&statement.sql, &statement.params)
            .await
            .map_err(ExecutorError::Backend)?;
        debug!(
            rows_affected = outcome.rows_affected,
            last_insert_id = ?outcome.last_insert_id,
            "mutation finished"
        );
        Ok(outcome)
    }

    pub async fn search(
        &self,
        statement: &SearchStatement,
    ) -> Result<RowCursor<B::Stream>, ExecutorError> {
        info!(
            table = %statement.table,
            column = %statement.column,
            "executing search"
        );
        let stream = self
            .backend
            .query(&statement.sql, &statement.params)
            .await
            .map_err(ExecutorError::Backend)?;
        Ok(RowCursor::new(statement.table, stream))
    }

    pub async fn disconnect(&self) -> Result<(), BackendError> {
        self.backend.disconnect().await
    }
}
