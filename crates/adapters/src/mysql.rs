use async_trait::async_trait;
use futures_util::StreamExt;
use mysql_async::prelude::{Query, Queryable, WithParams};
use mysql_async::{
    BinaryProtocol, OptsBuilder, Params, Pool, PoolConstraints, PoolOpts, ResultSetStream, Row,
    Value,
};
use tracing::{debug, info};
use warden_core::config::{
    DatabaseConfig, Transport, CONNECTION_MAX_LIFETIME, POOL_MAX_IDLE, POOL_MAX_OPEN,
};
use warden_core::query_executor::{BackendError, MutationOutcome, RecordBackend, RowStream};
use warden_core::records::{CellValue, RawRow, Timestamp};
use warden_core::statements::SqlParam;

/// A single-connection pool; backend round-trips never overlap.
#[derive(Debug, Clone)]
pub struct MysqlRecordBackend {
    pool: Pool,
}

impl MysqlRecordBackend {
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, BackendError> {
        let opts = opts_from_config(config)?;
        info!(dsn = %config.redacted_dsn(), "mysql pool configured");
        Ok(Self {
            pool: Pool::new(opts),
        })
    }
}

#[derive(Debug)]
pub struct MysqlRowStream {
    stream: Option<ResultSetStream<'static, 'static, 'static, Row, BinaryProtocol>>,
}

impl MysqlRowStream {
    fn new(stream: ResultSetStream<'static, 'static, 'static, Row, BinaryProtocol>) -> Self {
        Self {
            stream: Some(stream),
        }
    }
}

#[async_trait]
impl RowStream for MysqlRowStream {
    async fn next_row(&mut self) -> Result<Option<RawRow>, BackendError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        match stream.next().await {
            Some(Ok(row)) => Ok(Some(row_to_raw_row(row))),
            Some(Err(error)) => Err(to_backend_error(error)),
            None => {
                self.stream = None;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl RecordBackend for MysqlRecordBackend {
    type Stream = MysqlRowStream;

    async fn mutate(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<MutationOutcome, BackendError> {
        let mut conn = self.pool.get_conn().await.map_err(to_backend_error)?;
        conn.exec_drop(sql, to_params(params))
            .await
            .map_err(to_backend_error)?;

        Ok(MutationOutcome {
            rows_affected: conn.affected_rows(),
            last_insert_id: conn.last_insert_id(),
        })
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> Result<Self::Stream, BackendError> {
        let stream = sql
            .to_string()
            .with(to_params(params))
            .stream::<Row, _>(self.pool.clone())
            .await
            .map_err(to_backend_error)?;
        Ok(MysqlRowStream::new(stream))
    }

    async fn disconnect(&self) -> Result<(), BackendError> {
        debug!("disconnecting mysql pool");
        self.pool
            .clone()
            .disconnect()
            .await
            .map_err(to_backend_error)
    }
}

fn opts_from_config(config: &DatabaseConfig) -> Result<OptsBuilder, BackendError> {
    let mut builder = OptsBuilder::default()
        .user(Some(config.username.clone()))
        .pass(Some(config.password.clone()))
        .db_name(Some(config.database_name.clone()))
        .pool_opts(pool_opts()?);

    builder = match config.transport() {
        Transport::Tcp => {
            let (host, port) = config.tcp_endpoint();
            builder
                .ip_or_hostname(host)
                .tcp_port(port)
                .prefer_socket(false)
        }
        Transport::Unix => builder.socket(Some(config.database_url.clone())),
    };

    Ok(builder)
}

fn pool_opts() -> Result<PoolOpts, BackendError> {
    let constraints = PoolConstraints::new(POOL_MAX_IDLE, POOL_MAX_OPEN)
        .ok_or_else(|| BackendError::new("invalid pool constraints"))?;
    Ok(PoolOpts::default()
        .with_constraints(constraints)
        .with_abs_conn_ttl(Some(CONNECTION_MAX_LIFETIME)))
}

fn to_params(params: &[SqlParam]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(params.iter().map(sql_param_to_value).collect())
}

fn sql_param_to_value(param: &SqlParam) -> Value {
    match param {
        SqlParam::Int(value) => Value::Int(*value),
        SqlParam::UInt(value) => Value::UInt(*value),
        SqlParam::Text(value) => Value::Bytes(value.clone().into_bytes()),
    }
}

fn row_to_raw_row(row: Row) -> RawRow {
    RawRow::new(row.unwrap().into_iter().map(mysql_value_to_cell).collect())
}

fn mysql_value_to_cell(value: Value) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Bytes(bytes) => CellValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(value) => CellValue::Int(value),
        Value::UInt(value) => CellValue::UInt(value),
        Value::Float(value) => CellValue::Float(f64::from(value)),
        Value::Double(value) => CellValue::Float(value),
        Value::Date(year, month, day, hour, minute, second, _micros) => {
            CellValue::Timestamp(Timestamp {
                year,
                month,
                day,
                hour,
                minute,
                second,
            })
        }
        Value::Time(is_negative, days, hours, minutes, seconds, micros) => {
            let sign = if is_negative { "-" } else { "" };
            CellValue::Text(format!(
                "{sign}{days:03} {hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}

fn to_backend_error(error: mysql_async::Error) -> BackendError {
    BackendError::new(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mysql_async::{Params, Value};
    use warden_core::config::DatabaseConfig;
    use warden_core::records::{CellValue, Timestamp};
    use warden_core::statements::SqlParam;

    use super::{mysql_value_to_cell, opts_from_config, pool_opts, to_params};

    fn sample_config(protocol: &str, url: &str) -> DatabaseConfig {
        DatabaseConfig {
            username: "warden".to_string(),
            password: "pw".to_string(),
            protocol: protocol.to_string(),
            database_url: url.to_string(),
            database_name: "feedback".to_string(),
            log_file: PathBuf::from("warden.log"),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn value_conversion_keeps_backend_types() {
        assert_eq!(mysql_value_to_cell(Value::NULL), CellValue::Null);
        assert_eq!(
            mysql_value_to_cell(Value::Bytes(b"steve".to_vec())),
            CellValue::Text("steve".to_string())
        );
        assert_eq!(mysql_value_to_cell(Value::Int(-1)), CellValue::Int(-1));
        assert_eq!(mysql_value_to_cell(Value::UInt(8)), CellValue::UInt(8));
        assert_eq!(
            mysql_value_to_cell(Value::Date(2020, 1, 2, 3, 4, 5, 0)),
            CellValue::Timestamp(Timestamp {
                year: 2020,
                month: 1,
                day: 2,
                hour: 3,
                minute: 4,
                second: 5,
            })
        );
    }

    #[test]
    fn params_are_positional_and_typed() {
        let params = to_params(&[
            SqlParam::Text("steve".to_string()),
            SqlParam::UInt(4),
            SqlParam::Int(-7),
        ]);
        assert_eq!(
            params,
            Params::Positional(vec![
                Value::Bytes(b"steve".to_vec()),
                Value::UInt(4),
                Value::Int(-7),
            ])
        );
        assert_eq!(to_params(&[]), Params::Empty);
    }

    #[test]
    fn pool_is_limited_to_one_connection() {
        let opts = pool_opts().expect("pool opts");
        assert_eq!(opts.constraints().min(), 1);
        assert_eq!(opts.constraints().max(), 1);
    }

    #[test]
    fn opts_builder_accepts_tcp_and_unix_configs() {
        opts_from_config(&sample_config("tcp", "127.0.0.1:3307")).expect("tcp opts");
        opts_from_config(&sample_config("unix", "/run/mysqld/mysqld.sock")).expect("unix opts");
        // Construction is the assertion here; mysql_async exposes limited stable introspection.
    }
}
