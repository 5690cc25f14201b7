//! MySQL connection implementation

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use mysql_async::{Conn, Opts, OptsBuilder, Row as MySqlRow, consts::ColumnType, prelude::*};
use sqlgate_core::{
    ColumnMeta, Connection, ConnectionSettings, QueryResult, Result, Row, SqlgateError, Value,
};

/// A single MySQL session.
///
/// Unlike a pooled handle this owns exactly one socket; the sqlgate pool above
/// it does the pooling.
pub struct MySqlConnection {
    conn: Option<Conn>,
    /// Bound on one whole statement, result sets included
    read_timeout: Option<Duration>,
}

impl MySqlConnection {
    /// Open a session using `settings`, applying the charset on connect
    pub async fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let opts = build_opts(settings)?;
        let timeout = settings.timeout();

        tracing::info!(
            host = %settings.host,
            port = %settings.port,
            database = %settings.database,
            "connecting to MySQL database"
        );

        let conn = tokio::time::timeout(timeout, Conn::new(opts))
            .await
            .map_err(|_| {
                SqlgateError::Connection(format!(
                    "Connecting to {}:{} timed out after {}s",
                    settings.host,
                    settings.port,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| SqlgateError::Connection(format!("Failed to connect to MySQL: {}", e)))?;

        tracing::info!(
            host = %settings.host,
            connection_id = conn.id(),
            "MySQL connection established"
        );

        Ok(Self {
            conn: Some(conn),
            read_timeout: settings.read_timeout(),
        })
    }

    fn conn_mut(&mut self) -> Result<&mut Conn> {
        self.conn
            .as_mut()
            .ok_or_else(|| SqlgateError::Connection("MySQL connection is closed".into()))
    }
}

/// Build connect options; only the charset can make these fail
fn build_opts(settings: &ConnectionSettings) -> Result<Opts> {
    if !is_valid_charset(&settings.charset) {
        return Err(SqlgateError::Driver(format!(
            "invalid character set name '{}'",
            settings.charset
        )));
    }

    let opts = OptsBuilder::default()
        .ip_or_hostname(settings.host.as_str())
        .tcp_port(settings.port)
        .user(Some(settings.user.as_str()))
        .pass(Some(settings.password.as_str()))
        .db_name(Some(settings.database.as_str()))
        .init(vec![format!("SET NAMES {}", settings.charset)]);

    Ok(opts.into())
}

/// Charset names are bare identifiers such as `utf8mb4` or `latin1`
fn is_valid_charset(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Convert mysql_async Value to our Value type, using column type metadata
/// to correctly interpret byte strings from the text protocol.
fn mysql_value_to_value(val: mysql_async::Value, col_type: ColumnType) -> Value {
    match val {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => match col_type {
                ColumnType::MYSQL_TYPE_TINY
                | ColumnType::MYSQL_TYPE_SHORT
                | ColumnType::MYSQL_TYPE_LONG
                | ColumnType::MYSQL_TYPE_LONGLONG
                | ColumnType::MYSQL_TYPE_INT24
                | ColumnType::MYSQL_TYPE_YEAR => match s.parse::<i64>() {
                    Ok(v) => Value::Int64(v),
                    Err(_) => s.parse::<u64>().map(Value::UInt64).unwrap_or(Value::String(s)),
                },
                ColumnType::MYSQL_TYPE_FLOAT => {
                    s.parse::<f32>().map(Value::Float32).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DOUBLE => {
                    s.parse::<f64>().map(Value::Float64).unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
                    Value::Decimal(s)
                }
                ColumnType::MYSQL_TYPE_DATE => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(Value::Date)
                    .unwrap_or(Value::String(s)),
                ColumnType::MYSQL_TYPE_DATETIME | ColumnType::MYSQL_TYPE_TIMESTAMP => {
                    chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                        .map(Value::DateTime)
                        .unwrap_or(Value::String(s))
                }
                ColumnType::MYSQL_TYPE_TIME => Value::Time(s),
                _ => Value::String(s),
            },
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        mysql_async::Value::Int(i) => Value::Int64(i),
        mysql_async::Value::UInt(u) => match i64::try_from(u) {
            Ok(v) => Value::Int64(v),
            Err(_) => Value::UInt64(u),
        },
        mysql_async::Value::Float(f) => Value::Float32(f),
        mysql_async::Value::Double(d) => Value::Float64(d),
        mysql_async::Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = chrono::NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
            if hour == 0 && min == 0 && sec == 0 && micro == 0 {
                match date {
                    Some(date) => Value::Date(date),
                    None => Value::String(format!("{:04}-{:02}-{:02}", year, month, day)),
                }
            } else {
                match date.and_then(|d| d.and_hms_micro_opt(hour as u32, min as u32, sec as u32, micro)) {
                    Some(dt) => Value::DateTime(dt),
                    None => Value::String(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        year, month, day, hour, min, sec
                    )),
                }
            }
        }
        mysql_async::Value::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + hours as u32;
            let sign = if negative { "-" } else { "" };
            Value::Time(format!(
                "{}{:02}:{:02}:{:02}.{:06}",
                sign, total_hours, mins, secs, micros
            ))
        }
    }
}

/// Drain every result set the statement produced
async fn collect_result_sets(
    conn: &mut Conn,
    sql: &str,
) -> std::result::Result<Vec<QueryResult>, mysql_async::Error> {
    let mut result = conn.query_iter(sql).await?;
    let mut sets = Vec::new();

    // Every statement yields a set, including the OK packet of the last one.
    loop {
        let start_time = Instant::now();
        let (column_names, column_types): (Vec<String>, Vec<ColumnType>) = result
            .columns_ref()
            .iter()
            .map(|col| (col.name_str().to_string(), col.column_type()))
            .unzip();
        // The OK packet only belongs to this set when it has no columns
        let affected_rows = if column_names.is_empty() {
            result.affected_rows()
        } else {
            0
        };
        let mysql_rows: Vec<MySqlRow> = result.collect().await?;

        let column_meta = column_names
            .iter()
            .zip(column_types.iter())
            .enumerate()
            .map(|(ordinal, (name, col_type))| ColumnMeta {
                name: name.clone(),
                data_type: format!("{:?}", col_type),
                ordinal,
            })
            .collect();

        let names: Arc<[String]> = column_names.into();
        let rows = mysql_rows
            .into_iter()
            .map(|mysql_row| {
                let values = column_types
                    .iter()
                    .enumerate()
                    .map(|(idx, col_type)| {
                        let mysql_val: mysql_async::Value =
                            mysql_row.get(idx).unwrap_or(mysql_async::Value::NULL);
                        mysql_value_to_value(mysql_val, *col_type)
                    })
                    .collect();
                Row::new(names.clone(), values)
            })
            .collect();

        sets.push(QueryResult {
            columns: column_meta,
            rows,
            affected_rows,
            execution_time_ms: start_time.elapsed().as_millis() as u64,
            ..QueryResult::empty()
        });

        if result.is_empty() {
            break;
        }
    }

    Ok(sets)
}

#[async_trait]
impl Connection for MySqlConnection {
    fn driver_name(&self) -> &str {
        "mysql"
    }

    fn connection_id(&self) -> Option<u64> {
        self.conn.as_ref().map(|c| u64::from(c.id()))
    }

    #[tracing::instrument(skip(self, sql), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn query(&mut self, sql: &str) -> Result<Vec<QueryResult>> {
        let read_timeout = self.read_timeout;
        let conn = self.conn_mut()?;

        let sets = match read_timeout {
            Some(limit) => tokio::time::timeout(limit, collect_result_sets(conn, sql))
                .await
                .map_err(|_| {
                    SqlgateError::Query(format!("Query timed out after {}s", limit.as_secs()))
                })?,
            None => collect_result_sets(conn, sql).await,
        }
        .map_err(|e| SqlgateError::Query(format!("Failed to execute query: {}", e)))?;

        tracing::debug!(result_sets = sets.len(), "query executed successfully");
        Ok(sets)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        tracing::debug!(connection_id = conn.id(), "closing MySQL connection");
        conn.disconnect()
            .await
            .map_err(|e| SqlgateError::Connection(format!("Failed to close MySQL connection: {}", e)))
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}
