use crate::backend::{
    BackendConnector, BackendSession, FieldMeta, QueryOutcome, RowValues, SessionError,
};

use async_trait::async_trait;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Row, Value};
use tracing::warn;

/// Dials the target server over TCP with the credentials forwarded in the
/// form. No pooling: the tunnel contract is one connection per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl BackendConnector for MySqlConnector {
    type Session = MySqlSession;

    async fn connect(
        &self,
        host: &str,
        port: &str,
        user: &str,
        password: &str,
    ) -> Result<MySqlSession, SessionError> {
        let tcp_port: u16 = port
            .parse()
            .map_err(|_| SessionError::BadPort(port.to_string()))?;
        let opts = OptsBuilder::default()
            .ip_or_hostname(host.to_string())
            .tcp_port(tcp_port)
            .user(Some(user.to_string()))
            .pass(Some(password.to_string()))
            // always dial TCP, even for localhost targets
            .prefer_socket(false);
        let conn = Conn::new(opts).await?;
        Ok(MySqlSession { conn })
    }
}

pub struct MySqlSession {
    conn: Conn,
}

#[async_trait]
impl BackendSession for MySqlSession {
    async fn select_db(&mut self, database: &str) -> Result<(), SessionError> {
        let statement = format!("USE `{}`", database.replace('`', "``"));
        self.conn.query_drop(statement).await?;
        Ok(())
    }

    async fn run_query(&mut self, statement: &str) -> Result<QueryOutcome, SessionError> {
        let mut result = self.conn.query_iter(statement).await?;
        // column metadata is gone once the set is collected
        let fields: Vec<FieldMeta> = result
            .columns()
            .map(|columns| columns.iter().map(field_meta).collect())
            .unwrap_or_default();
        let raw_rows: Vec<Row> = result.collect().await?;
        Ok(QueryOutcome {
            affected_rows: result.affected_rows(),
            last_insert_id: result.last_insert_id().unwrap_or(0),
            rows: raw_rows
                .into_iter()
                .map(|row| row_values(row, &fields))
                .collect(),
            fields,
        })
    }

    async fn close(self) {
        if let Err(e) = self.conn.disconnect().await {
            warn!("TunnelSrv backend disconnect err = {e:?}");
        }
    }
}

fn field_meta(column: &mysql_async::Column) -> FieldMeta {
    FieldMeta {
        name: column.name_str().into_owned(),
        table: column.table_str().into_owned(),
        type_code: u32::from(column.column_type() as u8),
        flags: u32::from(column.flags().bits()),
        display_len: column.column_length(),
    }
}

fn row_values(row: Row, fields: &[FieldMeta]) -> RowValues {
    row.unwrap()
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            value_text_bytes(value, fields.get(index).map_or(0, |field| field.type_code))
        })
        .collect()
}

/// Text-protocol rendition of a driver value. Text queries deliver almost
/// everything as `Value::Bytes` already; the remaining variants are printed
/// the way the server would. The driver folds DATE, DATETIME and TIMESTAMP
/// columns into one temporal shape, so the column type decides the format;
/// a midnight DATETIME still carries its time part.
fn value_text_bytes(value: Value, type_code: u32) -> Option<Vec<u8>> {
    match value {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(bytes),
        Value::Int(v) => Some(v.to_string().into_bytes()),
        Value::UInt(v) => Some(v.to_string().into_bytes()),
        Value::Float(v) => Some(v.to_string().into_bytes()),
        Value::Double(v) => Some(v.to_string().into_bytes()),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let date_only = type_code == ColumnType::MYSQL_TYPE_DATE as u32
                || type_code == ColumnType::MYSQL_TYPE_NEWDATE as u32;
            let rendered = if date_only {
                format!("{year:04}-{month:02}-{day:02}")
            } else if micros > 0 {
                format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
                )
            } else {
                format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
            };
            Some(rendered.into_bytes())
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = u32::from(days) * 24 + u32::from(hours);
            let rendered = if micros > 0 {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
            } else {
                format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}")
            };
            Some(rendered.into_bytes())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::session::value_text_bytes;
    use mysql_async::consts::ColumnType;
    use mysql_async::Value;

    const DATE: u32 = ColumnType::MYSQL_TYPE_DATE as u32;
    const DATETIME: u32 = ColumnType::MYSQL_TYPE_DATETIME as u32;
    const TIMESTAMP: u32 = ColumnType::MYSQL_TYPE_TIMESTAMP as u32;
    const TIME: u32 = ColumnType::MYSQL_TYPE_TIME as u32;
    const LONGLONG: u32 = ColumnType::MYSQL_TYPE_LONGLONG as u32;

    #[test]
    fn test_null_value() {
        assert_eq!(value_text_bytes(Value::NULL, LONGLONG), None);
    }

    #[test]
    fn test_bytes_pass_through() {
        let raw = vec![0x00, 0xFF, b'a'];
        assert_eq!(
            value_text_bytes(Value::Bytes(raw.clone()), LONGLONG),
            Some(raw)
        );
    }

    #[test]
    fn test_numeric_values_render_as_text() {
        assert_eq!(
            value_text_bytes(Value::Int(-7), LONGLONG),
            Some(b"-7".to_vec())
        );
        assert_eq!(
            value_text_bytes(Value::UInt(42), LONGLONG),
            Some(b"42".to_vec())
        );
    }

    #[test]
    fn test_date_column_renders_date_only() {
        assert_eq!(
            value_text_bytes(Value::Date(2020, 5, 30, 0, 0, 0, 0), DATE),
            Some(b"2020-05-30".to_vec())
        );
    }

    #[test]
    fn test_midnight_datetime_keeps_time_part() {
        // the driver reports the same tuple for DATE and a midnight
        // DATETIME/TIMESTAMP; only the column type separates them
        assert_eq!(
            value_text_bytes(Value::Date(2024, 1, 1, 0, 0, 0, 0), DATETIME),
            Some(b"2024-01-01 00:00:00".to_vec())
        );
        assert_eq!(
            value_text_bytes(Value::Date(2024, 1, 1, 0, 0, 0, 0), TIMESTAMP),
            Some(b"2024-01-01 00:00:00".to_vec())
        );
    }

    #[test]
    fn test_datetime_column_renders_time_and_micros() {
        assert_eq!(
            value_text_bytes(Value::Date(2020, 5, 30, 12, 30, 5, 0), DATETIME),
            Some(b"2020-05-30 12:30:05".to_vec())
        );
        assert_eq!(
            value_text_bytes(Value::Date(2020, 5, 30, 12, 30, 5, 42), DATETIME),
            Some(b"2020-05-30 12:30:05.000042".to_vec())
        );
    }

    #[test]
    fn test_time_column_renders_total_hours() {
        assert_eq!(
            value_text_bytes(Value::Time(true, 1, 2, 3, 4, 0), TIME),
            Some(b"-26:03:04".to_vec())
        );
    }
}
