use std::fmt;

use thiserror::Error;

/// A backend value before it is decoded into a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Timestamp(Timestamp),
}

impl CellValue {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Int(_) => "signed integer",
            Self::UInt(_) => "unsigned integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub values: Vec<CellValue>,
}

impl RawRow {
    #[must_use]
    pub fn new(values: Vec<CellValue>) -> Self {
        Self { values }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("column `{column}`: expected {expected}, found {found}")]
    TypeMismatch {
        column: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("column `{column}`: value out of range")]
    OutOfRange { column: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTable {
    Admins,
    Bans,
    Whitelist,
}

const ADMIN_COLUMNS: [&str; 5] = ["id", "ckey", "rank", "level", "flags"];
const BAN_COLUMNS: [&str; 9] = [
    "bantime",
    "bantype",
    "reason",
    "job",
    "duration",
    "ckey",
    "computerid",
    "ip",
    "a_ckey",
];
const WHITELIST_COLUMNS: [&str; 3] = ["id", "ckey", "race"];

impl RecordTable {
    #[must_use]
    pub fn table_name(self) -> &'static str {
        match self {
            Self::Admins => "erro_admin",
            Self::Bans => "erro_ban",
            Self::Whitelist => "whitelist",
        }
    }

    /// Columns in the order search statements select them.
    #[must_use]
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Admins => &ADMIN_COLUMNS,
            Self::Bans => &BAN_COLUMNS,
            Self::Whitelist => &WHITELIST_COLUMNS,
        }
    }

    #[must_use]
    pub fn search_columns(self) -> &'static [SearchColumn] {
        match self {
            Self::Admins => &[SearchColumn::Ckey, SearchColumn::Rank],
            Self::Bans => &[
                SearchColumn::Ckey,
                SearchColumn::ComputerId,
                SearchColumn::Ip,
                SearchColumn::AdminCkey,
            ],
            Self::Whitelist => &[SearchColumn::Ckey, SearchColumn::Race],
        }
    }
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Every column an operator may search on. The SQL name is fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchColumn {
    Ckey,
    Rank,
    ComputerId,
    Ip,
    AdminCkey,
    Race,
}

impl SearchColumn {
    #[must_use]
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Ckey => "ckey",
            Self::Rank => "rank",
            Self::ComputerId => "computerid",
            Self::Ip => "ip",
            Self::AdminCkey => "a_ckey",
            Self::Race => "race",
        }
    }
}

impl fmt::Display for SearchColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub id: i64,
    pub ckey: String,
    pub rank: String,
    pub level: i32,
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRecord {
    pub bantime: Timestamp,
    pub bantype: String,
    pub reason: String,
    pub job: String,
    pub duration: i32,
    pub ckey: String,
    pub computerid: String,
    pub ip: String,
    pub a_ckey: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistRecord {
    pub id: i64,
    pub ckey: String,
    pub race: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRow {
    Admin(AdminRecord),
    Ban(BanRecord),
    Whitelist(WhitelistRecord),
}

impl RecordRow {
    pub fn decode(table: RecordTable, row: RawRow) -> Result<Self, DecodeError> {
        let expected = table.columns().len();
        if row.values.len() != expected {
            return Err(DecodeError::ColumnCount {
                expected,
                found: row.values.len(),
            });
        }

        let mut values = row.values.into_iter();
        let mut next = move || values.next().unwrap_or(CellValue::Null);

        let record = match table {
            RecordTable::Admins => Self::Admin(AdminRecord {
                id: decode_int("id", next())?,
                ckey: decode_text("ckey", next())?,
                rank: decode_text("rank", next())?,
                level: decode_int("level", next())?,
                flags: decode_int("flags", next())?,
            }),
            RecordTable::Bans => Self::Ban(BanRecord {
                bantime: decode_timestamp("bantime", next())?,
                bantype: decode_text("bantype", next())?,
                reason: decode_text("reason", next())?,
                job: decode_text("job", next())?,
                duration: decode_int("duration", next())?,
                ckey: decode_text("ckey", next())?,
                computerid: decode_text("computerid", next())?,
                ip: decode_text("ip", next())?,
                a_ckey: decode_text("a_ckey", next())?,
            }),
            RecordTable::Whitelist => Self::Whitelist(WhitelistRecord {
                id: decode_int("id", next())?,
                ckey: decode_text("ckey", next())?,
                race: decode_text("race", next())?,
            }),
        };
        Ok(record)
    }

    /// Display cells, aligned with `RecordTable::columns`.
    #[must_use]
    pub fn cells(&self) -> Vec<String> {
        match self {
            Self::Admin(admin) => vec![
                admin.id.to_string(),
                admin.ckey.clone(),
                admin.rank.clone(),
                admin.level.to_string(),
                admin.flags.to_string(),
            ],
            Self::Ban(ban) => vec![
                ban.bantime.to_string(),
                ban.bantype.clone(),
                ban.reason.clone(),
                ban.job.clone(),
                ban.duration.to_string(),
                ban.ckey.clone(),
                ban.computerid.clone(),
                ban.ip.clone(),
                ban.a_ckey.clone(),
            ],
            Self::Whitelist(entry) => vec![
                entry.id.to_string(),
                entry.ckey.clone(),
                entry.race.clone(),
            ],
        }
    }
}

fn decode_int<T>(column: &'static str, value: CellValue) -> Result<T, DecodeError>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    match value {
        CellValue::Int(raw) => {
            <T as TryFrom<i64>>::try_from(raw).map_err(|_| DecodeError::OutOfRange { column })
        }
        CellValue::UInt(raw) => {
            <T as TryFrom<u64>>::try_from(raw).map_err(|_| DecodeError::OutOfRange { column })
        }
        CellValue::Text(raw) => {
            let parsed = raw
                .trim()
                .parse::<i64>()
                .map_err(|_| DecodeError::TypeMismatch {
                    column,
                    expected: "integer",
                    found: "text",
                })?;
            <T as TryFrom<i64>>::try_from(parsed).map_err(|_| DecodeError::OutOfRange { column })
        }
        other => Err(DecodeError::TypeMismatch {
            column,
            expected: "integer",
            found: other.kind_name(),
        }),
    }
}

fn decode_text(column: &'static str, value: CellValue) -> Result<String, DecodeError> {
    match value {
        CellValue::Text(raw) => Ok(raw),
        CellValue::Null => Ok(String::new()),
        other => Err(DecodeError::TypeMismatch {
            column,
            expected: "text",
            found: other.kind_name(),
        }),
    }
}

fn decode_timestamp(column: &'static str, value: CellValue) -> Result<Timestamp, DecodeError> {
    match value {
        CellValue::Timestamp(timestamp) => Ok(timestamp),
        other => Err(DecodeError::TypeMismatch {
            column,
            expected: "timestamp",
            found: other.kind_name(),
        }),
    }
}
