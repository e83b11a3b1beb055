use crate::focus::Focus;
use crate::query_executor::{ExecutorError, MutationOutcome, RowCursor, RowStream};
use crate::records::RecordTable;
use crate::statements::MutationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    Error,
    Result,
    Table,
}

/// Preferred popup size in terminal cells, before clamping to the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupSize {
    pub width: u16,
    pub height: u16,
}

pub const MESSAGE_POPUP_SIZE: PopupSize = PopupSize {
    width: 40,
    height: 10,
};
const WIDE_TABLE_POPUP_SIZE: PopupSize = PopupSize {
    width: 80,
    height: 24,
};

#[must_use]
pub fn table_popup_size(table: RecordTable) -> PopupSize {
    match table {
        RecordTable::Bans => WIDE_TABLE_POPUP_SIZE,
        RecordTable::Admins | RecordTable::Whitelist => MESSAGE_POPUP_SIZE,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLine {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupBody {
    Message(Vec<MessageLine>),
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
        scroll: usize,
    },
}

/// A transient surface over the main layout. Dismissal hands focus back to `return_to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub title: &'static str,
    pub kind: PopupKind,
    pub body: PopupBody,
    pub size: PopupSize,
    pub return_to: Focus,
}

impl Popup {
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        match &self.body {
            PopupBody::Table { rows, .. } => rows,
            PopupBody::Message(_) => &[],
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        match &self.body {
            PopupBody::Table { columns, .. } => columns,
            PopupBody::Message(_) => &[],
        }
    }

    #[must_use]
    pub fn message_text(&self) -> String {
        match &self.body {
            PopupBody::Message(lines) => lines
                .iter()
                .map(|line| line.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            PopupBody::Table { .. } => String::new(),
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        if let PopupBody::Table { rows, scroll, .. } = &mut self.body {
            let max = rows.len().saturating_sub(1);
            *scroll = scroll.saturating_add_signed(delta).min(max);
        }
    }
}

#[must_use]
pub fn render_message(
    title: &'static str,
    text: impl Into<String>,
    severity: Severity,
    return_to: Focus,
) -> Popup {
    let kind = if severity == Severity::Error {
        PopupKind::Error
    } else {
        PopupKind::Result
    };
    Popup {
        title,
        kind,
        body: PopupBody::Message(vec![MessageLine {
            text: text.into(),
            severity,
        }]),
        size: MESSAGE_POPUP_SIZE,
        return_to,
    }
}

#[must_use]
pub fn render_mutation(kind: MutationKind, outcome: MutationOutcome, return_to: Focus) -> Popup {
    let lines = match kind {
        MutationKind::Insert => vec![MessageLine {
            text: format!(
                "Inserted {} row(s). Last inserted ID: {}",
                outcome.rows_affected,
                outcome.last_insert_id.unwrap_or_default()
            ),
            severity: Severity::Success,
        }],
        MutationKind::Delete => vec![
            MessageLine {
                text: format!("Updated {} rows.", outcome.rows_affected),
                severity: Severity::Warning,
            },
            MessageLine {
                text: "If this is greater than 1, something went very wrong.".to_string(),
                severity: Severity::Error,
            },
        ],
    };

    Popup {
        title: "Execution Results",
        kind: PopupKind::Result,
        body: PopupBody::Message(lines),
        size: MESSAGE_POPUP_SIZE,
        return_to,
    }
}

/// Drains the cursor into a table popup. Nothing is shown until every row is in.
pub async fn render_rows<S: RowStream>(
    mut cursor: RowCursor<S>,
    return_to: Focus,
) -> Result<Popup, ExecutorError> {
    let columns = cursor
        .columns()
        .iter()
        .map(|column| (*column).to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    while let Some(record) = cursor.next_record().await? {
        rows.push(record.cells());
    }
    tracing::debug!(table = %cursor.table(), rows = rows.len(), "search results rendered");

    Ok(Popup {
        title: "Search Results",
        kind: PopupKind::Table,
        body: PopupBody::Table {
            columns,
            rows,
            scroll: 0,
        },
        size: table_popup_size(cursor.table()),
        return_to,
    })
}
