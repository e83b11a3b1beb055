use std::fmt;

use thiserror::Error;

use crate::forms::{FieldSpec, FormValues};
use crate::records::RecordTable;
use crate::statements::{
    delete_whitelist_statement, insert_admin_statement, insert_whitelist_statement,
    search_statement, MutateStatement, SearchStatement,
};

pub const PERFORM_IN_GAME: &str = "Not Implemented. Perform in game.";
pub const UNBAN_IN_GAME: &str = "Not Implemented. Unban in game.";
pub const DESTRUCTIVE_WARNING: &str =
    "WARNING. This operation is destructive and can not be undone. Are you sure you want to continue?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Admins,
    Bans,
    Whitelist,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Admins, Self::Bans, Self::Whitelist];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Admins => "Admins",
            Self::Bans => "Bans",
            Self::Whitelist => "Whitelist",
        }
    }

    #[must_use]
    pub fn shortcut(self) -> char {
        match self {
            Self::Admins => 'a',
            Self::Bans => 'b',
            Self::Whitelist => 'w',
        }
    }

    #[must_use]
    pub fn table(self) -> RecordTable {
        match self {
            Self::Admins => RecordTable::Admins,
            Self::Bans => RecordTable::Bans,
            Self::Whitelist => RecordTable::Whitelist,
        }
    }

    /// Submenu entries, in display order.
    #[must_use]
    pub fn operations(self) -> &'static [Operation] {
        match self {
            Self::Admins => &[
                Operation::Add,
                Operation::Remove,
                Operation::Search,
                Operation::Update,
            ],
            Self::Bans => &[Operation::Remove, Operation::Search],
            Self::Whitelist => &[Operation::Add, Operation::Remove, Operation::Search],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Remove,
    Search,
    Update,
}

impl Operation {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Remove => "Remove",
            Self::Search => "Search",
            Self::Update => "Update",
        }
    }

    #[must_use]
    pub fn shortcut(self) -> char {
        match self {
            Self::Add => 'a',
            Self::Remove => 'r',
            Self::Search => 's',
            Self::Update => 'u',
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationAction {
    /// Handled elsewhere; the form area only shows the notice.
    Stub { notice: &'static str },
    InsertAdmin,
    InsertWhitelist,
    DeleteWhitelist,
    Search { table: RecordTable },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub category: Category,
    pub operation: Operation,
    pub fields: &'static [FieldSpec],
    pub button_label: &'static str,
    pub action: OperationAction,
    /// Set for destructive operations that need an explicit Yes first.
    pub confirmation: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Flags must be a number between 0 and 65535.")]
    Flags,
    #[error("ID must be numeric")]
    Id,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("search option {index} has no column in `{table}`")]
    UnknownColumn { table: RecordTable, index: usize },
    #[error("{0}")]
    NotImplemented(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Mutate(MutateStatement),
    Search(SearchStatement),
}

const ADMIN_ADD_FIELDS: [FieldSpec; 3] = [
    FieldSpec::text("ckey", 32),
    FieldSpec::text("rank", 32),
    FieldSpec::numeric("flags", 16, false, 5),
];
const ADMIN_SEARCH_FIELDS: [FieldSpec; 2] = [
    FieldSpec::choice("Type", &["ckey", "rank"]),
    FieldSpec::text("Search Term", 32),
];
const BAN_SEARCH_FIELDS: [FieldSpec; 2] = [
    FieldSpec::choice("Search By", &["ckey", "computerid", "ip", "a_ckey"]),
    FieldSpec::text("Search Term", 32),
];
const WHITELIST_ADD_FIELDS: [FieldSpec; 2] =
    [FieldSpec::text("ckey", 32), FieldSpec::text("race", 32)];
const WHITELIST_REMOVE_FIELDS: [FieldSpec; 1] = [FieldSpec::numeric("ID", 16, true, 8)];
const WHITELIST_SEARCH_FIELDS: [FieldSpec; 2] = [
    FieldSpec::choice("Search By", &["ckey", "race"]),
    FieldSpec::text("Search Term", 32),
];

const fn stub(
    category: Category,
    operation: Operation,
    notice: &'static str,
) -> OperationDescriptor {
    OperationDescriptor {
        category,
        operation,
        fields: &[],
        button_label: notice,
        action: OperationAction::Stub { notice },
        confirmation: None,
    }
}

static DESCRIPTORS: [OperationDescriptor; 9] = [
    OperationDescriptor {
        category: Category::Admins,
        operation: Operation::Add,
        fields: &ADMIN_ADD_FIELDS,
        button_label: "Execute",
        action: OperationAction::InsertAdmin,
        confirmation: None,
    },
    stub(Category::Admins, Operation::Remove, PERFORM_IN_GAME),
    OperationDescriptor {
        category: Category::Admins,
        operation: Operation::Search,
        fields: &ADMIN_SEARCH_FIELDS,
        button_label: "Search",
        action: OperationAction::Search {
            table: RecordTable::Admins,
        },
        confirmation: None,
    },
    stub(Category::Admins, Operation::Update, PERFORM_IN_GAME),
    stub(Category::Bans, Operation::Remove, UNBAN_IN_GAME),
    OperationDescriptor {
        category: Category::Bans,
        operation: Operation::Search,
        fields: &BAN_SEARCH_FIELDS,
        button_label: "Search",
        action: OperationAction::Search {
            table: RecordTable::Bans,
        },
        confirmation: None,
    },
    OperationDescriptor {
        category: Category::Whitelist,
        operation: Operation::Add,
        fields: &WHITELIST_ADD_FIELDS,
        button_label: "Execute",
        action: OperationAction::InsertWhitelist,
        confirmation: None,
    },
    OperationDescriptor {
        category: Category::Whitelist,
        operation: Operation::Remove,
        fields: &WHITELIST_REMOVE_FIELDS,
        button_label: "Execute",
        action: OperationAction::DeleteWhitelist,
        confirmation: Some(DESTRUCTIVE_WARNING),
    },
    OperationDescriptor {
        category: Category::Whitelist,
        operation: Operation::Search,
        fields: &WHITELIST_SEARCH_FIELDS,
        button_label: "Search",
        action: OperationAction::Search {
            table: RecordTable::Whitelist,
        },
        confirmation: None,
    },
];

/// Looks up the descriptor of a submenu entry. `None` if the category has no such operation.
#[must_use]
pub fn descriptor(category: Category, operation: Operation) -> Option<&'static OperationDescriptor> {
    DESCRIPTORS
        .iter()
        .find(|descriptor| descriptor.category == category && descriptor.operation == operation)
}

impl OperationDescriptor {
    #[must_use]
    pub fn is_stub(&self) -> bool {
        matches!(self.action, OperationAction::Stub { .. })
    }

    /// Validates raw form values and turns them into a statement.
    pub fn plan(&self, values: &FormValues) -> Result<Submission, ValidationError> {
        match self.action {
            OperationAction::Stub { notice } => Err(ValidationError::NotImplemented(notice)),
            OperationAction::InsertAdmin => {
                let ckey = require(values, "ckey")?;
                let rank = require(values, "rank")?;
                let flags = require(values, "flags")?
                    .parse::<u16>()
                    .map_err(|_| ValidationError::Flags)?;
                Ok(Submission::Mutate(insert_admin_statement(ckey, rank, flags)))
            }
            OperationAction::InsertWhitelist => {
                let ckey = require(values, "ckey")?;
                let race = require(values, "race")?;
                Ok(Submission::Mutate(insert_whitelist_statement(ckey, race)))
            }
            OperationAction::DeleteWhitelist => {
                let id = require(values, "ID")?
                    .parse::<i16>()
                    .map_err(|_| ValidationError::Id)?;
                Ok(Submission::Mutate(delete_whitelist_statement(id)))
            }
            OperationAction::Search { table } => {
                let choice_field = self
                    .fields
                    .first()
                    .map_or("Search By", |field| field.name);
                let index = values
                    .choice(choice_field)
                    .ok_or(ValidationError::MissingField(choice_field))?;
                let column = table
                    .search_columns()
                    .get(index)
                    .copied()
                    .ok_or(ValidationError::UnknownColumn { table, index })?;
                let pattern = require(values, "Search Term")?;
                let statement = search_statement(table, column, pattern)
                    .map_err(|_| ValidationError::UnknownColumn { table, index })?;
                Ok(Submission::Search(statement))
            }
        }
    }
}

fn require<'a>(values: &'a FormValues, name: &'static str) -> Result<&'a str, ValidationError> {
    values.get(name).ok_or(ValidationError::MissingField(name))
}
