//! Column schema expected by the priority pipeline

use crate::frame::Cell;

/// Placeholder written into categorical columns that are absent
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Ticket column names
pub mod columns {
    pub const IMPACT: &str = "Impact";
    pub const URGENCY: &str = "Urgency";
    pub const REASSIGNMENTS: &str = "No_of_Reassignments";
    pub const HANDLE_TIME: &str = "Handle_Time_hrs";
    pub const RESOLUTION_TIME: &str = "Resolution_Time_hours";
    pub const RELATED_INTERACTIONS: &str = "No_of_Related_Interactions";
    pub const RELATED_INCIDENTS: &str = "No_of_Related_Incidents";
    pub const RELATED_CHANGES: &str = "No_of_Related_Changes";
    pub const STATUS: &str = "Status";
    pub const CATEGORY: &str = "Category";
    pub const CLOSURE_CODE: &str = "Closure_Code";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn numeric(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Numeric,
        }
    }

    pub const fn categorical(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Categorical,
        }
    }

    /// Neutral value used when the column is absent from the input
    pub fn default_cell(&self) -> Cell {
        match self.kind {
            ColumnKind::Numeric => Cell::Number(0.0),
            ColumnKind::Categorical => Cell::Text(UNKNOWN_CATEGORY.to_string()),
        }
    }

    /// Type an input cell for this column. Numeric columns parse text into
    /// numbers; categorical values are kept exactly as read.
    pub fn coerce(&self, cell: &Cell) -> Cell {
        match (self.kind, cell) {
            (ColumnKind::Numeric, Cell::Text(raw)) => Cell::parse(raw),
            _ => cell.clone(),
        }
    }
}

/// A lower-case header that stands in for a schema column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnAlias {
    pub alias: &'static str,
    pub target: &'static str,
}

pub const TICKET_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::numeric(columns::IMPACT),
    ColumnSpec::numeric(columns::URGENCY),
    ColumnSpec::numeric(columns::REASSIGNMENTS),
    ColumnSpec::numeric(columns::HANDLE_TIME),
    ColumnSpec::numeric(columns::RESOLUTION_TIME),
    ColumnSpec::numeric(columns::RELATED_INTERACTIONS),
    ColumnSpec::numeric(columns::RELATED_INCIDENTS),
    ColumnSpec::numeric(columns::RELATED_CHANGES),
    ColumnSpec::categorical(columns::STATUS),
    ColumnSpec::categorical(columns::CATEGORY),
    ColumnSpec::categorical(columns::CLOSURE_CODE),
];

pub const TICKET_ALIASES: &[ColumnAlias] = &[
    ColumnAlias {
        alias: "handle_time_hrs",
        target: columns::RESOLUTION_TIME,
    },
    ColumnAlias {
        alias: "resolution_time_hour",
        target: columns::RESOLUTION_TIME,
    },
    ColumnAlias {
        alias: "resolution_time_hours",
        target: columns::RESOLUTION_TIME,
    },
];

/// Column pairs that stand in for each other when only one is present
pub const TICKET_MIRRORS: &[(&str, &str)] = &[(columns::HANDLE_TIME, columns::RESOLUTION_TIME)];

/// Expected columns plus the rules used to reconcile inputs against them
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub columns: &'static [ColumnSpec],
    pub aliases: &'static [ColumnAlias],
    pub mirrors: &'static [(&'static str, &'static str)],
}

impl Schema {
    /// The ITSM ticket schema the priority pipeline was trained on
    pub const fn ticket() -> Self {
        Self {
            columns: TICKET_COLUMNS,
            aliases: TICKET_ALIASES,
            mirrors: TICKET_MIRRORS,
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn spec(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.spec(name).is_some()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::ticket()
    }
}
