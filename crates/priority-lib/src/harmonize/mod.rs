//! Column harmonization
//!
//! Reconciles an arbitrary input table against the schema the model was
//! trained on: aliased headers are copied onto their targets, the two
//! time columns mirror each other, absent columns get neutral defaults,
//! and the output keeps exactly the schema columns in schema order.

mod schema;

pub use schema::{
    columns, ColumnAlias, ColumnKind, ColumnSpec, Schema, TICKET_ALIASES, TICKET_COLUMNS,
    TICKET_MIRRORS, UNKNOWN_CATEGORY,
};

use crate::frame::{Cell, Frame};
use serde::Serialize;
use std::collections::HashMap;

/// What a harmonization pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarmonizeReport {
    /// (source header, target column) pairs filled from aliases
    pub aliased: Vec<(String, String)>,
    /// (source column, target column) pairs filled by mirroring
    pub mirrored: Vec<(String, String)>,
    /// Schema columns filled with their default value
    pub defaulted: Vec<String>,
    /// Input columns that are not part of the schema
    pub dropped: Vec<String>,
}

impl HarmonizeReport {
    /// True when the input already matched the schema exactly
    pub fn is_clean(&self) -> bool {
        self.aliased.is_empty()
            && self.mirrored.is_empty()
            && self.defaulted.is_empty()
            && self.dropped.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Harmonizer {
    schema: Schema,
}

impl Harmonizer {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Produce a table with exactly the schema columns
    pub fn harmonize(&self, frame: &Frame) -> Frame {
        self.harmonize_with_report(frame).0
    }

    /// Describe what [`Harmonizer::harmonize`] would change
    pub fn report(&self, frame: &Frame) -> HarmonizeReport {
        self.harmonize_with_report(frame).1
    }

    pub fn harmonize_with_report(&self, frame: &Frame) -> (Frame, HarmonizeReport) {
        let mut working = frame.clone();
        let mut report = HarmonizeReport::default();

        // Later duplicates win, matching a plain dict build over the header
        let lower: HashMap<String, String> = working
            .columns()
            .iter()
            .map(|c| (c.to_lowercase(), c.clone()))
            .collect();

        for alias in self.schema.aliases {
            let Some(source) = lower.get(alias.alias) else {
                continue;
            };
            if !working.has_column(alias.target) && working.copy_column(source, alias.target) {
                report
                    .aliased
                    .push((source.clone(), alias.target.to_string()));
            }
        }

        for &(left, right) in self.schema.mirrors {
            for (from, to) in [(left, right), (right, left)] {
                if working.has_column(from)
                    && !working.has_column(to)
                    && working.copy_column(from, to)
                {
                    report.mirrored.push((from.to_string(), to.to_string()));
                }
            }
        }

        report.dropped = working
            .columns()
            .iter()
            .filter(|c| !self.schema.contains(c))
            .cloned()
            .collect();

        let indices: Vec<Option<usize>> = self
            .schema
            .columns
            .iter()
            .map(|spec| working.column_index(spec.name))
            .collect();

        for (spec, idx) in self.schema.columns.iter().zip(&indices) {
            if idx.is_none() {
                report.defaulted.push(spec.name.to_string());
            }
        }

        let rows: Vec<Vec<Cell>> = working
            .rows()
            .iter()
            .map(|row| {
                self.schema
                    .columns
                    .iter()
                    .zip(&indices)
                    .map(|(spec, idx)| match idx {
                        Some(i) => spec.coerce(&row[*i]),
                        None => spec.default_cell(),
                    })
                    .collect()
            })
            .collect();

        let columns = self
            .schema
            .columns
            .iter()
            .map(|c| c.name.to_string())
            .collect();

        (Frame::from_parts(columns, rows), report)
    }
}
