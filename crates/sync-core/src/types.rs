//! Column types and first-batch type inference.
//!
//! Database sinks that have to create their target table infer one
//! [`ColumnType`] per column by widening every value observed in the first
//! batch to the least restrictive type that fits all of them:
//!
//! - any null makes the column nullable
//! - Int64 mixed with Float64 becomes Float64
//! - any other mix becomes Text
//! - a column with only nulls becomes nullable Text
//!
//! Inference is fixed once the first batch has been seen.

use std::fmt;

use crate::values::{ColumnValue, Row};

/// Value kinds a column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Int64,
    Float64,
    Text,
    Bool,
    Timestamp,
}

impl ColumnKind {
    /// Least restrictive kind that holds values of both `self` and `other`.
    pub fn widen(self, other: ColumnKind) -> ColumnKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnKind::Int64, ColumnKind::Float64) | (ColumnKind::Float64, ColumnKind::Int64) => {
                ColumnKind::Float64
            }
            _ => ColumnKind::Text,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Int64 => "Int64",
            ColumnKind::Float64 => "Float64",
            ColumnKind::Text => "Text",
            ColumnKind::Bool => "Bool",
            ColumnKind::Timestamp => "Timestamp",
        };
        f.write_str(name)
    }
}

/// A column's kind plus nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnType {
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl ColumnType {
    pub fn new(kind: ColumnKind, nullable: bool) -> Self {
        Self { kind, nullable }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "Nullable({})", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Per-column accumulator for first-batch inference.
#[derive(Debug, Clone, Default)]
struct ColumnObservation {
    kind: Option<ColumnKind>,
    saw_null: bool,
}

impl ColumnObservation {
    fn observe(&mut self, value: &ColumnValue) {
        match value.kind() {
            None => self.saw_null = true,
            Some(kind) => {
                self.kind = Some(match self.kind {
                    Some(current) => current.widen(kind),
                    None => kind,
                })
            }
        }
    }

    fn finish(&self) -> ColumnType {
        match self.kind {
            Some(kind) => ColumnType::new(kind, self.saw_null),
            None => ColumnType::new(ColumnKind::Text, true),
        }
    }
}

/// Infer one column type per position from a batch of rows.
///
/// `width` is the number of columns; rows are expected to have exactly that
/// many values.
pub fn infer_column_types(width: usize, rows: &[Row]) -> Vec<ColumnType> {
    let mut observations = vec![ColumnObservation::default(); width];
    for row in rows {
        for (observation, value) in observations.iter_mut().zip(row) {
            observation.observe(value);
        }
    }
    observations.iter().map(ColumnObservation::finish).collect()
}
