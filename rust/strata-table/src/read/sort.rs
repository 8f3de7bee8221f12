//! Sort declarations and the per-column row comparators derived from them.

use std::cmp::Ordering;

use strata_common::{Result, error::Error};
use strata_format::{
    defs,
    schema::{LeafColumn, Schema},
    value::{Kind, Value},
};

/// A column the rows of a row group are sorted by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortingColumn {
    path: Vec<String>,
    descending: bool,
    nulls_first: bool,
}

impl SortingColumn {
    pub fn ascending<S: Into<String>>(path: impl IntoIterator<Item = S>) -> SortingColumn {
        SortingColumn {
            path: path.into_iter().map(Into::into).collect(),
            descending: false,
            nulls_first: false,
        }
    }

    pub fn descending<S: Into<String>>(path: impl IntoIterator<Item = S>) -> SortingColumn {
        SortingColumn {
            descending: true,
            ..SortingColumn::ascending(path)
        }
    }

    /// Places null values before non-null ones.
    pub fn with_nulls_first(mut self) -> SortingColumn {
        self.nulls_first = true;
        self
    }

    /// Resolves a sorting column of the row group metadata against the schema.
    pub fn from_metadata(schema: &Schema, sorting: &defs::SortingColumn) -> Result<SortingColumn> {
        let column = usize::try_from(sorting.column_idx)
            .ok()
            .and_then(|i| schema.column(i))
            .ok_or_else(|| {
                Error::invalid_format(
                    "sorting column",
                    format!(
                        "column index {} out of range for {} columns",
                        sorting.column_idx,
                        schema.num_columns()
                    ),
                )
            })?;
        Ok(SortingColumn {
            path: column.path().to_vec(),
            descending: sorting.descending,
            nulls_first: sorting.nulls_first,
        })
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_descending(&self) -> bool {
        self.descending
    }

    pub fn is_nulls_first(&self) -> bool {
        self.nulls_first
    }
}

impl std::fmt::Display for SortingColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nulls_first {
            f.write_str("nulls_first+")?;
        }
        let order = if self.descending { "descending" } else { "ascending" };
        write!(f, "{order}({})", self.path.join("."))
    }
}

/// Returns whether `sorting` starts with every column of `prefix`, in order.
pub fn has_prefix(sorting: &[SortingColumn], prefix: &[SortingColumn]) -> bool {
    sorting.len() >= prefix.len() && sorting.iter().zip(prefix).all(|(a, b)| a == b)
}

/// Comparator of the values of one column between two rows.
///
/// The values of a column within a row form a sequence (a single value for columns
/// that are not repeated). Sequences compare element by element; when one is a prefix
/// of the other the shorter sorts first.
#[derive(Debug, Clone, Copy)]
pub struct SortFunc {
    kind: Option<Kind>,
    max_repetition_level: u8,
    max_definition_level: u8,
    descending: bool,
    nulls_first: bool,
}

impl SortFunc {
    pub fn new(column: &LeafColumn, sorting: &SortingColumn) -> SortFunc {
        SortFunc {
            kind: column.kind(),
            max_repetition_level: column.max_repetition_level(),
            max_definition_level: column.max_definition_level(),
            descending: sorting.descending,
            nulls_first: sorting.nulls_first,
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }

    pub fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        if self.max_repetition_level == 0 {
            return match (a.first(), b.first()) {
                (Some(a), Some(b)) => self.compare_value(a, b),
                _ => a.len().cmp(&b.len()),
            };
        }
        a.iter()
            .zip(b)
            .map(|(a, b)| self.compare_value(a, b))
            .find(|&ordering| ordering != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    }

    fn compare_value(&self, a: &Value, b: &Value) -> Ordering {
        match (self.is_null(a), self.is_null(b)) {
            (true, true) => Ordering::Equal,
            (true, false) if self.nulls_first => Ordering::Less,
            (true, false) => Ordering::Greater,
            (false, true) if self.nulls_first => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = a.compare(b);
                if self.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
        }
    }

    fn is_null(&self, value: &Value) -> bool {
        value.is_null() || value.definition_level() < self.max_definition_level
    }
}
