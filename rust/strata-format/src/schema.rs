//! Leaf-column view of a table schema.

use std::sync::Arc;

use strata_common::{Result, error::Error, verify_arg};

use crate::{
    defs::{FieldRepetitionType, MAX_LEVEL, PhysicalType, SchemaElement},
    value::Kind,
};

/// A primitive (leaf) column of the schema: its path from the root, its physical type
/// and the maximum repetition and definition levels implied by its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafColumn {
    index: usize,
    path: Vec<String>,
    physical_type: Option<PhysicalType>,
    type_length: Option<usize>,
    max_repetition_level: u8,
    max_definition_level: u8,
}

impl LeafColumn {
    /// Creates a top-level leaf column; the levels follow from `repetition`.
    pub fn new(
        name: impl Into<String>,
        physical_type: PhysicalType,
        repetition: FieldRepetitionType,
    ) -> LeafColumn {
        let (max_repetition_level, max_definition_level) = match repetition {
            FieldRepetitionType::Required => (0, 0),
            FieldRepetitionType::Optional => (0, 1),
            FieldRepetitionType::Repeated => (1, 1),
        };
        LeafColumn {
            index: 0,
            path: vec![name.into()],
            physical_type: Some(physical_type),
            type_length: None,
            max_repetition_level,
            max_definition_level,
        }
    }

    pub fn required(name: impl Into<String>, physical_type: PhysicalType) -> LeafColumn {
        LeafColumn::new(name, physical_type, FieldRepetitionType::Required)
    }

    pub fn optional(name: impl Into<String>, physical_type: PhysicalType) -> LeafColumn {
        LeafColumn::new(name, physical_type, FieldRepetitionType::Optional)
    }

    pub fn repeated(name: impl Into<String>, physical_type: PhysicalType) -> LeafColumn {
        LeafColumn::new(name, physical_type, FieldRepetitionType::Repeated)
    }

    pub fn with_type_length(mut self, type_length: usize) -> LeafColumn {
        self.type_length = Some(type_length);
        self
    }

    pub fn with_path(mut self, path: Vec<String>) -> LeafColumn {
        self.path = path;
        self
    }

    pub fn with_levels(mut self, max_repetition_level: u8, max_definition_level: u8) -> LeafColumn {
        self.max_repetition_level = max_repetition_level;
        self.max_definition_level = max_definition_level;
        self
    }

    /// Ordinal of the column among the schema's leaves.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Dotted path, used to identify the column in errors and logs.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }

    pub fn physical_type(&self) -> Option<PhysicalType> {
        self.physical_type
    }

    /// Value kind of the column, `None` for null-only columns.
    pub fn kind(&self) -> Option<Kind> {
        self.physical_type.and_then(Kind::from_physical_type)
    }

    pub fn type_length(&self) -> Option<usize> {
        self.type_length
    }

    pub fn max_repetition_level(&self) -> u8 {
        self.max_repetition_level
    }

    pub fn max_definition_level(&self) -> u8 {
        self.max_definition_level
    }

    pub fn is_repeated(&self) -> bool {
        self.max_repetition_level > 0
    }

    pub fn is_optional(&self) -> bool {
        self.max_definition_level > 0
    }

    /// Wraps a failure with the identity of this column.
    pub fn error_context(
        &self,
        page: Option<usize>,
        offset: Option<u64>,
    ) -> impl FnOnce(Error) -> Error + '_ {
        move |e| e.in_column(self.path_string(), page, offset)
    }

    fn is_compatible(&self, other: &LeafColumn) -> bool {
        self.path == other.path
            && self.physical_type == other.physical_type
            && self.type_length == other.type_length
            && self.max_repetition_level == other.max_repetition_level
            && self.max_definition_level == other.max_definition_level
    }
}

/// Ordered list of the leaf columns of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    columns: Vec<Arc<LeafColumn>>,
}

impl Schema {
    /// Builds a schema from leaf columns, assigning their ordinals in order.
    pub fn new(name: impl Into<String>, columns: Vec<LeafColumn>) -> Result<Schema> {
        verify_arg!(columns, columns.len() <= u16::MAX as usize + 1);
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(index, mut column)| -> Result<Arc<LeafColumn>> {
                verify_arg!(
                    max_repetition_level,
                    column.max_repetition_level <= MAX_LEVEL
                );
                verify_arg!(
                    max_definition_level,
                    column.max_definition_level <= MAX_LEVEL
                );
                if column.physical_type == Some(PhysicalType::FixedLenByteArray) {
                    verify_arg!(type_length, column.type_length.is_some());
                }
                column.index = index;
                Ok(Arc::new(column))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema {
            name: name.into(),
            columns,
        })
    }

    /// Builds a schema from its flattened, depth-first element list. The first element
    /// is the root group.
    pub fn from_elements(elements: &[SchemaElement]) -> Result<Schema> {
        let root = elements
            .first()
            .ok_or_else(|| Error::invalid_format("schema", "empty element list"))?;
        let mut columns = Vec::new();
        let mut pos = 1;
        let mut path = Vec::new();
        for _ in 0..num_children(root)? {
            walk_element(elements, &mut pos, &mut path, 0, 0, &mut columns)?;
        }
        if pos != elements.len() {
            return Err(Error::invalid_format(
                "schema",
                format!("{} trailing elements", elements.len() - pos),
            ));
        }
        Schema::new(root.name.clone(), columns).map_err(|e| {
            Error::invalid_format("schema", e.to_string())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Arc<LeafColumn>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Arc<LeafColumn>> {
        self.columns.get(index)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn find_column(&self, path: &[&str]) -> Option<&Arc<LeafColumn>> {
        self.columns
            .iter()
            .find(|column| column.path.iter().map(String::as_str).eq(path.iter().copied()))
    }

    /// Whether rows of both schemas have the same shape: same leaf columns in the
    /// same order with the same types and levels. The schema names are ignored.
    pub fn is_compatible(&self, other: &Schema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.is_compatible(b))
    }
}

fn num_children(element: &SchemaElement) -> Result<usize> {
    let n = element.num_children.unwrap_or(0);
    usize::try_from(n).map_err(|_| {
        Error::invalid_format(
            "schema",
            format!("element '{}' has {n} children", element.name),
        )
    })
}

fn walk_element(
    elements: &[SchemaElement],
    pos: &mut usize,
    path: &mut Vec<String>,
    repetition_level: u8,
    definition_level: u8,
    columns: &mut Vec<LeafColumn>,
) -> Result<()> {
    let element = elements
        .get(*pos)
        .ok_or_else(|| Error::invalid_format("schema", "element list is truncated"))?;
    *pos += 1;

    let repetition = match element.repetition_type {
        Some(tag) => FieldRepetitionType::try_from(tag).map_err(|_| {
            Error::invalid_format("schema", format!("unknown repetition type {tag}"))
        })?,
        None => FieldRepetitionType::Required,
    };
    let (repetition_level, definition_level) = match repetition {
        FieldRepetitionType::Required => (repetition_level, definition_level),
        FieldRepetitionType::Optional => (repetition_level, definition_level.saturating_add(1)),
        FieldRepetitionType::Repeated => (
            repetition_level.saturating_add(1),
            definition_level.saturating_add(1),
        ),
    };
    if repetition_level > MAX_LEVEL || definition_level > MAX_LEVEL {
        return Err(Error::invalid_format(
            "schema",
            format!("nesting of '{}' exceeds the maximum level", element.name),
        ));
    }

    path.push(element.name.clone());
    let children = num_children(element)?;
    if children > 0 {
        for _ in 0..children {
            walk_element(
                elements,
                pos,
                path,
                repetition_level,
                definition_level,
                columns,
            )?;
        }
    } else {
        let physical_type = match element.physical_type {
            Some(tag) => Some(PhysicalType::try_from(tag).map_err(|_| {
                Error::invalid_format("schema", format!("unknown physical type {tag}"))
            })?),
            None => None,
        };
        let type_length = match element.type_length {
            Some(n) => Some(usize::try_from(n).map_err(|_| {
                Error::invalid_format("schema", format!("negative type length {n}"))
            })?),
            None => None,
        };
        columns.push(LeafColumn {
            index: columns.len(),
            path: path.clone(),
            physical_type,
            type_length,
            max_repetition_level: repetition_level,
            max_definition_level: definition_level,
        });
    }
    path.pop();
    Ok(())
}
