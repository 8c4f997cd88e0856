//! Table schemas, relations and column references.

use super::value::SqlType;

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Logical type.
    pub ty: SqlType,
    /// Whether the column accepts nulls.
    pub nullable: bool,
}

impl ColumnDef {
    /// Creates a non-null column.
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
        }
    }

    /// Creates a nullable column.
    pub fn nullable(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
        }
    }
}

/// A table definition.
///
/// # Examples
///
/// ```
/// use catalog_search::sql::{ColumnDef, SqlType, TableSchema};
///
/// let schema = TableSchema::new("staged")
///     .with_column(ColumnDef::new("id", SqlType::Identifier))
///     .with_column(ColumnDef::nullable("score", SqlType::Float64))
///     .with_primary_key(["id"])
///     .temporary();
///
/// assert!(schema.is_temporary());
/// assert_eq!(schema.columns().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Vec<String>,
    temporary: bool,
}

impl TableSchema {
    /// Creates an empty schema with the given table name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            temporary: false,
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the table as temporary.
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    /// Returns a copy of this schema under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary key columns.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Returns true if the table is temporary.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

/// A named relation usable in `FROM` and `JOIN` clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    name: String,
    alias: Option<String>,
}

impl Relation {
    /// Creates a relation referring to a table.
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Sets an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the alias, if any.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the name columns of this relation are qualified with.
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Returns a column of this relation.
    pub fn col(&self, name: impl Into<String>) -> ColumnRef {
        ColumnRef::qualified(self.qualifier(), name)
    }
}

/// A reference to a column, optionally qualified with a relation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// The qualifying relation name or alias.
    pub qualifier: Option<String>,
    /// The column name.
    pub name: String,
}

impl ColumnRef {
    /// Creates an unqualified column reference.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Creates a qualified column reference.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}
