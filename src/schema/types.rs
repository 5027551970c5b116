//! Schema declaration types: one root table with nested fields and relations.
//!
//! These are input-only values. Building a [`Definition`](crate::Definition) never mutates them.

use serde::{Deserialize, Serialize};

/// Declared value type of a field; drives filter value checks and search casting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Numeric,
    #[default]
    String,
    Boolean,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Numeric => "numeric",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: FieldType,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    /// Filterable only by trusted local filters (e.g. tenant scoping).
    #[serde(default)]
    pub local_filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    /// Rows where this boolean column is true are excluded by default.
    #[serde(default)]
    pub soft_delete: bool,
    /// Default sort applied unless the request sorts on this field.
    #[serde(default)]
    pub sort: Option<SortDirection>,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            ..Field::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn kind(mut self, kind: FieldType) -> Self {
        self.kind = kind;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn local_filterable(mut self) -> Self {
        self.local_filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn soft_delete(mut self) -> Self {
        self.soft_delete = true;
        self
    }

    pub fn default_sort(mut self, direction: SortDirection) -> Self {
        self.sort = Some(direction);
        self
    }
}

/// Edge from a parent table to a child table: `parent.foreign_key = child.reference_key`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Child is always joined (e.g. non-nullable foreign key).
    #[serde(default)]
    pub mandatory: bool,
    /// Field name on the parent table.
    pub foreign_key: String,
    /// Field name on the child table.
    pub reference_key: String,
    pub table: Table,
}

impl Relation {
    pub fn new(foreign_key: impl Into<String>, reference_key: impl Into<String>, table: Table) -> Self {
        Relation {
            mandatory: false,
            foreign_key: foreign_key.into(),
            reference_key: reference_key.into(),
            table,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            ..Table::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Name used to qualify columns in SQL: alias if present, else table name.
    pub fn reference(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Same declared table: equal name and alias.
    pub(crate) fn same_declaration(&self, other: &Table) -> bool {
        self.name == other.name && self.alias == other.alias
    }
}
