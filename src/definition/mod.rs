//! Definition: immutable, flattened schema metadata built once from a [`Table`](crate::schema::Table) tree.
//!
//! Tables, fields and relations live in arenas and are addressed by copyable handles.
//! A `Definition` is read-only after [`Definition::build`] and can be shared across requests.

mod builder;
mod joins;
pub mod usage;

use crate::error::DefinitionError;
use crate::schema::{FieldType, SortDirection};
use std::collections::HashMap;

pub use usage::{Usage, UsageMap, UsageSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub(crate) usize);

#[derive(Clone, Debug)]
pub struct TableNode {
    pub name: String,
    pub alias: Option<String>,
    /// Alias if present, else name. Qualifies every column of this table.
    pub reference: String,
    /// `name` or `name alias`, as written after FROM / JOIN.
    pub statement: String,
    pub fields: Vec<FieldId>,
    pub relations: Vec<RelationId>,
}

#[derive(Clone, Debug)]
pub struct FieldNode {
    pub table: TableId,
    pub name: String,
    pub alias: Option<String>,
    pub kind: FieldType,
    pub searchable: bool,
    pub filterable: bool,
    pub local_filterable: bool,
    pub sortable: bool,
    pub soft_delete: bool,
    pub sort: Option<SortDirection>,
    /// Qualified column: `<tableRef>."<name>"`.
    pub statement: String,
}

impl FieldNode {
    /// Column as compared against a bound argument. String fields compare as `text`
    /// whatever the column type (uuid, enum, varchar).
    pub fn comparand(&self) -> String {
        match self.kind {
            FieldType::String => format!("{}::text", self.statement),
            _ => self.statement.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RelationNode {
    pub parent: TableId,
    pub child: TableId,
    pub foreign_key: FieldId,
    pub reference_key: FieldId,
    pub mandatory: bool,
}

#[derive(Clone, Debug)]
pub struct Definition {
    tables: Vec<TableNode>,
    fields: Vec<FieldNode>,
    relations: Vec<RelationNode>,
    index: HashMap<String, FieldId>,
    search_fields: Vec<FieldId>,
    default_where: Vec<String>,
    default_sorts: Vec<FieldId>,
    default_usage: UsageMap,
}

impl Definition {
    /// Root table; always the first table in the arena.
    pub fn root(&self) -> TableId {
        TableId(0)
    }

    pub fn table(&self, id: TableId) -> &TableNode {
        &self.tables[id.0]
    }

    pub fn field(&self, id: FieldId) -> &FieldNode {
        &self.fields[id.0]
    }

    pub fn relation(&self, id: RelationId) -> &RelationNode {
        &self.relations[id.0]
    }

    pub fn tables(&self) -> impl Iterator<Item = (TableId, &TableNode)> {
        self.tables.iter().enumerate().map(|(i, t)| (TableId(i), t))
    }

    pub fn contains_field(&self, id: FieldId) -> bool {
        id.0 < self.fields.len()
    }

    /// Table by its SQL reference (alias or name).
    pub fn table_by_ref(&self, reference: &str) -> Option<TableId> {
        self.tables
            .iter()
            .position(|t| t.reference == reference)
            .map(TableId)
    }

    /// Field by table reference and field name, regardless of capabilities.
    pub fn field_of(&self, table_ref: &str, field_name: &str) -> Option<FieldId> {
        let table = self.table_by_ref(table_ref)?;
        self.table(table)
            .fields
            .iter()
            .copied()
            .find(|f| self.field(*f).name == field_name)
    }

    /// Field of the root table by name.
    pub fn root_field(&self, field_name: &str) -> Option<FieldId> {
        self.field_of(&self.table(self.root()).reference, field_name)
    }

    /// Field by request key (filter/sort index). Only filterable, local-filterable or sortable fields are indexed.
    pub fn indexed_field(&self, key: &str) -> Option<FieldId> {
        self.index.get(key).copied()
    }

    pub fn index(&self) -> &HashMap<String, FieldId> {
        &self.index
    }

    pub fn search_fields(&self) -> &[FieldId] {
        &self.search_fields
    }

    pub fn default_where(&self) -> &[String] {
        &self.default_where
    }

    pub fn default_sorts(&self) -> &[FieldId] {
        &self.default_sorts
    }

    pub fn default_usage(&self) -> &UsageMap {
        &self.default_usage
    }

    /// Load a schema from JSON and build it.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let table = crate::schema::load_table_from_str(json)?;
        Definition::build(&table)
    }
}
