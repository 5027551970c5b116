//! Definition builder: one depth-first walk over the declared table tree.

use super::{Definition, FieldId, FieldNode, RelationId, RelationNode, TableId, TableNode, Usage, UsageMap};
use crate::error::DefinitionError;
use crate::schema::Table;
use crate::sql::quoted;
use std::collections::{HashMap, HashSet};

impl Definition {
    /// Flatten and validate a table tree. Fails on duplicate field names within a table,
    /// relations back to the table itself or to any ancestor, unknown key fields and
    /// duplicate table references.
    pub fn build(root: &Table) -> Result<Definition, DefinitionError> {
        let mut builder = Builder::default();
        let mut path = Vec::new();
        builder.walk(root, &mut path)?;

        let definition = Definition {
            tables: builder.tables,
            fields: builder.fields,
            relations: builder.relations,
            index: builder.index,
            search_fields: builder.search_fields,
            default_where: builder.default_where,
            default_sorts: builder.default_sorts,
            default_usage: builder.default_usage,
        };
        tracing::debug!(
            root = %root.name,
            tables = definition.tables.len(),
            fields = definition.fields.len(),
            relations = definition.relations.len(),
            "definition built"
        );
        Ok(definition)
    }
}

#[derive(Default)]
struct Builder {
    tables: Vec<TableNode>,
    fields: Vec<FieldNode>,
    relations: Vec<RelationNode>,
    index: HashMap<String, FieldId>,
    search_fields: Vec<FieldId>,
    default_where: Vec<String>,
    default_sorts: Vec<FieldId>,
    default_usage: UsageMap,
    references: HashSet<String>,
}

impl Builder {
    fn walk<'a>(&mut self, table: &'a Table, path: &mut Vec<&'a Table>) -> Result<TableId, DefinitionError> {
        let reference = table.reference().to_string();
        if !self.references.insert(reference.clone()) {
            return Err(DefinitionError::DuplicateTableReference { reference });
        }
        let statement = match &table.alias {
            Some(alias) => format!("{} {}", table.name, alias),
            None => table.name.clone(),
        };
        let table_id = TableId(self.tables.len());
        self.tables.push(TableNode {
            name: table.name.clone(),
            alias: table.alias.clone(),
            reference: reference.clone(),
            statement,
            fields: Vec::with_capacity(table.fields.len()),
            relations: Vec::with_capacity(table.relations.len()),
        });

        let mut own_names = HashSet::new();
        for field in &table.fields {
            if !own_names.insert(field.name.as_str()) {
                return Err(DefinitionError::DuplicateField {
                    table: table.name.clone(),
                });
            }

            let field_id = FieldId(self.fields.len());
            let node = FieldNode {
                table: table_id,
                name: field.name.clone(),
                alias: field.alias.clone(),
                kind: field.kind,
                searchable: field.searchable,
                filterable: field.filterable,
                local_filterable: field.local_filterable,
                sortable: field.sortable,
                soft_delete: field.soft_delete,
                sort: field.sort,
                statement: format!("{}.{}", reference, quoted(&field.name)),
            };

            if node.filterable || node.local_filterable || node.sortable {
                let mut key = node.alias.clone().unwrap_or_else(|| node.name.clone());
                if self.index.contains_key(&key) {
                    key = format!("{}.{}", table.name, node.name);
                }
                if self.index.contains_key(&key) {
                    return Err(DefinitionError::IndexKeyCollision {
                        table: table.name.clone(),
                        field: node.name.clone(),
                    });
                }
                self.index.insert(key, field_id);
            }
            if node.searchable {
                self.search_fields.push(field_id);
            }
            // soft delete is the only default predicate for now
            if node.soft_delete {
                self.default_where.push(format!("{} is false", node.statement));
                self.default_usage.mark(table_id, Usage::Filter);
            }
            if node.sort.is_some() {
                self.default_sorts.push(field_id);
                self.default_usage.mark(table_id, Usage::Sort);
            }

            self.fields.push(node);
            self.tables[table_id.0].fields.push(field_id);
        }

        path.push(table);
        for relation in &table.relations {
            let child = &relation.table;
            if path.iter().any(|ancestor| ancestor.same_declaration(child)) {
                return Err(DefinitionError::CircularRelation {
                    table: table.name.clone(),
                });
            }
            let foreign_key = self.own_field(table_id, &relation.foreign_key).ok_or_else(|| {
                DefinitionError::UnknownKeyField {
                    kind: "foreign key",
                    table: table.name.clone(),
                    field: relation.foreign_key.clone(),
                }
            })?;

            let child_id = self.walk(child, path)?;
            let reference_key = self.own_field(child_id, &relation.reference_key).ok_or_else(|| {
                DefinitionError::UnknownKeyField {
                    kind: "reference key",
                    table: child.name.clone(),
                    field: relation.reference_key.clone(),
                }
            })?;

            if relation.mandatory {
                self.default_usage.mark(child_id, Usage::Mandatory);
            }
            let relation_id = RelationId(self.relations.len());
            self.relations.push(RelationNode {
                parent: table_id,
                child: child_id,
                foreign_key,
                reference_key,
                mandatory: relation.mandatory,
            });
            self.tables[table_id.0].relations.push(relation_id);
        }
        path.pop();

        Ok(table_id)
    }

    fn own_field(&self, table: TableId, name: &str) -> Option<FieldId> {
        self.tables[table.0]
            .fields
            .iter()
            .copied()
            .find(|f| self.fields[f.0].name == name)
    }
}
