//! Resource: one request's query-building session over a shared [`Definition`].
//!
//! Lifecycle: [`Resource::set_param`] once, [`Resource::select`], then
//! [`Resource::query_and_args`] for the id query, [`Resource::paginated_results`] on the
//! returned ids, [`Resource::select`] again and [`Resource::populate_query_args`] for the
//! row query, and finally [`Resource::set_result`] / [`Resource::response`].

mod compiler;
mod parameter;
mod values;

pub use parameter::Parameter;

use crate::definition::{Definition, FieldId, TableId, Usage, UsageMap, UsageSet};
use crate::error::ResourceError;
use crate::response::{Data, Metadata, Response};
use crate::sql::QueryBuf;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Ids from the id query and the materialized rows of the current page.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultSet<Id, Model> {
    pub ids: Vec<Id>,
    pub paginated_result: Vec<Model>,
}

pub struct Resource<Id, Model> {
    /// `None` for passthrough resources (data served by another API).
    definition: Option<Arc<Definition>>,
    parameter: Parameter,
    processed: bool,
    select: Vec<String>,
    where_clauses: Vec<String>,
    sorts: Vec<String>,
    args: Vec<Value>,
    usage: UsageMap,
    result: Option<ResultSet<Id, Model>>,
}

impl<Id, Model> Resource<Id, Model> {
    pub fn new(definition: Arc<Definition>) -> Self {
        Resource {
            definition: Some(definition),
            parameter: Parameter::default(),
            processed: false,
            select: Vec::new(),
            where_clauses: Vec::new(),
            sorts: Vec::new(),
            args: Vec::new(),
            usage: UsageMap::new(),
            result: None,
        }
    }

    /// A resource without a schema: only pagination and response shaping are available.
    pub fn passthrough(param: Parameter) -> Self {
        Resource {
            definition: None,
            parameter: param,
            processed: true,
            select: Vec::new(),
            where_clauses: Vec::new(),
            sorts: Vec::new(),
            args: Vec::new(),
            usage: UsageMap::new(),
            result: None,
        }
    }

    /// Schema definition backing this resource; `None` for passthrough resources.
    pub fn definition(&self) -> Option<&Arc<Definition>> {
        self.definition.as_ref()
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    /// Arguments bound by the last `set_param`, in placeholder order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Usage tags recorded for a table (defaults, compiled clauses and selection).
    pub fn usage_of(&self, table: TableId) -> UsageSet {
        self.usage.get(table)
    }

    /// Reset all request state, then validate and compile `param`. On validation
    /// failure every error is returned and the resource stays unprocessed.
    pub fn set_param(&mut self, param: Parameter) -> Result<(), ResourceError> {
        self.clean_state();
        self.parameter = param;

        let Some(definition) = self.definition.clone() else {
            self.processed = true;
            return Ok(());
        };

        let compiled = compiler::compile(&definition, &self.parameter);
        self.where_clauses = compiled.where_clauses;
        self.sorts = compiled.sorts;
        self.args = compiled.args;
        self.usage = compiled.usage;

        if !compiled.errors.is_empty() {
            tracing::debug!(errors = %compiled.errors, "rejected resource parameters");
            return Err(ResourceError::Validation(compiled.errors));
        }
        self.processed = true;
        Ok(())
    }

    /// Columns to project. Replaces any previous selection.
    pub fn select(&mut self, fields: &[FieldId]) {
        self.select.clear();
        self.usage.unmark_all(Usage::Select);
        let Some(definition) = self.definition.clone() else {
            return;
        };
        for field_id in fields {
            if !definition.contains_field(*field_id) {
                tracing::warn!(field = ?field_id, "ignoring field from another definition");
                continue;
            }
            let field = definition.field(*field_id);
            self.select.push(field.statement.clone());
            self.usage.mark(field.table, Usage::Select);
        }
    }

    /// Id query: projection, joins for every active usage, filter/search and default
    /// predicates, and ordering.
    pub fn query_and_args(&self) -> Result<QueryBuf, ResourceError> {
        let definition = self.ready()?;
        let mut q = QueryBuf::new();
        q.sql = self.select_from(definition);

        let joins = self.join_statements(
            definition,
            UsageSet::of(&[Usage::Select, Usage::Search, Usage::Filter, Usage::Sort, Usage::Mandatory]),
        );
        if !joins.is_empty() {
            q.sql.push('\n');
            q.sql.push_str(&joins.join("\n"));
        }

        let where_parts: Vec<&str> = self
            .where_clauses
            .iter()
            .chain(definition.default_where())
            .map(String::as_str)
            .collect();
        if !where_parts.is_empty() {
            q.sql.push_str("\nWHERE ");
            q.sql.push_str(&where_parts.join("\nAND "));
        }

        self.push_order_by(&mut q.sql);
        q.params = self.args.clone();
        tracing::debug!(sql = %q.sql, params = ?q.params, "resource query");
        Ok(q)
    }

    /// Row query for an already filtered page of ids. Only selection and sort joins
    /// are applied; search and filter predicates are not repeated.
    pub fn populate_query_args(&self, id_field: FieldId, ids: &[Id]) -> Result<QueryBuf, ResourceError>
    where
        Id: Serialize,
    {
        let definition = self.ready()?;
        if !definition.contains_field(id_field) {
            return Err(ResourceError::Argument(format!("unknown id field {:?}", id_field)));
        }

        let mut q = QueryBuf::new();
        let mut sql = self.select_from(definition);
        let joins = self.join_statements(definition, UsageSet::of(&[Usage::Select, Usage::Sort]));
        if !joins.is_empty() {
            sql.push('\n');
            sql.push_str(&joins.join("\n"));
        }

        let id_column = definition.field(id_field).comparand();
        if ids.is_empty() {
            sql.push_str("\nWHERE 1 = 0");
        } else {
            let mut placeholders = Vec::with_capacity(ids.len());
            for id in ids {
                let value = serde_json::to_value(id).map_err(|e| ResourceError::Argument(e.to_string()))?;
                placeholders.push(format!("${}", q.push_param(value)));
            }
            sql.push_str(&format!("\nWHERE {} IN ({})", id_column, placeholders.join(", ")));
        }

        self.push_order_by(&mut sql);
        q.sql = sql;
        tracing::debug!(sql = %q.sql, params = ?q.params, "resource populate query");
        Ok(q)
    }

    /// Slice the current page out of the full id list. Fails with
    /// [`ResourceError::Pagination`] when the page starts past the last id, which
    /// includes page 1 of an empty list.
    pub fn paginated_results<'a>(&self, ids: &'a [Id]) -> Result<&'a [Id], ResourceError> {
        let Parameter { limit, page, .. } = self.parameter;
        let start = page
            .checked_sub(1)
            .and_then(|p| p.checked_mul(limit))
            .ok_or(ResourceError::Pagination)?;
        let end = limit.saturating_mul(page).min(ids.len());
        if start >= end {
            return Err(ResourceError::Pagination);
        }
        Ok(&ids[start..end])
    }

    pub fn set_result(&mut self, ids: Vec<Id>, paginated_result: Vec<Model>) {
        self.result = Some(ResultSet { ids, paginated_result });
    }

    pub fn result(&self) -> Option<&ResultSet<Id, Model>> {
        self.result.as_ref()
    }

    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata {
            page: self.parameter.page,
            ..Metadata::default()
        };
        if let Some(result) = &self.result {
            metadata.total_count = result.ids.len();
            metadata.count = result.paginated_result.len();
            if self.parameter.limit > 0 {
                metadata.total_page = metadata.total_count.div_ceil(self.parameter.limit);
            }
        }
        metadata
    }

    /// Paged response; empty lists when no result was set.
    pub fn response(&self) -> Response<Id, Model>
    where
        Id: Clone,
        Model: Clone,
    {
        let data = match &self.result {
            Some(result) => Data {
                ids: result.ids.clone(),
                paginated_result: result.paginated_result.clone(),
            },
            None => Data {
                ids: Vec::new(),
                paginated_result: Vec::new(),
            },
        };
        Response {
            metadata: self.metadata(),
            data,
        }
    }

    pub fn into_response(self) -> Response<Id, Model> {
        let metadata = self.metadata();
        let data = match self.result {
            Some(result) => Data {
                ids: result.ids,
                paginated_result: result.paginated_result,
            },
            None => Data {
                ids: Vec::new(),
                paginated_result: Vec::new(),
            },
        };
        Response { metadata, data }
    }

    /// Query string for paging links, see [`Parameter::uri`].
    pub fn param_uri(&self) -> String {
        self.parameter.uri()
    }

    fn ready(&self) -> Result<&Definition, ResourceError> {
        let definition = self.definition.as_deref().ok_or(ResourceError::NoDefinition)?;
        if !self.processed {
            return Err(ResourceError::NotProcessed);
        }
        if self.select.is_empty() {
            return Err(ResourceError::EmptySelection);
        }
        Ok(definition)
    }

    fn select_from(&self, definition: &Definition) -> String {
        format!(
            "SELECT {} FROM {}",
            self.select.join(", "),
            definition.table(definition.root()).statement
        )
    }

    fn push_order_by(&self, sql: &mut String) {
        if !self.sorts.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&self.sorts.join(", "));
        }
    }

    /// Joins reaching every table used for one of `usages`. Mandatory relations and
    /// tables used only for filtering are inner joins; everything else is a left join.
    fn join_statements(&self, definition: &Definition, usages: UsageSet) -> Vec<String> {
        let used: HashSet<TableId> = self.usage.tables_with_any(usages).into_iter().collect();
        definition
            .required_relations(&used)
            .into_iter()
            .map(|relation_id| {
                let relation = definition.relation(relation_id);
                let inner = relation.mandatory || self.usage.get(relation.child).is_only(Usage::Filter);
                format!(
                    "{} {} ON {} = {}",
                    if inner { "JOIN" } else { "LEFT JOIN" },
                    definition.table(relation.child).statement,
                    definition.field(relation.foreign_key).statement,
                    definition.field(relation.reference_key).statement,
                )
            })
            .collect()
    }

    fn clean_state(&mut self) {
        self.parameter = Parameter::default();
        self.processed = false;
        self.select.clear();
        self.where_clauses.clear();
        self.sorts.clear();
        self.args.clear();
        self.usage = UsageMap::new();
        self.result = None;
    }
}

impl Definition {
    /// Start a request-scoped resource over this definition.
    pub fn resource<Id, Model>(self: &Arc<Self>) -> Resource<Id, Model> {
        Resource::new(Arc::clone(self))
    }
}
