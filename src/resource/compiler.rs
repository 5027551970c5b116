//! Parameter compiler: validates search, filters, local filters and sorts against a
//! definition and emits WHERE / ORDER BY fragments with positional arguments.

use super::values::{split_values, typed_value};
use super::Parameter;
use crate::definition::{Definition, FieldId, FieldNode, Usage, UsageMap};
use crate::error::ValidationErrors;
use crate::schema::{FieldType, SortDirection};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilterOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl FilterOperator {
    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => FilterOperator::Eq,
            "ne" => FilterOperator::Ne,
            "lt" => FilterOperator::Lt,
            "lte" => FilterOperator::Lte,
            "gt" => FilterOperator::Gt,
            "gte" => FilterOperator::Gte,
            "in" => FilterOperator::In,
            _ => return None,
        })
    }

    fn sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::In => "IN",
        }
    }
}

/// Public filters need `filterable`; trusted local filters also accept `local_filterable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FilterScope {
    Public,
    Local,
}

impl FilterScope {
    fn key(&self, position: usize) -> String {
        match self {
            FilterScope::Public => format!("filters.{}", position),
            FilterScope::Local => format!("localFilters.{}", position),
        }
    }

    fn allows(&self, field: &FieldNode) -> bool {
        match self {
            FilterScope::Public => field.filterable,
            FilterScope::Local => field.filterable || field.local_filterable,
        }
    }
}

/// Output of one compilation. Fragments and arguments of accepted clauses are kept
/// even when other clauses failed.
#[derive(Clone, Debug, Default)]
pub(crate) struct Compiled {
    pub where_clauses: Vec<String>,
    pub sorts: Vec<String>,
    pub args: Vec<Value>,
    pub usage: UsageMap,
    pub errors: ValidationErrors,
}

pub(crate) fn compile(definition: &Definition, param: &Parameter) -> Compiled {
    let mut compiler = Compiler {
        definition,
        out: Compiled {
            usage: definition.default_usage().clone(),
            ..Compiled::default()
        },
    };
    compiler.search(&param.search);
    compiler.filters(&param.filters, FilterScope::Public);
    compiler.filters(&param.local_filters, FilterScope::Local);
    compiler.sorts(&param.sorts);
    compiler.out
}

struct Compiler<'d> {
    definition: &'d Definition,
    out: Compiled,
}

impl<'d> Compiler<'d> {
    /// Bind one argument; returns its placeholder.
    fn bind(&mut self, value: Value, kind: FieldType) -> String {
        self.out.args.push(value);
        let n = self.out.args.len();
        match kind {
            FieldType::Date => format!("${}::timestamptz", n),
            _ => format!("${}", n),
        }
    }

    fn mark(&mut self, field: FieldId, usage: Usage) {
        let table = self.definition.field(field).table;
        self.out.usage.mark(table, usage);
    }

    fn search(&mut self, search: &str) {
        let definition = self.definition;
        if definition.search_fields().is_empty() {
            self.out
                .errors
                .push("search", "no available search fields for this entity");
            return;
        }
        if search.is_empty() {
            return;
        }

        let numeric_term = search.parse::<f64>().is_ok();
        let mut predicates = Vec::new();
        for field_id in definition.search_fields() {
            let field = definition.field(*field_id);
            self.mark(*field_id, Usage::Search);
            if field.kind == FieldType::Numeric {
                if numeric_term {
                    let ph = self.bind(Value::String(format!("{}%", search)), FieldType::String);
                    predicates.push(format!("{}::text like {}", field.statement, ph));
                }
            } else {
                let ph = self.bind(
                    Value::String(format!("%{}%", search.to_lowercase())),
                    FieldType::String,
                );
                predicates.push(format!("lower({}) like {}", field.statement, ph));
            }
        }

        if predicates.is_empty() {
            // only numeric fields and a non-numeric term: nothing can match
            self.out.where_clauses.push("(FALSE)".to_string());
        } else {
            self.out
                .where_clauses
                .push(format!("({})", predicates.join(" OR ")));
        }
    }

    fn filters(&mut self, filters: &[String], scope: FilterScope) {
        for (i, raw) in filters.iter().enumerate() {
            let key = scope.key(i + 1);
            if let Err(message) = self.filter(raw, scope) {
                self.out.errors.push(key, message);
            }
        }
    }

    fn filter(&mut self, raw: &str, scope: FilterScope) -> Result<(), String> {
        let definition = self.definition;
        let (key, rest) = raw.trim().split_once(char::is_whitespace).ok_or("invalid format")?;
        let (operator, value) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or("invalid format")?;
        if value.trim().is_empty() {
            return Err("invalid format".into());
        }

        let field_id = definition
            .indexed_field(key)
            .filter(|f| scope.allows(definition.field(*f)))
            .ok_or("invalid field")?;
        let field = definition.field(field_id);
        let operator = FilterOperator::parse(operator).ok_or("invalid operator")?;

        let invalid_value = || format!("value must be a valid {} format", field.kind);
        let values = split_values(value).ok_or_else(invalid_value)?;
        if operator != FilterOperator::In && values.len() != 1 {
            return Err(invalid_value());
        }
        let typed = values
            .iter()
            .map(|v| typed_value(v, field.kind))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(invalid_value)?;

        let clause = if operator == FilterOperator::In {
            let placeholders: Vec<String> = typed
                .into_iter()
                .map(|v| self.bind(v, field.kind))
                .collect();
            format!("{} IN ({})", field.comparand(), placeholders.join(","))
        } else {
            let mut typed = typed;
            let ph = self.bind(typed.remove(0), field.kind);
            format!("{} {} {}", field.comparand(), operator.sql(), ph)
        };
        self.out.where_clauses.push(clause);
        self.mark(field_id, Usage::Filter);
        Ok(())
    }

    fn sorts(&mut self, sorts: &[String]) {
        let definition = self.definition;
        let mut defaults: Vec<FieldId> = definition.default_sorts().to_vec();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut terms = Vec::new();
        let mut failed = false;

        for (i, raw) in sorts.iter().enumerate() {
            let key = format!("sorts.{}", i + 1);
            let parts: Vec<&str> = raw.split_whitespace().collect();
            let &[sort_key, direction] = parts.as_slice() else {
                self.out.errors.push(key, "invalid sorts format");
                failed = true;
                continue;
            };
            let Some(field_id) = definition
                .indexed_field(sort_key)
                .filter(|f| definition.field(*f).sortable)
            else {
                self.out.errors.push(key, "invalid sorts field");
                failed = true;
                continue;
            };
            if !seen.insert(sort_key) {
                self.out
                    .errors
                    .push(key, format!("duplicate with \"{}\" field", sort_key));
                failed = true;
                continue;
            }
            let Ok(direction) = direction.parse::<SortDirection>() else {
                self.out.errors.push(key, "invalid sorts operator");
                failed = true;
                continue;
            };

            defaults.retain(|f| *f != field_id);
            terms.push(format!("{} {}", definition.field(field_id).statement, direction.sql()));
            self.mark(field_id, Usage::Sort);
        }
        if failed {
            return;
        }

        for field_id in defaults {
            let field = definition.field(field_id);
            if let Some(direction) = field.sort {
                terms.push(format!("{} {}", field.statement, direction.sql()));
                self.mark(field_id, Usage::Sort);
            }
        }
        self.out.sorts = terms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Relation, Table};
    use serde_json::json;

    fn definition() -> Definition {
        let product_type = Table::new("product_type")
            .alias("pt")
            .field(Field::new("id"))
            .field(Field::new("name").searchable().filterable());
        let table = Table::new("product")
            .field(Field::new("id"))
            .field(Field::new("name").searchable().filterable().sortable())
            .field(Field::new("count").kind(FieldType::Numeric).searchable().filterable().sortable())
            .field(Field::new("active").kind(FieldType::Boolean).filterable())
            .field(Field::new("released_at").kind(FieldType::Date).filterable())
            .field(Field::new("company_id").kind(FieldType::Numeric).local_filterable())
            .field(Field::new("product_type_id"))
            .field(Field::new("created_on").sortable().default_sort(SortDirection::Desc))
            .relation(Relation::new("product_type_id", "id", product_type));
        Definition::build(&table).unwrap()
    }

    #[test]
    fn empty_search_adds_nothing() {
        let out = compile(&definition(), &Parameter::new(10, 1));
        assert!(out.where_clauses.is_empty());
        assert!(out.args.is_empty());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn numeric_search_term_also_matches_numeric_fields() {
        let out = compile(&definition(), &Parameter::new(10, 1).search("5"));
        assert_eq!(
            out.where_clauses,
            vec![
                "(lower(product.\"name\") like $1 OR product.\"count\"::text like $2 OR lower(pt.\"name\") like $3)"
            ]
        );
        assert_eq!(out.args, vec![json!("%5%"), json!("5%"), json!("%5%")]);
    }

    #[test]
    fn text_search_skips_numeric_fields_but_marks_their_tables() {
        let def = definition();
        let out = compile(&def, &Parameter::new(10, 1).search("Red"));
        assert_eq!(
            out.where_clauses,
            vec!["(lower(product.\"name\") like $1 OR lower(pt.\"name\") like $2)"]
        );
        assert_eq!(out.args, vec![json!("%red%"), json!("%red%")]);
        assert!(out.usage.get(def.root()).contains(Usage::Search));
        assert!(out.usage.get(def.table_by_ref("pt").unwrap()).contains(Usage::Search));
    }

    #[test]
    fn search_without_searchable_fields_is_rejected() {
        let def = Definition::build(&Table::new("t").field(Field::new("a").filterable())).unwrap();
        for param in [Parameter::new(10, 1).search("x"), Parameter::new(10, 1)] {
            let out = compile(&def, &param);
            assert_eq!(out.errors.len(), 1);
            assert_eq!(out.errors.messages_for("search"), vec!["no available search fields for this entity"]);
            assert!(out.where_clauses.is_empty());
        }
    }

    #[test]
    fn filters_bind_one_argument_per_value() {
        let def = definition();
        let out = compile(
            &def,
            &Parameter::new(10, 1)
                .filter("name eq foo")
                .filter("count in (1 2.5)")
                .filter("active ne false")
                .filter("released_at gte 2024-01-01T00:00:00Z"),
        );
        assert!(out.errors.is_empty(), "{}", out.errors);
        assert_eq!(
            out.where_clauses,
            vec![
                "product.\"name\"::text = $1",
                "product.\"count\" IN ($2,$3)",
                "product.\"active\" != $4",
                "product.\"released_at\" >= $5::timestamptz",
            ]
        );
        assert_eq!(
            out.args,
            vec![json!("foo"), json!(1), json!(2.5), json!(false), json!("2024-01-01T00:00:00Z")]
        );
        assert!(out.usage.get(def.root()).contains(Usage::Filter));
    }

    #[test]
    fn filter_tokens_split_on_any_whitespace() {
        let out = compile(
            &definition(),
            &Parameter::new(10, 1).filter("name\teq\tfoo").filter("count  in\t(1 2)"),
        );
        assert!(out.errors.is_empty(), "{}", out.errors);
        assert_eq!(
            out.where_clauses,
            vec!["product.\"name\"::text = $1", "product.\"count\" IN ($2,$3)"]
        );
        assert_eq!(out.args, vec![json!("foo"), json!(1), json!(2)]);
    }

    #[test]
    fn in_filter_keeps_quoted_values_whole() {
        let out = compile(&definition(), &Parameter::new(10, 1).filter(r#"name in ("red shoes" 'x y' z)"#));
        assert_eq!(out.where_clauses, vec!["product.\"name\"::text IN ($1,$2,$3)"]);
        assert_eq!(out.args, vec![json!("red shoes"), json!("x y"), json!("z")]);
    }

    #[test]
    fn every_bad_filter_gets_its_own_error() {
        let out = compile(
            &definition(),
            &Parameter::new(10, 1)
                .filter("name eq")
                .filter("ghost eq 1")
                .filter("company_id eq 1")
                .filter("name like foo")
                .filter("count eq many")
                .filter("name in ()")
                .filter("name eq foo bar")
                .filter("name eq ok"),
        );
        let keys: Vec<&str> = out.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            keys,
            vec!["filters.1", "filters.2", "filters.3", "filters.4", "filters.5", "filters.6", "filters.7"]
        );
        assert_eq!(out.errors.messages_for("filters.1"), vec!["invalid format"]);
        assert_eq!(out.errors.messages_for("filters.2"), vec!["invalid field"]);
        assert_eq!(out.errors.messages_for("filters.3"), vec!["invalid field"]);
        assert_eq!(out.errors.messages_for("filters.4"), vec!["invalid operator"]);
        assert_eq!(out.errors.messages_for("filters.5"), vec!["value must be a valid numeric format"]);
        assert_eq!(out.errors.messages_for("filters.6"), vec!["value must be a valid string format"]);
        assert_eq!(out.where_clauses, vec!["product.\"name\"::text = $1"]);
        assert_eq!(out.args, vec![json!("ok")]);
    }

    #[test]
    fn local_filters_accept_local_filterable_fields() {
        let out = compile(
            &definition(),
            &Parameter::new(10, 1)
                .local_filter("company_id eq 7")
                .local_filter("company_id in (1 2)")
                .local_filter("id eq 1"),
        );
        assert_eq!(
            out.where_clauses,
            vec!["product.\"company_id\" = $1", "product.\"company_id\" IN ($2,$3)"]
        );
        assert_eq!(out.errors.messages_for("localFilters.3"), vec!["invalid field"]);
    }

    #[test]
    fn request_sort_overrides_default_sort() {
        let out = compile(&definition(), &Parameter::new(10, 1).sort("created_on asc"));
        assert_eq!(out.sorts, vec!["product.\"created_on\" ASC"]);
    }

    #[test]
    fn remaining_defaults_follow_request_sorts() {
        let out = compile(&definition(), &Parameter::new(10, 1).sort("name asc").sort("count desc"));
        assert_eq!(
            out.sorts,
            vec![
                "product.\"name\" ASC",
                "product.\"count\" DESC",
                "product.\"created_on\" DESC",
            ]
        );
    }

    #[test]
    fn bad_sorts_are_reported_and_nothing_is_emitted() {
        let out = compile(
            &definition(),
            &Parameter::new(10, 1)
                .sort("name")
                .sort("active asc")
                .sort("name asc")
                .sort("name desc")
                .sort("count sideways"),
        );
        assert_eq!(out.errors.messages_for("sorts.1"), vec!["invalid sorts format"]);
        assert_eq!(out.errors.messages_for("sorts.2"), vec!["invalid sorts field"]);
        assert!(out.errors.messages_for("sorts.3").is_empty());
        assert_eq!(out.errors.messages_for("sorts.4"), vec!["duplicate with \"name\" field"]);
        assert_eq!(out.errors.messages_for("sorts.5"), vec!["invalid sorts operator"]);
        assert!(out.sorts.is_empty());
    }

    #[test]
    fn errors_keep_pass_order() {
        let def = Definition::build(
            &Table::new("t").field(Field::new("a").filterable().sortable()),
        )
        .unwrap();
        let out = compile(
            &def,
            &Parameter::new(10, 1)
                .search("x")
                .filter("b eq 1")
                .local_filter("c eq 1")
                .sort("d asc"),
        );
        let keys: Vec<&str> = out.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(keys, vec!["search", "filters.1", "localFilters.1", "sorts.1"]);
    }
}
