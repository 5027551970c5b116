use resourceful::{Definition, Field, FieldType, Relation, SortDirection, Table};
use std::sync::Arc;

/// product (root)
///   -> product_type pt (mandatory)
///   -> category c (optional)
pub fn catalog() -> Arc<Definition> {
    let product_type = Table::new("product_type")
        .alias("pt")
        .field(Field::new("id"))
        .field(Field::new("name").filterable().sortable());
    let category = Table::new("category")
        .alias("c")
        .field(Field::new("id"))
        .field(Field::new("name").searchable().filterable().sortable());
    let product = Table::new("product")
        .field(Field::new("id").kind(FieldType::Numeric).filterable())
        .field(Field::new("uuid"))
        .field(Field::new("name").searchable().filterable().sortable())
        .field(Field::new("price").kind(FieldType::Numeric).searchable().sortable())
        .field(Field::new("product_type_id"))
        .field(Field::new("category_id"))
        .field(Field::new("company_id").kind(FieldType::Numeric).local_filterable())
        .field(Field::new("created_on").sortable().default_sort(SortDirection::Desc))
        .field(Field::new("is_deleted").soft_delete())
        .relation(Relation::new("product_type_id", "id", product_type).mandatory())
        .relation(Relation::new("category_id", "id", category));
    Arc::new(Definition::build(&product).expect("catalog definition"))
}
