//! Load a schema declaration from JSON text or a JSON file.

use crate::error::DefinitionError;
use crate::schema::Table;
use std::path::Path;

/// Parse a root table (with nested fields and relations) from JSON.
pub fn load_table_from_str(json: &str) -> Result<Table, DefinitionError> {
    serde_json::from_str(json).map_err(|e| DefinitionError::Load(e.to_string()))
}

/// Read and parse a root table from a JSON file.
pub fn load_table_from_path(path: impl AsRef<Path>) -> Result<Table, DefinitionError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading schema");
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DefinitionError::Load(format!("{}: {}", path.display(), e)))?;
    load_table_from_str(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SortDirection};
    use std::io::Write;

    const PRODUCT: &str = r#"{
        "name": "product",
        "fields": [
            { "name": "id" },
            { "name": "count", "type": "numeric", "filterable": true },
            { "name": "created_on", "sortable": true, "sort": "desc" },
            { "name": "product_type_id" }
        ],
        "relations": [
            {
                "mandatory": true,
                "foreign_key": "product_type_id",
                "reference_key": "id",
                "table": { "name": "product_type", "alias": "pt", "fields": [{ "name": "id" }] }
            }
        ]
    }"#;

    #[test]
    fn loads_nested_tables_with_defaults() {
        let table = load_table_from_str(PRODUCT).unwrap();
        assert_eq!(table.name, "product");
        assert_eq!(table.fields[0].kind, FieldType::String);
        assert_eq!(table.fields[1].kind, FieldType::Numeric);
        assert!(table.fields[1].filterable);
        assert!(!table.fields[1].sortable);
        assert_eq!(table.fields[2].sort, Some(SortDirection::Desc));
        assert!(table.relations[0].mandatory);
        assert_eq!(table.relations[0].table.reference(), "pt");
    }

    #[test]
    fn rejects_unknown_sort_direction() {
        let err = load_table_from_str(r#"{ "name": "t", "fields": [{ "name": "a", "sort": "up" }] }"#)
            .unwrap_err();
        assert!(matches!(err, DefinitionError::Load(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PRODUCT.as_bytes()).unwrap();
        let table = load_table_from_path(file.path()).unwrap();
        assert_eq!(table.relations.len(), 1);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_table_from_path("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().starts_with("schema load:"));
    }
}
