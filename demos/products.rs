//! Product listing demo: builds a definition, compiles request parameters from the
//! environment and prints one paged response as JSON.
//!
//! Run: `DATABASE_URL=postgres://... cargo run --example products`
//! Optional: `SCHEMA_PATH=schema.json`, `REQUEST='{"limit":5,"page":1,"search":"lamp"}'`

use resourceful::{load_table_from_path, Definition, Parameter, PgExecutor, ResourceService};
use serde_json::Value;
use std::sync::Arc;

const PRODUCT_SCHEMA: &str = r#"{
    "name": "product",
    "fields": [
        { "name": "id", "type": "numeric", "filterable": true },
        { "name": "uuid" },
        { "name": "name", "searchable": true, "filterable": true, "sortable": true },
        { "name": "price", "type": "numeric", "searchable": true, "filterable": true, "sortable": true },
        { "name": "company_id", "type": "numeric", "local_filterable": true },
        { "name": "product_type_id" },
        { "name": "created_on", "type": "date", "filterable": true, "sortable": true, "sort": "desc" },
        { "name": "is_deleted", "type": "boolean", "soft_delete": true }
    ],
    "relations": [
        {
            "mandatory": true,
            "foreign_key": "product_type_id",
            "reference_key": "id",
            "table": {
                "name": "product_type",
                "alias": "pt",
                "fields": [
                    { "name": "id" },
                    { "name": "name", "alias": "type", "searchable": true, "filterable": true, "sortable": true }
                ]
            }
        }
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("resourceful=info")),
        )
        .init();

    let definition = match std::env::var("SCHEMA_PATH") {
        Ok(path) => Definition::build(&load_table_from_path(path)?)?,
        Err(_) => Definition::from_json(PRODUCT_SCHEMA)?,
    };
    let definition = Arc::new(definition);

    let request = std::env::var("REQUEST").unwrap_or_else(|_| r#"{"limit":10,"page":1}"#.into());
    let mut param: Parameter = serde_json::from_str(&request)?;
    if let Ok(company) = std::env::var("COMPANY_ID") {
        param = param.local_filter(format!("company_id eq {}", company));
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/products".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    let executor = PgExecutor::new(pool);

    let id = definition.root_field("id").ok_or("schema has no id field")?;
    let fields: Vec<_> = ["uuid", "name", "price", "created_on"]
        .iter()
        .filter_map(|name| definition.root_field(name))
        .collect();

    let mut resource = definition.resource::<i64, Value>();
    if let Err(e) = resource.set_param(param) {
        tracing::warn!("rejected request: {}", e);
        if let resourceful::ResourceError::Validation(errors) = e {
            println!("{}", serde_json::to_string_pretty(&errors)?);
        }
        return Ok(());
    }

    let response = ResourceService::paginate(&executor, &mut resource, id, &fields).await?;
    tracing::info!(
        total = response.metadata.total_count,
        uri = %resource.param_uri(),
        "listed products"
    );
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
