mod executor;
mod paginate;
mod postgres;

pub use executor::QueryExecutor;
pub use paginate::ResourceService;
pub use postgres::PgExecutor;
