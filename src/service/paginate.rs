//! Two-phase pagination: fetch every matching id, slice the page in memory, then
//! fetch full rows only for that page.

use crate::definition::FieldId;
use crate::error::{ExecutorError, PagerError, ResourceError};
use crate::resource::Resource;
use crate::response::Response;
use crate::service::QueryExecutor;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct ResourceService;

impl ResourceService {
    /// Run both phases for a resource whose parameters are already set.
    ///
    /// A page past the end of the id list yields an empty page that still reports the
    /// real `total_count`.
    pub async fn paginate<E, Id, Model>(
        executor: &E,
        resource: &mut Resource<Id, Model>,
        id_field: FieldId,
        fields: &[FieldId],
    ) -> Result<Response<Id, Model>, PagerError>
    where
        E: QueryExecutor,
        Id: DeserializeOwned + Serialize + Clone + Send + 'static,
        Model: DeserializeOwned + Clone,
    {
        resource.select(&[id_field]);
        let q = resource.query_and_args()?;
        let ids: Vec<Id> = executor.fetch_ids(&q).await?;

        let page = match resource.paginated_results(&ids) {
            Ok(page) => page.to_vec(),
            Err(ResourceError::Pagination) => {
                tracing::debug!(
                    total = ids.len(),
                    page = resource.parameter().page,
                    "page out of range, returning empty page"
                );
                resource.set_result(ids, Vec::new());
                return Ok(resource.response());
            }
            Err(e) => return Err(e.into()),
        };

        resource.select(fields);
        let q = resource.populate_query_args(id_field, &page)?;
        let rows = executor.fetch_rows(&q).await?;
        let models = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Model>, _>>()
            .map_err(|e| ExecutorError::Decode(e.to_string()))?;

        resource.set_result(ids, models);
        Ok(resource.response())
    }
}
