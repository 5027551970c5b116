//! Paged response envelope: `{ metadata: {...}, data: { ids, paginated_result } }`.

use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub count: usize,
    pub page: usize,
    pub total_count: usize,
    pub total_page: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Data<Id, Model> {
    /// Every id matching the request, not just the current page.
    pub ids: Vec<Id>,
    pub paginated_result: Vec<Model>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response<Id, Model> {
    pub metadata: Metadata,
    pub data: Data<Id, Model>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_envelope() {
        let response = Response {
            metadata: Metadata {
                count: 1,
                page: 2,
                total_count: 11,
                total_page: 2,
            },
            data: Data {
                ids: vec![1, 2],
                paginated_result: vec![json!({ "id": 11 })],
            },
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "metadata": { "count": 1, "page": 2, "total_count": 11, "total_page": 2 },
                "data": { "ids": [1, 2], "paginated_result": [{ "id": 11 }] }
            })
        );
    }
}
