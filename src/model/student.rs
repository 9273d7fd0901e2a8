use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "rollNo": "101",
        "name": "Alice Johnson",
        "department": "CSE - C"
    })
)]
pub struct Student {
    #[schema(example = "101")]
    pub roll_no: String,

    #[schema(example = "Alice Johnson")]
    pub name: String,

    #[schema(example = "CSE - C")]
    pub department: String,
}
