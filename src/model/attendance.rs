use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Per-student status within one day's record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

/// One student's row inside an [`AttendanceRecord`]. The name is a
/// snapshot taken at save time; there is no foreign key back to the
/// roster, and later roster edits never rewrite historical entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    #[schema(example = "101")]
    pub roll_no: String,

    #[schema(example = "Alice Johnson")]
    pub name: String,

    pub status: AttendanceStatus,
}

/// The full entry list for one calendar date. Unique per date; saves
/// replace the whole list (last write wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: String,

    pub entries: Vec<StatusEntry>,
}
