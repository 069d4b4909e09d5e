use crate::tag::{Tag, TagId};

#[derive(sqlx::FromRow)]
pub(crate) struct TagRow {
    pub(crate) tag_id: i64,
    pub(crate) name: String,
    pub(crate) description: String,
}
impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self {
            tag_id: TagId(row.tag_id),
            name: row.name,
            description: row.description,
            post_list: Vec::new(),
        }
    }
}
