//! Rows from the `post_tags` association joined to one side of it.
//!
//! These only exist to batch-populate placeholder relation fields: the
//! association key says which record the flattened entity belongs to.

use crate::models::{PostRow, TagRow};

/// A tag, and the post it is attached to.
#[derive(sqlx::FromRow)]
pub(crate) struct PostTagRow {
    pub(crate) post_id: i64,
    #[sqlx(flatten)]
    pub(crate) tag: TagRow,
}

/// A post, and the tag it is attached to.
#[derive(sqlx::FromRow)]
pub(crate) struct TagPostRow {
    pub(crate) tag_id: i64,
    #[sqlx(flatten)]
    pub(crate) post: PostRow,
}
