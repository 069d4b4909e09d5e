use crate::error::{Error, ErrorKind};
use crate::post::{Content, Post, PostId};
use exn::ResultExt;
use time::OffsetDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) post_id: i64,
    pub(crate) title: String,
    pub(crate) subtitle: String,
    pub(crate) author: String,
    /// Unix timestamp in nanoseconds.
    pub(crate) published_at: i64,
    pub(crate) content: String,
    pub(crate) completed: bool,
}

/// Convert a publication time to the stored representation.
///
/// Nanoseconds since the epoch fit in an `i64` until the year 2262; anything
/// outside that range is rejected rather than clamped.
pub(crate) fn published_at_nanos(published_at: OffsetDateTime) -> Result<i64, Error> {
    i64::try_from(published_at.unix_timestamp_nanos()).or_raise(|| ErrorKind::InvalidData("published at"))
}

impl TryFrom<PostRow> for Post {
    type Error = Error;
    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            post_id: PostId(row.post_id),
            title: row.title,
            subtitle: row.subtitle,
            author: row.author,
            published_at: OffsetDateTime::from_unix_timestamp_nanos(i128::from(row.published_at))
                .or_raise(|| ErrorKind::InvalidData("published at"))?,
            content: Content::Markdown(row.content),
            completed: row.completed,
            tag_list: Vec::new(),
        })
    }
}
