use crate::post::Post;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

/// A tag record.
///
/// `post_list` is a placeholder: it is always present, but stays empty unless
/// the tag went through [`Repository::with_posts`](crate::Repository::with_posts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub tag_id: TagId,
    pub name: String,
    pub description: String,
    pub post_list: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub description: String,
}
impl NewTag {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into() }
    }
}
