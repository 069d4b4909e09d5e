use crate::tag::Tag;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Author recorded when a new post doesn't name one. Mirrors the column
/// default in the schema migration.
pub const DEFAULT_AUTHOR: &str = "smetam";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub i64);

/// Post body, tagged with the form it is currently in.
///
/// Posts are stored as Markdown and only become HTML when something
/// explicitly renders them. Serializes as a plain string either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Markdown(String),
    Html(String),
}
impl Content {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Markdown(s) | Self::Html(s) => s,
        }
    }

    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }

    /// Render Markdown to HTML. Already-rendered content is returned as-is.
    pub fn render(self) -> Self {
        match self {
            Self::Markdown(source) => Self::Html(blog_markup::to_html(source)),
            html @ Self::Html(_) => html,
        }
    }
}
impl AsRef<str> for Content {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// A blog post record.
///
/// `tag_list` is a placeholder: it is always present, but stays empty unless
/// the post went through [`Repository::with_tags`](crate::Repository::with_tags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub post_id: PostId,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub content: Content,
    pub completed: bool,
    pub tag_list: Vec<Tag>,
}
impl Post {
    /// Render the body to HTML, see [`Content::render`].
    pub fn render(self) -> Self {
        Self { content: self.content.render(), ..self }
    }
}

/// Everything needed to create a post.
///
/// `author` and `published_at` fall back to [`DEFAULT_AUTHOR`] and the time of
/// insertion respectively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub subtitle: String,
    /// Markdown source.
    pub content: String,
    pub completed: bool,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}
impl NewPost {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            content: content.into(),
            completed: false,
            author: None,
            published_at: None,
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_published_at(mut self, published_at: OffsetDateTime) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }
}
