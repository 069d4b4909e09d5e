//! Query layer for posts, tags and their associations.
//!
//! Every operation is independent: it needs nothing but the shared pool, and
//! either returns a complete result or fails. Lookups of a single entity that
//! finds nothing return `Ok(None)`.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{PostRow, PostTagRow, TagPostRow, TagRow, published_at_nanos};
use crate::page::Page;
use crate::post::{DEFAULT_AUTHOR, NewPost, Post, PostId};
use crate::tag::{NewTag, Tag, TagId};
use blog_config::PaginationConfig;
use exn::ResultExt;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use time::OffsetDateTime;
use tracing::instrument;

/// SQLite can't bind arrays, so ID lists travel as a JSON array and get
/// unpacked with `json_each()` on the other side.
fn json_ids<T: Serialize>(ids: &[T]) -> Result<String> {
    serde_json::to_string(ids).or_raise(|| ErrorKind::InvalidData("id list"))
}

fn rows_to_posts(rows: Vec<PostRow>) -> Result<Vec<Post>> {
    rows.into_iter().map(Post::try_from).collect()
}

/// Repository for reading (and creating) posts and tags.
///
/// # Relationships
///
/// - A post can have many tags, a tag can be attached to many posts.
/// - Records are returned with an empty placeholder for the other side of the
///   relationship; [`with_tags`](Self::with_tags) and
///   [`with_posts`](Self::with_posts) fill it in a single extra query.
/// - Only [`fetch_post`](Self::fetch_post) renders Markdown. Listings return
///   the stored source; call [`Post::render`] when HTML is wanted.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    pagination: PaginationConfig,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self::new(db.pool().clone(), PaginationConfig::default())
    }
}
impl Repository {
    /// Create a new repository with the given connection pool and default page sizes.
    pub fn new(pool: SqlitePool, pagination: PaginationConfig) -> Self {
        Self { pool, pagination }
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// ID of the most recently published post.
    ///
    /// Posts published at the same instant are ordered by ID, highest first.
    #[instrument(level = "debug", skip(self))]
    pub async fn last_post_id(&self) -> Result<Option<PostId>> {
        let id: Option<i64> = sqlx::query_scalar(include_str!("../queries/last_post_id.sql"))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id.map(PostId))
    }

    /// Get a single post, with its content rendered to HTML.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_post(&self, post_id: PostId) -> Result<Option<Post>> {
        let row: Option<PostRow> = sqlx::query_as(include_str!("../queries/get_post.sql"))
            .bind(post_id.0)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| Post::try_from(r).map(Post::render)).transpose()
    }

    /// Get the most recently published post, rendered.
    ///
    /// Equivalent to [`last_post_id`](Self::last_post_id) followed by
    /// [`fetch_post`](Self::fetch_post).
    pub async fn fetch_latest_post(&self) -> Result<Option<Post>> {
        match self.last_post_id().await? {
            Some(post_id) => {
                tracing::debug!(%post_id, "Resolved latest post");
                self.fetch_post(post_id).await
            },
            None => Ok(None),
        }
    }

    /// Get posts by ID, or a page of all posts.
    ///
    /// With a non-empty `post_ids`, exactly those posts are returned (missing
    /// IDs are skipped) and `page` is ignored. Otherwise `page` is applied to
    /// all posts, defaulting to the first `pagination.posts` of them.
    ///
    /// Results are ordered by ID. Content is left as Markdown.
    #[instrument(level = "debug", skip(self, post_ids), fields(ids = post_ids.len()))]
    pub async fn fetch_posts(&self, post_ids: &[PostId], page: Option<Page>) -> Result<Vec<Post>> {
        if !post_ids.is_empty() {
            return self.fetch_posts_by_ids(post_ids).await;
        }
        let (limit, offset) = page.unwrap_or(Page::first(self.pagination.posts)).bounds();
        let rows: Vec<PostRow> = sqlx::query_as(include_str!("../queries/list_posts.sql"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows_to_posts(rows)
    }

    async fn fetch_posts_by_ids(&self, post_ids: &[PostId]) -> Result<Vec<Post>> {
        let rows: Vec<PostRow> = sqlx::query_as(include_str!("../queries/get_posts_by_ids.sql"))
            .bind(json_ids(post_ids)?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows_to_posts(rows)
    }

    /// Get the posts attached to a tag.
    ///
    /// `page` applies to the tag's associations (ordered by post ID),
    /// defaulting to the first `pagination.posts_by_tag` of them.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_posts_by_tag(&self, tag_id: TagId, page: Option<Page>) -> Result<Vec<Post>> {
        let (limit, offset) = page.unwrap_or(Page::first(self.pagination.posts_by_tag)).bounds();
        let ids: Vec<i64> = sqlx::query_scalar(include_str!("../queries/list_post_ids_for_tag.sql"))
            .bind(tag_id.0)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = ids.into_iter().map(PostId).collect::<Vec<_>>();
        self.fetch_posts_by_ids(&ids).await
    }

    /// Insert a post and return it as stored (content not rendered).
    ///
    /// `published_at` is kept to the nanosecond; times past the year 2262
    /// can't be stored and fail with [`ErrorKind::InvalidData`].
    #[instrument(level = "debug", skip(self, post), fields(title = %post.title))]
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let published_at = published_at_nanos(post.published_at.unwrap_or_else(OffsetDateTime::now_utc))?;
        let row: PostRow = sqlx::query_as(include_str!("../queries/insert_post.sql"))
            .bind(post.title.as_str())
            .bind(post.subtitle.as_str())
            .bind(post.author.as_deref().unwrap_or(DEFAULT_AUTHOR))
            .bind(published_at)
            .bind(post.content.as_str())
            .bind(post.completed)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Post::try_from(row)
    }

    /// Fill in `tag_list` for every post, with one query for the whole batch.
    #[instrument(level = "debug", skip_all, fields(posts = posts.len()))]
    pub async fn with_tags(&self, posts: Vec<Post>) -> Result<Vec<Post>> {
        if posts.is_empty() {
            return Ok(posts);
        }
        let ids = posts.iter().map(|p| p.post_id).collect::<Vec<_>>();
        let rows: Vec<PostTagRow> = sqlx::query_as(include_str!("../queries/list_tags_for_posts.sql"))
            .bind(json_ids(&ids)?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut tags: HashMap<PostId, Vec<Tag>> = HashMap::new();
        for row in rows {
            tags.entry(PostId(row.post_id)).or_default().push(Tag::from(row.tag));
        }
        Ok(posts
            .into_iter()
            .map(|post| Post {
                tag_list: tags.get(&post.post_id).cloned().unwrap_or_default(),
                ..post
            })
            .collect())
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// ID of the tag attached to the most posts.
    ///
    /// Ties go to the lowest tag ID. Tags without any posts never qualify.
    #[instrument(level = "debug", skip(self))]
    pub async fn most_popular_tag_id(&self) -> Result<Option<TagId>> {
        let id: Option<i64> = sqlx::query_scalar(include_str!("../queries/most_popular_tag_id.sql"))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(id.map(TagId))
    }

    /// Get a single tag, with an empty `post_list`.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_tag(&self, tag_id: TagId) -> Result<Option<Tag>> {
        let row: Option<TagRow> = sqlx::query_as(include_str!("../queries/get_tag.sql"))
            .bind(tag_id.0)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(row.map(Tag::from))
    }

    /// Equivalent to [`most_popular_tag_id`](Self::most_popular_tag_id)
    /// followed by [`fetch_tag`](Self::fetch_tag).
    pub async fn fetch_most_popular_tag(&self) -> Result<Option<Tag>> {
        match self.most_popular_tag_id().await? {
            Some(tag_id) => {
                tracing::debug!(%tag_id, "Resolved most popular tag");
                self.fetch_tag(tag_id).await
            },
            None => Ok(None),
        }
    }

    /// A page of tags ordered by ID, defaulting to the first `pagination.tags`.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_tags(&self, page: Option<Page>) -> Result<Vec<Tag>> {
        let (limit, offset) = page.unwrap_or(Page::first(self.pagination.tags)).bounds();
        let rows: Vec<TagRow> = sqlx::query_as(include_str!("../queries/list_tags.sql"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    /// Insert a tag and return it as stored.
    #[instrument(level = "debug", skip(self, tag), fields(name = %tag.name))]
    pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag> {
        let row: TagRow = sqlx::query_as(include_str!("../queries/insert_tag.sql"))
            .bind(tag.name.as_str())
            .bind(tag.description.as_str())
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(Tag::from(row))
    }

    /// Fill in `post_list` for every tag, with one query for the whole batch.
    ///
    /// Attached posts are not rendered, and their own `tag_list` stays empty.
    #[instrument(level = "debug", skip_all, fields(tags = tags.len()))]
    pub async fn with_posts(&self, tags: Vec<Tag>) -> Result<Vec<Tag>> {
        if tags.is_empty() {
            return Ok(tags);
        }
        let ids = tags.iter().map(|t| t.tag_id).collect::<Vec<_>>();
        let rows: Vec<TagPostRow> = sqlx::query_as(include_str!("../queries/list_posts_for_tags.sql"))
            .bind(json_ids(&ids)?)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let mut posts: HashMap<TagId, Vec<Post>> = HashMap::new();
        for row in rows {
            posts.entry(TagId(row.tag_id)).or_default().push(Post::try_from(row.post)?);
        }
        Ok(tags
            .into_iter()
            .map(|tag| Tag {
                post_list: posts.get(&tag.tag_id).cloned().unwrap_or_default(),
                ..tag
            })
            .collect())
    }

    // =========================================================================
    // Associations
    // =========================================================================

    /// Attach a tag to a post.
    ///
    /// Attaching the same pair twice, or referencing a post or tag that
    /// doesn't exist, is rejected by the database.
    #[instrument(level = "debug", skip(self))]
    pub async fn tag_post(&self, post_id: PostId, tag_id: TagId) -> Result<()> {
        sqlx::query(include_str!("../queries/insert_post_tag.sql"))
            .bind(post_id.0)
            .bind(tag_id.0)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(())
    }
}
