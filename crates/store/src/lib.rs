//! SQLite storage and query layer for a small blog.
//!
//! # Architecture
//! Three relations make up the schema (see `migrations/`):
//! - **posts**: title, subtitle, author, publication time, Markdown body and a
//!   completed flag.
//! - **tags**: name and description.
//! - **post_tags**: the many-to-many association, keyed by `(post_id, tag_id)`.
//!
//! [`Database`] is the single shared storage handle; open it once and pass it
//! (or a [`Repository`] built from it) to whoever needs it. Every query lives
//! on [`Repository`] and is a single statement, or two when an ID has to be
//! resolved first.
//!
//! Records carry a placeholder relation field (`tag_list` on [`Post`],
//! `post_list` on [`Tag`]) which is always present and empty until explicitly
//! populated with [`Repository::with_tags`] or [`Repository::with_posts`].

mod db;
pub mod error;
mod models;
mod page;
mod post;
mod repo;
mod tag;

pub use crate::db::Database;
pub use crate::page::Page;
pub use crate::post::{Content, DEFAULT_AUTHOR, NewPost, Post, PostId};
pub use crate::repo::Repository;
pub use crate::tag::{NewTag, Tag, TagId};
pub use blog_config::{DatabaseConfig, PaginationConfig};
