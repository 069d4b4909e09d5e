mod join;
mod post;
mod tag;

pub(crate) use self::join::{PostTagRow, TagPostRow};
pub(crate) use self::post::{PostRow, published_at_nanos};
pub(crate) use self::tag::TagRow;
