/// An `OFFSET`/`LIMIT` window over a listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}
impl Page {
    pub const fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    /// The first `limit` rows.
    pub const fn first(limit: u32) -> Self {
        Self::new(0, limit)
    }

    /// The page directly after this one, same size.
    pub const fn next(self) -> Self {
        Self::new(self.offset.saturating_add(self.limit), self.limit)
    }

    pub(crate) fn bounds(self) -> (i64, i64) {
        (i64::from(self.limit), i64::from(self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_page() {
        assert_eq!(Page::first(3).next(), Page::new(3, 3));
        assert_eq!(Page::new(u32::MAX - 1, 5).next(), Page::new(u32::MAX, 5));
    }
}
