use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// `?page=&limit=` query parameters. Pages are 1-based.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.limit())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        let limit = i64::from(query.limit());
        Self {
            items,
            total,
            total_pages: (total + limit - 1) / limit,
            current_page: query.page(),
        }
    }

    pub fn empty(query: &PageQuery) -> Self {
        Self::new(Vec::new(), 0, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let q = PageQuery::default();
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 10);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn test_offset_and_clamping() {
        let q = PageQuery {
            page: Some(3),
            limit: Some(500),
        };
        assert_eq!(q.limit(), 100);
        assert_eq!(q.offset(), 200);

        let zero = PageQuery {
            page: Some(0),
            limit: Some(0),
        };
        assert_eq!(zero.page(), 1);
        assert_eq!(zero.limit(), 10);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let q = PageQuery {
            page: Some(1),
            limit: Some(10),
        };
        assert_eq!(Page::new(vec![1], 21, &q).total_pages, 3);
        assert_eq!(Page::new(Vec::<i32>::new(), 0, &q).total_pages, 0);
        assert_eq!(Page::<i32>::empty(&q).current_page, 1);
    }
}
