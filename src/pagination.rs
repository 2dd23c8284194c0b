use serde::{Deserialize, Serialize};

fn default_size() -> i64 {
    10
}

/// Zero-based page/size query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

impl PageParams {
    pub fn limit(&self) -> i64 {
        self.size.max(1)
    }

    pub fn offset(&self) -> i64 {
        self.page.max(0) * self.limit()
    }
}

/// Paginated response envelope.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: i64,
    pub size: i64,
    pub total_elements: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, params: PageParams, total_elements: i64) -> Self {
        let size = params.limit();
        let total_pages = (total_elements + size - 1) / size;
        Self {
            content,
            page: params.page.max(0),
            size,
            total_elements,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_page_times_size() {
        let params = PageParams { page: 3, size: 10 };
        assert_eq!(params.limit(), 10);
        assert_eq!(params.offset(), 30);
    }

    #[test]
    fn degenerate_params_are_clamped() {
        let params = PageParams { page: -1, size: 0 };
        assert_eq!(params.limit(), 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2, 3], PageParams { page: 0, size: 10 }, 31);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.total_elements, 31);

        let exact = Page::new(Vec::<i32>::new(), PageParams { page: 0, size: 10 }, 30);
        assert_eq!(exact.total_pages, 3);
    }
}
