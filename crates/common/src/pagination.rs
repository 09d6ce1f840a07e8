use serde::Serialize;
use std::num::NonZeroUsize;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// One page of a list, borrowed from the full roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<'a, T> {
    pub total_pages: usize,
    pub current_page: usize,
    pub start_index: usize,
    pub end_index: usize,
    pub items: &'a [T],
}

pub fn total_pages(item_count: usize, page_size: NonZeroUsize) -> usize {
    item_count.div_ceil(page_size.get())
}

/// Slice `items` into the 1-based `current_page`, clamping the page into the
/// valid range. An empty list yields zero pages and an empty slice.
pub fn paginate<T>(items: &[T], page_size: NonZeroUsize, current_page: usize) -> Page<'_, T> {
    let total_pages = total_pages(items.len(), page_size);
    let current_page = current_page.clamp(1, total_pages.max(1));
    let start_index = ((current_page - 1) * page_size.get()).min(items.len());
    let end_index = (start_index + page_size.get()).min(items.len());

    Page {
        total_pages,
        current_page,
        start_index,
        end_index,
        items: &items[start_index..end_index],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageJumpError {
    #[error("'{0}' is not a page number")]
    NotANumber(String),

    #[error("page {requested} is out of range (1-{total_pages})")]
    OutOfRange { requested: i64, total_pages: usize },
}

/// Current-page cursor over a list whose length changes between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroUsize,
    current_page: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

impl Paginator {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            page_size,
            current_page: 1,
        }
    }

    pub fn page_size(&self) -> NonZeroUsize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> Page<'a, T> {
        paginate(items, self.page_size, self.current_page)
    }

    /// Jump to a page typed by the user. Rejected input leaves the cursor
    /// untouched.
    pub fn jump(&mut self, input: &str, item_count: usize) -> Result<usize, PageJumpError> {
        let trimmed = input.trim();
        let requested: i64 = trimmed
            .parse()
            .map_err(|_| PageJumpError::NotANumber(trimmed.to_string()))?;
        let total_pages = total_pages(item_count, self.page_size);

        if requested < 1 || requested as u64 > total_pages as u64 {
            return Err(PageJumpError::OutOfRange {
                requested,
                total_pages,
            });
        }

        self.current_page = requested as usize;
        Ok(self.current_page)
    }

    pub fn next(&mut self, item_count: usize) -> usize {
        let last = total_pages(item_count, self.page_size).max(1);
        self.current_page = (self.current_page + 1).min(last);
        self.current_page
    }

    pub fn previous(&mut self) -> usize {
        self.current_page = self.current_page.saturating_sub(1).max(1);
        self.current_page
    }

    pub fn reset(&mut self) {
        self.current_page = 1;
    }
}
