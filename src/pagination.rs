/// Rows per page in the user directory.
pub const PAGE_SIZE: i64 = 15;

/// One page of a counted result set. There is always at least one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub num_pages: i64,
    pub size: i64,
}

impl Page {
    /// Clamp the raw `page` parameter into range. Missing or non-numeric
    /// means the first page, anything past the end means the last.
    pub fn clamp(raw: Option<&str>, total: i64, size: i64) -> Self {
        let num_pages = ((total.max(0) + size - 1) / size).max(1);
        let requested = raw.and_then(|r| r.trim().parse::<i64>().ok()).unwrap_or(1);
        Page {
            number: requested.clamp(1, num_pages),
            num_pages,
            size,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.size
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous(&self) -> i64 {
        self.number - 1
    }

    pub fn next(&self) -> i64 {
        self.number + 1
    }
}
