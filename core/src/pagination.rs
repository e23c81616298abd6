use serde::Serialize;

const MARGIN_PAGES: u32 = 1;
const AROUND_CURRENT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "page", rename_all = "lowercase")]
pub enum PageLink {
    Page(u32),
    Gap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Pagination {
    pub fn new(total_count: u64, current_page: u32, per_page: u32) -> Self {
        let per_page = u64::from(per_page.max(1));
        let total_pages = u32::try_from(total_count.div_ceil(per_page)).unwrap_or(u32::MAX);
        Pagination { current_page: current_page.max(1), total_pages }
    }

    /// The widget is hidden for a single page of results.
    pub fn is_visible(&self) -> bool {
        self.total_pages > 1
    }

    /// Page numbers to show: the first and last pages, the neighbours of the
    /// current page, and a gap marker for every skipped run.
    pub fn links(&self) -> Vec<PageLink> {
        let mut out = Vec::new();
        for p in 1..=self.total_pages {
            let near_edge = p <= MARGIN_PAGES || p > self.total_pages.saturating_sub(MARGIN_PAGES);
            let near_current = p.abs_diff(self.current_page) <= AROUND_CURRENT;
            if near_edge || near_current {
                out.push(PageLink::Page(p));
            } else if out.last() != Some(&PageLink::Gap) {
                out.push(PageLink::Gap);
            }
        }
        out
    }
}
