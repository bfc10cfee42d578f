//! Feed search and pagination.

use serde::{Deserialize, Serialize};

use crate::models::PostView;
use crate::repo::{PostRepo, RepoResult};

pub const PAGE_SIZE: usize = 5;

/// Raw `?q=&page=` parameters. `page` stays a string: anything unparsable means page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedParams {
    pub q: Option<String>,
    pub page: Option<String>,
}

/// `None` when the query should not filter: absent, blank, or the literal "none".
pub fn normalize_query(q: Option<&str>) -> Option<String> {
    let q = q?.trim();
    if q.is_empty() || q.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(q.to_string())
    }
}

pub fn parse_page(page: Option<&str>) -> i64 {
    page.and_then(|p| p.trim().parse().ok()).unwrap_or(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Slice out page `requested`, clamped into `1..=num_pages`. An empty input
/// still has one (empty) page.
pub fn paginate<T>(items: Vec<T>, requested: i64, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let num_pages = total.div_ceil(per_page).max(1);
    let number = requested.clamp(1, num_pages as i64) as usize;
    let items: Vec<T> = items.into_iter().skip((number - 1) * per_page).take(per_page).collect();
    Page {
        items,
        number,
        num_pages,
        per_page,
        total,
        has_previous: number > 1,
        has_next: number < num_pages,
    }
}

/// One page of the feed plus the query it was filtered by ("" when unfiltered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    #[serde(flatten)]
    pub page: Page<PostView>,
    pub query: String,
}

pub async fn feed<R: PostRepo + ?Sized>(repo: &R, params: &FeedParams) -> RepoResult<Feed> {
    let query = normalize_query(params.q.as_deref());
    let posts = repo.search_posts(query.as_deref()).await?;
    let page = paginate(posts.into_iter().map(PostView::from).collect(), parse_page(params.page.as_deref()), PAGE_SIZE);
    Ok(Feed { page, query: query.unwrap_or_default() })
}
