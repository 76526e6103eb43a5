use serde::Serialize;

use crate::{
    entities::{actor, category, genre, movie, review, star},
    error::{AppError, AppResult},
};

pub const LIST_PAGE_SIZE: u64 = 3;
pub const FILTER_PAGE_SIZE: u64 = 2;
pub const SEARCH_PAGE_SIZE: u64 = 3;
pub const LATEST_MOVIES: u64 = 5;

/// One page of a paginated listing. `number` is 1-based and an empty listing
/// still has one (empty) page.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self { items: Vec::new(), number: 1, num_pages: 1 }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

/// Requested page of a listing. `Last` resolves once the page count is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageNumber {
    Nth(u64),
    Last,
}

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber::Nth(1);

    /// The 1-based page this names in a listing of `num_pages` pages, if it exists.
    pub fn resolve(self, num_pages: u64) -> Option<u64> {
        match self {
            PageNumber::Last => Some(num_pages),
            PageNumber::Nth(n) if (1..=num_pages).contains(&n) => Some(n),
            PageNumber::Nth(_) => None,
        }
    }
}

/// `?page=` value. Missing means the first page and `last` the final one;
/// anything else that is not a positive integer does not exist.
pub fn page_number(raw: Option<&str>) -> AppResult<PageNumber> {
    match raw.map(str::trim) {
        None | Some("") => Ok(PageNumber::FIRST),
        Some("last") => Ok(PageNumber::Last),
        Some(v) => match v.parse::<u64>() {
            Ok(n) if n >= 1 => Ok(PageNumber::Nth(n)),
            _ => Err(AppError::NotFound),
        },
    }
}

/// Field subset exposed by the JSON filter endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MovieSummary {
    pub title: String,
    pub tagline: String,
    pub url: String,
    pub poster: String,
}

impl From<movie::Model> for MovieSummary {
    fn from(m: movie::Model) -> Self {
        Self { title: m.title, tagline: m.tagline, url: m.url, poster: m.poster }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieSummaries {
    pub movies: Vec<MovieSummary>,
}

#[derive(Clone, Debug, Default)]
pub struct Sidebar {
    pub genres: Vec<genre::Model>,
    pub years: Vec<i16>,
    pub categories: Vec<category::Model>,
    pub latest: Vec<movie::Model>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewNode {
    pub review: review::Model,
    pub replies: Vec<ReviewNode>,
}

#[derive(Clone, Debug)]
pub struct MovieDetail {
    pub movie: movie::Model,
    pub category: Option<category::Model>,
    pub genres: Vec<genre::Model>,
    pub directors: Vec<actor::Model>,
    pub actors: Vec<actor::Model>,
    pub reviews: Vec<ReviewNode>,
    pub stars: Vec<star::Model>,
    /// The caller's earlier vote, as text.
    pub user_stars: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ActorDetail {
    pub actor: actor::Model,
    pub movies: Vec<movie::Model>,
}
