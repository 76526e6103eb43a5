//! Facet filtering over the published catalogue.
//!
//! The year and genre facets combine with OR while at least one of them is
//! unconstrained and with AND once both carry values. The rule lives here as
//! plain data so the catalogue only has to translate it into a query.

use serde::Deserialize;

/// Repeatable `year` / `genre` query parameters, as sent by the browser.
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub year: Vec<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    pub page: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// year IN years OR genre IN genres
    Any,
    /// year IN years AND genre IN genres
    All,
}

impl Combinator {
    pub fn for_lists<Y, G>(years: &[Y], genres: &[G]) -> Self {
        if years.is_empty() || genres.is_empty() { Combinator::Any } else { Combinator::All }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovieFilter {
    pub years: Vec<i16>,
    pub genres: Vec<i32>,
}

impl MovieFilter {
    /// Values that are not integers are skipped.
    pub fn parse(years: &[String], genres: &[String]) -> Self {
        Self { years: parse_all(years), genres: parse_all(genres) }
    }

    pub fn from_params(params: &FilterParams) -> Self {
        Self::parse(&params.year, &params.genre)
    }

    pub fn combinator(&self) -> Combinator {
        Combinator::for_lists(&self.years, &self.genres)
    }
}

fn parse_all<T: std::str::FromStr>(raw: &[String]) -> Vec<T> {
    raw.iter()
        .filter_map(|v| match v.trim().parse() {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                tracing::debug!(value = %v, "ignoring non-numeric filter value");
                None
            }
        })
        .collect()
}

/// `key=v1&key=v2&` with the raw values, for carrying the active filter into
/// pagination links. Empty input gives an empty string.
pub fn query_fragment(key: &str, values: &[String]) -> String {
    values.iter().map(|v| format!("{key}={v}&")).collect()
}
