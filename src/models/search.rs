use serde::{Deserialize, Serialize};

use super::Centre;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalityFilter {
    pub state: Option<String>,
    pub lga: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub service_type: Option<String>,
    #[serde(default)]
    pub locality: LocalityFilter,
    /// `0` means "no rating filter", matching the search page's reset button.
    pub min_rating: Option<f64>,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl SearchFilters {
    pub fn matches_service_type(&self, centre: &Centre) -> bool {
        match active(&self.service_type) {
            None => true,
            Some(wanted) => centre
                .available_services()
                .any(|s| contains_ignore_case(&s.service_type, wanted)),
        }
    }

    pub fn matches_locality(&self, centre: &Centre) -> bool {
        let state_ok = active(&self.locality.state)
            .map_or(true, |s| contains_ignore_case(&centre.locality.state, s));
        let lga_ok = active(&self.locality.lga)
            .map_or(true, |l| contains_ignore_case(&centre.locality.lga, l));
        state_ok && lga_ok
    }

    pub fn matches_rating(&self, centre: &Centre) -> bool {
        match self.min_rating {
            Some(min) if min > 0.0 => centre.average_rating >= min,
            _ => true,
        }
    }

    pub fn matches(&self, centre: &Centre) -> bool {
        centre.is_verified()
            && self.matches_service_type(centre)
            && self.matches_locality(centre)
            && self.matches_rating(centre)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub results: Vec<Centre>,
    pub pagination: Pagination,
}
