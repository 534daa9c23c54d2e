use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Centre, CentreStatus, Pagination, SearchFilters, SearchResult};

/// Pure filtering and paging over an already-loaded centre list.
/// The result is ordered by centre id regardless of input order.
pub fn search_centres(
    centres: Vec<Centre>,
    filters: &SearchFilters,
    page: i64,
    page_size: i64,
) -> Result<SearchResult, AppError> {
    if page < 1 {
        return Err(AppError::InvalidArgument(format!(
            "page must be a positive integer, got {page}"
        )));
    }
    if page_size < 1 {
        return Err(AppError::InvalidArgument(format!(
            "pageSize must be a positive integer, got {page_size}"
        )));
    }
    if let Some(min) = filters.min_rating {
        if !(0.0..=5.0).contains(&min) {
            return Err(AppError::InvalidArgument(format!(
                "minRating must be between 0 and 5, got {min}"
            )));
        }
    }

    let mut matches: Vec<Centre> = centres.into_iter().filter(|c| filters.matches(c)).collect();
    matches.sort_by_key(|c| c.id);

    let total = matches.len() as i64;
    let total_pages = if total == 0 { 0 } else { (total - 1) / page_size + 1 };
    let start = (page - 1).saturating_mul(page_size);

    let results = if start >= total {
        vec![]
    } else {
        matches
            .into_iter()
            .skip(start as usize)
            .take(page_size as usize)
            .collect()
    };

    Ok(SearchResult {
        results,
        pagination: Pagination {
            page,
            page_size,
            total,
            total_pages,
        },
    })
}

pub fn search(
    conn: &Connection,
    filters: &SearchFilters,
    page: i64,
    page_size: i64,
) -> Result<SearchResult, AppError> {
    let centres = queries::list_centres(conn, Some(CentreStatus::Verified))?;
    let result = search_centres(centres, filters, page, page_size)?;

    tracing::debug!(
        service_type = ?filters.service_type,
        state = ?filters.locality.state,
        lga = ?filters.locality.lga,
        min_rating = ?filters.min_rating,
        page,
        total = result.pagination.total,
        "centre search"
    );
    Ok(result)
}

pub fn get_centre(conn: &Connection, id: i64) -> Result<Centre, AppError> {
    queries::get_centre(conn, id)?.ok_or_else(|| AppError::NotFound(format!("centre {id}")))
}
