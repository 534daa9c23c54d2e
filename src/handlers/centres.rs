use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::{parse_param, success};
use crate::errors::AppError;
use crate::models::{LocalityFilter, SearchFilters};
use crate::services::{search, store};
use crate::state::AppState;

/// Query string of `GET /centres`. `testType` and `location` are the
/// names the public site uses for the same filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentreQuery {
    #[serde(alias = "testType")]
    pub service_type: Option<String>,
    #[serde(alias = "location")]
    pub state: Option<String>,
    pub lga: Option<String>,
    pub min_rating: Option<String>,
    pub page: Option<String>,
    #[serde(alias = "pageSize")]
    pub limit: Option<String>,
}

impl CentreQuery {
    fn filters(&self) -> Result<SearchFilters, AppError> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        Ok(SearchFilters {
            service_type: non_empty(&self.service_type),
            locality: LocalityFilter {
                state: non_empty(&self.state),
                lga: non_empty(&self.lga),
            },
            min_rating: parse_param("minRating", self.min_rating.as_deref())?,
        })
    }
}

pub async fn list_centres(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CentreQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filters = query.filters()?;
    let page: i64 = parse_param("page", query.page.as_deref())?.unwrap_or(1);
    let page_size: i64 = parse_param("limit", query.limit.as_deref())?
        .unwrap_or(state.config.default_page_size);
    if page_size > state.config.max_page_size {
        return Err(AppError::InvalidArgument(format!(
            "limit must not exceed {}, got {page_size}",
            state.config.max_page_size
        )));
    }

    let result = store::run(&state, "search_centres", move |conn| {
        search::search(conn, &filters, page, page_size)
    })
    .await?;

    Ok(success(result))
}

pub async fn get_centre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| AppError::InvalidArgument(format!("centre id must be a number, got {id:?}")))?;

    let centre = store::run(&state, "get_centre", move |conn| search::get_centre(conn, id)).await?;
    Ok(success(centre))
}
