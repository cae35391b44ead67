//! Ad API endpoints

use api_types::{
    ad::{
        AdDetailView, AdNew, AdOrdering, AdSearch, AdUpdate, AdView, AdsResponse, Category,
        Condition,
    },
    proposal::ProposalsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{Ad, AdCategory, AdChanges, AdCondition, AdDraft, EngineError, User};
use uuid::Uuid;

use crate::{ServerError, proposals::proposals_response, server::ServerState};

pub(crate) fn category_to_engine(value: Category) -> AdCategory {
    match value {
        Category::Electronics => AdCategory::Electronics,
        Category::Clothing => AdCategory::Clothing,
        Category::Books => AdCategory::Books,
        Category::Furniture => AdCategory::Furniture,
        Category::Toys => AdCategory::Toys,
        Category::Vehicles => AdCategory::Vehicles,
        Category::Other => AdCategory::Other,
    }
}

fn category_from_engine(value: AdCategory) -> Category {
    match value {
        AdCategory::Electronics => Category::Electronics,
        AdCategory::Clothing => Category::Clothing,
        AdCategory::Books => Category::Books,
        AdCategory::Furniture => Category::Furniture,
        AdCategory::Toys => Category::Toys,
        AdCategory::Vehicles => Category::Vehicles,
        AdCategory::Other => Category::Other,
    }
}

fn condition_to_engine(value: Condition) -> AdCondition {
    match value {
        Condition::New => AdCondition::New,
        Condition::Used => AdCondition::Used,
    }
}

fn condition_from_engine(value: AdCondition) -> Condition {
    match value {
        AdCondition::New => Condition::New,
        AdCondition::Used => Condition::Used,
    }
}

fn ordering_to_engine(value: AdOrdering) -> engine::AdOrdering {
    match value {
        AdOrdering::CreatedAtDesc => engine::AdOrdering::Newest,
        AdOrdering::CreatedAt => engine::AdOrdering::Oldest,
        AdOrdering::Title => engine::AdOrdering::Title,
        AdOrdering::TitleDesc => engine::AdOrdering::TitleDesc,
    }
}

/// Split a comma separated `__in` value, parsing every non-blank item.
fn parse_list<T>(
    raw: Option<&str>,
    parse: impl Fn(&str) -> Result<T, EngineError>,
) -> Result<Vec<T>, ServerError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse(item).map_err(ServerError::from))
        .collect()
}

pub(crate) fn ad_view(ad: Ad) -> AdView {
    AdView {
        id: ad.id,
        owner: ad.owner,
        title: ad.title,
        description: ad.description,
        image_url: ad.image_url,
        category: category_from_engine(ad.category),
        condition: condition_from_engine(ad.condition),
        created_at: ad.created_at,
        updated_at: ad.updated_at,
    }
}

/// Handle requests for browsing ads, newest first
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<AdSearch>,
) -> Result<Json<AdsResponse>, ServerError> {
    let categories = parse_list(query.category_in.as_deref(), |c| AdCategory::try_from(c))?;
    let conditions = parse_list(query.condition_in.as_deref(), |c| AdCondition::try_from(c))?;
    let ads = state
        .engine
        .search_ads(&engine::AdSearch {
            query: query.search,
            category: query.category.map(category_to_engine),
            categories,
            condition: query.condition.map(condition_to_engine),
            conditions,
            exclude_user: query.exclude_user,
            owner: query.user,
            created_after: query.created_after,
            created_before: query.created_before,
            ordering: query.ordering.map(ordering_to_engine).unwrap_or_default(),
        })
        .await?
        .into_iter()
        .map(ad_view)
        .collect();

    Ok(Json(AdsResponse { ads }))
}

/// Handle requests for creating new `Ad`
pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<AdNew>,
) -> Result<(StatusCode, Json<AdView>), ServerError> {
    let ad = state
        .engine
        .new_ad(
            &user.username,
            AdDraft {
                title: payload.title,
                description: payload.description,
                category: category_to_engine(payload.category),
                condition: condition_to_engine(payload.condition),
                image_url: payload.image_url,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ad_view(ad))))
}

pub async fn detail(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdDetailView>, ServerError> {
    let detail = state.engine.ad_detail(id).await?;
    Ok(Json(AdDetailView {
        ad: ad_view(detail.ad),
        received_proposals: detail.received_proposals,
        sent_proposals: detail.sent_proposals,
    }))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdUpdate>,
) -> Result<Json<AdView>, ServerError> {
    let ad = state
        .engine
        .update_ad(
            id,
            &user.username,
            AdChanges {
                title: payload.title,
                description: payload.description,
                category: payload.category.map(category_to_engine),
                condition: payload.condition.map(condition_to_engine),
                image_url: payload.image_url,
            },
        )
        .await?;

    Ok(Json(ad_view(ad)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_ad(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Proposals the ad takes part in (owner only)
pub async fn proposals(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalsResponse>, ServerError> {
    let lists = state.engine.ad_proposals(id, &user.username).await?;
    Ok(Json(proposals_response(lists)))
}
