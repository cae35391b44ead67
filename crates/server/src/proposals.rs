//! Exchange proposal endpoints.

use api_types::proposal::{
    Kind, ProposalList, ProposalNew, ProposalOrdering, ProposalView, ProposalsResponse, Status,
    StatusUpdate,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{ProposalDetail, ProposalKind, ProposalQuery, ProposalStatus, User, UserProposals};
use uuid::Uuid;

use crate::{
    ServerError,
    ads::{ad_view, category_to_engine},
    server::ServerState,
};

fn status_to_engine(value: Status) -> ProposalStatus {
    match value {
        Status::Pending => ProposalStatus::Pending,
        Status::Accepted => ProposalStatus::Accepted,
        Status::Rejected => ProposalStatus::Rejected,
    }
}

fn status_from_engine(value: ProposalStatus) -> Status {
    match value {
        ProposalStatus::Pending => Status::Pending,
        ProposalStatus::Accepted => Status::Accepted,
        ProposalStatus::Rejected => Status::Rejected,
    }
}

fn kind_to_engine(value: Kind) -> ProposalKind {
    match value {
        Kind::All => ProposalKind::All,
        Kind::Sent => ProposalKind::Sent,
        Kind::Received => ProposalKind::Received,
    }
}

fn ordering_to_engine(value: ProposalOrdering) -> engine::ProposalOrdering {
    match value {
        ProposalOrdering::CreatedAtDesc => engine::ProposalOrdering::Newest,
        ProposalOrdering::CreatedAt => engine::ProposalOrdering::Oldest,
        ProposalOrdering::Status => engine::ProposalOrdering::Status,
        ProposalOrdering::StatusDesc => engine::ProposalOrdering::StatusDesc,
    }
}

fn proposal_view(detail: ProposalDetail) -> ProposalView {
    let ProposalDetail {
        proposal,
        ad_sender,
        ad_receiver,
    } = detail;
    ProposalView {
        id: proposal.id,
        ad_sender: ad_view(ad_sender),
        ad_receiver: ad_view(ad_receiver),
        comment: proposal.comment,
        status: status_from_engine(proposal.status),
        created_at: proposal.created_at,
        updated_at: proposal.updated_at,
    }
}

pub(crate) fn proposals_response(lists: UserProposals) -> ProposalsResponse {
    ProposalsResponse {
        sent: lists.sent.into_iter().map(proposal_view).collect(),
        received: lists.received.into_iter().map(proposal_view).collect(),
    }
}

/// Proposals sent and received by the caller
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Query(query): Query<ProposalList>,
) -> Result<Json<ProposalsResponse>, ServerError> {
    let lists = state
        .engine
        .user_proposals(
            &user.username,
            &ProposalQuery {
                kind: query.kind.map(kind_to_engine).unwrap_or_default(),
                status: query.status.map(status_to_engine),
                created_after: query.created_after,
                created_before: query.created_before,
                ad_sender_category: query.ad_sender_category.map(category_to_engine),
                ad_receiver_category: query.ad_receiver_category.map(category_to_engine),
                ordering: query.ordering.map(ordering_to_engine).unwrap_or_default(),
            },
        )
        .await?;

    Ok(Json(proposals_response(lists)))
}

/// Offer one of the caller's ads for another user's ad
pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<ProposalNew>,
) -> Result<(StatusCode, Json<ProposalView>), ServerError> {
    let proposal = state
        .engine
        .create_proposal(
            &user.username,
            payload.ad_sender_id,
            payload.ad_receiver_id,
            payload.comment.as_deref(),
        )
        .await?;
    let detail = state.engine.proposal(proposal.id, &user.username).await?;

    Ok((StatusCode::CREATED, Json(proposal_view(detail))))
}

pub async fn detail(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalView>, ServerError> {
    let detail = state.engine.proposal(id, &user.username).await?;
    Ok(Json(proposal_view(detail)))
}

/// Accept or reject a proposal received by the caller
pub async fn update_status(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<ProposalView>, ServerError> {
    state
        .engine
        .update_proposal_status(id, &user.username, status_to_engine(payload.status))
        .await?;
    let detail = state.engine.proposal(id, &user.username).await?;

    Ok(Json(proposal_view(detail)))
}
