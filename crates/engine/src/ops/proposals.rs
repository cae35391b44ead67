use chrono::Utc;
use sea_orm::{
    DbErr, JoinType, QueryFilter, QueryOrder, QuerySelect, QueryTrait, RelationTrait, Select,
    SqlErr, TransactionTrait, prelude::*,
    sea_query::{Expr, SelectStatement},
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AdCategory, EngineError, ExchangeProposal, ProposalStatus, ResultEngine, ads, proposals,
};

use super::{Engine, ProposalDetail, ProposalOrdering, ProposalQuery, UserProposals, with_tx};

trait ApplyProposalFilters: QueryFilter + Sized {
    fn apply_proposal_filters(self, query: &ProposalQuery) -> Self;
}

impl<T> ApplyProposalFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_proposal_filters(mut self, query: &ProposalQuery) -> Self {
        if let Some(status) = query.status {
            self = self.filter(proposals::Column::Status.eq(status.as_str()));
        }
        if let Some(after) = query.created_after {
            self = self.filter(proposals::Column::CreatedAt.gte(after));
        }
        if let Some(before) = query.created_before {
            self = self.filter(proposals::Column::CreatedAt.lte(before));
        }
        if let Some(category) = query.ad_sender_category {
            self = self.filter(proposals::Column::AdSenderId.in_subquery(ads_in(category)));
        }
        if let Some(category) = query.ad_receiver_category {
            self = self.filter(proposals::Column::AdReceiverId.in_subquery(ads_in(category)));
        }
        self
    }
}

/// Ids of the ads in `category`.
fn ads_in(category: AdCategory) -> SelectStatement {
    ads::Entity::find()
        .select_only()
        .column(ads::Column::Id)
        .filter(ads::Column::Category.eq(category.as_str()))
        .into_query()
}

fn order_proposals(
    select: Select<proposals::Entity>,
    ordering: ProposalOrdering,
) -> Select<proposals::Entity> {
    let select = match ordering {
        ProposalOrdering::Newest => select,
        ProposalOrdering::Oldest => select.order_by_asc(proposals::Column::CreatedAt),
        ProposalOrdering::Status => select.order_by_asc(proposals::Column::Status),
        ProposalOrdering::StatusDesc => select.order_by_desc(proposals::Column::Status),
    };
    select
        .order_by_desc(proposals::Column::CreatedAt)
        .order_by_desc(proposals::Column::Id)
}

fn duplicate_proposal() -> EngineError {
    EngineError::DuplicateProposal("you have already sent a proposal for this ad".to_string())
}

/// A concurrent insert of the same pair trips the unique index.
fn map_insert_error(err: DbErr) -> EngineError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_proposal(),
        _ => err.into(),
    }
}

impl Engine {
    /// Offer `ad_sender_id` in exchange for `ad_receiver_id`.
    ///
    /// The preconditions are checked in this order: the sender ad belongs to
    /// `user_id`, the receiver ad does not, and no proposal exists yet for
    /// the pair.
    pub async fn create_proposal(
        &self,
        user_id: &str,
        ad_sender_id: Uuid,
        ad_receiver_id: Uuid,
        comment: Option<&str>,
    ) -> ResultEngine<ExchangeProposal> {
        with_tx!(self, |db_tx| {
            let ad_sender = self.require_ad(&db_tx, ad_sender_id).await?;
            let ad_receiver = self.require_ad(&db_tx, ad_receiver_id).await?;

            if !ad_sender.is_owned_by(user_id) {
                return Err(EngineError::Validation(
                    "you can only offer your own ads".to_string(),
                ));
            }
            if ad_receiver.is_owned_by(user_id) {
                return Err(EngineError::SelfExchange(
                    "you cannot exchange with your own ads".to_string(),
                ));
            }

            let exists = proposals::Entity::find()
                .filter(proposals::Column::AdSenderId.eq(ad_sender_id.to_string()))
                .filter(proposals::Column::AdReceiverId.eq(ad_receiver_id.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                warn!(
                    user = user_id,
                    ad_sender = %ad_sender_id,
                    ad_receiver = %ad_receiver_id,
                    "duplicate proposal rejected"
                );
                return Err(duplicate_proposal());
            }

            let proposal =
                ExchangeProposal::new(ad_sender_id, ad_receiver_id, comment, Utc::now())?;
            let model: proposals::ActiveModel = (&proposal).into();
            model.insert(&db_tx).await.map_err(map_insert_error)?;

            info!(
                proposal_id = %proposal.id,
                user = user_id,
                ad_sender = %ad_sender_id,
                ad_receiver = %ad_receiver_id,
                "proposal created"
            );
            Ok(proposal)
        })
    }

    /// Accept or reject a pending proposal.
    ///
    /// Authorization: only the owner of the receiver ad. Accepting rejects
    /// every other pending proposal on the same receiver ad.
    pub async fn update_proposal_status(
        &self,
        proposal_id: Uuid,
        user_id: &str,
        new_status: ProposalStatus,
    ) -> ResultEngine<ExchangeProposal> {
        with_tx!(self, |db_tx| {
            let mut proposal = self.require_proposal(&db_tx, proposal_id).await?;

            // Serializes decisions on the same receiver ad where row locks exist.
            let receiver = ads::Entity::find_by_id(proposal.ad_receiver_id.to_string())
                .lock_exclusive()
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("ad not exists".to_string()))?;
            if receiver.user_id != user_id {
                return Err(EngineError::Forbidden(
                    "only the receiver can update proposal status".to_string(),
                ));
            }
            if !new_status.is_terminal() {
                return Err(EngineError::Validation(format!(
                    "invalid status: {}",
                    new_status.as_str()
                )));
            }
            if proposal.status.is_terminal() {
                return Err(EngineError::InvalidTransition(format!(
                    "proposal already {}",
                    proposal.status.as_str()
                )));
            }

            let now = Utc::now();
            let updated = proposals::Entity::update_many()
                .col_expr(proposals::Column::Status, Expr::value(new_status.as_str()))
                .col_expr(proposals::Column::UpdatedAt, Expr::value(now))
                .filter(proposals::Column::Id.eq(proposal_id.to_string()))
                .filter(proposals::Column::Status.eq(ProposalStatus::Pending.as_str()))
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Err(EngineError::InvalidTransition(
                    "proposal is no longer pending".to_string(),
                ));
            }

            if new_status == ProposalStatus::Accepted {
                let rejected = proposals::Entity::update_many()
                    .col_expr(
                        proposals::Column::Status,
                        Expr::value(ProposalStatus::Rejected.as_str()),
                    )
                    .col_expr(proposals::Column::UpdatedAt, Expr::value(now))
                    .filter(proposals::Column::AdReceiverId.eq(receiver.id.clone()))
                    .filter(proposals::Column::Status.eq(ProposalStatus::Pending.as_str()))
                    .filter(proposals::Column::Id.ne(proposal_id.to_string()))
                    .exec(&db_tx)
                    .await?;
                info!(
                    ad_receiver = %receiver.id,
                    count = rejected.rows_affected,
                    "competing proposals rejected"
                );
            }

            proposal.status = new_status;
            proposal.updated_at = now;
            info!(
                proposal_id = %proposal_id,
                user = user_id,
                status = new_status.as_str(),
                "proposal status updated"
            );
            Ok(proposal)
        })
    }

    /// Return a proposal with both ads.
    ///
    /// Only the owners of the two ads can see it; for anyone else it does
    /// not exist.
    pub async fn proposal(&self, proposal_id: Uuid, user_id: &str) -> ResultEngine<ProposalDetail> {
        with_tx!(self, |db_tx| {
            let model = proposals::Entity::find_by_id(proposal_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("proposal not exists".to_string()))?;
            let detail = self
                .proposal_details(&db_tx, vec![model])
                .await?
                .pop()
                .ok_or_else(|| EngineError::KeyNotFound("proposal not exists".to_string()))?;
            if !detail.ad_sender.is_owned_by(user_id) && !detail.ad_receiver.is_owned_by(user_id)
            {
                return Err(EngineError::KeyNotFound("proposal not exists".to_string()));
            }
            Ok(detail)
        })
    }

    /// List the proposals the user sent (offering one of their ads) and
    /// received (on one of their ads), newest first unless `query.ordering`
    /// says otherwise.
    pub async fn user_proposals(
        &self,
        user_id: &str,
        query: &ProposalQuery,
    ) -> ResultEngine<UserProposals> {
        with_tx!(self, |db_tx| {
            let mut out = UserProposals::default();

            if query.kind.includes_sent() {
                let select = proposals::Entity::find()
                    .join(JoinType::InnerJoin, proposals::Relation::AdSender.def())
                    .filter(ads::Column::UserId.eq(user_id.to_string()))
                    .apply_proposal_filters(query);
                let models = order_proposals(select, query.ordering).all(&db_tx).await?;
                out.sent = self.proposal_details(&db_tx, models).await?;
            }
            if query.kind.includes_received() {
                let select = proposals::Entity::find()
                    .join(JoinType::InnerJoin, proposals::Relation::AdReceiver.def())
                    .filter(ads::Column::UserId.eq(user_id.to_string()))
                    .apply_proposal_filters(query);
                let models = order_proposals(select, query.ordering).all(&db_tx).await?;
                out.received = self.proposal_details(&db_tx, models).await?;
            }

            Ok(out)
        })
    }
}
