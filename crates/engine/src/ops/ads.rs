use chrono::Utc;
use sea_orm::{
    Condition, PaginatorTrait, QueryFilter, QueryOrder, Select, TransactionTrait, prelude::*,
    sea_query::{Expr, LikeExpr},
};
use tracing::info;
use uuid::Uuid;

use crate::{Ad, AdChanges, AdDraft, EngineError, ResultEngine, ads, proposals};

use super::{AdDetail, AdOrdering, AdSearch, Engine, UserProposals, with_tx};

trait ApplyAdFilters: QueryFilter + Sized {
    fn apply_ad_filters(self, search: &AdSearch) -> Self;
}

/// Lowercase the query and escape `LIKE` wildcards so it is matched
/// literally against `search_text`.
fn like_pattern(query: &str) -> LikeExpr {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

impl<T> ApplyAdFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_ad_filters(mut self, search: &AdSearch) -> Self {
        if let Some(query) = search.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            self = self.filter(
                Expr::col((ads::Entity, ads::Column::SearchText)).like(like_pattern(query)),
            );
        }
        if let Some(category) = search.category {
            self = self.filter(ads::Column::Category.eq(category.as_str()));
        }
        if !search.categories.is_empty() {
            self = self.filter(
                ads::Column::Category.is_in(search.categories.iter().map(|c| c.as_str())),
            );
        }
        if let Some(condition) = search.condition {
            self = self.filter(ads::Column::Condition.eq(condition.as_str()));
        }
        if !search.conditions.is_empty() {
            self = self.filter(
                ads::Column::Condition.is_in(search.conditions.iter().map(|c| c.as_str())),
            );
        }
        if let Some(user) = &search.exclude_user {
            self = self.filter(ads::Column::UserId.ne(user.clone()));
        }
        if let Some(owner) = &search.owner {
            self = self.filter(ads::Column::UserId.eq(owner.clone()));
        }
        if let Some(after) = search.created_after {
            self = self.filter(ads::Column::CreatedAt.gte(after));
        }
        if let Some(before) = search.created_before {
            self = self.filter(ads::Column::CreatedAt.lte(before));
        }
        self
    }
}

fn order_ads(select: Select<ads::Entity>, ordering: AdOrdering) -> Select<ads::Entity> {
    let select = match ordering {
        AdOrdering::Newest => select,
        AdOrdering::Oldest => select.order_by_asc(ads::Column::CreatedAt),
        AdOrdering::Title => select.order_by_asc(ads::Column::Title),
        AdOrdering::TitleDesc => select.order_by_desc(ads::Column::Title),
    };
    select
        .order_by_desc(ads::Column::CreatedAt)
        .order_by_desc(ads::Column::Id)
}

impl Engine {
    /// Publish a new ad owned by `user_id`.
    ///
    /// Every field is validated before the database is touched.
    pub async fn new_ad(&self, user_id: &str, draft: AdDraft) -> ResultEngine<Ad> {
        let ad = Ad::new(user_id, draft, Utc::now())?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let model: ads::ActiveModel = (&ad).into();
            model.insert(&db_tx).await?;

            info!(ad_id = %ad.id, user = user_id, "ad created");
            Ok(ad)
        })
    }

    /// Return an ad with the number of proposals it receives and sends.
    pub async fn ad_detail(&self, ad_id: Uuid) -> ResultEngine<AdDetail> {
        with_tx!(self, |db_tx| {
            let ad = self.require_ad(&db_tx, ad_id).await?;
            let received_proposals = proposals::Entity::find()
                .filter(proposals::Column::AdReceiverId.eq(ad_id.to_string()))
                .count(&db_tx)
                .await?;
            let sent_proposals = proposals::Entity::find()
                .filter(proposals::Column::AdSenderId.eq(ad_id.to_string()))
                .count(&db_tx)
                .await?;
            Ok(AdDetail {
                ad,
                received_proposals,
                sent_proposals,
            })
        })
    }

    /// Update the fields set in `changes`. Without changes the ad is returned
    /// as stored, `updated_at` included.
    ///
    /// Authorization: only the owner.
    pub async fn update_ad(
        &self,
        ad_id: Uuid,
        user_id: &str,
        changes: AdChanges,
    ) -> ResultEngine<Ad> {
        with_tx!(self, |db_tx| {
            let mut ad = self.require_ad_owner(&db_tx, ad_id, user_id).await?;
            if changes.is_empty() {
                return Ok(ad);
            }
            ad.apply(changes, Utc::now())?;
            let model: ads::ActiveModel = (&ad).into();
            model.update(&db_tx).await?;

            info!(ad_id = %ad.id, user = user_id, "ad updated");
            Ok(ad)
        })
    }

    /// Delete an ad together with every proposal it takes part in.
    ///
    /// Authorization: only the owner.
    pub async fn delete_ad(&self, ad_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_ad_owner(&db_tx, ad_id, user_id).await?;
            let removed = proposals::Entity::delete_many()
                .filter(
                    Condition::any()
                        .add(proposals::Column::AdSenderId.eq(ad_id.to_string()))
                        .add(proposals::Column::AdReceiverId.eq(ad_id.to_string())),
                )
                .exec(&db_tx)
                .await?;
            ads::Entity::delete_by_id(ad_id.to_string())
                .exec(&db_tx)
                .await?;

            info!(
                ad_id = %ad_id,
                user = user_id,
                proposals = removed.rows_affected,
                "ad deleted"
            );
            Ok(())
        })
    }

    /// List the ads matching `search` in the requested order.
    pub async fn search_ads(&self, search: &AdSearch) -> ResultEngine<Vec<Ad>> {
        with_tx!(self, |db_tx| {
            let models = order_ads(ads::Entity::find().apply_ad_filters(search), search.ordering)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Ad::try_from).collect()
        })
    }

    /// Every proposal the ad takes part in: `received` where it is requested,
    /// `sent` where it is offered.
    ///
    /// Authorization: only the owner.
    pub async fn ad_proposals(&self, ad_id: Uuid, user_id: &str) -> ResultEngine<UserProposals> {
        with_tx!(self, |db_tx| {
            let ad = self.require_ad(&db_tx, ad_id).await?;
            if !ad.is_owned_by(user_id) {
                return Err(EngineError::Forbidden(
                    "only the owner can list the proposals of this ad".to_string(),
                ));
            }

            let received = proposals::Entity::find()
                .filter(proposals::Column::AdReceiverId.eq(ad_id.to_string()))
                .order_by_desc(proposals::Column::CreatedAt)
                .order_by_desc(proposals::Column::Id)
                .all(&db_tx)
                .await?;
            let sent = proposals::Entity::find()
                .filter(proposals::Column::AdSenderId.eq(ad_id.to_string()))
                .order_by_desc(proposals::Column::CreatedAt)
                .order_by_desc(proposals::Column::Id)
                .all(&db_tx)
                .await?;

            Ok(UserProposals {
                sent: self.proposal_details(&db_tx, sent).await?,
                received: self.proposal_details(&db_tx, received).await?,
            })
        })
    }
}

