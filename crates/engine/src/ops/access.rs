use std::collections::HashMap;

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{Ad, EngineError, ExchangeProposal, ResultEngine, ads, proposals, users};

use super::{Engine, ProposalDetail};

impl Engine {
    async fn find_ad_by_id(
        &self,
        db: &DatabaseTransaction,
        ad_id: Uuid,
    ) -> ResultEngine<Option<ads::Model>> {
        ads::Entity::find_by_id(ad_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_ad(&self, db: &DatabaseTransaction, ad_id: Uuid) -> ResultEngine<Ad> {
        let model = self
            .find_ad_by_id(db, ad_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("ad not exists".to_string()))?;
        Ad::try_from(model)
    }

    /// Like `require_ad`, but the ad must belong to `user_id`.
    pub(super) async fn require_ad_owner(
        &self,
        db: &DatabaseTransaction,
        ad_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<Ad> {
        let ad = self.require_ad(db, ad_id).await?;
        if !ad.is_owned_by(user_id) {
            return Err(EngineError::Forbidden(
                "only the owner can modify this ad".to_string(),
            ));
        }
        Ok(ad)
    }

    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(username.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    pub(super) async fn require_proposal(
        &self,
        db: &DatabaseTransaction,
        proposal_id: Uuid,
    ) -> ResultEngine<ExchangeProposal> {
        let model = proposals::Entity::find_by_id(proposal_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("proposal not exists".to_string()))?;
        ExchangeProposal::try_from(model)
    }

    /// Attach both ads to every proposal, keeping the input order.
    ///
    /// The ads are loaded with one query.
    pub(super) async fn proposal_details(
        &self,
        db: &DatabaseTransaction,
        models: Vec<proposals::Model>,
    ) -> ResultEngine<Vec<ProposalDetail>> {
        let proposals = models
            .into_iter()
            .map(ExchangeProposal::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let mut ad_ids: Vec<String> = proposals
            .iter()
            .flat_map(|p| [p.ad_sender_id.to_string(), p.ad_receiver_id.to_string()])
            .collect();
        ad_ids.sort();
        ad_ids.dedup();
        if ad_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ads_by_id: HashMap<Uuid, Ad> = ads::Entity::find()
            .filter(ads::Column::Id.is_in(ad_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| Ad::try_from(model).map(|ad| (ad.id, ad)))
            .collect::<ResultEngine<_>>()?;

        proposals
            .into_iter()
            .map(|proposal| {
                let lookup = |id: Uuid| {
                    ads_by_id
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| EngineError::KeyNotFound("ad not exists".to_string()))
                };
                Ok(ProposalDetail {
                    ad_sender: lookup(proposal.ad_sender_id)?,
                    ad_receiver: lookup(proposal.ad_receiver_id)?,
                    proposal,
                })
            })
            .collect()
    }
}
