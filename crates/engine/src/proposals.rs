//! Exchange proposals.
//!
//! A proposal is a directed offer: the owner of `ad_sender` offers it in
//! exchange for `ad_receiver`. It starts `Pending` and the owner of the
//! receiver ad moves it to one of the terminal states.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::require_max_chars};

pub(crate) const COMMENT_MAX_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// `Accepted` and `Rejected` are final.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl TryFrom<&str> for ProposalStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(EngineError::Validation(format!(
                "invalid proposal status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeProposal {
    pub id: Uuid,
    pub ad_sender_id: Uuid,
    pub ad_receiver_id: Uuid,
    /// Trimmed, empty when the sender left no comment.
    pub comment: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn validate_comment(value: Option<&str>) -> ResultEngine<String> {
    let comment = value.map(str::trim).unwrap_or_default();
    require_max_chars(comment, COMMENT_MAX_CHARS, "comment")?;
    Ok(comment.to_string())
}

impl ExchangeProposal {
    pub fn new(
        ad_sender_id: Uuid,
        ad_receiver_id: Uuid,
        comment: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if ad_sender_id == ad_receiver_id {
            return Err(EngineError::SelfExchange(
                "an ad cannot be exchanged with itself".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            ad_sender_id,
            ad_receiver_id,
            comment: validate_comment(comment)?,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "exchange_proposals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ad_sender_id: String,
    pub ad_receiver_id: String,
    pub comment: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ads::Entity",
        from = "Column::AdSenderId",
        to = "super::ads::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    AdSender,
    #[sea_orm(
        belongs_to = "super::ads::Entity",
        from = "Column::AdReceiverId",
        to = "super::ads::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    AdReceiver,
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExchangeProposal> for ActiveModel {
    fn from(value: &ExchangeProposal) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            ad_sender_id: ActiveValue::Set(value.ad_sender_id.to_string()),
            ad_receiver_id: ActiveValue::Set(value.ad_receiver_id.to_string()),
            comment: ActiveValue::Set(value.comment.clone()),
            status: ActiveValue::Set(value.status.as_str().to_string()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for ExchangeProposal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let parse = |raw: &str| {
            Uuid::parse_str(raw)
                .map_err(|_| EngineError::KeyNotFound("proposal not exists".to_string()))
        };
        Ok(Self {
            id: parse(&model.id)?,
            ad_sender_id: parse(&model.ad_sender_id)?,
            ad_receiver_id: parse(&model.ad_receiver_id)?,
            comment: model.comment,
            status: ProposalStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn new_starts_pending_with_trimmed_comment() {
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let proposal = ExchangeProposal::new(sender, receiver, Some("  deal?  "), now()).unwrap();

        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert_eq!(proposal.comment, "deal?");
        assert_eq!(proposal.ad_sender_id, sender);
        assert_eq!(proposal.ad_receiver_id, receiver);
        assert_eq!(proposal.created_at, proposal.updated_at);
    }

    #[test]
    fn missing_comment_is_empty() {
        let proposal =
            ExchangeProposal::new(Uuid::new_v4(), Uuid::new_v4(), None, now()).unwrap();
        assert_eq!(proposal.comment, "");
    }

    #[test]
    fn same_ad_on_both_sides_fails() {
        let ad = Uuid::new_v4();
        let err = ExchangeProposal::new(ad, ad, None, now()).unwrap_err();
        assert!(matches!(err, EngineError::SelfExchange(_)));
    }

    #[test]
    fn comment_length_limit() {
        let ok = "ы".repeat(COMMENT_MAX_CHARS);
        assert!(ExchangeProposal::new(Uuid::new_v4(), Uuid::new_v4(), Some(&ok), now()).is_ok());

        let too_long = "x".repeat(COMMENT_MAX_CHARS + 1);
        let err = ExchangeProposal::new(Uuid::new_v4(), Uuid::new_v4(), Some(&too_long), now())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation("comment must contain at most 500 characters".to_string())
        );
    }

    #[test]
    fn terminal_states() {
        assert!(!ProposalStatus::Pending.is_terminal());
        assert!(ProposalStatus::Accepted.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
        assert!(ProposalStatus::try_from("cancelled").is_err());
    }
}
