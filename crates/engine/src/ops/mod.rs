use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::{Ad, AdCategory, AdCondition, ExchangeProposal, ProposalStatus, ResultEngine};

mod access;
mod ads;
mod proposals;
mod users;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// Sort order of `Engine::search_ads`. Ties fall back to newest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdOrdering {
    #[default]
    Newest,
    Oldest,
    Title,
    TitleDesc,
}

/// Filters for `Engine::search_ads`. Every filter that is set must match.
///
/// `created_after` and `created_before` are both inclusive.
#[derive(Clone, Debug, Default)]
pub struct AdSearch {
    /// Case-insensitive substring of the title or the description.
    pub query: Option<String>,
    pub category: Option<AdCategory>,
    /// Any of these categories; empty means no restriction.
    pub categories: Vec<AdCategory>,
    pub condition: Option<AdCondition>,
    /// Any of these conditions; empty means no restriction.
    pub conditions: Vec<AdCondition>,
    /// Hide the ads of this user (the caller's own ads when browsing).
    pub exclude_user: Option<String>,
    /// Only the ads of this user.
    pub owner: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub ordering: AdOrdering,
}

/// An ad with the number of proposals it takes part in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdDetail {
    pub ad: Ad,
    /// Proposals where the ad is requested.
    pub received_proposals: u64,
    /// Proposals where the ad is offered.
    pub sent_proposals: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    #[default]
    All,
    Sent,
    Received,
}

impl ProposalKind {
    fn includes_sent(self) -> bool {
        matches!(self, Self::All | Self::Sent)
    }

    fn includes_received(self) -> bool {
        matches!(self, Self::All | Self::Received)
    }
}

/// Sort order of `Engine::user_proposals`. Status sorts by its stored name;
/// ties fall back to newest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProposalOrdering {
    #[default]
    Newest,
    Oldest,
    Status,
    StatusDesc,
}

/// Filters for `Engine::user_proposals`.
///
/// `created_after` and `created_before` are both inclusive.
#[derive(Clone, Debug, Default)]
pub struct ProposalQuery {
    pub kind: ProposalKind,
    pub status: Option<ProposalStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Category of the offered ad.
    pub ad_sender_category: Option<AdCategory>,
    /// Category of the requested ad.
    pub ad_receiver_category: Option<AdCategory>,
    pub ordering: ProposalOrdering,
}

/// A proposal together with both ads it links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDetail {
    pub proposal: ExchangeProposal,
    pub ad_sender: Ad,
    pub ad_receiver: Ad,
}

/// Proposals split by direction, newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProposals {
    pub sent: Vec<ProposalDetail>,
    pub received: Vec<ProposalDetail>,
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
