use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod user {
    use super::*;

    /// Request body for `POST /auth/register`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Register {
        pub username: String,
        pub email: String,
        pub password: String,
        /// Must repeat `password`.
        pub password2: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProfileUpdate {
        pub email: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        /// Only shown to the user itself.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub email: Option<String>,
        pub first_name: String,
        pub last_name: String,
        pub date_joined: DateTime<Utc>,
        pub ads_count: u64,
    }
}

pub mod ad {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Category {
        Electronics,
        Clothing,
        Books,
        Furniture,
        Toys,
        Vehicles,
        Other,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Condition {
        New,
        Used,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdNew {
        pub title: String,
        pub description: String,
        pub category: Category,
        pub condition: Condition,
        pub image_url: Option<String>,
    }

    /// Partial update; absent fields are left untouched, an empty
    /// `image_url` removes the image.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AdUpdate {
        pub title: Option<String>,
        pub description: Option<String>,
        pub category: Option<Category>,
        pub condition: Option<Condition>,
        pub image_url: Option<String>,
    }

    /// `ordering` values of `GET /ads`; a leading `-` means descending.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum AdOrdering {
        #[serde(rename = "created_at")]
        CreatedAt,
        #[serde(rename = "-created_at")]
        CreatedAtDesc,
        #[serde(rename = "title")]
        Title,
        #[serde(rename = "-title")]
        TitleDesc,
    }

    /// Query string of `GET /ads`. Every filter that is set must match.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AdSearch {
        /// Case-insensitive text searched in title and description.
        pub search: Option<String>,
        pub category: Option<Category>,
        /// Comma separated categories, any of which may match.
        #[serde(rename = "category__in")]
        pub category_in: Option<String>,
        pub condition: Option<Condition>,
        /// Comma separated conditions, any of which may match.
        #[serde(rename = "condition__in")]
        pub condition_in: Option<String>,
        /// Only the ads of this username.
        pub user: Option<String>,
        /// Hide the ads of this username.
        pub exclude_user: Option<String>,
        /// RFC3339, inclusive.
        pub created_after: Option<DateTime<Utc>>,
        /// RFC3339, inclusive.
        pub created_before: Option<DateTime<Utc>>,
        /// Defaults to `-created_at`.
        pub ordering: Option<AdOrdering>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdView {
        pub id: Uuid,
        pub owner: String,
        pub title: String,
        pub description: String,
        pub image_url: Option<String>,
        pub category: Category,
        pub condition: Condition,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdDetailView {
        #[serde(flatten)]
        pub ad: AdView,
        pub received_proposals: u64,
        pub sent_proposals: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AdsResponse {
        pub ads: Vec<AdView>,
    }
}

pub mod proposal {
    use super::*;

    use crate::ad::{AdView, Category};

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Status {
        Pending,
        Accepted,
        Rejected,
    }

    /// Which side of the user's proposals to list.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Kind {
        #[default]
        All,
        Sent,
        Received,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProposalNew {
        /// The caller's ad being offered.
        pub ad_sender_id: Uuid,
        /// The ad being requested.
        pub ad_receiver_id: Uuid,
        pub comment: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatusUpdate {
        pub status: Status,
    }

    /// `ordering` values of `GET /proposals`; a leading `-` means descending.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum ProposalOrdering {
        #[serde(rename = "created_at")]
        CreatedAt,
        #[serde(rename = "-created_at")]
        CreatedAtDesc,
        #[serde(rename = "status")]
        Status,
        #[serde(rename = "-status")]
        StatusDesc,
    }

    /// Query string of `GET /proposals`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProposalList {
        pub kind: Option<Kind>,
        pub status: Option<Status>,
        /// RFC3339, inclusive.
        pub created_after: Option<DateTime<Utc>>,
        /// RFC3339, inclusive.
        pub created_before: Option<DateTime<Utc>>,
        /// Category of the offered ad.
        pub ad_sender_category: Option<Category>,
        /// Category of the requested ad.
        pub ad_receiver_category: Option<Category>,
        /// Defaults to `-created_at`.
        pub ordering: Option<ProposalOrdering>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProposalView {
        pub id: Uuid,
        pub ad_sender: AdView,
        pub ad_receiver: AdView,
        pub comment: String,
        pub status: Status,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProposalsResponse {
        pub sent: Vec<ProposalView>,
        pub received: Vec<ProposalView>,
    }
}
