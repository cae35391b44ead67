//! The module contains the `Ad` struct, its storage entity and the field
//! rules every ad must satisfy.
//!
//! An ad is a listing of an item a user offers for exchange. It is owned by
//! the user who created it; only that user may change or delete it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{normalize_image_url, require_max_chars, require_min_chars},
};

pub(crate) const TITLE_MIN_CHARS: usize = 3;
pub(crate) const TITLE_MAX_CHARS: usize = 255;
pub(crate) const DESCRIPTION_MIN_CHARS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdCategory {
    Electronics,
    Clothing,
    Books,
    Furniture,
    Toys,
    Vehicles,
    Other,
}

impl AdCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Electronics => "electronics",
            Self::Clothing => "clothing",
            Self::Books => "books",
            Self::Furniture => "furniture",
            Self::Toys => "toys",
            Self::Vehicles => "vehicles",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for AdCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "electronics" => Ok(Self::Electronics),
            "clothing" => Ok(Self::Clothing),
            "books" => Ok(Self::Books),
            "furniture" => Ok(Self::Furniture),
            "toys" => Ok(Self::Toys),
            "vehicles" => Ok(Self::Vehicles),
            "other" => Ok(Self::Other),
            other => Err(EngineError::Validation(format!(
                "invalid ad category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdCondition {
    New,
    Used,
}

impl AdCondition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Used => "used",
        }
    }
}

impl TryFrom<&str> for AdCondition {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "new" => Ok(Self::New),
            "used" => Ok(Self::Used),
            other => Err(EngineError::Validation(format!(
                "invalid ad condition: {other}"
            ))),
        }
    }
}

/// Input for a new ad.
#[derive(Clone, Debug)]
pub struct AdDraft {
    pub title: String,
    pub description: String,
    pub category: AdCategory,
    pub condition: AdCondition,
    pub image_url: Option<String>,
}

/// Partial update of an ad. `None` leaves a field untouched; a blank
/// `image_url` removes the image.
#[derive(Clone, Debug, Default)]
pub struct AdChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<AdCategory>,
    pub condition: Option<AdCondition>,
    pub image_url: Option<String>,
}

impl AdChanges {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.condition.is_none()
            && self.image_url.is_none()
    }
}

/// A listing owned by `owner`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    /// Username of the owner.
    pub owner: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: AdCategory,
    pub condition: AdCondition,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn validate_title(value: &str) -> ResultEngine<String> {
    let title = require_min_chars(value, TITLE_MIN_CHARS, "title")?;
    require_max_chars(&title, TITLE_MAX_CHARS, "title")?;
    Ok(title)
}

pub(crate) fn validate_description(value: &str) -> ResultEngine<String> {
    require_min_chars(value, DESCRIPTION_MIN_CHARS, "description")
}

impl Ad {
    /// Build a validated ad for `owner`. Title and description are trimmed.
    pub fn new(owner: &str, draft: AdDraft, now: DateTime<Utc>) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            title: validate_title(&draft.title)?,
            description: validate_description(&draft.description)?,
            image_url: normalize_image_url(draft.image_url.as_deref())?,
            category: draft.category,
            condition: draft.condition,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner == user_id
    }

    /// Lowercased title and description, matched by free-text search.
    ///
    /// SQLite `LOWER` and `LIKE` fold ASCII only, so folding happens here.
    pub(crate) fn search_text(&self) -> String {
        format!("{}\n{}", self.title, self.description).to_lowercase()
    }

    /// Apply `changes`, validating every field that is being mutated.
    ///
    /// On error the ad is left untouched.
    pub fn apply(&mut self, changes: AdChanges, now: DateTime<Utc>) -> ResultEngine<()> {
        let title = changes.title.as_deref().map(validate_title).transpose()?;
        let description = changes
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let image_url = match changes.image_url.as_deref() {
            Some(raw) => Some(normalize_image_url(Some(raw))?),
            None => None,
        };

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(image_url) = image_url {
            self.image_url = image_url;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(condition) = changes.condition {
            self.condition = condition;
        }
        self.updated_at = now;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: String,
    pub condition: String,
    pub search_text: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Ad> for ActiveModel {
    fn from(value: &Ad) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.owner.clone()),
            title: ActiveValue::Set(value.title.clone()),
            description: ActiveValue::Set(value.description.clone()),
            image_url: ActiveValue::Set(value.image_url.clone()),
            category: ActiveValue::Set(value.category.as_str().to_string()),
            condition: ActiveValue::Set(value.condition.as_str().to_string()),
            search_text: ActiveValue::Set(value.search_text()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Ad {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("ad not exists".to_string()))?,
            owner: model.user_id,
            title: model.title,
            description: model.description,
            image_url: model.image_url,
            category: AdCategory::try_from(model.category.as_str())?,
            condition: AdCondition::try_from(model.condition.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn draft() -> AdDraft {
        AdDraft {
            title: "  Bike  ".to_string(),
            description: "A red city bike, barely used".to_string(),
            category: AdCategory::Vehicles,
            condition: AdCondition::Used,
            image_url: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn new_trims_fields() {
        let ad = Ad::new("alice", draft(), now()).unwrap();
        assert_eq!(ad.title, "Bike");
        assert_eq!(ad.owner, "alice");
        assert_eq!(ad.created_at, ad.updated_at);
    }

    #[test]
    #[should_panic(expected = "Validation(\"title must contain at least 3 characters\")")]
    fn fail_short_title() {
        let mut draft = draft();
        draft.title = " ab ".to_string();
        Ad::new("alice", draft, now()).unwrap();
    }

    #[test]
    #[should_panic(expected = "Validation(\"description must contain at least 10 characters\")")]
    fn fail_short_description() {
        let mut draft = draft();
        draft.description = "too short".to_string();
        Ad::new("alice", draft, now()).unwrap();
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let mut ad = Ad::new("alice", draft(), now()).unwrap();
        let before = ad.clone();
        let changes = AdChanges {
            title: Some("Road bike".to_string()),
            description: Some("short".to_string()),
            ..Default::default()
        };
        assert!(ad.apply(changes, now()).is_err());
        assert_eq!(ad, before);
    }

    #[test]
    fn apply_blank_image_clears_it() {
        let mut draft = draft();
        draft.image_url = Some("https://img.example.com/bike.png".to_string());
        let mut ad = Ad::new("alice", draft, now()).unwrap();

        let changes = AdChanges {
            image_url: Some(String::new()),
            condition: Some(AdCondition::New),
            ..Default::default()
        };
        ad.apply(changes, now()).unwrap();
        assert_eq!(ad.image_url, None);
        assert_eq!(ad.condition, AdCondition::New);
    }

    #[test]
    fn search_text_folds_unicode_case() {
        let mut draft = draft();
        draft.title = "Электрочайник".to_string();
        draft.description = "Почти НОВЫЙ, 1.7 L".to_string();
        let ad = Ad::new("alice", draft, now()).unwrap();
        assert_eq!(ad.search_text(), "электрочайник\nпочти новый, 1.7 l");
    }

    #[test]
    fn category_round_trips_through_storage_name() {
        for category in [
            AdCategory::Electronics,
            AdCategory::Clothing,
            AdCategory::Books,
            AdCategory::Furniture,
            AdCategory::Toys,
            AdCategory::Vehicles,
            AdCategory::Other,
        ] {
            assert_eq!(AdCategory::try_from(category.as_str()).unwrap(), category);
        }
        assert!(AdCategory::try_from("weapons").is_err());
    }
}
