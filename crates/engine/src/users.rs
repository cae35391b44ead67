//! Users table and account rules.
//!
//! Ads reference their owner by `user_id`, which is the username.
//! Passwords are stored as `sha256$<salt>$<digest>` (hex encoded).

use chrono::{DateTime, Utc};
use rand::RngCore;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{EngineError, ResultEngine, util::normalize_optional_text};

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;
const SALT_BYTES: usize = 16;
const HASH_SCHEME: &str = "sha256";

/// Well-formed hash no password produces, verified in place of a missing
/// user's hash so unknown usernames cost the same as wrong passwords.
pub(crate) const DUMMY_PASSWORD_HASH: &str = concat!(
    "sha256$",
    "00000000000000000000000000000000",
    "$",
    "0000000000000000000000000000000000000000000000000000000000000000"
);

/// Input for `Engine::register`.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Partial profile update; `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// A registered user, without credentials.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: User,
    pub ads_count: u64,
}

pub(crate) fn validate_username(value: &str) -> ResultEngine<String> {
    let username = value.trim();
    if username.is_empty() {
        return Err(EngineError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(EngineError::Validation(format!(
            "username must contain at most {USERNAME_MAX_CHARS} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(EngineError::Validation(
            "username may contain only letters, digits and @/./+/-/_".to_string(),
        ));
    }
    Ok(username.to_string())
}

pub(crate) fn validate_email(value: &str) -> ResultEngine<String> {
    let email = value.trim();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid || email.chars().any(char::is_whitespace) {
        return Err(EngineError::Validation(format!("invalid email: {email}")));
    }
    Ok(email.to_string())
}

/// Password rules applied on registration: at least 8 characters, one digit
/// and one uppercase letter.
pub fn check_password_policy(value: &str) -> Result<(), EngineError> {
    if value.chars().count() < PASSWORD_MIN_CHARS {
        return Err(EngineError::Validation(format!(
            "password must contain at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(EngineError::Validation(
            "password must contain at least one digit".to_string(),
        ));
    }
    if !value.chars().any(char::is_uppercase) {
        return Err(EngineError::Validation(
            "password must contain at least one uppercase letter".to_string(),
        ));
    }
    Ok(())
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

pub(crate) fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{HASH_SCHEME}${}${}",
        hex::encode(salt),
        hex::encode(digest(&salt, password))
    )
}

/// Check `password` against a stored hash. Malformed hashes never match.
pub(crate) fn verify_password(stored: &str, password: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(HASH_SCHEME), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    constant_time_eq::constant_time_eq(&digest(&salt, password), &expected)
}

impl User {
    pub(crate) fn from_new(new_user: &NewUser, now: DateTime<Utc>) -> ResultEngine<Self> {
        check_password_policy(&new_user.password)?;
        Ok(Self {
            username: validate_username(&new_user.username)?,
            email: validate_email(&new_user.email)?,
            first_name: normalize_optional_text(new_user.first_name.as_deref())
                .unwrap_or_default(),
            last_name: normalize_optional_text(new_user.last_name.as_deref()).unwrap_or_default(),
            date_joined: now,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ads::Entity")]
    Ads,
}

impl Related<super::ads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ads.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            date_joined: model.date_joined,
        }
    }
}

impl ActiveModel {
    pub(crate) fn from_user(user: &User, password_hash: String) -> Self {
        Self {
            username: ActiveValue::Set(user.username.clone()),
            email: ActiveValue::Set(user.email.clone()),
            password: ActiveValue::Set(password_hash),
            first_name: ActiveValue::Set(user.first_name.clone()),
            last_name: ActiveValue::Set(user.last_name.clone()),
            date_joined: ActiveValue::Set(user.date_joined),
        }
    }
}
