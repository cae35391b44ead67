//! Barter engine.
//!
//! The engine owns the relational model of the platform (users, ads and
//! exchange proposals) and every business rule applied to it. Callers hand in
//! the acting username, which the engine trusts and checks ownership against.

pub use ads::{Ad, AdCategory, AdChanges, AdCondition, AdDraft};
pub use error::EngineError;
pub use ops::{
    AdDetail, AdOrdering, AdSearch, Engine, EngineBuilder, ProposalDetail, ProposalKind,
    ProposalOrdering, ProposalQuery, UserProposals,
};
pub use proposals::{ExchangeProposal, ProposalStatus};
pub use users::{NewUser, ProfileChanges, User, UserProfile, check_password_policy};

mod ads;
mod error;
mod ops;
mod proposals;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
