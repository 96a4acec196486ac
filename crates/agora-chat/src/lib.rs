//! Chat orchestration: request-scoped services composing the store with the
//! platform collaborators (identity, group membership, profiles,
//! notifications). Caller identity is always an explicit parameter — the
//! transport layer resolves it through [`collaborators::IdentityProvider`]
//! before calling in.

pub mod collaborators;
pub mod direct;
pub mod group;

pub use direct::ChatService;
pub use group::GroupChatService;
