//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core
//! depends only on these traits, not on concrete implementations.

mod assistant;
mod persistence;
mod session;
mod token;

pub use assistant::Assistant;
pub use persistence::{CompletionToggle, GroupsSnapshot, Persistence};
pub use session::{Session, SessionProvider};
pub use token::TokenStore;
