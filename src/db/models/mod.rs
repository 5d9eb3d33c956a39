//! Database models split into domain-specific modules.

pub mod actor;
pub mod attendance;
pub mod coach;
pub mod common;
pub mod gym;
pub mod login;
pub mod membership;
pub mod payment;
pub mod stats;
pub mod user;

pub use actor::*;
pub use attendance::*;
pub use coach::*;
pub use common::*;
pub use gym::*;
pub use login::*;
pub use membership::*;
pub use payment::*;
pub use user::*;
