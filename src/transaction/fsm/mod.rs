//! The four RFC 3261 transaction state machines plus the Stale absorber.
//! Each submodule is a set of free functions over `&mut Transaction` that
//! return the actions the dispatcher should carry out; none of them mutate
//! the transaction table.

pub mod client_invite;
pub mod client_non_invite;
pub mod server_invite;
pub mod server_non_invite;
pub mod stale;
