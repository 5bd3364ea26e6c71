//! Proxy policies
//!
//! Each wrapped value gets one handler bound to its original. The handler
//! answers the traps of a proxy whose target is an empty shadow object.

mod base;
mod reactive;
mod read_only;

pub(crate) use base::Policy;
pub(crate) use reactive::ReactiveHandler;
pub(crate) use read_only::ReadOnlyHandler;
