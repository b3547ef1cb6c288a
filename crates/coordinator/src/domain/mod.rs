//! The stateful core: admission (C5), the auction controller (C6), session
//! managers (C7/C8) and the expiry reaper (C9). Everything below the HTTP/WS
//! boundary in `crate::api` lives here.

pub mod admission;
pub mod auction;
pub mod auth;
pub mod locks;
pub mod reaper;
pub mod sessions;
