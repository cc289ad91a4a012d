//! Data models for the UNIBUS backend.
//!
//! Typed request/response structs; raw encoded columns never cross this boundary.

mod admin;
mod driver;
mod notification;
mod profile;
mod route;
mod student;
mod subscription;

pub use admin::*;
pub use driver::*;
pub use notification::*;
pub use profile::*;
pub use route::*;
pub use student::*;
pub use subscription::*;
