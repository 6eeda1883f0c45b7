//! QQ open platform data model.

pub mod api;
pub mod event;
pub mod message;
