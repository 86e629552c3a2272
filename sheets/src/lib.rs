mod client;
mod domain;
mod sheets_url;

pub(crate) use sheets_url::*;

pub use client::*;
pub use domain::*;
