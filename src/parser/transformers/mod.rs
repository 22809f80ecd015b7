//! One transformer per known record type. Each consumes a raw record and
//! returns every point it produces, or fails the whole record.

mod api;
mod app;
mod callback_api;
mod stats;
mod web;

pub use api::api;
pub use app::app;
pub use callback_api::callback_api;
pub use stats::{all_users, created_apps, released_apps, total_services};
pub use web::{web, web_channel};
