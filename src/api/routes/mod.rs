use actix_web::web;

use crate::store::MemoryStore;

pub mod clear;

/// Shared state handed to the privileged handlers.
pub struct AppData {
    pub store: MemoryStore,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(clear::clear_messages);
}
