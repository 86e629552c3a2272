pub mod google_auth;
pub mod pending_queue;
pub mod sheets;
