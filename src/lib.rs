pub mod auth;
pub mod core;
pub mod embed;
pub mod llm;
pub mod rag;
pub mod server;
pub mod session;
pub mod state;
pub mod store;
