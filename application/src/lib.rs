pub mod agent_service;
pub mod chat_service;
pub mod persona;
pub mod session_store;
pub mod toolbox;
