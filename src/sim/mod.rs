pub mod engine;
pub mod event;
pub mod save;
pub mod session;
pub mod stage;
