pub mod cast;
pub mod line;
pub mod route;
pub mod scenario;
