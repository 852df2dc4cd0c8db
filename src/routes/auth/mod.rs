mod handler;
mod model;

pub use handler::{login, logout, me, refresh, register};
pub use model::{LoginRequest, LogoutResponse, RefreshResponse, RegisterRequest};
