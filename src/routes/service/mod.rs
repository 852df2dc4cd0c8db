mod model;

pub use model::{NewService, Service, ServiceChanges, ServiceFilter};
