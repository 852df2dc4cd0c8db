mod handler;
mod model;

pub use handler::{create_property, update_property};
pub use model::{ListingType, NewProperty, Property, PropertyChanges, PropertyFilter, PropertyStatus};
