mod model;

pub use model::{Gallery, GalleryChanges, GalleryFilter, NewGallery};
