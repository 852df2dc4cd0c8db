mod model;

pub use model::{NewProject, Project, ProjectChanges, ProjectFilter, PublicProject};
