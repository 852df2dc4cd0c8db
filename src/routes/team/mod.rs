mod model;

pub use model::{NewTeamMember, TeamFilter, TeamMember, TeamMemberChanges};
