pub mod hungarian;
pub mod nearest;
pub mod policy;
pub mod types;

use bevy_ecs::prelude::Resource;

pub use hungarian::HungarianAssignment;
pub use nearest::NearestDriverAssignment;
pub use policy::AssignmentPolicy;
pub use types::AssignmentPair;

/// Default weight for pickup ETA in scored policies.
pub const DEFAULT_ETA_WEIGHT: f64 = 0.1;

/// Resource wrapper for the assignment policy trait object.
#[derive(Resource)]
pub struct AssignmentPolicyResource(pub Box<dyn AssignmentPolicy>);

impl AssignmentPolicyResource {
    pub fn new(policy: Box<dyn AssignmentPolicy>) -> Self {
        Self(policy)
    }
}

impl std::ops::Deref for AssignmentPolicyResource {
    type Target = dyn AssignmentPolicy;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
