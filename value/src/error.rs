use snafu::Snafu;

use crate::mesh::BoneId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// A deferred payload could not be fetched from its backing store.
    #[snafu(display("failed to load resource payload: {reason}"))]
    LoadFailed { reason: String },

    /// Remapping requires the source mesh to carry a skeleton.
    #[snafu(display("mesh has skinning data but no skeleton"))]
    MissingSkeleton,

    /// A bone referenced by the mesh is absent from the target skeleton.
    #[snafu(display("bone {bone} is not part of the target skeleton"))]
    BoneNotInSkeleton { bone: BoneId },

    /// A skin influence points past the end of the mesh's own skeleton.
    #[snafu(display("bone index {index} out of range for skeleton with {bones} bones"))]
    InfluenceOutOfRange { index: u16, bones: usize },
}
