//! Mesh payloads, skeletons and bone remapping.

use std::hash::{Hash, Hasher};

use enumset::{EnumSet, EnumSetType};
use snafu::OptionExt;

use crate::error::{BoneNotInSkeletonSnafu, InfluenceOutOfRangeSnafu, MissingSkeletonSnafu, Result};
use crate::scalar::Scalar;

/// Externally meaningful bone identity (usually a hashed bone name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneId(pub u64);

impl std::fmt::Display for BoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bone#{}", self.0)
    }
}

/// Ordered bone set. The position of a bone is the index skin influences refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Skeleton {
    pub bones: Vec<BoneId>,
}

impl Skeleton {
    pub fn new(bones: impl IntoIterator<Item = BoneId>) -> Self {
        let mut skeleton = Self::default();
        for bone in bones {
            skeleton.push_unique(bone);
        }
        skeleton
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Influence index of `bone`. Bones past the `u16` range have none.
    pub fn index_of(&self, bone: BoneId) -> Option<u16> {
        self.bones.iter().position(|b| *b == bone).and_then(|i| u16::try_from(i).ok())
    }

    pub fn contains(&self, bone: BoneId) -> bool {
        self.bones.contains(&bone)
    }

    fn push_unique(&mut self, bone: BoneId) {
        if !self.contains(bone) {
            self.bones.push(bone);
        }
    }

    /// Bone-set union. Bones of `self` keep their indices; bones only present
    /// in `other` are appended in `other`'s order.
    pub fn union(&self, other: &Skeleton) -> Skeleton {
        let mut merged = self.clone();
        for bone in &other.bones {
            merged.push_unique(*bone);
        }
        merged
    }
}

/// A single skin weight: `vertex` is driven by bone `bone` (an index into the mesh skeleton).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneInfluence {
    pub vertex: u32,
    pub bone: u16,
    pub weight: Scalar,
}

/// Format classification of a mesh, cached on constant nodes for the runtime.
#[derive(Debug, Hash, PartialOrd, Ord, EnumSetType)]
pub enum MeshFeature {
    /// Carries skin influences and a skeleton.
    Skinned,
    /// Placeholder for an externally resolved mesh.
    Reference,
    /// No vertices at all.
    Empty,
    /// More vertices than 16-bit indices can address.
    LargeIndices,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub positions: Vec<[f32; 3]>,
    pub influences: Vec<BoneInfluence>,
    pub skeleton: Option<Skeleton>,
    /// Set when this mesh is only a stand-in for an external resource id.
    pub reference: Option<u32>,
}

impl Mesh {
    pub fn new(positions: Vec<[f32; 3]>) -> Self {
        Self { positions, ..Default::default() }
    }

    /// Stand-in mesh for the external resource `id`.
    pub fn reference(id: u32) -> Self {
        Self { reference: Some(id), ..Default::default() }
    }

    pub fn with_skin(mut self, skeleton: Skeleton, influences: Vec<BoneInfluence>) -> Self {
        self.skeleton = Some(skeleton);
        self.influences = influences;
        self
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Resolve the bone each influence refers to.
    pub fn influence_bones(&self) -> Result<Vec<BoneId>> {
        if self.influences.is_empty() {
            return Ok(Vec::new());
        }
        let skeleton = self.skeleton.as_ref().context(MissingSkeletonSnafu)?;
        self.influences
            .iter()
            .map(|inf| {
                skeleton
                    .bones
                    .get(inf.bone as usize)
                    .copied()
                    .context(InfluenceOutOfRangeSnafu { index: inf.bone, bones: skeleton.len() })
            })
            .collect()
    }

    /// Rewrite skin influences so they index into `target` instead of the mesh's own skeleton.
    ///
    /// Every bone used by the mesh must be present in `target`.
    pub fn remap_to(&self, target: &Skeleton) -> Result<Mesh> {
        let mut remapped = self.clone();
        remapped.skeleton = Some(target.clone());

        let bones = self.influence_bones()?;
        for (influence, bone) in remapped.influences.iter_mut().zip(bones) {
            influence.bone = target.index_of(bone).context(BoneNotInSkeletonSnafu { bone })?;
        }
        Ok(remapped)
    }

    pub fn features(&self) -> EnumSet<MeshFeature> {
        let mut features = EnumSet::empty();
        if self.reference.is_some() {
            features |= MeshFeature::Reference;
        }
        if self.skeleton.is_some() && !self.influences.is_empty() {
            features |= MeshFeature::Skinned;
        }
        if self.positions.is_empty() {
            features |= MeshFeature::Empty;
        }
        if self.positions.len() > usize::from(u16::MAX) {
            features |= MeshFeature::LargeIndices;
        }
        features
    }

    /// Concatenate two meshes. Influences of `other` are re-indexed against the union skeleton.
    pub fn merged(&self, other: &Mesh) -> Result<Mesh> {
        let skeleton = match (&self.skeleton, &other.skeleton) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.clone().or_else(|| b.clone()),
        };

        let mut merged = match &skeleton {
            Some(s) => self.remap_to(s)?,
            None => self.clone(),
        };
        let tail = match &skeleton {
            Some(s) => other.remap_to(s)?,
            None => other.clone(),
        };

        let offset = merged.positions.len() as u32;
        merged.positions.extend_from_slice(&tail.positions);
        merged
            .influences
            .extend(tail.influences.iter().map(|inf| BoneInfluence { vertex: inf.vertex + offset, ..*inf }));
        merged.reference = None;
        Ok(merged)
    }

    fn position_bits(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.positions.iter().map(|p| [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()])
    }
}

impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        self.positions.len() == other.positions.len()
            && self.position_bits().eq(other.position_bits())
            && self.influences == other.influences
            && self.skeleton == other.skeleton
            && self.reference == other.reference
    }
}

impl Eq for Mesh {}

impl Hash for Mesh {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.positions.len().hash(state);
        for bits in self.position_bits() {
            bits.hash(state);
        }
        self.influences.hash(state);
        self.skeleton.hash(state);
        self.reference.hash(state);
    }
}
