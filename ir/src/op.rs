//! Operation kinds of the content-generation IR.
//!
//! The [`Op`] enum is closed: every kind declares its arity, its output
//! [`Category`] and the handful of classifications the optimizer cares
//! about. What an op actually computes is the evaluator's business.
//!
//! Children are not stored in the op. A node pairs an `Op` with an ordered
//! child list whose layout per kind is documented on the variant.

use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use smallvec::SmallVec;
use tessera_value::{BoneId, Category, Color, Image, ImageFormat, ImageSize, Layout, Mesh, Resource, Scalar};

/// Scalar arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOp {
    pub fn apply(self, lhs: f32, rhs: f32) -> f32 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
        }
    }
}

/// How a layer is blended over its base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
}

/// Kind of an externally identified resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceKind {
    Mesh,
    Image,
}

impl ReferenceKind {
    pub fn category(self) -> Category {
        match self {
            Self::Mesh => Category::Mesh,
            Self::Image => Category::Image,
        }
    }
}

/// Number of children an op kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum Arity {
    #[display("{_0}")]
    Exactly(usize),
    #[display("{min}..={max}")]
    Between { min: usize, max: usize },
    #[display("at least {_0}")]
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::Between { min, max } => (min..=max).contains(&count),
            Self::AtLeast(n) => count >= n,
        }
    }
}

/// Sorted, duplicate-free set of authoring source ids a constant was derived from.
///
/// Downstream cache keys are computed from it, so folding carries the union
/// of every folded constant's provenance onto the new constant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Provenance(SmallVec<[u32; 2]>);

impl Provenance {
    pub fn new(ids: impl IntoIterator<Item = u32>) -> Self {
        let mut ids: SmallVec<[u32; 2]> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn ids(&self) -> &[u32] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn union(&self, other: &Provenance) -> Provenance {
        Self::new(self.0.iter().chain(other.0.iter()).copied())
    }
}

/// Payload handle embedded in a constant op.
///
/// Two handles are the same op payload only when they share storage. Equal
/// content behind different handles is merged by resource deduplication,
/// never by structural comparison, so comparing ops never loads anything.
#[derive(Debug)]
pub struct Payload<T>(pub Resource<T>);

impl<T> Payload<T> {
    pub fn resource(&self) -> &Resource<T> {
        &self.0
    }
}

impl<T: Hash> Payload<T> {
    pub fn new(value: T) -> Self {
        Self(Resource::new(value))
    }
}

impl<T> Clone for Payload<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Payload<T> {
    type Target = Resource<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<Resource<T>> for Payload<T> {
    fn from(resource: Resource<T>) -> Self {
        Self(resource)
    }
}

impl<T> PartialEq for Payload<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl<T> Eq for Payload<T> {}

impl<T> Hash for Payload<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.digest().hash(state);
    }
}

/// Operation kind.
///
/// Child layouts are listed per variant; `base` children of instance ops
/// are optional and always come last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum::IntoStaticStr)]
pub enum Op {
    // Constants
    ConstantBool(bool),
    ConstantScalar(Scalar),
    ConstantColor(Color),
    ConstantImage { image: Payload<Image>, provenance: Provenance },
    /// `reference` is set when the mesh only stands in for an external
    /// resource. It is fixed at construction so it is known without loading.
    ConstantMesh { mesh: Payload<Mesh>, provenance: Provenance, reference: Option<u32> },
    ConstantLayout { layout: Payload<Layout> },

    // External references, resolved by id outside the graph
    MeshReference { id: u32 },
    ImageReference { id: u32 },

    // Runtime parameters
    BoolParameter { name: Arc<str> },
    ScalarParameter { name: Arc<str> },
    ColorParameter { name: Arc<str> },
    ImageParameter { name: Arc<str> },
    MeshParameter { name: Arc<str> },

    /// `[condition, yes, no]`
    Conditional { category: Category },

    /// `[lhs, rhs]`
    BoolAnd,
    /// `[lhs, rhs]`
    BoolOr,
    /// `[value]`
    BoolNot,

    /// `[lhs, rhs]`
    ScalarArithmetic(ArithmeticOp),

    /// `[r, g, b, a]`
    ColorFromScalars,
    /// `[image, x, y]`
    ColorSampleImage,

    /// `[color]`
    ImagePlainColor { size: ImageSize, format: ImageFormat },
    /// `[image]`
    ImageResize { size: ImageSize },
    /// `[image, like]`: resize `image` to whatever size `like` has.
    ImageResizeLike,
    /// `[image]`
    ImagePixelFormat { format: ImageFormat },
    /// `[image]`
    ImageMipmap { levels: u8 },
    /// `[base, blended]` or `[base, blended, mask]`
    ImageLayer { blend: BlendMode },
    /// `[layout, base, block_image]`
    ImageCompose { block: u64 },
    /// `[base, layer, ..]`
    ImageMultiLayer { blend: BlendMode },

    /// `[lhs, rhs]`
    MeshMerge,
    /// `[base, target, factor]`
    MeshMorph,
    /// `[mesh]`
    MeshClipWithBones { bones: SmallVec<[BoneId; 4]> },
    /// `[mesh, pose]`
    MeshApplyPose,
    /// `[mesh, shape]`
    MeshBindShape { reshape_skeleton: bool },
    /// `[mesh, shape]`
    MeshApplyShape { reshape_skeleton: bool },

    /// `[mesh]`
    LayoutFromMesh { index: u8 },
    /// `[lhs, rhs]`
    LayoutMerge,

    /// `[mesh]` or `[mesh, base]`. The point where meshes are combined into an instance.
    InstanceAddMesh { component: u16 },
    /// `[image]` or `[image, base]`
    InstanceAddImage { name: Arc<str> },
    /// `[color]` or `[color, base]`
    InstanceAddColor { name: Arc<str> },
}

impl Op {
    /// Constant over resident mesh content, carrying over its stand-in reference.
    pub fn constant_mesh(mesh: Arc<Mesh>, provenance: Provenance) -> Self {
        let reference = mesh.reference;
        Self::ConstantMesh { mesh: Payload(Resource::from_arc(mesh)), provenance, reference }
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn arity(&self) -> Arity {
        use Arity::*;
        match self {
            Self::ConstantBool(_)
            | Self::ConstantScalar(_)
            | Self::ConstantColor(_)
            | Self::ConstantImage { .. }
            | Self::ConstantMesh { .. }
            | Self::ConstantLayout { .. }
            | Self::MeshReference { .. }
            | Self::ImageReference { .. }
            | Self::BoolParameter { .. }
            | Self::ScalarParameter { .. }
            | Self::ColorParameter { .. }
            | Self::ImageParameter { .. }
            | Self::MeshParameter { .. } => Exactly(0),
            Self::BoolNot
            | Self::ImagePlainColor { .. }
            | Self::ImageResize { .. }
            | Self::ImagePixelFormat { .. }
            | Self::ImageMipmap { .. }
            | Self::MeshClipWithBones { .. }
            | Self::LayoutFromMesh { .. } => Exactly(1),
            Self::BoolAnd
            | Self::BoolOr
            | Self::ScalarArithmetic(_)
            | Self::ImageResizeLike
            | Self::MeshMerge
            | Self::MeshApplyPose
            | Self::MeshBindShape { .. }
            | Self::MeshApplyShape { .. }
            | Self::LayoutMerge => Exactly(2),
            Self::Conditional { .. } | Self::ColorSampleImage | Self::ImageCompose { .. } | Self::MeshMorph => {
                Exactly(3)
            }
            Self::ColorFromScalars => Exactly(4),
            Self::ImageLayer { .. } => Between { min: 2, max: 3 },
            Self::ImageMultiLayer { .. } => AtLeast(2),
            Self::InstanceAddMesh { .. } | Self::InstanceAddImage { .. } | Self::InstanceAddColor { .. } => {
                Between { min: 1, max: 2 }
            }
        }
    }

    /// Output category of the op.
    pub fn category(&self) -> Category {
        match self {
            Self::ConstantBool(_) | Self::BoolParameter { .. } | Self::BoolAnd | Self::BoolOr | Self::BoolNot => {
                Category::Bool
            }
            Self::ConstantScalar(_) | Self::ScalarParameter { .. } | Self::ScalarArithmetic(_) => Category::Scalar,
            Self::ConstantColor(_) | Self::ColorParameter { .. } | Self::ColorFromScalars | Self::ColorSampleImage => {
                Category::Color
            }
            Self::ConstantImage { .. }
            | Self::ImageReference { .. }
            | Self::ImageParameter { .. }
            | Self::ImagePlainColor { .. }
            | Self::ImageResize { .. }
            | Self::ImageResizeLike
            | Self::ImagePixelFormat { .. }
            | Self::ImageMipmap { .. }
            | Self::ImageLayer { .. }
            | Self::ImageCompose { .. }
            | Self::ImageMultiLayer { .. } => Category::Image,
            Self::ConstantMesh { .. }
            | Self::MeshReference { .. }
            | Self::MeshParameter { .. }
            | Self::MeshMerge
            | Self::MeshMorph
            | Self::MeshClipWithBones { .. }
            | Self::MeshApplyPose
            | Self::MeshBindShape { .. }
            | Self::MeshApplyShape { .. } => Category::Mesh,
            Self::ConstantLayout { .. } | Self::LayoutFromMesh { .. } | Self::LayoutMerge => Category::Layout,
            Self::Conditional { category } => *category,
            Self::InstanceAddMesh { .. } | Self::InstanceAddImage { .. } | Self::InstanceAddColor { .. } => {
                Category::Instance
            }
        }
    }

    /// Already a materialized value.
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Self::ConstantBool(_)
                | Self::ConstantScalar(_)
                | Self::ConstantColor(_)
                | Self::ConstantImage { .. }
                | Self::ConstantMesh { .. }
                | Self::ConstantLayout { .. }
        )
    }

    pub fn is_parameter(&self) -> bool {
        matches!(
            self,
            Self::BoolParameter { .. }
                | Self::ScalarParameter { .. }
                | Self::ColorParameter { .. }
                | Self::ImageParameter { .. }
                | Self::MeshParameter { .. }
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::MeshReference { .. } | Self::ImageReference { .. })
    }

    /// The external resource this op stands for: a reference op, or a
    /// constant mesh built as a reference stand-in.
    pub fn reference(&self) -> Option<(u32, ReferenceKind)> {
        match self {
            Self::MeshReference { id } => Some((*id, ReferenceKind::Mesh)),
            Self::ImageReference { id } => Some((*id, ReferenceKind::Image)),
            Self::ConstantMesh { reference, .. } => reference.map(|id| (id, ReferenceKind::Mesh)),
            _ => None,
        }
    }

    /// Ops that need the skeleton of every mesh below them to survive until evaluation.
    pub fn requires_skeleton(&self) -> bool {
        match self {
            Self::MeshClipWithBones { .. } | Self::MeshApplyPose => true,
            Self::MeshBindShape { reshape_skeleton } | Self::MeshApplyShape { reshape_skeleton } => *reshape_skeleton,
            _ => false,
        }
    }

    pub fn is_instance(&self) -> bool {
        self.category() == Category::Instance
    }

    pub fn provenance(&self) -> Option<&Provenance> {
        match self {
            Self::ConstantImage { provenance, .. } | Self::ConstantMesh { provenance, .. } => Some(provenance),
            _ => None,
        }
    }

    /// Short human-readable form including the kind-specific payload.
    pub fn describe(&self) -> String {
        match self {
            Self::ConstantBool(b) => format!("ConstantBool({b})"),
            Self::ConstantScalar(s) => format!("ConstantScalar({})", s.0),
            Self::ConstantColor(c) => format!("ConstantColor({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            Self::ConstantImage { image, .. } => format!("ConstantImage(#{})", image.digest()),
            Self::ConstantMesh { mesh, .. } => format!("ConstantMesh(#{})", mesh.digest()),
            Self::ConstantLayout { layout } => format!("ConstantLayout(#{})", layout.digest()),
            Self::MeshReference { id } | Self::ImageReference { id } => format!("{}({id})", self.name()),
            Self::BoolParameter { name }
            | Self::ScalarParameter { name }
            | Self::ColorParameter { name }
            | Self::ImageParameter { name }
            | Self::MeshParameter { name } => format!("{}('{name}')", self.name()),
            Self::Conditional { category } => format!("Conditional({category})"),
            Self::ScalarArithmetic(op) => format!("ScalarArithmetic({op})"),
            Self::ImagePlainColor { size, format } => format!("ImagePlainColor({size}, {format})"),
            Self::ImageResize { size } => format!("ImageResize({size})"),
            Self::ImagePixelFormat { format } => format!("ImagePixelFormat({format})"),
            Self::ImageMipmap { levels } => format!("ImageMipmap({levels})"),
            Self::ImageLayer { blend } | Self::ImageMultiLayer { blend } => format!("{}({blend})", self.name()),
            Self::ImageCompose { block } => format!("ImageCompose(block={block})"),
            Self::MeshClipWithBones { bones } => format!("MeshClipWithBones(bones={})", bones.len()),
            Self::LayoutFromMesh { index } => format!("LayoutFromMesh({index})"),
            Self::InstanceAddMesh { component } => format!("InstanceAddMesh({component})"),
            Self::InstanceAddImage { name } | Self::InstanceAddColor { name } => format!("{}('{name}')", self.name()),
            _ => self.name().to_string(),
        }
    }
}
