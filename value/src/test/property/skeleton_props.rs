use proptest::prelude::*;

use crate::{BoneId, BoneInfluence, ContentDigest, Mesh, Resource, Scalar, Skeleton};

fn arb_skeleton() -> impl Strategy<Value = Skeleton> {
    prop::collection::vec(0u64..16, 0..8).prop_map(|ids| Skeleton::new(ids.into_iter().map(BoneId)))
}

/// A mesh with one influence per bone of its skeleton.
fn arb_skinned_mesh() -> impl Strategy<Value = Mesh> {
    arb_skeleton().prop_map(|skeleton| {
        let influences = (0..skeleton.len())
            .map(|i| BoneInfluence { vertex: i as u32, bone: i as u16, weight: Scalar(0.5) })
            .collect();
        let positions = (0..skeleton.len()).map(|i| [i as f32, 1.0, 0.0]).collect();
        Mesh::new(positions).with_skin(skeleton, influences)
    })
}

proptest! {
    #[test]
    fn union_keeps_left_indices_and_covers_both(a in arb_skeleton(), b in arb_skeleton()) {
        let union = a.union(&b);

        for (i, bone) in a.bones.iter().enumerate() {
            prop_assert_eq!(union.index_of(*bone), Some(i as u16));
        }
        prop_assert!(b.bones.iter().all(|bone| union.contains(*bone)));
        prop_assert_eq!(union.union(&a), union.clone());
    }

    #[test]
    fn remap_to_union_preserves_influence_bones(mesh in arb_skinned_mesh(), other in arb_skeleton()) {
        let target = mesh.skeleton.as_ref().unwrap().union(&other);
        let remapped = mesh.remap_to(&target).unwrap();

        prop_assert_eq!(remapped.influence_bones().unwrap(), mesh.influence_bones().unwrap());
        prop_assert_eq!(remapped.skeleton.as_ref(), Some(&target));
    }

    #[test]
    fn equal_meshes_have_equal_digests(mesh in arb_skinned_mesh()) {
        let copy = mesh.clone();

        prop_assert_eq!(mesh.digest(), copy.digest());
        prop_assert!(Resource::new(mesh).content_eq(&Resource::new(copy)).unwrap());
    }
}
