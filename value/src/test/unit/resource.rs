use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::{ContentDigest, Digest, Error, Mesh, Resource, ResourceLoader};

struct CountingLoader {
    mesh: Mesh,
    loads: AtomicUsize,
}

impl ResourceLoader<Mesh> for CountingLoader {
    fn load(&self) -> Result<Mesh> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.mesh.clone())
    }
}

struct FailingLoader;

impl ResourceLoader<Mesh> for FailingLoader {
    fn load(&self) -> Result<Mesh> {
        Err(Error::LoadFailed { reason: "store offline".into() })
    }
}

fn deferred(mesh: Mesh) -> (Resource<Mesh>, Arc<CountingLoader>) {
    let digest = mesh.digest();
    let loader = Arc::new(CountingLoader { mesh, loads: AtomicUsize::new(0) });
    (Resource::deferred(digest, loader.clone()), loader)
}

#[test]
fn test_digest_mismatch_does_not_load() {
    let (a, la) = deferred(Mesh::new(vec![[1.0, 0.0, 0.0]]));
    let (b, lb) = deferred(Mesh::new(vec![[2.0, 0.0, 0.0]]));

    assert!(!a.content_eq(&b).unwrap());
    assert_eq!(la.loads.load(Ordering::SeqCst), 0);
    assert_eq!(lb.loads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_digest_match_loads_once() {
    let mesh = Mesh::new(vec![[1.0, 2.0, 3.0]]);
    let (a, la) = deferred(mesh.clone());
    let (b, _lb) = deferred(mesh);

    assert!(a.content_eq(&b).unwrap());
    assert!(a.content_eq(&b).unwrap());
    assert_eq!(la.loads.load(Ordering::SeqCst), 1);
    assert!(a.is_loaded());
}

#[test]
fn test_colliding_digest_with_different_content_is_unequal() {
    let (a, _) = deferred(Mesh::new(vec![[1.0, 0.0, 0.0]]));
    let forged = Resource::deferred(
        a.digest(),
        Arc::new(CountingLoader { mesh: Mesh::new(vec![[9.0, 0.0, 0.0]]), loads: AtomicUsize::new(0) }),
    );

    assert_eq!(a.digest(), forged.digest());
    assert_ne!(a, forged);
}

#[test]
fn test_failed_load_is_unequal() {
    let mesh = Mesh::new(vec![]);
    let ok = Resource::new(mesh.clone());
    let broken: Resource<Mesh> = Resource::deferred(mesh.digest(), Arc::new(FailingLoader));

    assert!(broken.content_eq(&ok).is_err());
    assert_ne!(broken, ok);
    assert_eq!(broken, broken.clone());
}

#[test]
fn test_new_is_resident() {
    let r = Resource::new(Mesh::reference(3));
    assert!(r.is_loaded());
    assert_ne!(r.digest(), Digest(0));
    assert!(r.peek().is_some_and(|m| m.is_reference()));
}
