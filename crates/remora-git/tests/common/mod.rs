#![allow(dead_code)]
use remora_git::{MemoryBackend, MemoryConnector, MemoryRemote, ObjectId, Repository};

/// Url every fixture remote is served at.
pub const URL: &str = "proto://host/repo.git";

/// Builds an object id made of one repeated byte.
pub fn oid(byte: u8) -> ObjectId {
    ObjectId::from_hex(format!("{:02x}", byte).repeat(20).as_bytes())
        .expect("repeated hex byte is a valid object id")
}

/// A repository wired to an in-memory backend and one scripted remote.
pub struct Fixture {
    pub repo: Repository,
    pub backend: MemoryBackend,
    pub connector: MemoryConnector,
}

/// Serves `server` at [`URL`] and returns a fresh repository.
pub fn fixture(server: MemoryRemote) -> Fixture {
    init_tracing();
    let backend = MemoryBackend::new();
    let connector = MemoryConnector::new().with_remote(URL, server);
    let repo = Repository::in_memory(backend.clone(), connector.clone());
    Fixture {
        repo,
        backend,
        connector,
    }
}

/// A remote advertising `main` and `dev` branches plus a tag on `main`.
pub fn branches_and_tag() -> MemoryRemote {
    MemoryRemote::new()
        .with_head("HEAD", oid(1))
        .with_head("refs/heads/main", oid(1))
        .with_head("refs/heads/dev", oid(2))
        .with_head("refs/tags/v1.0", oid(9))
        .with_head("refs/tags/v1.0^{}", oid(1))
}

/// Installs a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
