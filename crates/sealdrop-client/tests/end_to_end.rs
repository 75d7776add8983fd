//! End-to-end scenarios: real server, real clients, real keystores
//!
//! Each test spawns an in-process server on a random port and drives it
//! through `SealdropClient` instances, so the full uploader → server →
//! recipient path runs exactly as it would across three processes.

use sealdrop_client::{ClientError, Config, FileKeystore, Keystore, MemoryKeystore, SealdropClient};
use sealdrop_crypto::{CryptoError, UploadPhase};
use sealdrop_server::{routes, AppState, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_server() -> (String, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: dir.path().join("test.db"),
        blob_dir: dir.path().join("blobs"),
        ..ServerConfig::default()
    };

    let state = AppState::new(config).await.unwrap();
    let app = routes::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), dir)
}

fn memory_client(base: &str) -> SealdropClient {
    SealdropClient::new(Config::new(base), Arc::new(MemoryKeystore::new())).unwrap()
}

fn file_client(base: &str, keystore_dir: &Path) -> SealdropClient {
    let keystore = FileKeystore::open(keystore_dir).unwrap();
    SealdropClient::new(Config::new(base), Arc::new(keystore)).unwrap()
}

/// Deterministic filler so tests need no RNG of their own
fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
}

fn api_kind(err: &ClientError) -> &str {
    err.kind().expect("expected an api error")
}

#[tokio::test]
async fn test_owner_upload_download_across_sessions() {
    let (base, _server_dir) = spawn_server().await;
    let keystore_dir = TempDir::new().unwrap();

    // Register, upload a 3-byte file, recover it via the owner-wrap
    let alice = file_client(&base, keystore_dir.path());
    alice.register("alice", "hunter22").await.unwrap();

    let record = alice.upload("hi.txt", "text/plain", b"Hi\n").await.unwrap();
    assert_eq!(record.original_size, 3);
    assert_eq!(record.encrypted_size, 31);

    assert_eq!(alice.download_own(record.id).await.unwrap(), b"Hi\n");

    // Logout does not wipe the keystore; a fresh session on the same host
    // still decrypts
    alice.logout().await.unwrap();
    alice.login("alice", "hunter22").await.unwrap();
    assert_eq!(alice.download_own(record.id).await.unwrap(), b"Hi\n");

    // A different host with an empty keystore cannot: NoKeypair, and no
    // silent regeneration that would orphan existing shares
    let other_host_dir = TempDir::new().unwrap();
    let alice_elsewhere = file_client(&base, other_host_dir.path());
    let identity = alice_elsewhere.login("alice", "hunter22").await.unwrap();
    assert!(identity.has_public_key);

    let err = alice_elsewhere.download_own(record.id).await.unwrap_err();
    assert!(matches!(err, ClientError::NoKeypair(_)));
}

#[tokio::test]
async fn test_upload_reports_phases_in_order() {
    let (base, _server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();

    let mut phases = Vec::new();
    alice
        .upload_with_progress("p.bin", "application/octet-stream", b"data", |p| {
            phases.push(p)
        })
        .await
        .unwrap();

    assert_eq!(
        phases,
        vec![
            UploadPhase::KeyDraw,
            UploadPhase::IvDraw,
            UploadPhase::Encrypt,
            UploadPhase::Hash,
            UploadPhase::OwnerWrap,
            UploadPhase::Upload,
            UploadPhase::Done,
        ]
    );
}

#[tokio::test]
async fn test_cross_identity_share_roundtrip() {
    let (base, _server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    let bob = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();
    bob.register("bob", "hunter22").await.unwrap();

    let plaintext = patterned(1024 * 1024);
    let record = alice
        .upload("big.bin", "application/octet-stream", &plaintext)
        .await
        .unwrap();

    let share = alice.share_file(record.id, "bob", "download").await.unwrap();
    assert_eq!(share.permission, "download");
    assert_eq!(share.share_code.len(), 6);

    let received = bob.receive_by_code(&share.share_code).await.unwrap();
    assert_eq!(received.data, plaintext);
    assert_eq!(received.file_name, "big.bin");
    assert_eq!(received.permission.as_deref(), Some("download"));
}

#[tokio::test]
async fn test_share_needs_ownership_and_recipient_key() {
    let (base, _server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    let bob = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();
    bob.register("bob", "hunter22").await.unwrap();

    let record = alice.upload("f.txt", "text/plain", b"mine").await.unwrap();

    // Bob is not the owner: the server hides the file entirely
    let err = bob.share_file(record.id, "alice", "view").await.unwrap_err();
    assert_eq!(api_kind(&err), "NotFound");

    // Sharing to an identity that never registered
    let err = alice
        .share_file(record.id, "nobody", "view")
        .await
        .unwrap_err();
    assert_eq!(api_kind(&err), "NotFound");
}

#[tokio::test]
async fn test_group_fanout_roundtrip() {
    let (base, _server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    let bob = memory_client(&base);
    let carol = memory_client(&base);
    let dave = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();
    bob.register("bob", "hunter22").await.unwrap();
    carol.register("carol", "hunter22").await.unwrap();
    dave.register("dave", "hunter22").await.unwrap();

    let group = alice
        .api()
        .create_group("pq-lab", Some("shared datasets"))
        .await
        .unwrap();
    alice
        .api()
        .add_group_member(group.id, "bob", "member")
        .await
        .unwrap();
    alice
        .api()
        .add_group_member(group.id, "carol", "member")
        .await
        .unwrap();

    let plaintext = patterned(64 * 1024);
    let record = alice
        .upload("dataset.bin", "application/octet-stream", &plaintext)
        .await
        .unwrap();
    alice.share_with_group(record.id, group.id).await.unwrap();

    // Every member, the sharer included, decrypts the same bytes
    for member in [&alice, &bob, &carol] {
        let shares = member.api().list_group_shares().await.unwrap();
        assert_eq!(shares.len(), 1);
        let received = member.receive_group_share(&shares[0]).await.unwrap();
        assert_eq!(received.data, plaintext);
    }

    // A non-member sees no share and cannot pull the blob
    assert!(dave.api().list_group_shares().await.unwrap().is_empty());
    let err = dave.api().download_blob(record.id).await.unwrap_err();
    assert_eq!(api_kind(&err), "Forbidden");
}

#[tokio::test]
async fn test_revocation_is_authorization_not_cryptography() {
    let (base, _server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    let bob = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();
    bob.register("bob", "hunter22").await.unwrap();

    let record = alice.upload("r.txt", "text/plain", b"revocable").await.unwrap();
    let share = alice.share_file(record.id, "bob", "download").await.unwrap();

    // Bob decrypts once while the share is active
    let received = bob.receive_by_code(&share.share_code).await.unwrap();
    assert_eq!(received.data, b"revocable");

    alice.api().revoke_share(share.id).await.unwrap();

    // The code stops resolving, but the plaintext Bob already holds is
    // untouched; revocation cannot reach it
    let err = bob.receive_by_code(&share.share_code).await.unwrap_err();
    assert_eq!(api_kind(&err), "NotFound");
    assert_eq!(received.data, b"revocable");
}

#[tokio::test]
async fn test_tampered_blob_fails_closed() {
    let (base, server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    let bob = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();
    bob.register("bob", "hunter22").await.unwrap();

    let plaintext = patterned(8 * 1024);
    let record = alice
        .upload("t.bin", "application/octet-stream", &plaintext)
        .await
        .unwrap();
    let share = alice.share_file(record.id, "bob", "download").await.unwrap();

    // Flip one byte of the stored ciphertext behind the server's back
    let blob_path = find_blob(&server_dir.path().join("blobs"));
    let mut blob = std::fs::read(&blob_path).unwrap();
    blob[1000] ^= 0x01;
    std::fs::write(&blob_path, blob).unwrap();

    let err = bob.receive_by_code(&share.share_code).await.unwrap_err();
    assert!(matches!(err, ClientError::Crypto(CryptoError::Tampered)));
}

#[tokio::test]
async fn test_empty_file_roundtrip() {
    let (base, _server_dir) = spawn_server().await;

    let alice = memory_client(&base);
    alice.register("alice", "hunter22").await.unwrap();

    let record = alice.upload("empty", "application/octet-stream", b"").await.unwrap();
    assert_eq!(record.encrypted_size, 28);
    assert!(alice.download_own(record.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_keystore_bootstrap_registers_public_key_once() {
    let (base, _server_dir) = spawn_server().await;

    let keystore = Arc::new(MemoryKeystore::new());
    let alice = SealdropClient::new(Config::new(&base), Arc::clone(&keystore) as Arc<dyn Keystore>)
        .unwrap();

    let identity = alice.register("alice", "hunter22").await.unwrap();
    assert!(identity.has_public_key);
    let first_key = keystore.get("alice").unwrap().unwrap();

    // A second login on the same host reuses the stored keypair
    alice.logout().await.unwrap();
    let identity = alice.login("alice", "hunter22").await.unwrap();
    assert!(identity.has_public_key);
    let second_key = keystore.get("alice").unwrap().unwrap();
    assert_eq!(first_key.public_key(), second_key.public_key());
}

fn find_blob(dir: &Path) -> PathBuf {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(current).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == "enc") {
                return path;
            }
        }
    }
    panic!("no blob found under {}", dir.display());
}
