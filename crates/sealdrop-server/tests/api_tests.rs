//! Integration tests driving the full HTTP surface
//!
//! Each test spawns the server on a random port with a throwaway database
//! and blob directory, then acts as one or more clients over reqwest. The
//! cipher-engine calls here play the role of the client-side engine; the
//! server itself only ever sees sealed bytes.

use reqwest::{Client, StatusCode};
use sealdrop_crypto::{engine, kem, EncryptedUpload, KyberKeyPair};
use sealdrop_server::{routes, AppState, ServerConfig};
use serde_json::{json, Value};
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

/// Register an identity with a fresh keypair; returns (token, identity id)
async fn register(
    client: &Client,
    base: &str,
    rid: &str,
    keypair: Option<&KyberKeyPair>,
) -> (String, i64) {
    let mut body = json!({ "researcherId": rid, "password": "hunter22" });
    if let Some(kp) = keypair {
        body["kyberPublicKey"] = Value::String(kp.public_key().to_base64());
    }

    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let body: Value = res.json().await.unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["identity"]["id"].as_i64().unwrap(),
    )
}

/// Seal a plaintext and upload it as `owner`; returns the file record
async fn upload(
    client: &Client,
    base: &str,
    token: &str,
    owner: &KyberKeyPair,
    file_name: &str,
    plaintext: &[u8],
) -> (Value, EncryptedUpload) {
    let sealed = engine::encrypt_and_wrap(owner.public_key(), plaintext, |_| {}).unwrap();

    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(sealed.blob.clone()).file_name("blob.enc"),
        )
        .text("fileName", file_name.to_string())
        .text("originalSize", sealed.original_size.to_string())
        .text("iv", sealed.iv.to_base64())
        .text("sha256Hash", sealed.fingerprint.to_hex())
        .text("contentType", "text/plain".to_string())
        .text("ownerKemCt", sealed.owner_wrap.to_base64());

    let res = client
        .post(format!("{base}/api/files/upload"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    (res.json().await.unwrap(), sealed)
}

async fn error_kind(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["kind"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let (base, _dir) = spawn_server().await;
    let res = Client::new()
        .get(format!("{base}/api/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_identity_lifecycle() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let (token, _) = register(&client, &base, "alice", None).await;

    // Session resolves while the token lives
    let res = client
        .get(format!("{base}/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["researcherId"], "alice");
    assert_eq!(body["hasPublicKey"], false);

    // Duplicate identifier is a conflict
    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "researcherId": "alice", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(error_kind(res).await, "AlreadyExists");

    // Weak password rejected before anything is created
    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({ "researcherId": "bob", "password": "abc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "WeakPassword");

    // Wrong-length public key rejected
    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({
            "researcherId": "carol",
            "password": "hunter22",
            "kyberPublicKey": "AAAA"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "BadKey");

    // Unknown identifier and wrong password return the same kind
    for body in [
        json!({ "researcherId": "alice", "password": "wrong-password" }),
        json!({ "researcherId": "nobody", "password": "wrong-password" }),
    ] {
        let res = client
            .post(format!("{base}/api/auth/login"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_kind(res).await, "BadCredentials");
    }

    // Logout invalidates the token
    let res = client
        .post(format!("{base}/api/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{base}/api/auth/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_key_lookup_and_search() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let alice_keys = KyberKeyPair::generate().unwrap();
    register(&client, &base, "alice", Some(&alice_keys)).await;
    let (bob_token, _) = register(&client, &base, "Bobby", None).await;

    // Lookup by name needs no session
    let res = client
        .get(format!("{base}/api/auth/public-key/alice"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["kyberPublicKey"].as_str().unwrap(),
        alice_keys.public_key().to_base64()
    );

    // A keyless identity resolves to NotFound, same as an unknown one
    let res = client
        .get(format!("{base}/api/auth/public-key/Bobby"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "NotFound");

    let res = client
        .get(format!("{base}/api/auth/public-key/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "NotFound");

    // Prefix search is case-sensitive and excludes the caller
    let res = client
        .get(format!("{base}/api/auth/search?q=al"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    let hits: Vec<Value> = res.json().await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["researcherId"], "alice");
    assert_eq!(hits[0]["hasPublicKey"], true);

    let res = client
        .get(format!("{base}/api/auth/search?q=AL"))
        .bearer_auth(&bob_token)
        .send()
        .await
        .unwrap();
    let hits: Vec<Value> = res.json().await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_upload_integrity_checks() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let keys = KyberKeyPair::generate().unwrap();
    let (token, _) = register(&client, &base, "alice", Some(&keys)).await;

    let sealed = engine::encrypt_and_wrap(keys.public_key(), b"Hi\n", |_| {}).unwrap();

    // Wrong originalSize fails the length relation
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(sealed.blob.clone()).file_name("blob.enc"),
        )
        .text("fileName", "hi.txt")
        .text("originalSize", "5")
        .text("iv", sealed.iv.to_base64())
        .text("sha256Hash", sealed.fingerprint.to_hex())
        .text("ownerKemCt", sealed.owner_wrap.to_base64());
    let res = client
        .post(format!("{base}/api/files/upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "SizeMismatch");

    // Wrong fingerprint is rejected
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(sealed.blob.clone()).file_name("blob.enc"),
        )
        .text("fileName", "hi.txt")
        .text("originalSize", "3")
        .text("iv", sealed.iv.to_base64())
        .text(
            "sha256Hash",
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
        .text("ownerKemCt", sealed.owner_wrap.to_base64());
    let res = client
        .post(format!("{base}/api/files/upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "FingerprintMismatch");

    // Truncated owner wrap is rejected
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(sealed.blob.clone()).file_name("blob.enc"),
        )
        .text("fileName", "hi.txt")
        .text("originalSize", "3")
        .text("iv", sealed.iv.to_base64())
        .text("sha256Hash", sealed.fingerprint.to_hex())
        .text("ownerKemCt", "AAAA");
    let res = client
        .post(format!("{base}/api/files/upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "BadPayload");

    // Nothing was persisted by the failed attempts
    let res = client
        .get(format!("{base}/api/files"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let files: Vec<Value> = res.json().await.unwrap();
    assert!(files.is_empty());

    // A well-formed 3-byte upload lands as a 31-byte blob
    let (record, _) = upload(&client, &base, &token, &keys, "hi.txt", b"Hi\n").await;
    assert_eq!(record["originalSize"], 3);
    assert_eq!(record["encryptedSize"], 31);
}

#[tokio::test]
async fn test_owner_roundtrip_via_server() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let keys = KyberKeyPair::generate().unwrap();
    let (token, _) = register(&client, &base, "alice", Some(&keys)).await;

    let (record, sealed) = upload(&client, &base, &token, &keys, "hi.txt", b"Hi\n").await;
    let file_id = record["id"].as_i64().unwrap();

    let blob = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(blob.len(), 31);

    // The owner-wrap on the record decapsulates back to the plaintext
    let wrap = kem::KemPayload::from_base64(record["ownerKemCt"].as_str().unwrap()).unwrap();
    let plain = engine::decrypt_and_unwrap(
        keys.secret_key(),
        &wrap,
        &blob,
        Some(&sealed.fingerprint),
    )
    .unwrap();
    assert_eq!(plain, b"Hi\n");
}

#[tokio::test]
async fn test_direct_share_lifecycle() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let alice_keys = KyberKeyPair::generate().unwrap();
    let bob_keys = KyberKeyPair::generate().unwrap();
    let (alice, _) = register(&client, &base, "alice", Some(&alice_keys)).await;
    let (bob, _) = register(&client, &base, "bob", Some(&bob_keys)).await;

    let plaintext: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();
    let (record, sealed) = upload(&client, &base, &alice, &alice_keys, "data.bin", &plaintext).await;
    let file_id = record["id"].as_i64().unwrap();

    // Bob cannot read before a share exists
    let res = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Alice re-wraps her DEK for Bob and records the share
    let payload = engine::rewrap_for_recipient(
        alice_keys.secret_key(),
        &sealed.owner_wrap,
        bob_keys.public_key(),
    )
    .unwrap();
    let res = client
        .post(format!("{base}/api/shares"))
        .bearer_auth(&alice)
        .json(&json!({
            "fileId": file_id,
            "recipientId": "bob",
            "payload": payload.to_base64(),
            "permission": "download"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let share: Value = res.json().await.unwrap();
    let code = share["shareCode"].as_str().unwrap().to_string();
    let share_id = share["id"].as_i64().unwrap();
    assert_eq!(code.len(), 6);
    assert_eq!(share["viewed"], false);

    // The sender is not the addressee of the code
    let res = client
        .get(format!("{base}/api/shares/code/{code}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Bob fetches twice: equal payloads, viewed flips once
    let first: Value = client
        .get(format!("{base}/api/shares/code/{code}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: Value = client
        .get(format!("{base}/api/shares/code/{code}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["payload"], second["payload"]);
    assert_eq!(first["viewed"], true);
    assert_eq!(second["viewed"], true);

    // Bob decrypts bit-exact
    let blob = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let wrap = kem::KemPayload::from_base64(first["payload"].as_str().unwrap()).unwrap();
    let plain =
        engine::decrypt_and_unwrap(bob_keys.secret_key(), &wrap, &blob, Some(&sealed.fingerprint))
            .unwrap();
    assert_eq!(plain, plaintext);

    // Two shares of the same file to the same recipient carry different
    // payloads
    let payload2 = engine::rewrap_for_recipient(
        alice_keys.secret_key(),
        &sealed.owner_wrap,
        bob_keys.public_key(),
    )
    .unwrap();
    assert_ne!(payload.to_bytes(), payload2.to_bytes());

    // Revocation: the code stops resolving for everyone, reads stop, the
    // sender's outgoing history keeps the record
    let res = client
        .delete(format!("{base}/api/shares/{share_id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{base}/api/shares/code/{code}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let incoming: Vec<Value> = client
        .get(format!("{base}/api/shares/incoming"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(incoming.is_empty());

    let outgoing: Vec<Value> = client
        .get(format!("{base}/api/shares/outgoing"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0]["revoked"], true);
}

#[tokio::test]
async fn test_share_requires_recipient_key() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let alice_keys = KyberKeyPair::generate().unwrap();
    let (alice, _) = register(&client, &base, "alice", Some(&alice_keys)).await;
    register(&client, &base, "keyless", None).await;

    let (record, sealed) = upload(&client, &base, &alice, &alice_keys, "x.txt", b"x").await;

    let res = client
        .post(format!("{base}/api/shares"))
        .bearer_auth(&alice)
        .json(&json!({
            "fileId": record["id"],
            "recipientId": "keyless",
            "payload": sealed.owner_wrap.to_base64(),
            "permission": "download"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "NoRecipientKey");
}

#[tokio::test]
async fn test_group_fanout_is_atomic() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let alice_keys = KyberKeyPair::generate().unwrap();
    let bob_keys = KyberKeyPair::generate().unwrap();
    let (alice, _) = register(&client, &base, "alice", Some(&alice_keys)).await;
    let (bob, bob_id) = register(&client, &base, "bob", Some(&bob_keys)).await;
    let (_carol, carol_id) = register(&client, &base, "carol", None).await;

    let group: Value = client
        .post(format!("{base}/api/groups"))
        .bearer_auth(&alice)
        .json(&json!({ "name": "lab-42" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let group_id = group["id"].as_i64().unwrap();

    for rid in ["bob", "carol"] {
        let res = client
            .post(format!("{base}/api/groups/{group_id}/members"))
            .bearer_auth(&alice)
            .json(&json!({ "researcherId": rid }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let plaintext = vec![0x5au8; 64 * 1024];
    let (record, sealed) = upload(&client, &base, &alice, &alice_keys, "group.bin", &plaintext).await;
    let file_id = record["id"].as_i64().unwrap();

    let bob_payload = engine::rewrap_for_recipient(
        alice_keys.secret_key(),
        &sealed.owner_wrap,
        bob_keys.public_key(),
    )
    .unwrap();

    // Carol has no key: the share including her fails as a whole
    let mut payloads = serde_json::Map::new();
    payloads.insert(bob_id.to_string(), Value::String(bob_payload.to_base64()));
    payloads.insert(carol_id.to_string(), Value::String(bob_payload.to_base64()));
    let res = client
        .post(format!("{base}/api/groups/{group_id}/shares"))
        .bearer_auth(&alice)
        .json(&json!({ "fileId": file_id, "payloads": payloads }))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "NoRecipientKey");

    // Nothing was recorded for Bob either
    let shares: Vec<Value> = client
        .get(format!("{base}/api/groups/shares"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(shares.is_empty());

    // A mapping over a non-member likewise fails whole
    let res = client
        .post(format!("{base}/api/groups/{group_id}/shares"))
        .bearer_auth(&alice)
        .json(&json!({
            "fileId": file_id,
            "payloads": { "999999": bob_payload.to_base64() }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(error_kind(res).await, "InvalidInput");

    // The keyed subset succeeds; members absent from the mapping stay
    // without access but group membership still authorizes Bob's read
    let mut payloads = serde_json::Map::new();
    payloads.insert(bob_id.to_string(), Value::String(bob_payload.to_base64()));
    let res = client
        .post(format!("{base}/api/groups/{group_id}/shares"))
        .bearer_auth(&alice)
        .json(&json!({ "fileId": file_id, "payloads": payloads }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let shares: Vec<Value> = client
        .get(format!("{base}/api/groups/shares"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(shares.len(), 1);

    let blob = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let wrap = kem::KemPayload::from_base64(shares[0]["payload"].as_str().unwrap()).unwrap();
    let plain =
        engine::decrypt_and_unwrap(bob_keys.secret_key(), &wrap, &blob, Some(&sealed.fingerprint))
            .unwrap();
    assert_eq!(plain, plaintext);
}

#[tokio::test]
async fn test_group_membership_gates_reads() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let alice_keys = KyberKeyPair::generate().unwrap();
    let bob_keys = KyberKeyPair::generate().unwrap();
    let dave_keys = KyberKeyPair::generate().unwrap();
    let (alice, _) = register(&client, &base, "alice", Some(&alice_keys)).await;
    let (bob, bob_id) = register(&client, &base, "bob", Some(&bob_keys)).await;
    let (dave, _) = register(&client, &base, "dave", Some(&dave_keys)).await;

    let group: Value = client
        .post(format!("{base}/api/groups"))
        .bearer_auth(&alice)
        .json(&json!({ "name": "readers" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let group_id = group["id"].as_i64().unwrap();

    client
        .post(format!("{base}/api/groups/{group_id}/members"))
        .bearer_auth(&alice)
        .json(&json!({ "researcherId": "bob" }))
        .send()
        .await
        .unwrap();

    let (record, sealed) = upload(&client, &base, &alice, &alice_keys, "g.bin", b"group data").await;
    let file_id = record["id"].as_i64().unwrap();

    let bob_payload = engine::rewrap_for_recipient(
        alice_keys.secret_key(),
        &sealed.owner_wrap,
        bob_keys.public_key(),
    )
    .unwrap();
    let mut payloads = serde_json::Map::new();
    payloads.insert(bob_id.to_string(), Value::String(bob_payload.to_base64()));
    client
        .post(format!("{base}/api/groups/{group_id}/shares"))
        .bearer_auth(&alice)
        .json(&json!({ "fileId": file_id, "payloads": payloads }))
        .send()
        .await
        .unwrap();

    // A non-member never reads through the group share
    let res = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&dave)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Membership authorizes; removal revokes future reads
    let res = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    client
        .delete(format!("{base}/api/groups/{group_id}/members/{bob_id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_file_delete_cascades_and_is_idempotent() {
    let (base, _dir) = spawn_server().await;
    let client = Client::new();

    let alice_keys = KyberKeyPair::generate().unwrap();
    let bob_keys = KyberKeyPair::generate().unwrap();
    let (alice, _) = register(&client, &base, "alice", Some(&alice_keys)).await;
    let (bob, _) = register(&client, &base, "bob", Some(&bob_keys)).await;

    let (record, sealed) = upload(&client, &base, &alice, &alice_keys, "doomed.txt", b"bye").await;
    let file_id = record["id"].as_i64().unwrap();

    let payload = engine::rewrap_for_recipient(
        alice_keys.secret_key(),
        &sealed.owner_wrap,
        bob_keys.public_key(),
    )
    .unwrap();
    client
        .post(format!("{base}/api/shares"))
        .bearer_auth(&alice)
        .json(&json!({
            "fileId": file_id,
            "recipientId": "bob",
            "payload": payload.to_base64()
        }))
        .send()
        .await
        .unwrap();

    // Only the owner may delete
    let res = client
        .delete(format!("{base}/api/files/{file_id}"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(format!("{base}/api/files/{file_id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Ledger entries referencing the file are gone
    let incoming: Vec<Value> = client
        .get(format!("{base}/api/shares/incoming"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(incoming.is_empty());

    let res = client
        .get(format!("{base}/api/files/download/{file_id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Deleting again is a no-op success
    let res = client
        .delete(format!("{base}/api/files/{file_id}"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_state_never_contains_plaintext() {
    let (base, dir) = spawn_server().await;
    let client = Client::new();

    let keys = KyberKeyPair::generate().unwrap();
    let (token, _) = register(&client, &base, "alice", Some(&keys)).await;

    // A distinctive plaintext that would be visible in any raw dump
    let plaintext = b"TOP-SECRET-MARKER-9f8e7d6c5b4a-DO-NOT-STORE".repeat(64);
    upload(&client, &base, &token, &keys, "secret.bin", &plaintext).await;

    // Scan every byte the server persisted: the database (including WAL),
    // and every blob. The DEK never reaches the server by construction;
    // the upload carries only sealed bytes and the wrapped payload.
    let needle = &plaintext[..44];
    let mut scanned = 0usize;
    for entry in walk(dir.path()) {
        let bytes = std::fs::read(&entry).unwrap();
        scanned += 1;
        assert!(
            !contains(&bytes, needle),
            "plaintext leaked into {}",
            entry.display()
        );
    }
    assert!(scanned > 0);
}

fn walk(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(current).unwrap().flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
