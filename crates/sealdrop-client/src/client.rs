//! High-level client: end-to-end encrypted upload, share, and receive
//!
//! Wraps the raw [`ApiClient`] with the cipher-engine pipelines and the
//! local keystore. Plaintext and DEKs exist only inside these methods;
//! everything that leaves over the wire is ciphertext, base64 payloads, or
//! public keys.

use crate::{
    api::ApiClient,
    keystore::Keystore,
    types::{FileRecord, GroupShareRecord, Identity, Session, ShareRecord},
    ClientError, Config, Result,
};
use sealdrop_crypto::{
    engine::{self, UploadPhase},
    kem, Fingerprint, KemPayload, KyberKeyPair, KyberPublicKey,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;

/// A decrypted file received through a share
#[derive(Debug)]
pub struct ReceivedFile {
    pub file_name: String,
    pub content_type: String,
    pub permission: Option<String>,
    pub data: Vec<u8>,
}

/// Client with end-to-end encryption
pub struct SealdropClient {
    api: ApiClient,
    keystore: Arc<dyn Keystore>,
    identity: RwLock<Option<Identity>>,
}

impl SealdropClient {
    /// Create a new client over the given keystore
    pub fn new(config: Config, keystore: Arc<dyn Keystore>) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            keystore,
            identity: RwLock::new(None),
        })
    }

    /// The underlying API client, for operations that need no crypto
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The authenticated identity, if logged in
    pub fn identity(&self) -> Option<Identity> {
        self.identity.read().expect("identity lock poisoned").clone()
    }

    fn current_identity(&self) -> Result<Identity> {
        self.identity().ok_or(ClientError::NotAuthenticated)
    }

    /// The caller's local keypair; receiving and re-sharing fail with
    /// `NoKeypair` on a host whose keystore has no entry; a regenerated
    /// keypair would orphan all past shares, so none is created here.
    fn require_keypair(&self) -> Result<KyberKeyPair> {
        let identity = self.current_identity()?;
        self.keystore
            .get(&identity.researcher_id)?
            .ok_or_else(|| ClientError::NoKeypair(identity.researcher_id))
    }

    /// First authentication on a host bootstraps the keystore.
    ///
    /// A keypair is generated only when neither the local store nor the
    /// registry has one; when the registry holds a key but this host's
    /// store is empty, nothing is generated; receive and re-share will
    /// fail with `NoKeypair` until the keystore is restored or the key is
    /// explicitly rotated via [`rotate_keys`](Self::rotate_keys).
    async fn bootstrap_keys(&self, session: &Session) -> Result<()> {
        let rid = &session.identity.researcher_id;

        if let Some(keypair) = self.keystore.get(rid)? {
            if !session.identity.has_public_key {
                self.api
                    .set_public_key(&keypair.public_key().to_base64())
                    .await?;
                info!(researcher_id = %rid, "public key uploaded to registry");
            }
            return Ok(());
        }

        if session.identity.has_public_key {
            // Registry key exists but this host cannot use it; leave the
            // store empty so the mismatch surfaces as NoKeypair
            return Ok(());
        }

        let keypair = self.keystore.get_or_generate(rid)?;
        self.api
            .set_public_key(&keypair.public_key().to_base64())
            .await?;
        info!(researcher_id = %rid, "keypair generated and public key registered");
        Ok(())
    }

    /// Generate a fresh keypair, persist it, and overwrite the registry
    /// key. Every payload wrapped to the previous key is orphaned; callers
    /// invoke this only as an explicit recovery step.
    pub async fn rotate_keys(&self) -> Result<()> {
        let identity = self.current_identity()?;
        let keypair = KyberKeyPair::generate()?;
        self.keystore.put(&identity.researcher_id, &keypair)?;
        self.api
            .set_public_key(&keypair.public_key().to_base64())
            .await?;
        self.refresh_identity().await?;
        info!(researcher_id = %identity.researcher_id, "keypair rotated");
        Ok(())
    }

    /// Register a new identity and bootstrap its keys
    pub async fn register(&self, researcher_id: &str, password: &str) -> Result<Identity> {
        let session = self.api.register(researcher_id, password, None).await?;
        *self.identity.write().expect("identity lock poisoned") = Some(session.identity.clone());
        self.bootstrap_keys(&session).await?;
        self.refresh_identity().await
    }

    /// Log in and bootstrap keys for this host
    pub async fn login(&self, researcher_id: &str, password: &str) -> Result<Identity> {
        let session = self.api.login(researcher_id, password).await?;
        *self.identity.write().expect("identity lock poisoned") = Some(session.identity.clone());
        self.bootstrap_keys(&session).await?;
        self.refresh_identity().await
    }

    async fn refresh_identity(&self) -> Result<Identity> {
        let identity = self.api.session().await?;
        *self.identity.write().expect("identity lock poisoned") = Some(identity.clone());
        Ok(identity)
    }

    /// Log out; the keystore keeps its entries
    pub async fn logout(&self) -> Result<()> {
        self.api.logout().await?;
        *self.identity.write().expect("identity lock poisoned") = None;
        Ok(())
    }

    // ── Upload ────────────────────────────────────────────

    /// Seal a plaintext and upload it with the owner's wrapped key
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        plaintext: &[u8],
    ) -> Result<FileRecord> {
        self.upload_with_progress(file_name, content_type, plaintext, |_| {})
            .await
    }

    /// Like [`upload`](Self::upload), reporting pipeline phases through the
    /// callback side channel
    pub async fn upload_with_progress(
        &self,
        file_name: &str,
        content_type: &str,
        plaintext: &[u8],
        mut on_phase: impl FnMut(UploadPhase),
    ) -> Result<FileRecord> {
        let keypair = self.require_keypair()?;

        let upload = engine::encrypt_and_wrap(keypair.public_key(), plaintext, &mut on_phase)?;

        on_phase(UploadPhase::Upload);
        let result = self
            .api
            .upload_file(
                file_name,
                content_type,
                upload.blob,
                upload.original_size,
                &upload.iv.to_base64(),
                &upload.fingerprint.to_hex(),
                &upload.owner_wrap.to_base64(),
            )
            .await;

        match result {
            Ok(record) => {
                on_phase(UploadPhase::Done);
                info!(file_id = record.id, "encrypted upload complete");
                Ok(record)
            }
            Err(e) => {
                on_phase(UploadPhase::Failed);
                Err(e)
            }
        }
    }

    // ── Owner download ────────────────────────────────────

    /// Download one of the caller's own files and open it via the
    /// owner-wrap
    pub async fn download_own(&self, file_id: i64) -> Result<Vec<u8>> {
        let record = self.api.file_metadata(file_id).await?;
        let owner_wrap = Self::owner_wrap_of(&record)?;
        let keypair = self.require_keypair()?;

        let blob = self.api.download_blob(file_id).await?;
        let fingerprint = Fingerprint::from_hex(&record.sha256_hash)?;

        Ok(engine::decrypt_and_unwrap(
            keypair.secret_key(),
            &owner_wrap,
            &blob,
            Some(&fingerprint),
        )?)
    }

    fn owner_wrap_of(record: &FileRecord) -> Result<KemPayload> {
        let b64 = record.owner_kem_ct.as_deref().ok_or(ClientError::NotOwner)?;
        Ok(KemPayload::from_base64(b64)?)
    }

    // ── Sharing ───────────────────────────────────────────

    /// Share a file the caller owns with another researcher.
    ///
    /// Recovers the DEK from the owner-wrap, performs a fresh encapsulation
    /// against the recipient's registered public key, and submits the
    /// wrapped payload; the DEK never leaves this function.
    pub async fn share_file(
        &self,
        file_id: i64,
        recipient_id: &str,
        permission: &str,
    ) -> Result<ShareRecord> {
        let record = self.api.file_metadata(file_id).await?;
        let owner_wrap = Self::owner_wrap_of(&record)?;
        let keypair = self.require_keypair()?;

        let entry = self.api.lookup_public_key(recipient_id).await?;
        let recipient_key = KyberPublicKey::from_base64(&entry.kyber_public_key)?;

        let payload =
            engine::rewrap_for_recipient(keypair.secret_key(), &owner_wrap, &recipient_key)?;

        let share = self
            .api
            .create_share(file_id, recipient_id, payload.to_base64(), permission)
            .await?;
        info!(share_code = %share.share_code, "file shared");
        Ok(share)
    }

    /// Fan a file out to every keyed member of a group, one fresh
    /// encapsulation per member
    pub async fn share_with_group(&self, file_id: i64, group_id: i64) -> Result<()> {
        let record = self.api.file_metadata(file_id).await?;
        let owner_wrap = Self::owner_wrap_of(&record)?;
        let keypair = self.require_keypair()?;

        let members = self.api.group_member_keys(group_id).await?;

        let dek = kem::unwrap_dek(&owner_wrap, keypair.secret_key())?;
        let mut payloads = HashMap::with_capacity(members.len());
        for member in &members {
            let member_key = KyberPublicKey::from_base64(&member.kyber_public_key)?;
            let payload = kem::wrap_dek(&member_key, &dek)?;
            payloads.insert(member.identity_id.to_string(), payload.to_base64());
        }
        drop(dek);

        self.api
            .create_group_share(group_id, file_id, payloads)
            .await?;
        info!(file_id, group_id, members = members.len(), "group share created");
        Ok(())
    }

    // ── Receiving ─────────────────────────────────────────

    /// Fetch a direct share by its code, download the blob, and decrypt
    pub async fn receive_by_code(&self, share_code: &str) -> Result<ReceivedFile> {
        let share = self.api.fetch_by_code(share_code).await?;
        let keypair = self.require_keypair()?;

        let payload = KemPayload::from_base64(&share.payload)?;
        let fingerprint = Fingerprint::from_hex(&share.sha256_hash)?;
        let blob = self.api.download_blob(share.file_id).await?;

        let data = engine::decrypt_and_unwrap(
            keypair.secret_key(),
            &payload,
            &blob,
            Some(&fingerprint),
        )?;

        Ok(ReceivedFile {
            file_name: share.file_name,
            content_type: share.content_type,
            permission: Some(share.permission),
            data,
        })
    }

    /// Decrypt a group-shared file from its listing entry
    pub async fn receive_group_share(&self, share: &GroupShareRecord) -> Result<ReceivedFile> {
        let keypair = self.require_keypair()?;

        let payload = KemPayload::from_base64(&share.payload)?;
        let fingerprint = Fingerprint::from_hex(&share.sha256_hash)?;
        let blob = self.api.download_blob(share.file_id).await?;

        let data = engine::decrypt_and_unwrap(
            keypair.secret_key(),
            &payload,
            &blob,
            Some(&fingerprint),
        )?;

        Ok(ReceivedFile {
            file_name: share.file_name.clone(),
            content_type: share.content_type.clone(),
            permission: None,
            data,
        })
    }
}
