//! Low-level API client
//!
//! One method per server endpoint, JSON in and out, the bearer token
//! attached once per request. Binary values are base64 at this boundary
//! and typed bytes everywhere above it.

use crate::{types::*, ClientError, Config, Result};
use bytes::Bytes;
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::RwLock;
use tracing::debug;

/// HTTP client for the sealdrop server
pub struct ApiClient {
    config: Config,
    http: Client,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a new client with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            config,
            http,
            token: RwLock::new(None),
        })
    }

    /// Create against an endpoint with default settings
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        Self::new(Config::new(endpoint))
    }

    /// Replace the session token used for subsequent requests
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().expect("token lock poisoned") = token;
    }

    /// Whether a session token is currently held
    pub fn has_token(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.endpoint, path);
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.token.read().expect("token lock poisoned").as_deref() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    /// Turn an error response into `ClientError::Api`, decoding the
    /// `{error, kind}` body when present
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        #[derive(serde::Deserialize)]
        struct WireError {
            error: String,
            kind: String,
        }

        let (kind, message) = match response.json::<WireError>().await {
            Ok(body) => (body.kind, body.error),
            Err(_) => ("Internal".to_string(), status.to_string()),
        };

        debug!(status = status.as_u16(), kind = %kind, "request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            kind,
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    // ── Identity & key registry ───────────────────────────

    pub async fn register(
        &self,
        researcher_id: &str,
        password: &str,
        kyber_public_key: Option<String>,
    ) -> Result<Session> {
        let session: Session = self
            .post_json(
                "/api/auth/register",
                &RegisterRequest {
                    researcher_id,
                    password,
                    kyber_public_key,
                },
            )
            .await?;
        self.set_token(Some(session.token.clone()));
        Ok(session)
    }

    pub async fn login(&self, researcher_id: &str, password: &str) -> Result<Session> {
        let session: Session = self
            .post_json(
                "/api/auth/login",
                &LoginRequest {
                    researcher_id,
                    password,
                },
            )
            .await?;
        self.set_token(Some(session.token.clone()));
        Ok(session)
    }

    /// Destroy the server-side session; the local keystore is untouched
    pub async fn logout(&self) -> Result<()> {
        let response = self.request(Method::POST, "/api/auth/logout").send().await?;
        Self::check(response).await?;
        self.set_token(None);
        Ok(())
    }

    pub async fn session(&self) -> Result<Identity> {
        self.get_json("/api/auth/session").await
    }

    pub async fn set_public_key(&self, key_b64: &str) -> Result<Identity> {
        let response = self
            .request(Method::PUT, "/api/auth/public-key")
            .json(&serde_json::json!({ "kyberPublicKey": key_b64 }))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn lookup_public_key(&self, researcher_id: &str) -> Result<PublicKeyEntry> {
        self.get_json(&format!("/api/auth/public-key/{researcher_id}"))
            .await
    }

    pub async fn search(&self, prefix: &str) -> Result<Vec<SearchHit>> {
        self.get_json(&format!("/api/auth/search?q={prefix}")).await
    }

    // ── Blob store ────────────────────────────────────────

    /// Upload a sealed blob with its metadata, multipart/form-data
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        blob: Vec<u8>,
        original_size: u64,
        iv_b64: &str,
        sha256_hex: &str,
        owner_kem_ct_b64: &str,
    ) -> Result<FileRecord> {
        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(blob)
                    .file_name(format!("{file_name}.enc"))
                    .mime_str("application/octet-stream")
                    .map_err(ClientError::Http)?,
            )
            .text("fileName", file_name.to_string())
            .text("originalSize", original_size.to_string())
            .text("iv", iv_b64.to_string())
            .text("sha256Hash", sha256_hex.to_string())
            .text("contentType", content_type.to_string())
            .text("ownerKemCt", owner_kem_ct_b64.to_string());

        let response = self
            .request(Method::POST, "/api/files/upload")
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn download_blob(&self, file_id: i64) -> Result<Bytes> {
        let response = self
            .request(Method::GET, &format!("/api/files/download/{file_id}"))
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?)
    }

    pub async fn list_my_files(&self) -> Result<Vec<FileRecord>> {
        self.get_json("/api/files").await
    }

    pub async fn file_metadata(&self, file_id: i64) -> Result<FileRecord> {
        self.get_json(&format!("/api/files/{file_id}")).await
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/api/files/{file_id}"))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // ── Share ledger ──────────────────────────────────────

    pub async fn create_share(
        &self,
        file_id: i64,
        recipient_id: &str,
        payload_b64: String,
        permission: &str,
    ) -> Result<ShareRecord> {
        self.post_json(
            "/api/shares",
            &CreateShareRequest {
                file_id,
                recipient_id,
                payload: payload_b64,
                permission,
            },
        )
        .await
    }

    pub async fn fetch_by_code(&self, share_code: &str) -> Result<ShareRecord> {
        self.get_json(&format!("/api/shares/code/{share_code}")).await
    }

    pub async fn list_outgoing(&self) -> Result<Vec<ShareRecord>> {
        self.get_json("/api/shares/outgoing").await
    }

    pub async fn list_incoming(&self) -> Result<Vec<IncomingShare>> {
        self.get_json("/api/shares/incoming").await
    }

    pub async fn revoke_share(&self, share_id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/api/shares/{share_id}"))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    // ── Groups ────────────────────────────────────────────

    pub async fn create_group(&self, name: &str, description: Option<&str>) -> Result<GroupRecord> {
        self.post_json("/api/groups", &CreateGroupRequest { name, description })
            .await
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupRecord>> {
        self.get_json("/api/groups").await
    }

    pub async fn group_detail(&self, group_id: i64) -> Result<GroupDetail> {
        self.get_json(&format!("/api/groups/{group_id}")).await
    }

    pub async fn delete_group(&self, group_id: i64) -> Result<()> {
        let response = self
            .request(Method::DELETE, &format!("/api/groups/{group_id}"))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn add_group_member(
        &self,
        group_id: i64,
        researcher_id: &str,
        role: &str,
    ) -> Result<GroupMember> {
        self.post_json(
            &format!("/api/groups/{group_id}/members"),
            &AddMemberRequest { researcher_id, role },
        )
        .await
    }

    pub async fn remove_group_member(&self, group_id: i64, identity_id: i64) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                &format!("/api/groups/{group_id}/members/{identity_id}"),
            )
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn group_member_keys(&self, group_id: i64) -> Result<Vec<MemberKey>> {
        self.get_json(&format!("/api/groups/{group_id}/public-keys"))
            .await
    }

    pub async fn create_group_share(
        &self,
        group_id: i64,
        file_id: i64,
        payloads: std::collections::HashMap<String, String>,
    ) -> Result<serde_json::Value> {
        self.post_json(
            &format!("/api/groups/{group_id}/shares"),
            &CreateGroupShareRequest { file_id, payloads },
        )
        .await
    }

    pub async fn list_group_shares(&self) -> Result<Vec<GroupShareRecord>> {
        self.get_json("/api/groups/shares").await
    }
}
