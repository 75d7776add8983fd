//! Blob store handlers: upload, download, listing, deletion
//!
//! The server treats blob bytes as opaque. Upload validates only what it
//! can see (the size relation `|blob| = 12 + originalSize + 16` and the
//! SHA-256 fingerprint over the ciphertext-and-tag portion) and persists
//! nothing if either check fails.

use crate::blobstore::BlobStore;
use crate::models::FileResponse;
use crate::state::{AppState, AuthIdentity};
use crate::{ApiError, ErrorKind};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Extension, Json,
};
use sealdrop_crypto::{Fingerprint, KemPayload, IV_SIZE, TAG_SIZE};
use std::sync::Arc;

struct UploadFields {
    blob: Vec<u8>,
    file_name: String,
    original_size: i64,
    iv: String,
    sha256_hash: String,
    content_type: String,
    owner_kem_ct: KemPayload,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut blob = None;
    let mut file_name = None;
    let mut original_size = None;
    let mut iv = None;
    let mut sha256_hash = None;
    let mut content_type = "application/octet-stream".to_string();
    let mut owner_kem_ct = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(format!("malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                blob = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::invalid(format!("failed reading blob: {e}")))?
                        .to_vec(),
                );
            }
            "fileName" => file_name = Some(field.text().await.unwrap_or_default()),
            "originalSize" => {
                let text = field.text().await.unwrap_or_default();
                original_size = Some(
                    text.parse::<i64>()
                        .map_err(|_| ApiError::invalid("originalSize must be an integer"))?,
                );
            }
            "iv" => iv = Some(field.text().await.unwrap_or_default()),
            "sha256Hash" => sha256_hash = Some(field.text().await.unwrap_or_default()),
            "contentType" => content_type = field.text().await.unwrap_or_default(),
            "ownerKemCt" => {
                let text = field.text().await.unwrap_or_default();
                owner_kem_ct = Some(
                    KemPayload::from_base64(&text)
                        .map_err(|e| ApiError::new(ErrorKind::BadPayload, e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    Ok(UploadFields {
        blob: blob.ok_or_else(|| ApiError::invalid("no file provided"))?,
        file_name: file_name.ok_or_else(|| ApiError::invalid("fileName is required"))?,
        original_size: original_size.ok_or_else(|| ApiError::invalid("originalSize is required"))?,
        iv: iv.ok_or_else(|| ApiError::invalid("iv is required"))?,
        sha256_hash: sha256_hash.ok_or_else(|| ApiError::invalid("sha256Hash is required"))?,
        content_type,
        owner_kem_ct: owner_kem_ct.ok_or_else(|| ApiError::invalid("ownerKemCt is required"))?,
    })
}

/// POST /api/files/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let fields = read_upload(multipart).await?;

    if fields.original_size < 0 {
        return Err(ApiError::invalid("originalSize must not be negative"));
    }

    sealdrop_crypto::Iv::from_base64(&fields.iv)
        .map_err(|_| ApiError::invalid("iv must be 12 base64-encoded bytes"))?;

    let expected_len = IV_SIZE as i64 + fields.original_size + TAG_SIZE as i64;
    if fields.blob.len() as i64 != expected_len {
        return Err(ApiError::new(
            ErrorKind::SizeMismatch,
            format!(
                "blob length {} does not match IV + originalSize + tag = {}",
                fields.blob.len(),
                expected_len
            ),
        ));
    }

    // The fingerprint covers the ciphertext-and-tag portion, never the IV
    let claimed = Fingerprint::from_hex(&fields.sha256_hash)
        .map_err(|_| ApiError::invalid("sha256Hash must be 64 hex chars"))?;
    if claimed != Fingerprint::digest(&fields.blob[IV_SIZE..]) {
        return Err(ApiError::new(
            ErrorKind::FingerprintMismatch,
            "blob does not hash to the supplied fingerprint",
        ));
    }

    // Commit the blob before the record so a record never points at a
    // missing blob; a failed insert leaves only an unreferenced file that
    // the next put never collides with.
    let storage_name = BlobStore::allocate_name();
    state.blobs.put(&storage_name, &fields.blob).await?;

    let record = state
        .db
        .insert_file(
            caller.id,
            &fields.file_name,
            fields.original_size,
            fields.blob.len() as i64,
            &fields.content_type,
            &claimed.to_hex(),
            &fields.iv,
            &fields.owner_kem_ct.to_bytes(),
            &storage_name,
        )
        .await?;

    tracing::info!(file_id = record.id, size = record.encrypted_size, "blob stored");

    Ok((StatusCode::CREATED, Json(FileResponse::for_owner(&record))))
}

/// GET /api/files/download/{fileId}
///
/// Authorization is delegated to the share ledger: owner, active direct
/// share, or current membership in a group the file was shared with.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(file_id): Path<i64>,
) -> Result<Response, ApiError> {
    let record = state
        .db
        .file_by_id(file_id)
        .await?
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    if !state.db.authorize_read(file_id, caller.id).await? {
        return Err(ApiError::forbidden("no access to this file"));
    }

    let blob = state.blobs.get(&record.storage_name).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::not_found("file blob not found on storage")
        } else {
            e.into()
        }
    })?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.enc\"", record.file_name),
        )
        .body(Body::from(blob))
        .map_err(|e| ApiError::new(ErrorKind::Internal, e.to_string()))?;

    Ok(response)
}

/// GET /api/files
pub async fn list_my_files(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let files = state.db.files_by_owner(caller.id).await?;
    Ok(Json(files.iter().map(FileResponse::for_owner).collect()))
}

/// GET /api/files/{fileId}
pub async fn file_metadata(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(file_id): Path<i64>,
) -> Result<Json<FileResponse>, ApiError> {
    let record = state
        .db
        .file_by_id(file_id)
        .await?
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    if record.owner_id == caller.id {
        return Ok(Json(FileResponse::for_owner(&record)));
    }
    if !state.db.authorize_read(file_id, caller.id).await? {
        // Hide existence from unauthorized callers
        return Err(ApiError::not_found("file not found"));
    }
    Ok(Json(FileResponse::public_view(&record)))
}

/// DELETE /api/files/{fileId}
///
/// Owner-only; removes every ledger entry referencing the file and the blob
/// itself. Idempotent on a missing file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthIdentity>,
    Path(file_id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(record) = state.db.file_by_id(file_id).await? else {
        return Ok(Json(serde_json::json!({ "message": "deleted" })));
    };

    if record.owner_id != caller.id {
        return Err(ApiError::not_found("file not found"));
    }

    state.db.delete_file(file_id).await?;
    state.blobs.delete(&record.storage_name).await?;

    tracing::info!(file_id, "file deleted");
    Ok(Json(serde_json::json!({ "message": "deleted" })))
}
