use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use log::{debug, error, info};
use serde::Serialize;

use crate::api::errors::{ApiError, ApiResult};
use crate::api::scratch::ScratchFile;
use crate::api::validation::validate_address;
use crate::api::AppState;
use crate::platform::DatasetMetadata;
use crate::storage::DatasetRecord;
use crate::types::Address;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub address: String,
}

/// POST /upload
pub async fn upload_dataset(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Upload without multipart body: {}", rejection.body_text());
        ApiError::bad_request("No file uploaded")
    })?;

    let mut file: Option<Vec<u8>> = None;
    let mut title: Option<String> = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                if file.is_some() {
                    return Err(ApiError::bad_request("only one file may be uploaded"));
                }
                file = Some(field.bytes().await?.to_vec());
            }
            Some("title") => title = Some(field.text().await?),
            _ => {}
        }
    }

    let data = file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    let title = title
        .filter(|title| !title.is_empty())
        .ok_or_else(|| ApiError::bad_request("title is required"))?;

    store_upload(&state, data, title.clone())
        .await
        .map(Json)
        .map_err(|e| e.logged("POST /upload", &title))
}

async fn store_upload(state: &AppState, data: Vec<u8>, title: String) -> ApiResult<UploadResponse> {
    let size = data.len();
    let identity = state.platform.get_token_identity().await?;
    let metadata = DatasetMetadata {
        title: title.clone(),
    };
    let dataset = state.platform.upload_dataset(data, &metadata, &identity).await?;

    let record = DatasetRecord {
        title,
        address: dataset.address.to_hex(),
    };
    if let Err(e) = state.store.insert_dataset(&record).await {
        error!("Dataset {} uploaded but not mirrored locally", record.address);
        return Err(e.into());
    }

    info!("Uploaded dataset {} ({} bytes, title {:?})", record.address, size, record.title);
    Ok(UploadResponse {
        message: "file is uploaded".to_string(),
        address: record.address,
    })
}

/// GET /datasets
pub async fn list_datasets(State(state): State<AppState>) -> ApiResult<Json<Vec<DatasetRecord>>> {
    let datasets = state
        .store
        .list_datasets()
        .await
        .map_err(|e| ApiError::from(e).logged("GET /datasets", "-"))?;
    Ok(Json(datasets))
}

/// GET /dataset/:address
pub async fn download_dataset(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Response> {
    let address = validate_address(&address)?;
    fetch_dataset(&state, address)
        .await
        .map_err(|e| e.logged("GET /dataset", &address.to_hex()))
}

async fn fetch_dataset(state: &AppState, address: Address) -> ApiResult<Response> {
    let identity = state.platform.get_token_identity().await?;
    let dataset = state.platform.connect_dataset(&address, &identity).await?;

    let scratch = ScratchFile::create(&state.scratch_dir, &address.to_hex())?;
    state
        .platform
        .download_to_path(&dataset, &identity, scratch.path())
        .await?;
    let body = scratch.into_body().await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", address),
            ),
        ],
        body,
    )
        .into_response())
}

/// GET /dataset/ with the address left out
pub async fn missing_address() -> ApiError {
    ApiError::missing("address")
}
