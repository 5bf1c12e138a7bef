use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::errors::{ApiError, ApiResult};
use crate::api::validation::{parse_field, require_text, take_field, validate_job_id};
use crate::api::AppState;
use crate::platform::{InputDataset, JobRequest, OutputDataset};
use crate::storage::{ComputeJobRecord, JobOutputRecord, JobStatusUpdate};
use crate::types::{Address, RawJobId};

#[derive(Debug, Deserialize)]
pub struct InputDatasetSpec {
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub message: String,
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    pub job_status: String,
    pub info: String,
    pub outputs: Vec<JobOutputRecord>,
}

/// Body of POST /compute after validation.
struct ValidatedSubmission {
    name: String,
    docker_image: String,
    input_datasets: Vec<InputDataset>,
    output_datasets: Vec<Map<String, Value>>,
    cmd: Vec<String>,
}

impl ValidatedSubmission {
    /// Every required field is checked for presence first, in order, so the
    /// first missing one decides the message whatever the other values hold.
    /// Types are checked only afterwards.
    fn from_body(body: Value) -> ApiResult<Self> {
        let mut body = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let name = take_field(&mut body, "name")?;
        let docker_image = take_field(&mut body, "dockerImage")?;
        let input_datasets = take_field(&mut body, "inputDatasets")?;
        let output_datasets = take_field(&mut body, "outputDatasets")?;
        let cmd = take_field(&mut body, "cmd")?;

        let name: String = parse_field(name, "name")?;
        let docker_image: String = parse_field(docker_image, "dockerImage")?;
        let input_specs: Vec<InputDatasetSpec> = parse_field(input_datasets, "inputDatasets")?;
        let output_datasets: Vec<Map<String, Value>> =
            parse_field(output_datasets, "outputDatasets")?;
        let cmd: Vec<String> = parse_field(cmd, "cmd")?;

        let input_datasets = input_specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let raw = require_text(spec.address, &format!("inputDatasets[{}].address", index))?;
                let address: Address = raw.parse().map_err(|e| {
                    ApiError::bad_request(format!("inputDatasets[{}].address is invalid: {}", index, e))
                })?;
                Ok(InputDataset {
                    address,
                    extra: spec.extra,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        Ok(ValidatedSubmission {
            name,
            docker_image,
            input_datasets,
            output_datasets,
            cmd,
        })
    }
}

/// POST /compute
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<SubmitJobResponse>> {
    let Json(body) = payload?;
    let submission = ValidatedSubmission::from_body(body)?;
    let name = submission.name.clone();

    dispatch(&state, submission)
        .await
        .map(Json)
        .map_err(|e| e.logged("POST /compute", &name))
}

async fn dispatch(state: &AppState, submission: ValidatedSubmission) -> ApiResult<SubmitJobResponse> {
    let identity = state.platform.get_token_identity().await?;

    let output_datasets = submission
        .output_datasets
        .into_iter()
        .map(|mut extra| {
            extra.remove("owner");
            OutputDataset {
                owner: identity.address,
                extra,
            }
        })
        .collect();

    let job = JobRequest {
        name: submission.name,
        docker_image: submission.docker_image,
        input_datasets: submission.input_datasets,
        output_datasets,
        cmd: submission.cmd,
    };

    let dispatcher = state
        .platform
        .connect_dispatcher(&state.dispatcher, &identity)
        .await?;
    let job_name = job.name.clone();
    let job_id = dispatcher.submit_job(job).await?.encode_hex();

    state
        .store
        .insert_job(&ComputeJobRecord::submitted(job_id.clone()))
        .await?;

    info!("Submitted job {} ({})", job_id, job_name);
    Ok(SubmitJobResponse {
        message: "job is submitted".to_string(),
        job_id,
    })
}

/// GET /jobs
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<ComputeJobRecord>>> {
    let jobs = state
        .store
        .list_jobs()
        .await
        .map_err(|e| ApiError::from(e).logged("GET /jobs", "-"))?;
    Ok(Json(jobs))
}

/// GET /job/:jobId
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let raw_id = validate_job_id(&job_id)?;
    refresh_status(&state, &raw_id)
        .await
        .map(Json)
        .map_err(|e| e.logged("GET /job", &job_id))
}

async fn refresh_status(state: &AppState, job_id: &RawJobId) -> ApiResult<JobStatusResponse> {
    let identity = state.platform.get_token_identity().await?;
    let dispatcher = state
        .platform
        .connect_dispatcher(&state.dispatcher, &identity)
        .await?;
    let job = dispatcher.get_job_info(job_id).await?;
    if job.status.is_terminal() {
        info!("Job {} finished with {}", job_id, job.status.as_status_str());
    }

    let response = JobStatusResponse {
        job_status: job.status.as_status_str().to_string(),
        info: job.info,
        outputs: job
            .outputs
            .into_iter()
            .map(|output| JobOutputRecord {
                address: output.address.to_hex(),
                metadata: output.metadata,
            })
            .collect(),
    };

    let update = JobStatusUpdate {
        status: response.job_status.clone(),
        info: response.info.clone(),
        outputs: response.outputs.clone(),
    };
    let key = job_id.encode_hex();
    if !state.store.update_job_status(&key, update).await? {
        warn!("No local record for job {}; status {:?} not mirrored", key, response.job_status);
    }

    Ok(response)
}

/// GET /job/ with the id left out
pub async fn missing_job_id() -> ApiError {
    ApiError::missing("jobId")
}
