//! HTTP implementation of the cloud collaborators.
//!
//! Speaks the OpenStack-style REST shapes: volume records come from the
//! volume service (`GET /volumes/{id}`), attachments go through the compute
//! service (`POST`/`DELETE /servers/{id}/os-volume_attachments`). Volume
//! sizes are reported in GiB on the wire and converted to bytes here.

use std::sync::LazyLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    ApiFuture, AttachmentHandle, CloudApiError, CloudVolumeApi, VolumeRecord, VolumeStatus,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const GIB: u64 = 1024 * 1024 * 1024;

static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Token-authenticated client for the volume and compute services.
#[derive(Clone, Debug)]
pub struct HttpVolumeApi {
    volume_api: String,
    compute_api: String,
    auth_token: String,
}

impl HttpVolumeApi {
    /// Creates a client from the two service endpoints and an auth token.
    ///
    /// Trailing slashes on the endpoints are ignored.
    #[must_use]
    pub fn new(
        volume_api: impl Into<String>,
        compute_api: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            volume_api: volume_api.into().trim_end_matches('/').to_owned(),
            compute_api: compute_api.into().trim_end_matches('/').to_owned(),
            auth_token: auth_token.into(),
        }
    }

    async fn get_inner(&self, volume_id: &str) -> Result<VolumeRecord, CloudApiError> {
        let url = format!("{}/volumes/{volume_id}", self.volume_api);
        let response = HTTP_CLIENT
            .get(&url)
            .header("X-Auth-Token", &self.auth_token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudApiError::NotFound {
                volume_id: volume_id.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let body: VolumeShowResponse = response.json().await.map_err(transport)?;
        Ok(body.volume.into_record())
    }

    async fn attach_inner(
        &self,
        host_id: &str,
        volume_id: &str,
    ) -> Result<AttachmentHandle, CloudApiError> {
        let url = format!(
            "{}/servers/{host_id}/os-volume_attachments",
            self.compute_api
        );
        let request = AttachRequest {
            volume_attachment: AttachBody {
                volume_id,
                device: None,
            },
        };
        let response = HTTP_CLIENT
            .post(&url)
            .header("X-Auth-Token", &self.auth_token)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudApiError::NotFound {
                volume_id: volume_id.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }

        let body: AttachResponse = response.json().await.map_err(transport)?;
        Ok(body.volume_attachment.into_handle())
    }

    async fn detach_inner(&self, host_id: &str, volume_id: &str) -> Result<(), CloudApiError> {
        let url = format!(
            "{}/servers/{host_id}/os-volume_attachments/{volume_id}",
            self.compute_api
        );
        let response = HTTP_CLIENT
            .delete(&url)
            .header("X-Auth-Token", &self.auth_token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CloudApiError::NotFound {
                volume_id: volume_id.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(api_error(status, response).await);
        }
        Ok(())
    }
}

impl CloudVolumeApi for HttpVolumeApi {
    fn attach<'a>(
        &'a self,
        host_id: &'a str,
        volume_id: &'a str,
    ) -> ApiFuture<'a, AttachmentHandle> {
        Box::pin(self.attach_inner(host_id, volume_id))
    }

    fn detach<'a>(&'a self, host_id: &'a str, volume_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(self.detach_inner(host_id, volume_id))
    }

    fn get<'a>(&'a self, volume_id: &'a str) -> ApiFuture<'a, VolumeRecord> {
        Box::pin(self.get_inner(volume_id))
    }
}

fn transport(err: reqwest::Error) -> CloudApiError {
    CloudApiError::Transport {
        message: err.to_string(),
    }
}

async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> CloudApiError {
    CloudApiError::Api {
        status: status.as_u16(),
        message: response.text().await.unwrap_or_default(),
    }
}

#[derive(Debug, Deserialize)]
struct VolumeShowResponse {
    volume: VolumeWire,
}

#[derive(Debug, Deserialize)]
struct VolumeWire {
    id: String,
    size: u64,
    status: String,
}

impl VolumeWire {
    fn into_record(self) -> VolumeRecord {
        VolumeRecord {
            id: self.id,
            size_bytes: self.size.saturating_mul(GIB),
            status: VolumeStatus::from(self.status.as_str()),
        }
    }
}

#[derive(Debug, Serialize)]
struct AttachRequest<'a> {
    #[serde(rename = "volumeAttachment")]
    volume_attachment: AttachBody<'a>,
}

#[derive(Debug, Serialize)]
struct AttachBody<'a> {
    #[serde(rename = "volumeId")]
    volume_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct AttachResponse {
    #[serde(rename = "volumeAttachment")]
    volume_attachment: AttachmentWire,
}

#[derive(Debug, Deserialize)]
struct AttachmentWire {
    id: String,
    #[serde(rename = "volumeId")]
    volume_id: String,
    #[serde(default)]
    device: Option<String>,
}

impl AttachmentWire {
    fn into_handle(self) -> AttachmentHandle {
        AttachmentHandle {
            id: self.id,
            volume_id: self.volume_id,
            device: self.device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_wire_converts_gib_to_bytes() {
        let raw = r#"{"volume": {"id": "vol-1", "size": 2, "status": "available"}}"#;
        let parsed: Result<VolumeShowResponse, _> = serde_json::from_str(raw);
        let Ok(body) = parsed else {
            panic!("volume payload did not parse");
        };
        let record = body.volume.into_record();
        assert_eq!(record.id, "vol-1");
        assert_eq!(record.size_bytes, 2 * GIB);
        assert_eq!(record.status, VolumeStatus::Available);
    }

    #[test]
    fn attachment_wire_tolerates_missing_device() {
        let raw = r#"{"volumeAttachment": {"id": "att-1", "volumeId": "vol-1"}}"#;
        let parsed: Result<AttachResponse, _> = serde_json::from_str(raw);
        let Ok(body) = parsed else {
            panic!("attachment payload did not parse");
        };
        let handle = body.volume_attachment.into_handle();
        assert_eq!(handle.id, "att-1");
        assert_eq!(handle.volume_id, "vol-1");
        assert_eq!(handle.device, None);
    }

    #[test]
    fn attach_request_serialises_compute_shape() {
        let request = AttachRequest {
            volume_attachment: AttachBody {
                volume_id: "vol-1",
                device: None,
            },
        };
        let encoded = serde_json::to_string(&request).unwrap_or_default();
        assert_eq!(encoded, r#"{"volumeAttachment":{"volumeId":"vol-1"}}"#);
    }

    #[test]
    fn endpoints_are_normalised() {
        let api = HttpVolumeApi::new(
            "https://volume.example/v3/proj/",
            "https://compute.example/v2.1",
            "token",
        );
        assert_eq!(api.volume_api, "https://volume.example/v3/proj");
        assert_eq!(api.compute_api, "https://compute.example/v2.1");
    }
}
