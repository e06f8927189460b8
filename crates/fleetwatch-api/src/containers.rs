use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Container, ContainerDetail, ContainerListResponse, ContainerLog, ContainerQuery};

impl ApiClient {
    /// `GET /api/containers` with optional server-side filters.
    pub async fn list_containers(&self, query: &ContainerQuery) -> Result<Vec<Container>, Error> {
        let resp: ContainerListResponse = self
            .get_with_params("api/containers", &query.to_params())
            .await?;
        Ok(resp.containers)
    }

    /// `GET /api/containers/{id}` (record id, not the docker container id).
    pub async fn get_container(&self, id: Uuid) -> Result<ContainerDetail, Error> {
        self.get(&format!("api/containers/{id}")).await
    }

    /// `GET /api/containers/{id}/logs`
    pub async fn container_logs(&self, id: Uuid) -> Result<Vec<ContainerLog>, Error> {
        let logs: Option<Vec<ContainerLog>> =
            self.get(&format!("api/containers/{id}/logs")).await?;
        Ok(logs.unwrap_or_default())
    }
}
