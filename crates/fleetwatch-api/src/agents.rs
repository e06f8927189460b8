// Agent registry endpoints.

use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{
    Agent, AgentDetail, AgentNginxConfig, Container, CreateAgentRequest, SystemMetric,
    UpdateAgentRequest,
};

impl ApiClient {
    /// `GET /api/agents`
    pub async fn list_agents(&self) -> Result<Vec<Agent>, Error> {
        let agents: Option<Vec<Agent>> = self.get("api/agents").await?;
        Ok(agents.unwrap_or_default())
    }

    /// `GET /api/agents/{id}` with nested containers, images, volumes,
    /// networks and metrics.
    pub async fn get_agent(&self, id: Uuid) -> Result<AgentDetail, Error> {
        self.get(&format!("api/agents/{id}")).await
    }

    /// `POST /api/agents`. The returned record carries the enrollment token.
    ///
    /// A duplicate name comes back as [`Error::Conflict`].
    pub async fn create_agent(&self, req: &CreateAgentRequest) -> Result<Agent, Error> {
        self.post("api/agents", req).await
    }

    /// `PUT /api/agents/{id}`
    pub async fn update_agent(&self, id: Uuid, req: &UpdateAgentRequest) -> Result<Agent, Error> {
        self.put(&format!("api/agents/{id}"), req).await
    }

    /// `DELETE /api/agents/{id}`
    pub async fn delete_agent(&self, id: Uuid) -> Result<(), Error> {
        self.delete(&format!("api/agents/{id}")).await
    }

    /// `GET /api/agents/{id}/metrics?limit=N`, newest first.
    pub async fn agent_metrics(&self, id: Uuid, limit: u32) -> Result<Vec<SystemMetric>, Error> {
        let metrics: Option<Vec<SystemMetric>> = self
            .get_with_params(
                &format!("api/agents/{id}/metrics"),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(metrics.unwrap_or_default())
    }

    /// `GET /api/agents/{id}/containers`
    pub async fn agent_containers(&self, id: Uuid) -> Result<Vec<Container>, Error> {
        let containers: Option<Vec<Container>> =
            self.get(&format!("api/agents/{id}/containers")).await?;
        Ok(containers.unwrap_or_default())
    }

    /// `GET /api/agents/{id}/nginx-config`
    pub async fn agent_nginx_config(&self, id: Uuid) -> Result<AgentNginxConfig, Error> {
        self.get(&format!("api/agents/{id}/nginx-config")).await
    }
}
