// Remote action endpoints.
//
// The backend queues actions for the agent's next check-in; creation only
// ever returns a `pending` record. Outcomes are observed by re-listing.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Action, ActionListResponse, ActionQuery, CreateActionRequest};

impl ApiClient {
    /// `GET /api/actions`, newest first.
    pub async fn list_actions(&self, query: &ActionQuery) -> Result<Vec<Action>, Error> {
        let resp: ActionListResponse = self
            .get_with_params("api/actions", &query.to_params())
            .await?;
        Ok(resp.into_actions())
    }

    /// `POST /api/actions`
    pub async fn create_action(&self, req: &CreateActionRequest) -> Result<Action, Error> {
        debug!(agent_id = %req.agent_id, action = %req.action_type, "queueing action");
        self.post("api/actions", req).await
    }
}
