// ── Fleet facade ──
//
// One backend connection: the API client, the session bound to it, and
// factories for the standard pollers at their configured cadences.
// Views own the poller handles they create; dropping a handle stops it.

use std::sync::Arc;

use uuid::Uuid;

use fleetwatch_api::{
    Action, ActionQuery, Agent, AgentDetail, ApiClient, Container, ContainerQuery, DashboardData,
    Image, ImageQuery,
};

use crate::action::ActionSubmitter;
use crate::config::FleetConfig;
use crate::error::CoreError;
use crate::poller::{PollerHandle, ResourcePoller};
use crate::session::{CredentialStore, Session};

pub struct Fleet {
    config: FleetConfig,
    session: Session,
}

impl Fleet {
    /// Build the client and session. Does not touch the network; call
    /// `session().restore()` or `session().login(..)` next.
    pub fn new(config: FleetConfig, store: Arc<dyn CredentialStore>) -> Result<Self, CoreError> {
        let client = Arc::new(ApiClient::new(config.url.clone(), &config.transport())?);
        Ok(Self {
            session: Session::new(client, store),
            config,
        })
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        self.session.client()
    }

    // ── Pollers ──────────────────────────────────────────────────────

    /// Agent list, refreshed at the liveness cadence.
    pub fn agents_poller(&self) -> PollerHandle<(), Vec<Agent>> {
        let client = Arc::clone(self.client());
        ResourcePoller::new("agents", self.config.agents_interval, (), move |()| {
            let client = Arc::clone(&client);
            async move { client.list_agents().await.map_err(CoreError::from) }
        })
        .start()
    }

    pub fn dashboard_poller(&self) -> PollerHandle<(), DashboardData> {
        let client = Arc::clone(self.client());
        ResourcePoller::new("dashboard", self.config.dashboard_interval, (), move |()| {
            let client = Arc::clone(&client);
            async move { client.dashboard().await.map_err(CoreError::from) }
        })
        .start()
    }

    pub fn agent_detail_poller(&self, agent_id: Uuid) -> PollerHandle<Uuid, AgentDetail> {
        let client = Arc::clone(self.client());
        ResourcePoller::new("agent-detail", self.config.detail_interval, agent_id, move |id| {
            let client = Arc::clone(&client);
            async move { client.get_agent(id).await.map_err(CoreError::from) }
        })
        .start()
    }

    /// Container list. Changing the query through
    /// [`PollerHandle::set_params`] is debounced by `filter_debounce`.
    pub fn containers_poller(&self, query: ContainerQuery) -> PollerHandle<ContainerQuery, Vec<Container>> {
        let client = Arc::clone(self.client());
        ResourcePoller::new("containers", self.config.detail_interval, query, move |query| {
            let client = Arc::clone(&client);
            async move { client.list_containers(&query).await.map_err(CoreError::from) }
        })
        .debounce(self.config.filter_debounce)
        .start()
    }

    pub fn images_poller(&self, query: ImageQuery) -> PollerHandle<ImageQuery, Vec<Image>> {
        let client = Arc::clone(self.client());
        ResourcePoller::new("images", self.config.detail_interval, query, move |query| {
            let client = Arc::clone(&client);
            async move { client.list_images(&query).await.map_err(CoreError::from) }
        })
        .debounce(self.config.filter_debounce)
        .start()
    }

    pub fn actions_poller(&self, query: ActionQuery) -> PollerHandle<ActionQuery, Vec<Action>> {
        let client = Arc::clone(self.client());
        ResourcePoller::new("actions", self.config.actions_interval, query, move |query| {
            let client = Arc::clone(&client);
            async move { client.list_actions(&query).await.map_err(CoreError::from) }
        })
        .debounce(self.config.filter_debounce)
        .start()
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub fn action_submitter(&self) -> ActionSubmitter {
        ActionSubmitter::new(Arc::clone(self.client()))
    }

    /// Submitter that refreshes `history` after every queued action, so the
    /// new record shows up without waiting for the next tick.
    pub fn action_submitter_for(
        &self,
        history: &PollerHandle<ActionQuery, Vec<Action>>,
    ) -> ActionSubmitter {
        self.action_submitter().with_refresh(history.trigger())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::session::MemoryCredentialStore;

    async fn fleet(server: &MockServer) -> Fleet {
        let mut config = FleetConfig::new(server.uri().parse().unwrap());
        config.agents_interval = Duration::from_secs(60);
        Fleet::new(config, Arc::new(MemoryCredentialStore::default())).unwrap()
    }

    #[tokio::test]
    async fn agents_poller_loads_on_start() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/agents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "6f1c1f9e-4c7e-4b36-9f7e-0d6d3c1b2a11",
                "name": "edge-1",
                "is_active": true,
                "created": "2024-05-01T12:00:00Z",
                "status": "online"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let fleet = fleet(&server).await;
        let handle = fleet.agents_poller();
        let mut rx = handle.subscribe();
        let state = rx.wait_for(|s| s.generation > 0).await.unwrap().clone();

        let agents = state.data.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].name, "edge-1");
        assert!(state.error.is_none());
        handle.stop();
    }

    #[tokio::test]
    async fn submitting_refreshes_the_action_history() {
        let server = MockServer::start().await;
        let agent_id = Uuid::new_v4();
        let queued = serde_json::json!({
            "id": Uuid::new_v4(),
            "agent_id": agent_id,
            "type": "restart_nginx",
            "payload": {},
            "status": "pending",
            "created": "2024-05-01T12:00:00Z"
        });

        Mock::given(method("GET"))
            .and(path("/api/actions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "actions": [], "total": 0 })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/actions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "actions": [queued.clone()], "total": 1 })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/actions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(queued))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = FleetConfig::new(server.uri().parse().unwrap());
        config.actions_interval = Duration::from_secs(3600);
        let fleet = Fleet::new(config, Arc::new(MemoryCredentialStore::default())).unwrap();

        let history = fleet.actions_poller(ActionQuery {
            agent_id: Some(agent_id),
            ..ActionQuery::default()
        });
        let mut rx = history.subscribe();
        let first = rx.wait_for(|s| s.generation == 1).await.unwrap().clone();
        assert!(first.data.unwrap().is_empty());

        let action = fleet
            .action_submitter_for(&history)
            .submit_command(agent_id, &crate::action::ActionCommand::RestartNginx)
            .await
            .unwrap();

        let state = rx.wait_for(|s| s.generation == 2).await.unwrap().clone();
        let listed = state.data.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, action.id);
        history.stop();
    }

    #[tokio::test]
    async fn unauthorized_poll_ends_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let fleet = fleet(&server).await;
        fleet.client().set_token(SecretString::from("stale"));

        let handle = fleet.dashboard_poller();
        let mut rx = handle.subscribe();
        let state = rx.wait_for(|s| s.generation > 0).await.unwrap().clone();

        assert!(state.data.is_none());
        assert!(state.error.is_some());
        assert!(!fleet.client().has_token());
        assert!(!fleet.session().is_authenticated());
    }
}
