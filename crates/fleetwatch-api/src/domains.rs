// Reverse-proxy domain and route endpoints.

use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{
    CreateDomainRequest, CreateDomainRouteRequest, Domain, DomainDetail, DomainListResponse,
    DomainRoute, DomainRouteListResponse, DomainStatus, UpdateDomainRequest,
    UpdateDomainRouteRequest,
};

impl ApiClient {
    // ── Domains ──────────────────────────────────────────────────────

    pub async fn list_domains(&self) -> Result<Vec<Domain>, Error> {
        let resp: DomainListResponse = self.get("api/domains").await?;
        Ok(resp.domains)
    }

    pub async fn get_domain(&self, id: Uuid) -> Result<DomainDetail, Error> {
        self.get(&format!("api/domains/{id}")).await
    }

    pub async fn create_domain(&self, req: &CreateDomainRequest) -> Result<Domain, Error> {
        self.post("api/domains", req).await
    }

    pub async fn update_domain(
        &self,
        id: Uuid,
        req: &UpdateDomainRequest,
    ) -> Result<Domain, Error> {
        self.put(&format!("api/domains/{id}"), req).await
    }

    pub async fn delete_domain(&self, id: Uuid) -> Result<(), Error> {
        self.delete(&format!("api/domains/{id}")).await
    }

    /// `GET /api/domains/{id}/status`: proxy health per route.
    pub async fn domain_status(&self, id: Uuid) -> Result<DomainStatus, Error> {
        self.get(&format!("api/domains/{id}/status")).await
    }

    // ── Routes ───────────────────────────────────────────────────────

    pub async fn list_domain_routes(&self, domain_id: Uuid) -> Result<Vec<DomainRoute>, Error> {
        let resp: DomainRouteListResponse =
            self.get(&format!("api/domains/{domain_id}/routes")).await?;
        Ok(resp.routes)
    }

    pub async fn create_domain_route(
        &self,
        req: &CreateDomainRouteRequest,
    ) -> Result<DomainRoute, Error> {
        self.post("api/domains/routes", req).await
    }

    pub async fn update_domain_route(
        &self,
        id: Uuid,
        req: &UpdateDomainRouteRequest,
    ) -> Result<DomainRoute, Error> {
        self.put(&format!("api/domains/routes/{id}"), req).await
    }

    pub async fn delete_domain_route(&self, id: Uuid) -> Result<(), Error> {
        self.delete(&format!("api/domains/routes/{id}")).await
    }
}
