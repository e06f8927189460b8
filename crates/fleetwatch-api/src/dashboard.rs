use crate::client::ApiClient;
use crate::error::Error;
use crate::models::DashboardData;

impl ApiClient {
    /// `GET /api/dashboard`: KPIs, time series, and per-agent summary.
    pub async fn dashboard(&self) -> Result<DashboardData, Error> {
        self.get("api/dashboard").await
    }
}
