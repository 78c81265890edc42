use crate::api::ApiClient;
use crate::error::Result;
use crate::models::Dashboard;

const DASHBOARD_PATH: &str = "/metric/dashboard";

/// Public cluster-wide metrics. No session is needed.
pub struct DashboardService {
    api: ApiClient,
}

impl DashboardService {
    pub fn new(api: ApiClient) -> Self {
        DashboardService { api }
    }

    pub fn dashboard(&self) -> Result<Dashboard> {
        self.api
            .get(&self.api.url(DASHBOARD_PATH), &[])?
            .error_for_status()?
            .json()
    }
}
