// Node management: the user's own clusters plus the public leaderboard.

use crate::api::ApiClient;
use crate::cookie::CookieStore;
use crate::error::Result;
use crate::models::{Node, NodeMetricRank, NodeSponsor, NodeUpdate, ResetSecret, SponsorUpdate};

const MY_NODES_PATH: &str = "/mgmt/cluster/my";
const RANK_PATH: &str = "/metric/rank";

fn node_path(id: &str) -> String {
    format!("/mgmt/cluster/{}", id)
}

pub struct NodeService {
    api: ApiClient,
    store: CookieStore,
}

impl NodeService {
    pub fn new(api: ApiClient, store: CookieStore) -> Self {
        NodeService { api, store }
    }

    pub fn list(&self) -> Result<Vec<Node>> {
        let cookies = self.store.load()?;
        self.api
            .get(&self.api.url(MY_NODES_PATH), &cookies)?
            .error_for_status()?
            .json()
    }

    pub fn detail(&self, id: &str) -> Result<Node> {
        let cookies = self.store.load()?;
        self.api
            .get(&self.api.url(&node_path(id)), &cookies)?
            .error_for_status()?
            .json()
    }

    pub fn update(&self, id: &str, update: &NodeUpdate) -> Result<()> {
        let cookies = self.store.load()?;
        self.api
            .patch(&self.api.url(&node_path(id)), Some(update), &cookies)?
            .error_for_status()?;
        Ok(())
    }

    /// Sponsor changes go through the same PATCH endpoint as other node
    /// fields and only take effect after an administrator approves them.
    pub fn update_sponsor(&self, id: &str, sponsor: NodeSponsor) -> Result<()> {
        let cookies = self.store.load()?;
        let body = SponsorUpdate { sponsor };
        self.api
            .patch(&self.api.url(&node_path(id)), Some(&body), &cookies)?
            .error_for_status()?;
        Ok(())
    }

    /// Issue a new cluster secret. The old one stops working immediately.
    pub fn reset_secret(&self, id: &str) -> Result<String> {
        let cookies = self.store.load()?;
        let url = self.api.url(&format!("{}/reset-secret", node_path(id)));
        let reset: ResetSecret = self
            .api
            .patch(&url, None::<&()>, &cookies)?
            .error_for_status()?
            .json()?;
        Ok(reset.secret)
    }

    /// Today's leaderboard. Sent with the session when one exists.
    pub fn rank(&self) -> Result<Vec<NodeMetricRank>> {
        let cookies = self.store.load_optional()?;
        self.api
            .get(&self.api.url(RANK_PATH), &cookies)?
            .error_for_status()?
            .json()
    }
}
