// Typed records for the remote API. Field names mirror the JSON the
// service returns; everything non-essential is defaulted because the
// API omits fields freely (e.g. `downReason` only exists on offline nodes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GitHubProfile {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub blog: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "_json")]
    pub raw_profile: GitHubProfile,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct HourlyMetric {
    #[serde(rename = "_id")]
    pub hour: i64,
    #[serde(default)]
    pub bytes: i64,
    #[serde(default)]
    pub hits: i64,
    #[serde(default)]
    pub bandwidth: f64,
    #[serde(default)]
    pub nodes: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(default)]
    pub bytes: i64,
    #[serde(default)]
    pub hits: i64,
    #[serde(default)]
    pub hourly: Vec<HourlyMetric>,
    #[serde(default)]
    pub bandwidth: f64,
    #[serde(default)]
    pub current_bandwidth: f64,
    #[serde(default)]
    pub load: f64,
    #[serde(default)]
    pub current_nodes: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSponsor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub banner: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NodeEndpoint {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub proto: String,
    #[serde(default)]
    pub byoc: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct NodeFlavor {
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub storage: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_size: bool,
    #[serde(default)]
    pub bandwidth: i64,
    #[serde(default)]
    pub measure_bandwidth: i64,
    #[serde(default)]
    pub shards: Vec<String>,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub trust: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_reason: Option<String>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub sponsor: NodeSponsor,
    #[serde(default)]
    pub endpoint: NodeEndpoint,
    #[serde(default)]
    pub no_fast_enable: bool,
    #[serde(default)]
    pub uptime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub downtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flavor: NodeFlavor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban_reason: Option<String>,
    #[serde(default)]
    pub is_banned: bool,
}

/// Editable node fields (`PATCH /mgmt/cluster/{id}`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bandwidth: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SponsorUpdate {
    #[serde(default)]
    pub sponsor: NodeSponsor,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetSecret {
    pub secret: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RankOwner {
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RankMetric {
    #[serde(default, rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub cluster_id: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bytes: i64,
    #[serde(default)]
    pub hits: i64,
}

/// One leaderboard row (`GET /metric/rank`).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetricRank {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub full_size: bool,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<RankOwner>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_reason: Option<String>,
    #[serde(default)]
    pub downtime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sponsor: NodeSponsor,
    #[serde(default)]
    pub metric: RankMetric,
}

/// `{code, msg, data, time}` wrapper used by the local web server.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Envelope<T> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
    pub time: i64,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Envelope {
            code: 200,
            msg: "success".to_string(),
            data: Some(data),
            time: Utc::now().timestamp(),
        }
    }

    pub fn error(code: u16, msg: impl Into<String>) -> Self {
        Envelope {
            code,
            msg: msg.into(),
            data: None,
            time: Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_decodes_with_missing_optional_fields() {
        let node: Node = serde_json::from_str(
            r#"{
                "_id": "abc123",
                "name": "edge-1",
                "isEnabled": false,
                "downReason": "manual",
                "trust": -3,
                "createdAt": "2024-03-01T08:00:00.000Z",
                "endpoint": {"host": "1.2.3.4", "port": 4000, "proto": "https"},
                "sponsor": {"name": "acme"}
            }"#,
        )
        .unwrap();
        assert_eq!(node.id, "abc123");
        assert!(!node.is_enabled);
        assert_eq!(node.down_reason.as_deref(), Some("manual"));
        assert_eq!(node.trust, -3);
        assert!(node.created_at.is_some());
        assert!(node.uptime.is_none());
        assert_eq!(node.endpoint.port, 4000);
        assert_eq!(node.sponsor.url, "");
    }

    #[test]
    fn dashboard_uses_camel_case() {
        let dashboard: Dashboard = serde_json::from_str(
            r#"{"bytes": 10, "hits": 2, "currentNodes": 512, "currentBandwidth": 1200.5,
                "load": 0.42, "bandwidth": 3000, "hourly": [{"_id": 7, "nodes": 400}]}"#,
        )
        .unwrap();
        assert_eq!(dashboard.current_nodes, 512);
        assert_eq!(dashboard.hourly[0].hour, 7);
        assert_eq!(dashboard.hourly[0].bytes, 0);
    }

    #[test]
    fn sponsor_update_wraps_sponsor_object() {
        let body = serde_json::to_value(SponsorUpdate {
            sponsor: NodeSponsor {
                name: "n".into(),
                url: "u".into(),
                banner: "b".into(),
            },
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"sponsor": {"name": "n", "url": "u", "banner": "b"}})
        );
    }

    #[test]
    fn error_envelope_has_null_data() {
        let value = serde_json::to_value(Envelope::<()>::error(405, "Method not allowed")).unwrap();
        assert_eq!(value["code"], 405);
        assert!(value["data"].is_null());
        assert!(value["time"].as_i64().unwrap() > 0);
    }
}
