use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub api_base_url: String,
    pub scam_api_base_url: String,
    /// IANA name, e.g. `Asia/Kolkata`.
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdateInput {
    pub api_base_url: Option<String>,
    pub scam_api_base_url: Option<String>,
    pub timezone: Option<String>,
}
