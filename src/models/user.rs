use serde::{Deserialize, Serialize};

/// User decoded from the bearer token, stored in request extensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub email: String,
}
