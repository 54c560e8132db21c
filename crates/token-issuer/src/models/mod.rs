use serde::{Deserialize, Serialize};

/// Readiness probe body.
///
/// `status` is `"ready"` while rotation is healthy and `"degraded"` once the
/// consecutive failure threshold is reached. Tokens are still issued in the
/// degraded state, signed with the last registered key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub key_id: String,
    pub key_generation: u64,
    pub consecutive_rotation_failures: u32,
}
