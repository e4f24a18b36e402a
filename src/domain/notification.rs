use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue message asking the worker to notify an incident's locality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyJob {
    pub incident_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchSummary {
    pub success: bool,
    pub message: String,
    pub results: DeliveryResults,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryResults {
    pub attempted: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FailedDelivery>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDelivery {
    pub email: String,
    pub error: String,
}

/// Per-recipient result of one send. Lives only for a single dispatch.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub email: String,
    pub error: Option<String>,
}

impl DeliveryResults {
    pub fn from_outcomes(outcomes: Vec<DeliveryOutcome>) -> Self {
        let attempted = outcomes.len();
        let failures: Vec<FailedDelivery> = outcomes
            .into_iter()
            .filter_map(|outcome| {
                outcome.error.map(|error| FailedDelivery {
                    email: outcome.email,
                    error,
                })
            })
            .collect();

        Self {
            attempted,
            successful: attempted - failures.len(),
            failed: failures.len(),
            details: if failures.is_empty() {
                None
            } else {
                Some(failures)
            },
        }
    }
}
