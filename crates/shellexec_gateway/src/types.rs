use serde::{Deserialize, Serialize};
use shellexec_os::Execution;

/// Reply body shared by the Execute trigger and the configuration update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub message: String,
    /// Present only when the script actually ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl ExecuteResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            exit_code: None,
        }
    }
}

impl From<Execution> for ExecuteResponse {
    fn from(outcome: Execution) -> Self {
        match outcome {
            Execution::Completed(result) => Self {
                exit_code: Some(result.exit_code),
                ..Self::success("Script executed successfully")
            },
            // Nothing ran, but nothing went wrong either
            Execution::Skipped { reason } => Self::success(reason),
            Execution::Failed { error } => Self::failure(error),
        }
    }
}
