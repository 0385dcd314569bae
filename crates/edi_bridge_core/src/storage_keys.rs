use crate::execution::ExecutionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionArtifact {
    Input,
    Failure,
    IssuedControlNumber,
}

impl ExecutionArtifact {
    fn file_name(self) -> &'static str {
        match self {
            Self::Input => "input.json",
            Self::Failure => "failure.json",
            Self::IssuedControlNumber => "control-number.json",
        }
    }
}

pub fn execution_prefix(function_name: &str, execution_id: &ExecutionId) -> String {
    format!("functions/{function_name}/{execution_id}")
}

pub fn execution_artifact_key(
    function_name: &str,
    execution_id: &ExecutionId,
    artifact: ExecutionArtifact,
) -> String {
    format!(
        "{}/{}",
        execution_prefix(function_name, execution_id),
        artifact.file_name()
    )
}

pub fn execution_input_key(function_name: &str, execution_id: &ExecutionId) -> String {
    execution_artifact_key(function_name, execution_id, ExecutionArtifact::Input)
}

pub fn execution_failure_key(function_name: &str, execution_id: &ExecutionId) -> String {
    execution_artifact_key(function_name, execution_id, ExecutionArtifact::Failure)
}

pub fn issued_control_number_key(function_name: &str, execution_id: &ExecutionId) -> String {
    execution_artifact_key(
        function_name,
        execution_id,
        ExecutionArtifact::IssuedControlNumber,
    )
}

pub fn outbound_document_key(receiver_id: &str, control_number: &str) -> String {
    format!("trading_partners/{receiver_id}/outbound/{control_number}.edi")
}
