//! A2A JSON-RPC endpoint.
//!
//! Only `message/send` does work: the text parts of the incoming message are
//! handed to the agent and the reply comes back as a completed task. Tasks are
//! not retained, so `tasks/get` and `tasks/cancel` always report
//! "task not found".

use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use uuid::Uuid;

use super::routes::AppState;
use super::types::{
    Artifact, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams, Part,
    Task, TaskState, TaskStatus,
};

/// POST / - JSON-RPC 2.0 entry point.
pub async fn handle_rpc(State(state): State<Arc<AppState>>, body: Bytes) -> Json<JsonRpcResponse> {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(JsonRpcError::PARSE_ERROR, format!("Parse error: {}", e)),
            ));
        }
    };

    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(
                    JsonRpcError::INVALID_REQUEST,
                    format!("Invalid request: {}", e),
                ),
            ));
        }
    };

    if request.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::failure(
            request.id,
            JsonRpcError::new(JsonRpcError::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        ));
    }

    tracing::debug!(method = %request.method, "JSON-RPC request");

    let outcome = match request.method.as_str() {
        "message/send" => message_send(&state, request.params).await,
        "tasks/get" | "tasks/cancel" => Err(JsonRpcError::new(
            JsonRpcError::TASK_NOT_FOUND,
            "Task not found",
        )),
        other => Err(JsonRpcError::new(
            JsonRpcError::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    };

    Json(match outcome {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(error) => JsonRpcResponse::failure(request.id, error),
    })
}

async fn message_send(state: &AppState, params: Value) -> Result<Value, JsonRpcError> {
    let params: MessageSendParams = serde_json::from_value(params).map_err(|e| {
        JsonRpcError::new(JsonRpcError::INVALID_PARAMS, format!("Invalid params: {}", e))
    })?;

    let text = params.message.text();
    if text.trim().is_empty() {
        return Err(JsonRpcError::new(
            JsonRpcError::INVALID_PARAMS,
            "Message contains no text parts",
        ));
    }

    let task_id = params
        .message
        .task_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let context_id = params
        .message
        .context_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let reply = state.agent.run(&text).await.map_err(|e| {
        tracing::warn!("{} failed: {}", state.agent.name(), e);
        JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, format!("Agent error: {}", e))
    })?;

    let mut request_message = params.message;
    request_message.task_id = Some(task_id.clone());
    request_message.context_id = Some(context_id.clone());

    let task = Task {
        id: task_id.clone(),
        context_id: context_id.clone(),
        status: TaskStatus {
            state: TaskState::Completed,
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
        artifacts: vec![Artifact {
            artifact_id: Uuid::new_v4().to_string(),
            name: "agent_response".to_string(),
            parts: vec![Part::Text {
                text: reply.clone(),
            }],
        }],
        history: vec![
            request_message,
            Message::agent_text(reply, &context_id, &task_id),
        ],
        kind: "task".to_string(),
    };

    serde_json::to_value(task)
        .map_err(|e| JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, e.to_string()))
}
