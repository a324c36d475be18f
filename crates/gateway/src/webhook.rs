use {
    axum::{Json, extract::State},
    parley_telegram::Update,
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use crate::state::GatewayState;

/// `POST /webhook`: answer one Telegram update.
///
/// Always responds 200 once the body parsed, so Telegram never redelivers an
/// update and re-runs inference. Inference is cut off at the reply deadline
/// so the apology still goes out before the request timeout. Delivery
/// failures are reported in the body.
pub async fn webhook_handler(
    State(state): State<GatewayState>,
    Json(update): Json<Update>,
) -> Json<Value> {
    let Some(inbound) = update.inbound() else {
        debug!(update_id = update.update_id, "update without message, ignoring");
        return Json(json!({"ok": true, "note": "no message"}));
    };

    let reply = state
        .orchestrator
        .respond_within(&inbound.chat, &inbound.text, state.reply_deadline)
        .await;
    debug!(
        update_id = update.update_id,
        chat = %inbound.chat,
        kind = reply.kind.as_str(),
        "reply ready"
    );

    match state.relay.send_text(&inbound.chat, &reply.text).await {
        Ok(()) => Json(json!({"ok": true})),
        Err(e) => {
            warn!(chat = %inbound.chat, error = %e, "failed to deliver reply");
            Json(json!({"ok": false, "error": e.to_string()}))
        },
    }
}

/// `GET /health`
pub async fn health_handler(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": state.version,
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "backends": &*state.backend_ids,
        "active_chats": state.memory().chat_count(),
    }))
}
