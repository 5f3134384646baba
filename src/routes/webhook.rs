use axum::Json;

use crate::models::submission::{MessageResponse, WebhookPayload};

/// POST /webhook: local receiver for completion callbacks, handy when
/// pointing a job's `webhookUrl` back at this service.
pub async fn receive_webhook(Json(payload): Json<WebhookPayload>) -> Json<MessageResponse> {
    tracing::info!(
        job_id = %payload.request_id,
        status = %payload.status,
        images = payload.compressed_images.len(),
        output_csv = ?payload.output_csv,
        "Webhook received"
    );

    Json(MessageResponse {
        message: "Webhook Received".to_string(),
    })
}
