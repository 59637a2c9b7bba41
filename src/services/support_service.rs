//! Support service for recording tickets and forwarding them to the
//! support desk.
//!
//! Forwarding is best-effort: the ticket is stored first, then POSTed to the
//! configured webhook with an HMAC-SHA256 signature. Delivery failures are
//! logged and leave `notified = false`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::SupportWebhook;
use crate::db::DbPool;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::support::{CreateTicketRequest, SupportNotification, SupportTicket};

type HmacSha256 = Hmac<Sha256>;

const TICKET_COLUMNS: &str =
    "id, user_id, subject, message, priority, status, notified, created_at";

/// Create a ticket and forward it to the support desk if one is configured.
pub async fn create_ticket(
    pool: &DbPool,
    auth: &AuthContext,
    webhook: Option<SupportWebhook>,
    request: CreateTicketRequest,
) -> Result<SupportTicket, AppError> {
    request.validate()?;

    let mut ticket = sqlx::query_as::<_, SupportTicket>(&format!(
        r#"
        INSERT INTO support_tickets (company_id, user_id, subject, message, priority)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {TICKET_COLUMNS}
        "#
    ))
    .bind(auth.company_id)
    .bind(auth.user_id)
    .bind(request.subject.trim())
    .bind(request.message.trim())
    .bind(request.priority.as_str())
    .fetch_one(pool)
    .await?;

    let Some(webhook) = webhook else {
        return Ok(ticket);
    };

    let company_name: String = sqlx::query_scalar("SELECT name FROM companies WHERE id = $1")
        .bind(auth.company_id)
        .fetch_one(pool)
        .await?;

    let notification = SupportNotification {
        event: "support.ticket_created",
        ticket_id: ticket.id,
        company_name,
        user_email: auth.email.clone(),
        subject: ticket.subject.clone(),
        message: ticket.message.clone(),
        priority: ticket.priority.clone(),
        created_at: ticket.created_at,
    };

    match send_notification(&webhook, &notification).await {
        Ok(()) => {
            ticket.notified = true;
            // Delivered already; a failed flag update must not fail the request
            if let Err(e) = sqlx::query("UPDATE support_tickets SET notified = true WHERE id = $1")
                .bind(ticket.id)
                .execute(pool)
                .await
            {
                tracing::error!(ticket_id = %ticket.id, "Failed to mark ticket as notified: {}", e);
            }
        }
        Err(e) => {
            // Ticket is saved; the support desk can still pick it up from the list
            tracing::error!(ticket_id = %ticket.id, "Failed to forward support ticket: {}", e);
        }
    }

    Ok(ticket)
}

/// List a company's tickets, newest first.
pub async fn list_tickets(pool: &DbPool, company_id: Uuid) -> Result<Vec<SupportTicket>, AppError> {
    let tickets = sqlx::query_as::<_, SupportTicket>(&format!(
        "SELECT {TICKET_COLUMNS} FROM support_tickets WHERE company_id = $1 ORDER BY created_at DESC"
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(tickets)
}

/// POST the notification with a signature header.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Pix-Signature: sha256=<hex>`
/// - `X-Pix-Event-Id: <ticket uuid>`
///
/// # Timeout
///
/// 5 seconds; a slow support desk must not hold the request open.
async fn send_notification(
    webhook: &SupportWebhook,
    notification: &SupportNotification,
) -> Result<(), String> {
    let payload = serde_json::to_string(notification)
        .map_err(|e| format!("Failed to serialize payload: {}", e))?;
    let signature = generate_signature(&webhook.secret, &payload);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .map_err(|e| format!("HTTP client error: {}", e))?;

    let response = client
        .post(&webhook.url)
        .header("Content-Type", "application/json")
        .header("X-Pix-Signature", &signature)
        .header("X-Pix-Event-Id", notification.ticket_id.to_string())
        .body(payload)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    if !response.status().is_success() {
        return Err(format!("Support desk answered {}", response.status()));
    }
    Ok(())
}

/// Generate HMAC-SHA256 signature for a payload.
///
/// # Format
///
/// `sha256=<hex_encoded_hmac>`
fn generate_signature(secret: &str, payload: &str) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Validate webhook URL format.
///
/// # Rules
///
/// - Must be valid URL
/// - Must be HTTPS (HTTP localhost allowed for development)
/// - Maximum 2048 characters
pub fn validate_webhook_url(url: &str) -> Result<(), String> {
    if url.len() > 2048 {
        return Err("URL exceeds 2048 characters".to_string());
    }

    let parsed = url::Url::parse(url).map_err(|_| "Invalid URL format".to_string())?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => match parsed.host_str() {
            Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0") => Ok(()),
            _ => Err("HTTP is only allowed for localhost. Use HTTPS for production.".to_string()),
        },
        _ => Err("URL must use HTTP or HTTPS".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_known_hmac() {
        // RFC 4231 test case 2
        let signature = generate_signature("Jefe", "what do ya want for nothing?");
        assert_eq!(
            signature,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn webhook_url_rules() {
        assert!(validate_webhook_url("https://desk.example.com/hooks/pix").is_ok());
        assert!(validate_webhook_url("http://localhost:8080/hook").is_ok());
        assert!(validate_webhook_url("http://desk.example.com/hook").is_err());
        assert!(validate_webhook_url("ftp://desk.example.com").is_err());
        assert!(validate_webhook_url("not a url").is_err());
        let long = format!("https://example.com/{}", "a".repeat(2048));
        assert!(validate_webhook_url(&long).is_err());
    }
}
