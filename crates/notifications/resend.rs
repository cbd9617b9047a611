use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;
use tracing::{debug, error};

use super::{MailSender, OutgoingEmail};

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

/// Resend accepts at most this many addresses per message.
pub const MAX_RECIPIENTS_PER_MESSAGE: usize = 50;

#[derive(Debug, Clone)]
pub struct ResendSettings {
    pub api_key: String,
    pub from: String,
    pub timeout: Duration,
}

pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
}

impl ResendMailer {
    pub fn new(settings: ResendSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("failed to build resend http client")?;

        Ok(Self {
            http,
            api_key: settings.api_key,
            from: settings.from,
        })
    }
}

#[async_trait]
impl MailSender for ResendMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        for recipients in email.to.chunks(MAX_RECIPIENTS_PER_MESSAGE) {
            let body = ResendEmailRequest {
                from: &self.from,
                to: recipients,
                subject: &email.subject,
                text: &email.text,
            };

            let resp = self
                .http
                .post(RESEND_EMAILS_URL)
                .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
                .context("resend: request not completed")?;

            let status = resp.status();
            if !status.is_success() {
                let response_body = resp.text().await.unwrap_or_default();
                error!(
                    status = %status,
                    response_body = %response_body,
                    recipients = recipients.len(),
                    "resend: send email failed"
                );
                anyhow::bail!("Resend API request failed (status {status})");
            }

            debug!(recipients = recipients.len(), "resend: email accepted");
        }

        Ok(())
    }
}
