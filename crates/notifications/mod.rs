pub mod resend;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
}

#[automock]
#[async_trait]
pub trait MailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}
