use derive_more::Display;

use crate::config::MailConfig;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum MailError {
    #[display(fmt = "Mail delivery failed: {_0}")]
    Delivery(String),
}

impl std::error::Error for MailError {}

pub trait MailSender: Send + Sync {
    fn send_mail(
        &self,
        to_name: &str,
        to_email: &str,
        subject: &str,
        body: &str,
        language: &str,
    ) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log. Used when no relay is configured.
#[derive(Clone, Debug, Default)]
pub struct LogMailer;

impl MailSender for LogMailer {
    fn send_mail(
        &self,
        to_name: &str,
        to_email: &str,
        subject: &str,
        body: &str,
        language: &str,
    ) -> Result<(), MailError> {
        log::info!("Mail to {to_name} <{to_email}> [{language}] {subject:?}: {body}");
        Ok(())
    }
}

pub fn confirmation_link(frontend_url: &str, user_id: i64, token: &str) -> String {
    format!(
        "{}/api/accounts/ConfirmEmail?userId={user_id}&token={token}",
        frontend_url.trim_end_matches('/')
    )
}

/// Localized subject and body for the confirmation mail.
pub fn confirmation_message(mail: &MailConfig, language: &str, link: &str) -> (String, String) {
    let localized = mail.for_language(language);
    (
        localized.subject.clone(),
        localized.body.replace("{link}", link),
    )
}
