use askama::Template;
use serde::Deserialize;

use super::{Email, MailError};
use crate::config::EmailConfig;
use crate::db::models::User;

#[derive(Template)]
#[template(path = "emails/welcome.html")]
struct WelcomeEmail<'a> {
    name: &'a str,
    username: &'a str,
}

#[derive(Template)]
#[template(path = "emails/contact.html")]
struct ContactEmail<'a> {
    name: &'a str,
    email: &'a str,
    subject: Option<&'a str>,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "emails/feedback.html")]
struct FeedbackEmail<'a> {
    username: Option<&'a str>,
    email: Option<&'a str>,
    rating: Option<u8>,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "emails/account_deleted.html")]
struct AccountDeletedEmail<'a> {
    username: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub subject: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackMessage {
    #[serde(default)]
    pub message: String,
    pub email: Option<String>,
    pub rating: Option<u8>,
}

pub fn welcome(config: &EmailConfig, user: &User) -> Result<Email, MailError> {
    let name = user.first_name.as_deref().unwrap_or(&user.username);
    Ok(Email {
        from: config.from.clone(),
        to: vec![user.email.clone()],
        subject: "Welcome to NovelBug".into(),
        html: WelcomeEmail {
            name,
            username: &user.username,
        }
        .render()?,
        reply_to: None,
    })
}

pub fn contact(config: &EmailConfig, msg: &ContactMessage) -> Result<Email, MailError> {
    let subject = msg.subject.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Email {
        from: config.from.clone(),
        to: vec![config.contact_to.clone()],
        subject: format!("Contact: {}", subject.unwrap_or(msg.name.trim())),
        html: ContactEmail {
            name: msg.name.trim(),
            email: msg.email.trim(),
            subject,
            message: &msg.message,
        }
        .render()?,
        reply_to: Some(msg.email.trim().to_string()),
    })
}

pub fn feedback(
    config: &EmailConfig,
    msg: &FeedbackMessage,
    user: Option<&User>,
) -> Result<Email, MailError> {
    let email = msg
        .email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or(user.map(|u| u.email.as_str()));
    Ok(Email {
        from: config.from.clone(),
        to: vec![config.contact_to.clone()],
        subject: match user {
            Some(u) => format!("Feedback from {}", u.username),
            None => "Feedback".into(),
        },
        html: FeedbackEmail {
            username: user.map(|u| u.username.as_str()),
            email,
            rating: msg.rating,
            message: &msg.message,
        }
        .render()?,
        reply_to: email.map(str::to_string),
    })
}

pub fn account_deleted(
    config: &EmailConfig,
    username: &str,
    email: &str,
) -> Result<Email, MailError> {
    Ok(Email {
        from: config.from.clone(),
        to: vec![email.to_string()],
        subject: "Your NovelBug account has been deleted".into(),
        html: AccountDeletedEmail { username }.render()?,
        reply_to: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::from_epoch;

    fn user() -> User {
        let now = from_epoch(1_700_000_000);
        User {
            id: "u1".into(),
            kinde_id: "kp_1".into(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: Some("Alice".into()),
            last_name: None,
            date_of_birth: None,
            country: None,
            avatar_style: None,
            is_suspended: false,
            is_password_reset_requested: false,
            login_count: 1,
            last_login: now,
            user_since: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn welcome_goes_to_the_user() {
        let email = welcome(&EmailConfig::default(), &user()).unwrap();
        assert_eq!(email.to, vec!["alice@example.com".to_string()]);
        assert!(email.html.contains("Welcome to NovelBug, Alice!"));
        assert!(email.html.contains("alice"));
    }

    #[test]
    fn contact_escapes_html_and_sets_reply_to() {
        let config = EmailConfig::default();
        let email = contact(
            &config,
            &ContactMessage {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                subject: None,
                message: "<script>alert(1)</script>".into(),
            },
        )
        .unwrap();
        assert_eq!(email.to, vec![config.contact_to.clone()]);
        assert_eq!(email.reply_to.as_deref(), Some("bob@example.com"));
        assert_eq!(email.subject, "Contact: Bob");
        assert!(!email.html.contains("<script>"));
    }

    #[test]
    fn anonymous_feedback_has_no_reply_to() {
        let email = feedback(
            &EmailConfig::default(),
            &FeedbackMessage {
                message: "Lovely".into(),
                email: None,
                rating: Some(5),
            },
            None,
        )
        .unwrap();
        assert!(email.reply_to.is_none());
        assert!(email.html.contains("anonymous"));
        assert!(email.html.contains("5/5"));
    }

    #[test]
    fn signed_in_feedback_uses_account_email() {
        let u = user();
        let email = feedback(
            &EmailConfig::default(),
            &FeedbackMessage {
                message: "More dragons".into(),
                email: None,
                rating: None,
            },
            Some(&u),
        )
        .unwrap();
        assert_eq!(email.subject, "Feedback from alice");
        assert_eq!(email.reply_to.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn account_deleted_names_the_user() {
        let email = account_deleted(&EmailConfig::default(), "alice", "alice@example.com").unwrap();
        assert!(email.html.contains("Goodbye, alice"));
    }
}
