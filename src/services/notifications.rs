//! 邮件通知模板
//!
//! 只负责拼装 [`EmailMessage`]，发送交给 [`spawn_send`]，不阻塞请求。

use actix_web::HttpRequest;
use std::sync::Arc;

use crate::integrations::{EmailMessage, Mailer, spawn_send};
use crate::models::{
    courses::entities::Course,
    tickets::entities::SupportTicket,
    users::entities::User,
};

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 纯文本段落同时生成 HTML 版本
fn message(to: &User, subject: String, paragraphs: &[String]) -> EmailMessage {
    let greeting = format!("Hi {},", to.greeting_name());
    let text = std::iter::once(greeting.clone())
        .chain(paragraphs.iter().cloned())
        .collect::<Vec<_>>()
        .join("\n\n");
    let html = std::iter::once(&greeting)
        .chain(paragraphs.iter())
        .map(|p| format!("<p>{}</p>", escape_html(p)))
        .collect::<String>();

    EmailMessage {
        to: to.email.clone(),
        subject,
        html,
        text,
    }
}

fn course_name(course: &Course) -> &str {
    course.title.as_deref().unwrap_or(&course.topic)
}

pub fn welcome(user: &User) -> EmailMessage {
    message(
        user,
        "Welcome to LearnHub".to_string(),
        &[
            "Your account is ready.".to_string(),
            format!(
                "You start with {} credits. Use them to generate your first course.",
                user.credits
            ),
        ],
    )
}

pub fn course_ready(user: &User, course: &Course) -> EmailMessage {
    message(
        user,
        format!("Your course \"{}\" is ready", course_name(course)),
        &[format!(
            "\"{}\" has {} chapters and is ready to study.",
            course_name(course),
            course.chapter_count
        )],
    )
}

pub fn course_failed(user: &User, course: &Course, refunded: i64) -> EmailMessage {
    let mut paragraphs = vec![format!(
        "We could not generate your course on \"{}\".",
        course.topic
    )];
    if refunded > 0 {
        paragraphs.push(format!("{refunded} credits have been returned to your balance."));
    }
    message(user, "Course generation failed".to_string(), &paragraphs)
}

pub fn low_balance(user: &User, balance: i64, threshold: i64) -> EmailMessage {
    message(
        user,
        "Your LearnHub credits are running low".to_string(),
        &[format!(
            "Your balance is now {balance} credits, below the {threshold} credit threshold."
        )],
    )
}

pub fn ticket_reply(owner: &User, ticket: &SupportTicket, body: &str) -> EmailMessage {
    message(
        owner,
        format!("New reply on ticket #{}: {}", ticket.id, ticket.subject),
        &[
            "Our support team replied to your ticket:".to_string(),
            body.to_string(),
        ],
    )
}

pub fn ticket_status(owner: &User, ticket: &SupportTicket) -> EmailMessage {
    message(
        owner,
        format!("Ticket #{} is now {}", ticket.id, ticket.status),
        &[format!(
            "The status of \"{}\" changed to {}.",
            ticket.subject, ticket.status
        )],
    )
}

/// 邮件服务未注册时只记录日志
pub(crate) fn send(mailer: Option<&Arc<dyn Mailer>>, message: EmailMessage) {
    match mailer {
        Some(mailer) => spawn_send(mailer.clone(), message),
        None => tracing::warn!(to = %message.to, "Mailer not registered, email dropped"),
    }
}

pub(crate) fn notify(request: &HttpRequest, message: EmailMessage) {
    send(super::optional_app_data::<dyn Mailer>(request).as_ref(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tickets::entities::{TicketCategory, TicketPriority, TicketStatus};
    use crate::models::users::entities::{UserRole, UserStatus};

    fn user() -> User {
        User {
            id: 1,
            username: "alice_01".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            role: UserRole::User,
            status: UserStatus::Active,
            display_name: Some("Alice".to_string()),
            credits: 100,
            last_login: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_html_is_escaped() {
        let ticket = SupportTicket {
            id: 9,
            user_id: 1,
            subject: "Broken".to_string(),
            category: TicketCategory::Technical,
            priority: TicketPriority::High,
            status: TicketStatus::InProgress,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let msg = ticket_reply(&user(), &ticket, "<script>alert(1)</script> & more");

        assert_eq!(msg.to, "alice@example.com");
        assert!(msg.subject.contains("#9"));
        assert!(msg.html.contains("&lt;script&gt;"));
        assert!(!msg.html.contains("<script>"));
        assert!(msg.text.contains("<script>"));
        assert!(msg.text.starts_with("Hi Alice,"));
    }

    #[test]
    fn test_low_balance_mentions_threshold() {
        let msg = low_balance(&user(), 15, 20);
        assert!(msg.text.contains("15 credits"));
        assert!(msg.text.contains("20 credit threshold"));
    }
}
