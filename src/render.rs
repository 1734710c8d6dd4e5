//! Plain-text presentation of chat summaries.

use crate::models::chat::{ ChatSummary, MessageRecord };
use chrono::TimeZone;
use std::fmt::Display;

const PREVIEW_LIMIT: usize = 150;

pub fn sender_label<'a>(
    record: &'a MessageRecord,
    user_name: &'a str,
    character_name: &'a str
) -> &'a str {
    match record.name() {
        Some(name) if !name.is_empty() => name,
        _ if record.is_user() => user_name,
        _ => character_name,
    }
}

pub fn message_preview(record: &MessageRecord) -> String {
    let Some(mes) = record.mes().filter(|m| !m.is_empty()) else {
        return "(empty message)".to_string();
    };
    let text = strip_tags(mes).split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() > PREVIEW_LIMIT {
        let truncated: String = text.chars().take(PREVIEW_LIMIT).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

pub fn send_date_label<Tz>(record: &MessageRecord, tz: &Tz) -> String
    where Tz: TimeZone, Tz::Offset: Display
{
    match record.sent_at() {
        Some(at) => at.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown time".to_string(),
    }
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => {
                in_tag = true;
            }
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

pub fn render_summaries<Tz>(character: &str, summaries: &[ChatSummary], tz: &Tz) -> String
    where Tz: TimeZone, Tz::Offset: Display
{
    if summaries.is_empty() {
        return format!("{}: no chats with a last message were found.\n", character);
    }
    let mut out = format!("{} - {} chats, newest first\n", character, summaries.len());
    for summary in summaries {
        let record = &summary.last_message;
        out.push_str(&format!("\n[{}]\n", summary.chat_file_id));
        out.push_str(
            &format!(
                "  {} ({}):\n",
                sender_label(record, "User", character),
                send_date_label(record, tz)
            )
        );
        out.push_str(&format!("  {}\n", message_preview(record)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(value: serde_json::Value) -> MessageRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn sender_falls_back_by_author() {
        assert_eq!(sender_label(&record(json!({ "name": "Aqua" })), "You", "Char"), "Aqua");
        assert_eq!(sender_label(&record(json!({ "is_user": true })), "You", "Char"), "You");
        assert_eq!(sender_label(&record(json!({})), "You", "Char"), "Char");
    }

    #[test]
    fn preview_strips_markup_and_truncates() {
        assert_eq!(message_preview(&record(json!({}))), "(empty message)");
        assert_eq!(message_preview(&record(json!({ "mes": "<b>hi</b>\n there" }))), "hi there");

        let long = "x".repeat(200);
        let preview = message_preview(&record(json!({ "mes": long })));
        assert_eq!(preview.chars().count(), PREVIEW_LIMIT + 3);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn date_label_formats_or_reports_unknown() {
        let dated = record(json!({ "send_date": 1_700_000_000_000i64 }));
        assert_eq!(send_date_label(&dated, &Utc), "2023-11-14 22:13");
        assert_eq!(send_date_label(&record(json!({})), &Utc), "unknown time");
    }

    #[test]
    fn renders_listing() {
        let summaries = vec![ChatSummary {
            chat_file_id: "b".into(),
            last_message: record(json!({ "mes": "yo", "send_date": 1_700_000_000_000i64 })),
        }];
        let text = render_summaries("Foo", &summaries, &Utc);
        assert!(text.contains("[b]"));
        assert!(text.contains("Foo (2023-11-14 22:13):"));
        assert!(render_summaries("Foo", &[], &Utc).contains("no chats"));
    }
}
