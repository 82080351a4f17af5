//! Reply rendering.
//!
//! Pure templating: a [`ReplyDraft`] plus sender metadata in, email body
//! text out. No I/O and no session mutation happens here, so every branch
//! is trivially testable.

use chrono_tz::Tz;

use crate::models::proposal::Intent;
use crate::models::reply::{ReplyDraft, ReplyKind};
use crate::services::timezone;

/// Render the reply body for a draft.
///
/// # Arguments
/// * `draft` - Decision payload produced by the orchestrator
/// * `sender_address` - Email address the reply goes to, for the greeting
/// * `tz` - Timezone times are rendered in (the recipient's)
/// * `intent` - Detected intent of the inbound message, for tone
pub fn compose(draft: &ReplyDraft, sender_address: &str, tz: Tz, intent: Intent) -> String {
    let name = name_from_address(sender_address);
    let body = match draft.kind {
        ReplyKind::Confirm => confirm_body(draft, tz),
        ReplyKind::Counter => counter_body(draft, tz),
        ReplyKind::Clarify => clarify_body(draft),
        ReplyKind::Decline => decline_body(intent),
        ReplyKind::CalendarUnavailable => {
            "I'm having trouble reaching my calendar right now, so I can't \
             confirm a time yet. Could you give me a little while and try again?"
                .to_string()
        }
    };
    format!("Hi {},\n\n{}\n\nBest regards", name, body)
}

fn confirm_body(draft: &ReplyDraft, tz: Tz) -> String {
    match &draft.slot {
        Some(slot) => format!(
            "That works for me! I've confirmed our meeting for {}.\n\nLooking forward to it.",
            timezone::format_human(slot.window.start(), tz)
        ),
        // Should not happen; confirm drafts always carry a slot.
        None => "That works for me! Consider the meeting confirmed.".to_string(),
    }
}

fn counter_body(draft: &ReplyDraft, tz: Tz) -> String {
    if draft.alternatives.is_empty() {
        return "Unfortunately none of the times we've discussed work on my end. \
                Could you share a few more options, perhaps later in the week?"
            .to_string();
    }
    let mut lines = String::from(
        "Unfortunately that time doesn't work for me. Here are some \
         alternatives that are open on my calendar:\n",
    );
    for slot in &draft.alternatives {
        lines.push_str(&format!(
            "\n- {}",
            timezone::format_human(slot.window.start(), tz)
        ));
    }
    lines.push_str("\n\nWould any of these work for you?");
    lines
}

fn clarify_body(draft: &ReplyDraft) -> String {
    match &draft.clarify_span {
        Some(span) => format!(
            "Thanks for reaching out! You mentioned \"{}\", but I couldn't pin \
             down a specific time from that. Could you let me know a concrete \
             day and time that works for you?",
            span
        ),
        None => "Thanks for reaching out! Could you let me know a concrete day \
                 and time that works for you?"
            .to_string(),
    }
}

fn decline_body(intent: Intent) -> String {
    if intent == Intent::Cancel {
        "No problem, consider the meeting cancelled. Feel free to reach out \
         whenever you'd like to find a new time."
            .to_string()
    } else {
        "It looks like we haven't been able to land on a time that works for \
         both of us, so I'll step back for now. Please reach out again when \
         your schedule opens up."
            .to_string()
    }
}

/// Best-effort display name from an email address local part.
///
/// `jane.doe@example.com` becomes `Jane`; addresses with no usable local
/// part fall back to `"there"`.
fn name_from_address(address: &str) -> String {
    let local = address.split('@').next().unwrap_or("");
    let first = local
        .split(['.', '_', '-', '+'])
        .find(|part| part.chars().any(|c| c.is_alphabetic()));
    match first {
        Some(part) => {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => "there".to_string(),
            }
        }
        None => "there".to_string(),
    }
}

#[cfg(test)]
#[path = "composer_tests.rs"]
mod composer_tests;
