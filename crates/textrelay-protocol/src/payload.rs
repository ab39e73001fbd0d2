//! Reply payload builders.
//!
//! Each function renders the payload segment of one reply; the session
//! wraps it into a full line with [`compose_body`](crate::compose_body).
//! The `fit_*` helpers cut a payload down to the space left in a frame.

use crate::{MemberEntry, TextEntry};

/// Terminates every item of a list payload.
pub const ITEM_TERMINATOR: char = ';';

/// Returns `true` if `text` can appear inside a list item without being
/// mistaken for the end of one.
pub fn is_list_safe(text: &str) -> bool {
    !text.contains(ITEM_TERMINATOR)
}

/// `SENDTEXT` echo: byte length of the text, then the text in brackets.
///
/// ```rust
/// assert_eq!(textrelay_protocol::payload::send_echo("hi"), "2[hi];");
/// ```
pub fn send_echo(text: &str) -> String {
    format!("{}[{}];", text.len(), text)
}

/// `REQUSERS` payload: `id,name;` per member.
pub fn members(members: &[MemberEntry]) -> String {
    let mut out = String::new();
    for member in members {
        out.push_str(member.id.as_str());
        out.push(',');
        out.push_str(&member.name);
        out.push(';');
    }
    out
}

/// `REQCHATROOMS` payload: `name;` per room.
pub fn rooms<S: AsRef<str>>(names: &[S]) -> String {
    let mut out = String::new();
    for name in names {
        out.push_str(name.as_ref());
        out.push(';');
    }
    out
}

/// `REQTEXT` payload: the rendered entries back to back.
pub fn entries(entries: &[TextEntry]) -> String {
    let mut out = String::with_capacity(
        entries.iter().map(TextEntry::rendered_len).sum(),
    );
    for entry in entries {
        out.push_str(&entry.render());
    }
    out
}

/// Cuts a `;`-terminated list to the whole items that fit in `budget`
/// bytes.
///
/// Items must not contain `;` themselves (see [`is_list_safe`]), or the
/// cut may land inside one.
pub fn fit_items(payload: &str, budget: usize) -> &str {
    if payload.len() <= budget {
        return payload;
    }
    match payload[..floor_char_boundary(payload, budget)].rfind(';') {
        Some(end) => &payload[..=end],
        None => "",
    }
}

/// Cuts free text to at most `budget` bytes on a char boundary.
pub fn fit_text(payload: &str, budget: usize) -> &str {
    &payload[..floor_char_boundary(payload, budget)]
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParticipantId;

    #[test]
    fn test_send_echo_counts_bytes() {
        assert_eq!(send_echo("héllo"), "6[héllo];");
        assert_eq!(send_echo(""), "0[];");
    }

    #[test]
    fn test_members_format() {
        let list = vec![
            MemberEntry {
                id: ParticipantId::new("a1"),
                name: "alice".into(),
            },
            MemberEntry {
                id: ParticipantId::new("b2"),
                name: String::new(),
            },
        ];
        assert_eq!(members(&list), "a1,alice;b2,;");
    }

    #[test]
    fn test_rooms_format() {
        assert_eq!(rooms(&["dev", "the lobby"]), "dev;the lobby;");
        assert_eq!(rooms::<&str>(&[]), "");
    }

    #[test]
    fn test_entries_concatenates_rendered_entries() {
        let list = vec![
            TextEntry {
                author: ParticipantId::new("p1"),
                content: "hello".into(),
                index: 0,
            },
            TextEntry {
                author: ParticipantId::new("p2"),
                content: "hi dev".into(),
                index: 1,
            },
        ];
        assert_eq!(entries(&list), "p1 hello;p2 hi dev;");
    }

    #[test]
    fn test_fit_items_keeps_whole_items() {
        assert_eq!(fit_items("aa;bb;cc;", 9), "aa;bb;cc;");
        assert_eq!(fit_items("aa;bb;cc;", 8), "aa;bb;");
        assert_eq!(fit_items("aa;bb;cc;", 2), "");
    }

    #[test]
    fn test_is_list_safe_rejects_terminator() {
        assert!(is_list_safe("dev team"));
        assert!(!is_list_safe("dev;ops"));
    }

    #[test]
    fn test_fit_text_respects_char_boundaries() {
        assert_eq!(fit_text("héllo", 2), "h");
        assert_eq!(fit_text("héllo", 3), "hé");
        assert_eq!(fit_text("héllo", 100), "héllo");
    }
}
