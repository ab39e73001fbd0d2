//! Command dispatch: one broker call per request, and the reply it earns.
//!
//! | Command          | Broker call      | Reply payload                  |
//! |------------------|------------------|--------------------------------|
//! | `REQUUID`        | `issue_id`       | the new id                     |
//! | `NICK`           | `set_name`       | the name, on success only      |
//! | `SENDTEXT`       | `post_within`    | `len[text];`                   |
//! | `NAMECHATROOM`   | `ensure_room`    | the name, if newly created     |
//! | `CHANGECHATROOM` | `join`           | the name, on success only      |
//! | `REQUSERS`       | `list_members`   | `id,name;` per member          |
//! | `REQCHATROOMS`   | `list_rooms`     | `name;` per room               |
//! | `REQCHATROOM`    | `current_room`   | the room name                  |
//! | `REQTEXT`        | `pull_within`    | `author text;` per new entry   |
//! | `MYUUID`         | `participant`    | none (logged)                  |
//!
//! Anything else is ignored. Every payload is cut to the space the
//! frame leaves after the reply's fixed fields, except posted text: a
//! post that could not be echoed or later delivered whole in one frame
//! is ignored instead. Names and room names containing `;` are ignored
//! too, since they would break the list replies.

use textrelay_broker::{BrokerError, BrokerHandle, ParticipantKey};
use textrelay_protocol::payload::{self, fit_items, fit_text, is_list_safe};
use textrelay_protocol::{Command, compose_body, line_overhead};

/// A reply waiting to be rendered into a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Wire name of the command being answered.
    pub command: &'static str,
    pub payload: String,
}

impl Reply {
    fn new(command: &'static str, payload: impl Into<String>) -> Self {
        Self {
            command,
            payload: payload.into(),
        }
    }

    /// Renders the checksummed, timestamped body.
    pub fn to_body(&self) -> String {
        compose_body(self.command, &self.payload)
    }
}

/// Space left for the payload of a `command` reply.
fn budget(command: &str, max_body_length: usize) -> usize {
    max_body_length.saturating_sub(line_overhead(command))
}

/// Applies one command for `key` and returns the reply, if the command
/// earns one.
pub async fn dispatch(
    broker: &BrokerHandle,
    key: ParticipantKey,
    command: Command,
    max_body_length: usize,
) -> Result<Option<Reply>, BrokerError> {
    let fit = |name: &'static str, text: &str| {
        Reply::new(name, fit_text(text, budget(name, max_body_length)))
    };

    let reply = match command {
        Command::RequestId => broker
            .issue_id(key)
            .await?
            .map(|id| fit(Command::REQUEST_ID, id.as_str())),

        Command::Nick(name) if !is_list_safe(&name) => {
            tracing::debug!(%key, name = %name, "ignoring name with list terminator");
            None
        }
        Command::Nick(name) => broker
            .set_name(key, name.as_str())
            .await?
            .then(|| fit(Command::NICK, &name)),

        Command::SendText(text) => {
            let echo = payload::send_echo(&text);
            if echo.len() > budget(Command::SEND_TEXT, max_body_length) {
                tracing::debug!(%key, len = text.len(), "ignoring post too large to echo");
                return Ok(None);
            }
            let limit = budget(Command::REQUEST_TEXT, max_body_length);
            broker
                .post_within(key, text, limit)
                .await?
                .map(|_| Reply::new(Command::SEND_TEXT, echo))
        }

        Command::NameRoom(name) if name.is_empty() || !is_list_safe(&name) => None,
        Command::NameRoom(name) => broker
            .ensure_room(name.as_str())
            .await?
            .then(|| fit(Command::NAME_ROOM, &name)),

        Command::ChangeRoom(name) => broker
            .join(key, name.as_str())
            .await?
            .then(|| fit(Command::CHANGE_ROOM, &name)),

        Command::RequestUsers => match broker.current_room(key).await? {
            Some(room) => {
                let members = payload::members(&broker.list_members(room).await?);
                let limit = budget(Command::REQUEST_USERS, max_body_length);
                Some(Reply::new(Command::REQUEST_USERS, fit_items(&members, limit)))
            }
            None => None,
        },

        Command::RequestRooms => {
            let rooms = payload::rooms(&broker.list_rooms().await?);
            let limit = budget(Command::REQUEST_ROOMS, max_body_length);
            Some(Reply::new(Command::REQUEST_ROOMS, fit_items(&rooms, limit)))
        }

        Command::RequestRoom => broker
            .current_room(key)
            .await?
            .map(|room| fit(Command::REQUEST_ROOM, &room)),

        Command::RequestText => {
            let limit = budget(Command::REQUEST_TEXT, max_body_length);
            let entries = broker.pull_within(key, limit).await?;
            Some(Reply::new(Command::REQUEST_TEXT, payload::entries(&entries)))
        }

        Command::MyId => {
            if let Some(p) = broker.participant(key).await? {
                tracing::info!(%key, id = %p.id, "participant identity");
            }
            None
        }

        Command::Unknown(name) => {
            tracing::debug!(%key, command = %name, "ignoring unknown command");
            None
        }
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use textrelay_broker::{BrokerConfig, spawn_broker};
    use textrelay_protocol::DEFAULT_MAX_BODY_LENGTH;

    async fn setup() -> (BrokerHandle, ParticipantKey) {
        let broker = spawn_broker(BrokerConfig::default());
        let key = ParticipantKey::new(1);
        broker.register(key).await.unwrap();
        (broker, key)
    }

    async fn run(
        broker: &BrokerHandle,
        key: ParticipantKey,
        command: Command,
    ) -> Option<Reply> {
        dispatch(broker, key, command, DEFAULT_MAX_BODY_LENGTH)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dispatch_request_id_replies_with_new_id() {
        let (broker, key) = setup().await;
        let reply = run(&broker, key, Command::RequestId).await.unwrap();
        assert_eq!(reply.command, "REQUUID");
        let p = broker.participant(key).await.unwrap().unwrap();
        assert_eq!(reply.payload, p.id.as_str());
    }

    #[tokio::test]
    async fn test_dispatch_nick_taken_has_no_reply() {
        let (broker, key) = setup().await;
        let other = ParticipantKey::new(2);
        broker.register(other).await.unwrap();

        let reply = run(&broker, key, Command::Nick("alice".into())).await;
        assert_eq!(reply, Some(Reply::new("NICK", "alice")));
        assert!(run(&broker, other, Command::Nick("alice".into())).await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_send_text_echoes_length() {
        let (broker, key) = setup().await;
        let reply = run(&broker, key, Command::SendText("hello".into())).await;
        assert_eq!(reply, Some(Reply::new("SENDTEXT", "5[hello];")));
        assert_eq!(broker.room_len("the lobby").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_dispatch_send_text_longest_fitting_post_round_trips() {
        let (broker, key) = setup().await;
        let id = run(&broker, key, Command::RequestId).await.unwrap().payload;

        let limit = budget("REQTEXT", DEFAULT_MAX_BODY_LENGTH);
        let text = "y".repeat(limit - id.len() - 2);
        let echo = run(&broker, key, Command::SendText(text.clone())).await.unwrap();
        assert_eq!(echo.payload, format!("{}[{text}];", text.len()));
        assert!(echo.to_body().len() <= DEFAULT_MAX_BODY_LENGTH);

        let pulled = run(&broker, key, Command::RequestText).await.unwrap();
        assert_eq!(pulled.payload, format!("{id} {text};"));
        assert!(pulled.to_body().len() <= DEFAULT_MAX_BODY_LENGTH);
    }

    #[tokio::test]
    async fn test_dispatch_send_text_too_long_is_ignored_without_append() {
        let (broker, key) = setup().await;
        let id = run(&broker, key, Command::RequestId).await.unwrap().payload;

        let limit = budget("REQTEXT", DEFAULT_MAX_BODY_LENGTH);
        let text = "y".repeat(limit - id.len() - 1);
        assert!(run(&broker, key, Command::SendText(text)).await.is_none());
        assert_eq!(broker.room_len("the lobby").await.unwrap(), Some(0));

        let pulled = run(&broker, key, Command::RequestText).await.unwrap();
        assert_eq!(pulled.payload, "");
    }

    #[tokio::test]
    async fn test_dispatch_send_text_unechoable_is_ignored() {
        let (broker, key) = setup().await;
        // Anonymous entries fit more text than the echo does.
        let text = "y".repeat(budget("SENDTEXT", DEFAULT_MAX_BODY_LENGTH) - 4);
        assert!(run(&broker, key, Command::SendText(text)).await.is_none());
        assert_eq!(broker.room_len("the lobby").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_dispatch_names_with_terminator_are_ignored() {
        let (broker, key) = setup().await;
        assert!(run(&broker, key, Command::Nick("a;b".into())).await.is_none());
        assert!(run(&broker, key, Command::NameRoom("x;y".into())).await.is_none());
        assert!(!broker.name_taken("a;b").await.unwrap());
        assert!(!broker.room_exists("x;y").await.unwrap());
    }

    #[tokio::test]
    async fn test_dispatch_name_room_replies_only_on_creation() {
        let (broker, key) = setup().await;
        let first = run(&broker, key, Command::NameRoom("dev".into())).await;
        assert_eq!(first, Some(Reply::new("NAMECHATROOM", "dev")));
        assert!(run(&broker, key, Command::NameRoom("dev".into())).await.is_none());
        assert!(run(&broker, key, Command::NameRoom(String::new())).await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_change_room_missing_is_ignored() {
        let (broker, key) = setup().await;
        assert!(run(&broker, key, Command::ChangeRoom("nope".into())).await.is_none());

        let room = run(&broker, key, Command::RequestRoom).await.unwrap();
        assert_eq!(room.payload, "the lobby");
    }

    #[tokio::test]
    async fn test_dispatch_request_text_empty_still_replies() {
        let (broker, key) = setup().await;
        let reply = run(&broker, key, Command::RequestText).await.unwrap();
        assert_eq!(reply.command, "REQTEXT");
        assert_eq!(reply.payload, "");
    }

    #[tokio::test]
    async fn test_dispatch_request_text_fits_frame() {
        let (broker, key) = setup().await;
        let long = "x".repeat(300);
        run(&broker, key, Command::SendText(long.clone())).await;
        run(&broker, key, Command::SendText(long.clone())).await;

        let first = run(&broker, key, Command::RequestText).await.unwrap();
        assert!(first.to_body().len() <= DEFAULT_MAX_BODY_LENGTH);
        assert_eq!(first.payload, format!(" {long};"));

        let second = run(&broker, key, Command::RequestText).await.unwrap();
        assert_eq!(second.payload, format!(" {long};"));
    }

    #[tokio::test]
    async fn test_dispatch_lists_rooms_and_users() {
        let (broker, key) = setup().await;
        run(&broker, key, Command::Nick("alice".into())).await;
        run(&broker, key, Command::NameRoom("dev".into())).await;

        let rooms = run(&broker, key, Command::RequestRooms).await.unwrap();
        assert_eq!(rooms.payload, "dev;the lobby;");

        let users = run(&broker, key, Command::RequestUsers).await.unwrap();
        assert_eq!(users.payload, ",alice;");
    }

    #[tokio::test]
    async fn test_dispatch_unknown_and_my_id_have_no_reply() {
        let (broker, key) = setup().await;
        assert!(run(&broker, key, Command::Unknown("FLY".into())).await.is_none());
        assert!(run(&broker, key, Command::MyId).await.is_none());
    }

    #[test]
    fn test_reply_body_fits_default_frame() {
        let reply = Reply::new("REQTEXT", "x".repeat(budget("REQTEXT", 512)));
        assert!(reply.to_body().len() <= 512);
    }
}
