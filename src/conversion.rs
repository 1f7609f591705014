//! Mapping from the gateway's turn-based contract to the plain
//! role/content message format of the completions dialect.

use crate::models::chat::{Role, Turn};
use crate::models::upstream::PlainMessage;

/// Flatten turn-based contents into plain chat messages.
///
/// Mapping rules:
/// - A system message is emitted first when `system_instruction` is
///   present and non-empty.
/// - Each turn contributes one message carrying its first extractable
///   text part; turns without text (pure function-call or
///   function-response turns) are dropped — the completions dialect has
///   no representation for them.
/// - The "model" role is renamed to "assistant".
pub fn to_plain_messages(contents: &[Turn], system_instruction: Option<&str>) -> Vec<PlainMessage> {
    let mut out = Vec::with_capacity(contents.len() + 1);

    if let Some(system) = system_instruction {
        if !system.is_empty() {
            out.push(PlainMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
    }

    for turn in contents {
        let Some(text) = turn.first_text() else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let role = match turn.role {
            Role::User => "user",
            Role::Model => "assistant",
        };
        out.push(PlainMessage {
            role: role.to_string(),
            content: text.to_string(),
        });
    }

    out
}
