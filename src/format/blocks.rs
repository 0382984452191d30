use serde::{Deserialize, Serialize};

/// Slack Block Kit text object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TextObject {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn".to_string(),
            text: text.into(),
        }
    }
}

/// One display block of a notification message.
///
/// Serializes to the Slack Block Kit layout, e.g.
/// `{"type": "section", "text": {"type": "mrkdwn", "text": "..."}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Section { text: TextObject },
    Context { elements: Vec<TextObject> },
    Divider,
}

impl Block {
    pub fn section(text: impl Into<String>) -> Self {
        Block::Section {
            text: TextObject::mrkdwn(text),
        }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Block::Context {
            elements: vec![TextObject::mrkdwn(text)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_kit_layout() {
        let blocks = vec![Block::section("*hei*"), Block::context("ctx"), Block::Divider];
        let value = serde_json::to_value(&blocks).unwrap();

        assert_eq!(
            value,
            json!([
                {"type": "section", "text": {"type": "mrkdwn", "text": "*hei*"}},
                {"type": "context", "elements": [{"type": "mrkdwn", "text": "ctx"}]},
                {"type": "divider"}
            ])
        );
    }
}
