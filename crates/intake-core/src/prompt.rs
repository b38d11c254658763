use serde::{Deserialize, Serialize};

/// Reply-keyboard instruction attached to a prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum ReplyMarkup {
    /// Leave whatever keyboard the client shows untouched.
    #[default]
    Keep,
    /// Offer a constrained set of one-tap replies, one per row.
    Options(Vec<String>),
    /// Remove a previously offered keyboard.
    Clear,
}

/// One plain-text message sent back to the end user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Message text.
    pub text: String,
    /// Keyboard instruction.
    #[serde(default)]
    pub markup: ReplyMarkup,
}

impl Prompt {
    /// A prompt that leaves the keyboard as it is.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: ReplyMarkup::Keep,
        }
    }

    /// A prompt offering the given reply options.
    pub fn with_options<I, S>(text: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            markup: ReplyMarkup::Options(options.into_iter().map(Into::into).collect()),
        }
    }

    /// A prompt that clears any offered reply options.
    pub fn clearing(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: ReplyMarkup::Clear,
        }
    }
}
