use pullbot_core::{InteractionError, FAILURE_MESSAGE, FORBIDDEN_MESSAGE};
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::commands::{CommandError, ComponentCommand};

pub const EPHEMERAL_FLAG: u64 = 1 << 6;

pub const MAX_CONTENT_LEN: usize = 2000;
pub const MAX_EMBEDS: usize = 10;
pub const MAX_ACTION_ROWS: usize = 5;
pub const MAX_ROW_COMPONENTS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("message content exceeds {MAX_CONTENT_LEN} characters")]
    ContentTooLong,
    #[error("message carries {0} embeds, limit is {MAX_EMBEDS}")]
    TooManyEmbeds(usize),
    #[error("message carries {0} action rows, limit is {MAX_ACTION_ROWS}")]
    TooManyRows(usize),
    #[error("action row carries {0} components, limit is {MAX_ROW_COMPONENTS}")]
    RowTooWide(usize),
    #[error("attachment filename `{0}` cannot be sent")]
    InvalidFilename(String),
    #[error("payload serialization failed: {0}")]
    Serialize(String),
}

impl From<PayloadError> for InteractionError {
    fn from(value: PayloadError) -> Self {
        InteractionError::SubsystemFailure(value.to_string())
    }
}

/// Interaction callback types understood by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    Pong,
    ChannelMessage,
    Ack,
    DeferredUpdate,
    UpdateMessage,
}

impl ResponseType {
    pub fn code(&self) -> u8 {
        match self {
            Self::Pong => 1,
            Self::ChannelMessage => 4,
            Self::Ack => 5,
            Self::DeferredUpdate => 6,
            Self::UpdateMessage => 7,
        }
    }
}

impl Serialize for ResponseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// What a handler asks the platform to do with its message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageType {
    #[default]
    New,
    Update,
    Ack,
    DeferredUpdate,
}

impl From<MessageType> for ResponseType {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::New => ResponseType::ChannelMessage,
            MessageType::Update => ResponseType::UpdateMessage,
            MessageType::Ack => ResponseType::Ack,
            MessageType::DeferredUpdate => ResponseType::DeferredUpdate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedMedia {
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

impl Default for Embed {
    fn default() -> Self {
        Self {
            kind: "rich",
            title: None,
            description: None,
            color: None,
            fields: Vec::new(),
            thumbnail: None,
            image: None,
            footer: None,
        }
    }
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(EmbedMedia { url: url.into() });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(EmbedMedia { url: url.into() });
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
    Link,
}

impl Serialize for ButtonStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let code: u8 = match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Success => 3,
            Self::Danger => 4,
            Self::Link => 5,
        };
        serializer.serialize_u8(code)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: u8,
    pub style: ButtonStyle,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl Button {
    /// A button that routes back through the component codec when pressed.
    pub fn command(
        label: impl Into<String>,
        command: &ComponentCommand,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            kind: 2,
            style: ButtonStyle::Secondary,
            label: label.into(),
            custom_id: Some(command.encode_checked()?),
            url: None,
            disabled: false,
        })
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: 2,
            style: ButtonStyle::Link,
            label: label.into(),
            custom_id: None,
            url: Some(url.into()),
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        if self.custom_id.is_some() {
            self.style = style;
        }
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    kind: u8,
    pub components: Vec<Button>,
}

impl ActionRow {
    pub fn new(components: Vec<Button>) -> Self {
        Self { kind: 1, components }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self { filename: filename.into(), content_type: content_type.into(), bytes: bytes.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttachmentRef {
    pub id: usize,
    pub filename: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
    pub content: String,
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
    pub attachments: Vec<AttachmentRef>,
}

/// The body of an interaction callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResponsePayload {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl ResponsePayload {
    pub fn pong() -> Self {
        Self { kind: ResponseType::Pong, data: None }
    }

    /// The single payload used for every unknown command and every
    /// permission failure, so the two cannot be told apart.
    pub fn rejection() -> Self {
        Self::ephemeral_notice(FORBIDDEN_MESSAGE)
    }

    pub fn failure() -> Self {
        Self::ephemeral_notice(FAILURE_MESSAGE)
    }

    fn ephemeral_notice(text: &str) -> Self {
        Self {
            kind: ResponseType::ChannelMessage,
            data: Some(ResponseData {
                flags: Some(EPHEMERAL_FLAG),
                content: String::new(),
                embeds: vec![Embed::new().description(text)],
                components: Vec::new(),
                attachments: Vec::new(),
            }),
        }
    }
}

/// A handler's response under construction. Handlers return it unfinished;
/// the pipeline may still override its kind before calling [`Message::finalize`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    kind: MessageType,
    ephemeral: bool,
    content: String,
    embeds: Vec<Embed>,
    rows: Vec<ActionRow>,
    attachments: Vec<Attachment>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes a confirmation dialog in place.
    pub fn dialog_closed(text: impl Into<String>) -> Self {
        Self::new().set_type(MessageType::Update).embed(Embed::new().description(text))
    }

    pub fn cancelled() -> Self {
        Self::dialog_closed("Cancelled")
    }

    pub fn declined() -> Self {
        Self::dialog_closed("Declined")
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn set_type(mut self, kind: MessageType) -> Self {
        self.kind = kind;
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn row(mut self, row: ActionRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn finalize(self) -> Result<FinalizedResponse, PayloadError> {
        if self.content.chars().count() > MAX_CONTENT_LEN {
            return Err(PayloadError::ContentTooLong);
        }
        if self.embeds.len() > MAX_EMBEDS {
            return Err(PayloadError::TooManyEmbeds(self.embeds.len()));
        }
        if self.rows.len() > MAX_ACTION_ROWS {
            return Err(PayloadError::TooManyRows(self.rows.len()));
        }
        if let Some(row) = self.rows.iter().find(|row| row.components.len() > MAX_ROW_COMPONENTS) {
            return Err(PayloadError::RowTooWide(row.components.len()));
        }
        if let Some(file) = self
            .attachments
            .iter()
            .find(|file| file.filename.is_empty() || file.filename.contains(['"', '\r', '\n']))
        {
            return Err(PayloadError::InvalidFilename(file.filename.clone()));
        }

        let attachments = self
            .attachments
            .iter()
            .enumerate()
            .map(|(id, file)| AttachmentRef { id, filename: file.filename.clone() })
            .collect();

        let payload = ResponsePayload {
            kind: self.kind.into(),
            data: Some(ResponseData {
                flags: self.ephemeral.then_some(EPHEMERAL_FLAG),
                content: self.content,
                embeds: self.embeds,
                components: self.rows,
                attachments,
            }),
        };

        Ok(FinalizedResponse { payload, files: self.attachments })
    }
}

/// A payload plus the file parts that travel beside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedResponse {
    pub payload: ResponsePayload,
    pub files: Vec<Attachment>,
}

impl From<ResponsePayload> for FinalizedResponse {
    fn from(payload: ResponsePayload) -> Self {
        Self { payload, files: Vec::new() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FinalizedResponse {
    pub fn into_body(self) -> Result<ResponseBody, PayloadError> {
        let boundary = Uuid::new_v4().simple().to_string();
        self.into_body_with_boundary(&boundary)
    }

    /// JSON when there are no files, otherwise `multipart/form-data` with the
    /// payload in `payload_json` and file `n` in `files[n]`.
    pub fn into_body_with_boundary(self, boundary: &str) -> Result<ResponseBody, PayloadError> {
        let json = serde_json::to_vec(&self.payload)
            .map_err(|error| PayloadError::Serialize(error.to_string()))?;

        if self.files.is_empty() {
            return Ok(ResponseBody { content_type: "application/json".to_owned(), bytes: json });
        }

        let mut bytes = Vec::with_capacity(json.len() + 256);
        push_part_header(
            &mut bytes,
            boundary,
            "Content-Disposition: form-data; name=\"payload_json\"",
            "application/json",
        );
        bytes.extend_from_slice(&json);
        bytes.extend_from_slice(b"\r\n");

        for (index, file) in self.files.iter().enumerate() {
            let disposition = format!(
                "Content-Disposition: form-data; name=\"files[{index}]\"; filename=\"{}\"",
                file.filename
            );
            push_part_header(&mut bytes, boundary, &disposition, &file.content_type);
            bytes.extend_from_slice(&file.bytes);
            bytes.extend_from_slice(b"\r\n");
        }
        bytes.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        Ok(ResponseBody {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            bytes,
        })
    }
}

fn push_part_header(bytes: &mut Vec<u8>, boundary: &str, disposition: &str, content_type: &str) {
    bytes.extend_from_slice(
        format!("--{boundary}\r\n{disposition}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
    );
}
