use std::collections::BTreeMap;

use pullbot_core::InteractionError;
use serde::Deserialize;
use serde_json::Value;

use crate::service::HandlerContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    Component,
    Autocomplete,
    ModalSubmit,
    Unsupported(u8),
}

impl From<u8> for InteractionKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::Component,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unsupported(other),
        }
    }
}

/// A slash command invocation with its options flattened into a name/value map.
/// Nested subcommand groups are joined into `subcommand` with a space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SlashCommand {
    pub name: String,
    pub subcommand: Option<String>,
    pub options: BTreeMap<String, Value>,
}

/// An interaction as delivered by the platform, built once from a verified body.
#[derive(Clone, Debug, PartialEq)]
pub struct IncomingInteraction {
    pub id: String,
    pub token: String,
    pub kind: InteractionKind,
    pub guild_id: Option<String>,
    pub invoking_user_id: Option<String>,
    pub component_identifier: Option<String>,
    pub command: Option<SlashCommand>,
}

impl IncomingInteraction {
    pub fn from_body(body: &[u8]) -> Result<Self, InteractionError> {
        let raw: RawInteraction = serde_json::from_slice(body)
            .map_err(|error| InteractionError::MalformedBody(error.to_string()))?;
        Ok(raw.into())
    }

    /// The invoking user; guild interactions carry it on the member, DMs on the user.
    pub fn invoker(&self) -> Result<&str, InteractionError> {
        self.invoking_user_id
            .as_deref()
            .ok_or_else(|| {
                InteractionError::MalformedBody("interaction has no invoking user".into())
            })
    }

    pub fn context(&self) -> Result<HandlerContext, InteractionError> {
        Ok(HandlerContext {
            interaction_id: self.id.clone(),
            token: self.token.clone(),
            guild_id: self.guild_id.clone(),
            user_id: self.invoker()?.to_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    id: String,
    #[serde(default)]
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    guild_id: Option<String>,
    member: Option<RawMember>,
    user: Option<RawUser>,
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    custom_id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    options: Vec<RawOption>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    value: Option<Value>,
    #[serde(default)]
    options: Vec<RawOption>,
}

const OPTION_SUB_COMMAND: u8 = 1;
const OPTION_SUB_COMMAND_GROUP: u8 = 2;

impl From<RawInteraction> for IncomingInteraction {
    fn from(raw: RawInteraction) -> Self {
        let invoking_user_id = raw
            .member
            .and_then(|member| member.user)
            .or(raw.user)
            .map(|user| user.id);
        let kind = InteractionKind::from(raw.kind);
        let data = raw.data.unwrap_or_default();

        let command = match (kind, data.name) {
            (InteractionKind::ApplicationCommand, Some(name)) => {
                let mut command = SlashCommand { name, ..SlashCommand::default() };
                flatten_options(data.options, &mut command);
                Some(command)
            }
            _ => None,
        };

        Self {
            id: raw.id,
            token: raw.token,
            kind,
            guild_id: raw.guild_id,
            invoking_user_id,
            component_identifier: data.custom_id,
            command,
        }
    }
}

fn flatten_options(options: Vec<RawOption>, command: &mut SlashCommand) {
    for option in options {
        match option.kind {
            OPTION_SUB_COMMAND | OPTION_SUB_COMMAND_GROUP => {
                command.subcommand = Some(match command.subcommand.take() {
                    Some(parent) => format!("{parent} {}", option.name),
                    None => option.name,
                });
                flatten_options(option.options, command);
            }
            _ => {
                if let Some(value) = option.value {
                    command.options.insert(option.name, value);
                }
            }
        }
    }
}
