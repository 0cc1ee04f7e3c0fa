//! Custom identifier codec.
//!
//! Component interactions round-trip all of their state through the
//! platform's opaque `custom_id`, so every multi-step flow (propose, then
//! confirm or cancel) is stateless on our side. The wire grammar is:
//!
//! ```text
//! identifier = name *( "=" field )
//! field      = "" | token *( "&" token )
//! ```
//!
//! An empty field is an absent optional value. `&` joins an ordered sub-list
//! in which duplicates are meaningful.

use std::str::FromStr;

use pullbot_core::InteractionError;
use thiserror::Error;

pub const FIELD_DELIMITER: char = '=';
pub const LIST_DELIMITER: char = '&';

/// Platform limit on component custom identifiers.
pub const MAX_IDENTIFIER_LEN: usize = 100;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("argument {position} of `{command}` is malformed: {reason}")]
    MalformedArgument { command: String, position: usize, reason: String },
    #[error("custom identifier is {len} characters, limit is {MAX_IDENTIFIER_LEN}")]
    IdentifierTooLong { len: usize },
}

impl From<CommandError> for InteractionError {
    fn from(value: CommandError) -> Self {
        InteractionError::UnknownCommand(value.to_string())
    }
}

/// The untyped decoding of an identifier: a command name and its positional
/// fields, with empty fields decoded as `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedCommand {
    pub name: String,
    pub args: Vec<Option<String>>,
}

impl DecodedCommand {
    pub fn new(name: impl Into<String>, args: Vec<Option<String>>) -> Self {
        Self { name: name.into(), args }
    }

    /// Total over all inputs.
    pub fn decode(identifier: &str) -> Self {
        let mut fields = identifier.split(FIELD_DELIMITER);
        let name = fields.next().unwrap_or_default().to_owned();
        let args = fields
            .map(|field| if field.is_empty() { None } else { Some(field.to_owned()) })
            .collect();
        Self { name, args }
    }

    pub fn encode(&self) -> String {
        let mut encoded = self.name.clone();
        for arg in &self.args {
            encoded.push(FIELD_DELIMITER);
            if let Some(value) = arg {
                encoded.push_str(value);
            }
        }
        encoded
    }

    pub fn text(&self, position: usize) -> Option<&str> {
        self.args.get(position).and_then(|arg| arg.as_deref())
    }

    pub fn required(&self, position: usize) -> Result<&str, CommandError> {
        self.text(position).ok_or_else(|| self.malformed(position, "missing value"))
    }

    /// Splits a `&`-joined field. Order and duplicates are preserved; an absent
    /// field is an empty list.
    pub fn list(&self, position: usize) -> Vec<String> {
        self.text(position)
            .map(|value| value.split(LIST_DELIMITER).map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn integer<T: FromStr>(&self, position: usize) -> Result<T, CommandError> {
        let raw = self.required(position)?;
        raw.parse::<T>().map_err(|_| self.malformed(position, "not a base-10 integer"))
    }

    pub fn optional_integer<T: FromStr>(&self, position: usize) -> Result<Option<T>, CommandError> {
        match self.text(position) {
            Some(_) => self.integer(position).map(Some),
            None => Ok(None),
        }
    }

    /// Numeric coercion that yields NaN for an absent or non-numeric field
    /// rather than failing, so an omitted rating reads as "not a number".
    pub fn number(&self, position: usize) -> f64 {
        self.text(position)
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|value| value as f64)
            .unwrap_or(f64::NAN)
    }

    fn malformed(&self, position: usize, reason: &str) -> CommandError {
        CommandError::MalformedArgument {
            command: self.name.clone(),
            position,
            reason: reason.to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuyOffer {
    Normal,
    Guaranteed,
    BoughtGuaranteed,
}

impl BuyOffer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Guaranteed => "guaranteed",
            Self::BoughtGuaranteed => "bguaranteed",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "normal" => Some(Self::Normal),
            "guaranteed" => Some(Self::Guaranteed),
            "bguaranteed" => Some(Self::BoughtGuaranteed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatKind {
    Strength,
    Stamina,
    Agility,
    Reset,
}

impl StatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength => "str",
            Self::Stamina => "sta",
            Self::Agility => "agi",
            Self::Reset => "reset",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "str" => Some(Self::Strength),
            "sta" => Some(Self::Stamina),
            "agi" => Some(Self::Agility),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Closed set of component commands. Numeric fields that may be omitted on
/// the wire (`rating`, `stars`) are carried as `f64` and read NaN when absent.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentCommand {
    Media { id: String },
    Character { id: String, new_message: bool },
    MediaCharacters { media_id: String, index: usize },
    List { user_id: String, media_id: Option<String>, rating: f64, index: usize },
    Like { character_id: String },
    Likes { user_id: String, filter: bool, index: usize },
    Found { media_id: String, index: usize, direction: Option<String> },
    Gacha { user_id: String, guarantee: Option<u32>, quiet: bool },
    Pull { user_id: String, guarantee: u32 },
    Buy { offer: BuyOffer, user_id: String, quantity: u32 },
    Now { user_id: String },
    Help { index: usize },
    Give { user_id: String, target_id: String, character_ids: Vec<String> },
    Trade { user_id: String, target_id: String, give: Vec<String>, take: Vec<String> },
    Synthesis { user_id: String, target: u32 },
    Steal { user_id: String, character_id: String, pre: i64, stars: f64, sacrifice: bool },
    Packs { index: usize },
    Popular { index: usize },
    Install { pack_id: String, user_id: String },
    Uninstall { pack_id: String, user_id: String },
    Stats { kind: StatKind, user_id: String, character_id: String },
    Cancel { owner: Option<String>, counterpart: Option<String> },
}

impl ComponentCommand {
    pub fn parse(identifier: &str) -> Result<Self, CommandError> {
        Self::try_from(&DecodedCommand::decode(identifier))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Media { .. } => "media",
            Self::Character { .. } => "character",
            Self::MediaCharacters { .. } => "mcharacters",
            Self::List { .. } => "list",
            Self::Like { .. } => "like",
            Self::Likes { .. } => "likes",
            Self::Found { .. } => "found",
            Self::Gacha { quiet: true, .. } => "q",
            Self::Gacha { quiet: false, .. } => "gacha",
            Self::Pull { .. } => "pull",
            Self::Buy { .. } => "buy",
            Self::Now { .. } => "now",
            Self::Help { .. } => "help",
            Self::Give { .. } => "give",
            Self::Trade { .. } => "trade",
            Self::Synthesis { .. } => "synthesis",
            Self::Steal { sacrifice: true, .. } => "bsteal",
            Self::Steal { sacrifice: false, .. } => "steal",
            Self::Packs { .. } => "packs",
            Self::Popular { .. } => "popular",
            Self::Install { .. } => "install",
            Self::Uninstall { .. } => "uninstall",
            Self::Stats { .. } => "stats",
            Self::Cancel { .. } => "cancel",
        }
    }

    pub fn to_decoded(&self) -> DecodedCommand {
        let args = match self {
            Self::Media { id } => vec![some(id)],
            Self::Character { id, new_message } => {
                let mut args = vec![some(id)];
                if *new_message {
                    args.push(Some("1".to_owned()));
                }
                args
            }
            Self::MediaCharacters { media_id, index } => vec![some(media_id), some(index)],
            Self::List { user_id, media_id, rating, index } => {
                vec![some(user_id), media_id.clone(), number_field(*rating), some(index)]
            }
            Self::Like { character_id } => vec![some(character_id)],
            Self::Likes { user_id, filter, index } => {
                vec![some(user_id), some(if *filter { "1" } else { "0" }), some(index)]
            }
            Self::Found { media_id, index, direction } => {
                vec![some(media_id), some(index), direction.clone()]
            }
            Self::Gacha { user_id, guarantee, .. } => {
                let mut args = vec![some(user_id)];
                if let Some(guarantee) = guarantee {
                    args.push(some(guarantee));
                }
                args
            }
            Self::Pull { user_id, guarantee } => vec![some(user_id), some(guarantee)],
            Self::Buy { offer, user_id, quantity } => {
                vec![some(offer.as_str()), some(user_id), some(quantity)]
            }
            Self::Now { user_id } => vec![some(user_id)],
            Self::Help { index } | Self::Packs { index } | Self::Popular { index } => {
                vec![None, some(index)]
            }
            Self::Give { user_id, target_id, character_ids } => {
                vec![some(user_id), some(target_id), list_field(character_ids)]
            }
            Self::Trade { user_id, target_id, give, take } => {
                vec![some(user_id), some(target_id), list_field(give), list_field(take)]
            }
            Self::Synthesis { user_id, target } => vec![some(user_id), some(target)],
            Self::Steal { user_id, character_id, pre, stars, .. } => {
                let mut args = vec![some(user_id), some(character_id), some(pre)];
                if !stars.is_nan() {
                    args.push(number_field(*stars));
                }
                args
            }
            Self::Install { pack_id, user_id } | Self::Uninstall { pack_id, user_id } => {
                vec![some(pack_id), some(user_id)]
            }
            Self::Stats { kind, user_id, character_id } => {
                vec![some(kind.as_str()), some(user_id), some(character_id)]
            }
            Self::Cancel { owner, counterpart } => {
                let mut args = Vec::new();
                if owner.is_some() || counterpart.is_some() {
                    args.push(owner.clone());
                }
                if counterpart.is_some() {
                    args.push(counterpart.clone());
                }
                args
            }
        };

        DecodedCommand::new(self.name(), args)
    }

    pub fn encode(&self) -> String {
        self.to_decoded().encode()
    }

    /// Encodes and enforces the platform's identifier length limit.
    pub fn encode_checked(&self) -> Result<String, CommandError> {
        let encoded = self.encode();
        if encoded.len() > MAX_IDENTIFIER_LEN {
            return Err(CommandError::IdentifierTooLong { len: encoded.len() });
        }
        Ok(encoded)
    }
}

impl TryFrom<&DecodedCommand> for ComponentCommand {
    type Error = CommandError;

    fn try_from(command: &DecodedCommand) -> Result<Self, Self::Error> {
        let owned = |position: usize| command.required(position).map(str::to_owned);

        let parsed = match command.name.as_str() {
            "media" => Self::Media { id: owned(0)? },
            "character" => Self::Character {
                id: owned(0)?,
                new_message: command.text(1) == Some("1"),
            },
            "mcharacters" => {
                Self::MediaCharacters { media_id: owned(0)?, index: command.integer(1)? }
            }
            "list" => Self::List {
                user_id: owned(0)?,
                media_id: command.text(1).map(str::to_owned),
                rating: command.number(2),
                index: command.integer(3)?,
            },
            "like" => Self::Like { character_id: owned(0)? },
            "likes" => Self::Likes {
                user_id: owned(0)?,
                filter: command.text(1) == Some("1"),
                index: command.integer(2)?,
            },
            "found" => Self::Found {
                media_id: owned(0)?,
                index: command.integer(1)?,
                direction: command.text(2).map(str::to_owned),
            },
            "gacha" | "q" => Self::Gacha {
                user_id: owned(0)?,
                guarantee: command.optional_integer(1)?,
                quiet: command.name == "q",
            },
            "pull" => Self::Pull { user_id: owned(0)?, guarantee: command.integer(1)? },
            "buy" => {
                let variant = command.required(0)?;
                let offer = BuyOffer::parse(variant)
                    .ok_or_else(|| CommandError::UnknownCommand(format!("buy={variant}")))?;
                Self::Buy { offer, user_id: owned(1)?, quantity: command.integer(2)? }
            }
            "now" => Self::Now { user_id: owned(0)? },
            "help" => Self::Help { index: command.integer(1)? },
            "give" => Self::Give {
                user_id: owned(0)?,
                target_id: owned(1)?,
                character_ids: command.list(2),
            },
            "trade" => Self::Trade {
                user_id: owned(0)?,
                target_id: owned(1)?,
                give: command.list(2),
                take: command.list(3),
            },
            "synthesis" => Self::Synthesis { user_id: owned(0)?, target: command.integer(1)? },
            "steal" | "bsteal" => Self::Steal {
                user_id: owned(0)?,
                character_id: owned(1)?,
                pre: command.integer(2)?,
                stars: command.number(3),
                sacrifice: command.name == "bsteal",
            },
            "packs" => Self::Packs { index: command.integer(1)? },
            "popular" => Self::Popular { index: command.integer(1)? },
            "install" => Self::Install { pack_id: owned(0)?, user_id: owned(1)? },
            "uninstall" => Self::Uninstall { pack_id: owned(0)?, user_id: owned(1)? },
            "stats" => {
                let variant = command.required(0)?;
                let kind = StatKind::parse(variant)
                    .ok_or_else(|| CommandError::UnknownCommand(format!("stats={variant}")))?;
                Self::Stats { kind, user_id: owned(1)?, character_id: owned(2)? }
            }
            "cancel" => Self::Cancel {
                owner: command.text(0).map(str::to_owned),
                counterpart: command.text(1).map(str::to_owned),
            },
            other => return Err(CommandError::UnknownCommand(other.to_owned())),
        };

        Ok(parsed)
    }
}

fn some(value: impl ToString) -> Option<String> {
    Some(value.to_string())
}

fn number_field(value: f64) -> Option<String> {
    (!value.is_nan()).then(|| format!("{}", value as i64))
}

fn list_field(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        let delimiter = LIST_DELIMITER.to_string();
        Some(values.join(delimiter.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BuyOffer, CommandError, ComponentCommand, DecodedCommand, StatKind, MAX_IDENTIFIER_LEN,
    };

    #[test]
    fn decode_treats_consecutive_delimiters_as_absent_fields() {
        let decoded = DecodedCommand::decode("list=U===1");

        assert_eq!(decoded.name, "list");
        assert_eq!(decoded.args, vec![Some("U".to_owned()), None, None, Some("1".to_owned())]);
        assert_eq!(decoded.text(1), None);
        assert!(decoded.number(2).is_nan());
        assert_eq!(decoded.integer::<usize>(3), Ok(1));
    }

    #[test]
    fn decode_is_total_over_delimiter_soup() {
        for identifier in ["", "=", "==", "&", "=&=", "a=&&", "&=&", "name", "x==&==y"] {
            let decoded = DecodedCommand::decode(identifier);
            assert_eq!(decoded.encode(), identifier);
            // typed parsing may reject, but must not panic
            let _ = ComponentCommand::try_from(&decoded);
        }
    }

    #[test]
    fn sub_lists_keep_order_and_duplicates() {
        let decoded = DecodedCommand::decode("give=U=T=c1&c2&c1");
        assert_eq!(decoded.list(2), vec!["c1", "c2", "c1"]);
        assert!(decoded.list(3).is_empty());
    }

    #[test]
    fn number_is_nan_for_non_numeric_text() {
        let decoded = DecodedCommand::decode("steal=U=C=40=lots");
        assert_eq!(decoded.number(2), 40.0);
        assert!(decoded.number(3).is_nan());
        assert!(decoded.number(9).is_nan());
    }

    #[test]
    fn list_command_reads_rating_as_nan_when_omitted() {
        let command = ComponentCommand::parse("list=U===1").expect("parse");
        let ComponentCommand::List { user_id, media_id, rating, index } = command else {
            panic!("expected list command");
        };

        assert_eq!(user_id, "U");
        assert_eq!(media_id, None);
        assert!(rating.is_nan());
        assert_ne!(rating, 0.0);
        assert_eq!(index, 1);
    }

    #[test]
    fn unknown_names_and_sub_variants_are_rejected_by_typed_parse() {
        assert_eq!(
            ComponentCommand::parse("teleport=U"),
            Err(CommandError::UnknownCommand("teleport".to_owned()))
        );
        assert_eq!(
            ComponentCommand::parse("stats=unknown=U=C"),
            Err(CommandError::UnknownCommand("stats=unknown".to_owned()))
        );
        assert_eq!(
            ComponentCommand::parse("buy=free=U=1"),
            Err(CommandError::UnknownCommand("buy=free".to_owned()))
        );
    }

    #[test]
    fn malformed_required_numbers_are_reported_with_position() {
        assert!(matches!(
            ComponentCommand::parse("help==next"),
            Err(CommandError::MalformedArgument { position: 1, .. })
        ));
        assert!(matches!(
            ComponentCommand::parse("steal=U=C"),
            Err(CommandError::MalformedArgument { position: 2, .. })
        ));
    }

    #[test]
    fn typed_commands_encode_back_to_their_canonical_identifier() {
        let vectors = [
            "media=media_id",
            "character=character_id",
            "character=character_id=1",
            "mcharacters=media_id=1",
            "list=user_id===1",
            "list=user_id==5=0",
            "list=user_id=media_id==0",
            "like=character_id",
            "likes=user_id=0=1",
            "found=media_id=1=prev",
            "gacha=user_id",
            "q=user_id",
            "pull=user_id=4",
            "buy=normal=user_id=3",
            "buy=guaranteed=user_id=5",
            "buy=bguaranteed=user_id=5",
            "now=user_id",
            "help==1",
            "give=user_id=target_id=c1&c2&c3",
            "trade=user_id=target_id=g1&g2=t1&t2",
            "synthesis=user_id=5",
            "steal=user_id=character_id=40",
            "bsteal=user_id=character_id=40=5",
            "packs==1",
            "popular==1",
            "install=pack_id=user_id",
            "uninstall=pack_id=user_id",
            "stats=str=user_id=character_id",
            "cancel",
            "cancel=user_id",
            "cancel=user_id=target_id",
        ];

        for identifier in vectors {
            let command = ComponentCommand::parse(identifier)
                .unwrap_or_else(|error| panic!("`{identifier}` should parse: {error}"));
            assert_eq!(command.encode(), identifier);
        }
    }

    #[test]
    fn typed_round_trip_preserves_structured_arguments() {
        let commands = [
            ComponentCommand::Buy {
                offer: BuyOffer::BoughtGuaranteed,
                user_id: "U".to_owned(),
                quantity: 5,
            },
            ComponentCommand::Stats {
                kind: StatKind::Agility,
                user_id: "U".to_owned(),
                character_id: "C".to_owned(),
            },
            ComponentCommand::Trade {
                user_id: "U".to_owned(),
                target_id: "T".to_owned(),
                give: vec!["a".to_owned(), "a".to_owned()],
                take: vec!["b".to_owned()],
            },
            ComponentCommand::Gacha { user_id: "U".to_owned(), guarantee: Some(3), quiet: true },
            ComponentCommand::Cancel { owner: None, counterpart: None },
        ];

        for command in commands {
            assert_eq!(ComponentCommand::parse(&command.encode()), Ok(command));
        }
    }

    #[test]
    fn encode_checked_enforces_identifier_limit() {
        let command = ComponentCommand::Give {
            user_id: "U".to_owned(),
            target_id: "T".to_owned(),
            character_ids: vec!["x".repeat(40); 3],
        };

        assert!(matches!(
            command.encode_checked(),
            Err(CommandError::IdentifierTooLong { len }) if len > MAX_IDENTIFIER_LEN
        ));
        assert!(ComponentCommand::Now { user_id: "U".to_owned() }.encode_checked().is_ok());
    }
}
