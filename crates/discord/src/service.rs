use async_trait::async_trait;
use pullbot_core::InteractionError;
use thiserror::Error;

use crate::commands::{BuyOffer, StatKind};
use crate::interaction::SlashCommand;
use crate::response::{Embed, Message};

/// Request-scoped facts every handler receives. `interaction_id` is stable
/// across platform re-deliveries and can be used to de-duplicate side effects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerContext {
    pub interaction_id: String,
    pub token: String,
    pub guild_id: Option<String>,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListRequest {
    pub user_id: String,
    pub media_id: Option<String>,
    pub rating: f64,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LikeRequest {
    pub character_id: String,
    pub mention: bool,
    pub undo: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GachaRequest {
    pub user_id: String,
    pub guarantee: Option<u32>,
    pub quiet: bool,
    pub mention: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GiveRequest {
    pub user_id: String,
    pub target_id: String,
    pub character_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeRequest {
    pub user_id: String,
    pub target_id: String,
    pub give_character_ids: Vec<String>,
    pub take_character_ids: Vec<String>,
}

/// `stars` is NaN when the identifier carried no star filter.
#[derive(Clone, Debug, PartialEq)]
pub struct StealRequest {
    pub user_id: String,
    pub character_id: String,
    pub pre: i64,
    pub stars: f64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0} is unavailable")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
}

impl From<ServiceError> for InteractionError {
    fn from(value: ServiceError) -> Self {
        InteractionError::SubsystemFailure(value.to_string())
    }
}

pub type ServiceResult = Result<Message, ServiceError>;

/// The game subsystems behind the interaction edge. Each method returns an
/// unfinished [`Message`]; the dispatcher decides whether to keep its kind.
#[async_trait]
pub trait GameService: Send + Sync {
    async fn media(&self, ctx: &HandlerContext, id: &str) -> ServiceResult;

    async fn character(&self, ctx: &HandlerContext, id: &str) -> ServiceResult;

    async fn media_characters(
        &self,
        ctx: &HandlerContext,
        media_id: &str,
        index: usize,
    ) -> ServiceResult;

    async fn list(&self, ctx: &HandlerContext, request: ListRequest) -> ServiceResult;

    async fn like(&self, ctx: &HandlerContext, request: LikeRequest) -> ServiceResult;

    async fn likes_list(
        &self,
        ctx: &HandlerContext,
        user_id: &str,
        filter: bool,
        index: usize,
    ) -> ServiceResult;

    async fn media_found(&self, ctx: &HandlerContext, media_id: &str, index: usize)
        -> ServiceResult;

    async fn gacha(&self, ctx: &HandlerContext, request: GachaRequest) -> ServiceResult;

    async fn confirm_normal(&self, ctx: &HandlerContext, user_id: &str, amount: u32)
        -> ServiceResult;

    async fn confirm_guaranteed(
        &self,
        ctx: &HandlerContext,
        user_id: &str,
        stars: u32,
    ) -> ServiceResult;

    async fn guaranteed(&self, ctx: &HandlerContext, user_id: &str, stars: u32) -> ServiceResult;

    async fn now(&self, ctx: &HandlerContext, user_id: &str, mention: bool) -> ServiceResult;

    async fn help_pages(&self, ctx: &HandlerContext, index: usize) -> ServiceResult;

    async fn give(&self, ctx: &HandlerContext, request: GiveRequest) -> ServiceResult;

    async fn trade_accepted(&self, ctx: &HandlerContext, request: TradeRequest) -> ServiceResult;

    async fn synthesis_confirmed(
        &self,
        ctx: &HandlerContext,
        user_id: &str,
        target: u32,
    ) -> ServiceResult;

    async fn steal_attempt(&self, ctx: &HandlerContext, request: StealRequest) -> ServiceResult;

    async fn steal_sacrifices(&self, ctx: &HandlerContext, request: StealRequest)
        -> ServiceResult;

    async fn pack_pages(&self, ctx: &HandlerContext, index: usize) -> ServiceResult;

    async fn popular_packs(&self, ctx: &HandlerContext, index: usize) -> ServiceResult;

    async fn install_pack(&self, ctx: &HandlerContext, pack_id: &str) -> ServiceResult;

    async fn uninstall_pack(&self, ctx: &HandlerContext, pack_id: &str) -> ServiceResult;

    async fn update_stats(
        &self,
        ctx: &HandlerContext,
        user_id: &str,
        character_id: &str,
        kind: StatKind,
    ) -> ServiceResult;

    async fn slash_command(&self, ctx: &HandlerContext, command: &SlashCommand) -> ServiceResult;
}

/// Answers every call with a short description of what was asked. Used when
/// the edge runs without game subsystems attached.
#[derive(Default)]
pub struct NoopGameService;

fn acknowledge(text: String) -> ServiceResult {
    Ok(Message::new().embed(Embed::new().description(text)))
}

#[async_trait]
impl GameService for NoopGameService {
    async fn media(&self, _ctx: &HandlerContext, id: &str) -> ServiceResult {
        acknowledge(format!("media `{id}`"))
    }

    async fn character(&self, _ctx: &HandlerContext, id: &str) -> ServiceResult {
        acknowledge(format!("character `{id}`"))
    }

    async fn media_characters(
        &self,
        _ctx: &HandlerContext,
        media_id: &str,
        index: usize,
    ) -> ServiceResult {
        acknowledge(format!("characters of `{media_id}`, page {index}"))
    }

    async fn list(&self, _ctx: &HandlerContext, request: ListRequest) -> ServiceResult {
        acknowledge(format!("collection of <@{}>, page {}", request.user_id, request.index))
    }

    async fn like(&self, _ctx: &HandlerContext, request: LikeRequest) -> ServiceResult {
        acknowledge(format!("liked `{}`", request.character_id))
    }

    async fn likes_list(
        &self,
        _ctx: &HandlerContext,
        user_id: &str,
        _filter: bool,
        index: usize,
    ) -> ServiceResult {
        acknowledge(format!("likes of <@{user_id}>, page {index}"))
    }

    async fn media_found(
        &self,
        _ctx: &HandlerContext,
        media_id: &str,
        index: usize,
    ) -> ServiceResult {
        acknowledge(format!("found characters of `{media_id}`, page {index}"))
    }

    async fn gacha(&self, _ctx: &HandlerContext, request: GachaRequest) -> ServiceResult {
        acknowledge(format!("pull for <@{}>", request.user_id))
    }

    async fn confirm_normal(
        &self,
        _ctx: &HandlerContext,
        _user_id: &str,
        amount: u32,
    ) -> ServiceResult {
        acknowledge(format!("bought {amount} {}", BuyOffer::Normal.as_str()))
    }

    async fn confirm_guaranteed(
        &self,
        _ctx: &HandlerContext,
        _user_id: &str,
        stars: u32,
    ) -> ServiceResult {
        acknowledge(format!("bought a {stars}-star guarantee"))
    }

    async fn guaranteed(&self, _ctx: &HandlerContext, _user_id: &str, stars: u32) -> ServiceResult {
        acknowledge(format!("using a {stars}-star guarantee"))
    }

    async fn now(&self, _ctx: &HandlerContext, user_id: &str, _mention: bool) -> ServiceResult {
        acknowledge(format!("pulls available for <@{user_id}>"))
    }

    async fn help_pages(&self, _ctx: &HandlerContext, index: usize) -> ServiceResult {
        acknowledge(format!("help page {index}"))
    }

    async fn give(&self, _ctx: &HandlerContext, request: GiveRequest) -> ServiceResult {
        acknowledge(format!(
            "gave {} characters to <@{}>",
            request.character_ids.len(),
            request.target_id
        ))
    }

    async fn trade_accepted(&self, _ctx: &HandlerContext, request: TradeRequest) -> ServiceResult {
        acknowledge(format!(
            "trade between <@{}> and <@{}> accepted",
            request.user_id, request.target_id
        ))
    }

    async fn synthesis_confirmed(
        &self,
        _ctx: &HandlerContext,
        _user_id: &str,
        target: u32,
    ) -> ServiceResult {
        acknowledge(format!("synthesized a {target}-star character"))
    }

    async fn steal_attempt(&self, _ctx: &HandlerContext, request: StealRequest) -> ServiceResult {
        acknowledge(format!("attempting to steal `{}`", request.character_id))
    }

    async fn steal_sacrifices(
        &self,
        _ctx: &HandlerContext,
        request: StealRequest,
    ) -> ServiceResult {
        acknowledge(format!("choosing sacrifices to steal `{}`", request.character_id))
    }

    async fn pack_pages(&self, _ctx: &HandlerContext, index: usize) -> ServiceResult {
        acknowledge(format!("installed packs, page {index}"))
    }

    async fn popular_packs(&self, _ctx: &HandlerContext, index: usize) -> ServiceResult {
        acknowledge(format!("popular packs, page {index}"))
    }

    async fn install_pack(&self, _ctx: &HandlerContext, pack_id: &str) -> ServiceResult {
        acknowledge(format!("installed `{pack_id}`"))
    }

    async fn uninstall_pack(&self, _ctx: &HandlerContext, pack_id: &str) -> ServiceResult {
        acknowledge(format!("uninstalled `{pack_id}`"))
    }

    async fn update_stats(
        &self,
        _ctx: &HandlerContext,
        _user_id: &str,
        character_id: &str,
        kind: StatKind,
    ) -> ServiceResult {
        acknowledge(format!("updated `{}` of `{character_id}`", kind.as_str()))
    }

    async fn slash_command(&self, _ctx: &HandlerContext, command: &SlashCommand) -> ServiceResult {
        acknowledge(format!("/{}", command.name))
    }
}
