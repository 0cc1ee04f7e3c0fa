use std::sync::Arc;

use pullbot_core::InteractionError;

use crate::{
    commands::{BuyOffer, ComponentCommand},
    response::{Message, MessageType},
    service::{
        GachaRequest, GameService, GiveRequest, HandlerContext, LikeRequest, ListRequest,
        StealRequest, TradeRequest,
    },
};

/// Whether the dispatcher overrides the kind of message a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutePolicy {
    /// Edit the message the component is attached to.
    Update,
    /// Post a new message.
    New,
    /// Keep whatever the handler chose.
    Handler,
}

impl RoutePolicy {
    pub fn apply(self, message: Message) -> Message {
        match self {
            Self::Update => message.set_type(MessageType::Update),
            Self::New => message.set_type(MessageType::New),
            Self::Handler => message,
        }
    }
}

impl ComponentCommand {
    pub fn route_policy(&self) -> RoutePolicy {
        match self {
            Self::Character { new_message: true, .. } => RoutePolicy::New,
            Self::Like { .. }
            | Self::Gacha { .. }
            | Self::Pull { .. }
            | Self::Now { .. }
            | Self::Install { .. } => RoutePolicy::Handler,
            _ => RoutePolicy::Update,
        }
    }

    /// Commands that only exist when community packs are enabled.
    pub fn is_community_feature(&self) -> bool {
        matches!(self, Self::Popular { .. } | Self::Install { .. } | Self::Uninstall { .. })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchFeatures {
    pub community_packs: bool,
}

/// Maps each typed command onto exactly one subsystem entry point.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn GameService>,
    features: DispatchFeatures,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn GameService>, features: DispatchFeatures) -> Self {
        Self { service, features }
    }

    pub fn service(&self) -> &dyn GameService {
        self.service.as_ref()
    }

    /// Must only be called once the permission guard has allowed `command`.
    pub async fn dispatch(
        &self,
        command: ComponentCommand,
        ctx: &HandlerContext,
    ) -> Result<Message, InteractionError> {
        if command.is_community_feature() && !self.features.community_packs {
            return Err(InteractionError::UnknownCommand(format!(
                "{} is disabled",
                command.name()
            )));
        }

        let policy = command.route_policy();
        let service = self.service.as_ref();

        let message = match command {
            ComponentCommand::Media { id } => service.media(ctx, &id).await,
            ComponentCommand::Character { id, .. } => service.character(ctx, &id).await,
            ComponentCommand::MediaCharacters { media_id, index } => {
                service.media_characters(ctx, &media_id, index).await
            }
            ComponentCommand::List { user_id, media_id, rating, index } => {
                service.list(ctx, ListRequest { user_id, media_id, rating, index }).await
            }
            ComponentCommand::Like { character_id } => {
                service.like(ctx, LikeRequest { character_id, mention: true, undo: false }).await
            }
            ComponentCommand::Likes { user_id, filter, index } => {
                service.likes_list(ctx, &user_id, filter, index).await
            }
            ComponentCommand::Found { media_id, index, .. } => {
                service.media_found(ctx, &media_id, index).await
            }
            ComponentCommand::Gacha { user_id, guarantee, quiet } => {
                service.gacha(ctx, GachaRequest { user_id, guarantee, quiet, mention: true }).await
            }
            ComponentCommand::Pull { user_id, guarantee } => {
                let request = GachaRequest {
                    user_id,
                    guarantee: Some(guarantee),
                    quiet: false,
                    mention: true,
                };
                service.gacha(ctx, request).await
            }
            ComponentCommand::Buy { offer, user_id, quantity } => match offer {
                BuyOffer::Normal => service.confirm_normal(ctx, &user_id, quantity).await,
                BuyOffer::Guaranteed => service.confirm_guaranteed(ctx, &user_id, quantity).await,
                BuyOffer::BoughtGuaranteed => service.guaranteed(ctx, &user_id, quantity).await,
            },
            ComponentCommand::Now { user_id } => service.now(ctx, &user_id, true).await,
            ComponentCommand::Help { index } => service.help_pages(ctx, index).await,
            ComponentCommand::Give { user_id, target_id, character_ids } => {
                service.give(ctx, GiveRequest { user_id, target_id, character_ids }).await
            }
            ComponentCommand::Trade { user_id, target_id, give, take } => {
                let request = TradeRequest {
                    user_id,
                    target_id,
                    give_character_ids: give,
                    take_character_ids: take,
                };
                service.trade_accepted(ctx, request).await
            }
            ComponentCommand::Synthesis { user_id, target } => {
                service.synthesis_confirmed(ctx, &user_id, target).await
            }
            ComponentCommand::Steal { user_id, character_id, pre, stars, sacrifice } => {
                let request = StealRequest { user_id, character_id, pre, stars };
                if sacrifice {
                    service.steal_sacrifices(ctx, request).await
                } else {
                    service.steal_attempt(ctx, request).await
                }
            }
            ComponentCommand::Packs { index } => service.pack_pages(ctx, index).await,
            ComponentCommand::Popular { index } => service.popular_packs(ctx, index).await,
            ComponentCommand::Install { pack_id, .. } => service.install_pack(ctx, &pack_id).await,
            ComponentCommand::Uninstall { pack_id, .. } => {
                service.uninstall_pack(ctx, &pack_id).await
            }
            ComponentCommand::Stats { kind, user_id, character_id } => {
                service.update_stats(ctx, &user_id, &character_id, kind).await
            }
            // the guard answers every cancel before dispatch
            ComponentCommand::Cancel { .. } => return Err(InteractionError::UnauthorizedSubject),
        }?;

        Ok(policy.apply(message))
    }
}
