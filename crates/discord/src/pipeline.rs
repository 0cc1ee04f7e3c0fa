use std::time::Duration;

use pullbot_core::{Disposition, InteractionError};
use tracing::{debug, info, warn};

use crate::{
    commands::{ComponentCommand, DecodedCommand},
    dispatch::Dispatcher,
    guard::{PermissionGuard, Verdict},
    interaction::{IncomingInteraction, InteractionKind},
    response::{FinalizedResponse, Message, ResponsePayload},
    service::HandlerContext,
    signature::{SignatureVerifier, SignedRequest},
};

/// From a signed request to the payload the platform receives.
///
/// Errors returned from [`InteractionPipeline::handle`] are always transport
/// rejections ([`Disposition::HttpRejection`]); permission and subsystem
/// failures are answered in-band with a 200 payload.
#[derive(Clone)]
pub struct InteractionPipeline {
    verifier: SignatureVerifier,
    guard: PermissionGuard,
    dispatcher: Dispatcher,
    response_budget: Duration,
}

impl InteractionPipeline {
    pub fn new(
        verifier: SignatureVerifier,
        dispatcher: Dispatcher,
        response_budget: Duration,
    ) -> Self {
        Self { verifier, guard: PermissionGuard, dispatcher, response_budget }
    }

    pub async fn handle(
        &self,
        request: SignedRequest<'_>,
    ) -> Result<FinalizedResponse, InteractionError> {
        let body = match self.verifier.verify(request).into_body() {
            Ok(body) => body,
            Err(error) => {
                warn!(
                    event_name = "interaction.rejected.signature",
                    correlation_id = "unverified",
                    "rejected interaction with invalid signature"
                );
                return Err(error);
            }
        };

        let interaction = match IncomingInteraction::from_body(body) {
            Ok(interaction) => interaction,
            Err(error) => {
                warn!(
                    event_name = "interaction.rejected.malformed",
                    correlation_id = "unparsed",
                    error = %error,
                    "rejected interaction with malformed body"
                );
                return Err(error);
            }
        };

        let result = self.respond(&interaction).await;
        let response = match result {
            Ok(response) => response,
            Err(error) => match error.disposition() {
                Disposition::HttpRejection { .. } => {
                    warn!(
                        event_name = "interaction.rejected.malformed",
                        correlation_id = %interaction.id,
                        error = %error,
                        "rejected interaction"
                    );
                    return Err(error);
                }
                Disposition::Forbidden => ResponsePayload::rejection().into(),
                Disposition::Failure => {
                    warn!(
                        event_name = "interaction.subsystem.failed",
                        correlation_id = %interaction.id,
                        error = %error,
                        "subsystem failed while handling interaction"
                    );
                    ResponsePayload::failure().into()
                }
            },
        };

        debug!(
            event_name = "interaction.responded",
            correlation_id = %interaction.id,
            response_type = response.payload.kind.code(),
            files = response.files.len(),
            "interaction response ready"
        );
        Ok(response)
    }

    async fn respond(
        &self,
        interaction: &IncomingInteraction,
    ) -> Result<FinalizedResponse, InteractionError> {
        match interaction.kind {
            InteractionKind::Ping => {
                info!(
                    event_name = "interaction.ping",
                    correlation_id = %interaction.id,
                    "answered platform ping"
                );
                Ok(ResponsePayload::pong().into())
            }
            InteractionKind::Component | InteractionKind::ModalSubmit => {
                self.component(interaction).await
            }
            InteractionKind::ApplicationCommand => self.slash_command(interaction).await,
            InteractionKind::Autocomplete | InteractionKind::Unsupported(_) => {
                info!(
                    event_name = "interaction.route.unknown",
                    correlation_id = %interaction.id,
                    kind = ?interaction.kind,
                    "unsupported interaction kind"
                );
                Err(InteractionError::UnknownCommand(format!("{:?}", interaction.kind)))
            }
        }
    }

    async fn component(
        &self,
        interaction: &IncomingInteraction,
    ) -> Result<FinalizedResponse, InteractionError> {
        let ctx = interaction.context()?;
        let identifier = interaction.component_identifier.as_deref().unwrap_or_default();
        let decoded = DecodedCommand::decode(identifier);

        debug!(
            event_name = "interaction.component.decoded",
            correlation_id = %ctx.interaction_id,
            command = %decoded.name,
            args = decoded.args.len(),
            user_id = %ctx.user_id,
            "decoded component identifier"
        );

        let command = ComponentCommand::try_from(&decoded).map_err(|error| {
            info!(
                event_name = "interaction.route.unknown",
                correlation_id = %ctx.interaction_id,
                command = %decoded.name,
                error = %error,
                "component identifier did not resolve to a command"
            );
            InteractionError::from(error)
        })?;

        let message = match self.guard.check(&command, &ctx.user_id) {
            Verdict::Allow => self.dispatch(command, &ctx).await?,
            Verdict::Cancel => Message::cancelled(),
            Verdict::Decline => Message::declined(),
            Verdict::Deny => {
                info!(
                    event_name = "interaction.guard.denied",
                    correlation_id = %ctx.interaction_id,
                    command = command.name(),
                    user_id = %ctx.user_id,
                    "invoker does not own this component"
                );
                return Err(InteractionError::UnauthorizedSubject);
            }
        };

        Ok(message.finalize()?)
    }

    async fn dispatch(
        &self,
        command: ComponentCommand,
        ctx: &HandlerContext,
    ) -> Result<Message, InteractionError> {
        let name = command.name();
        self.within_budget(name, ctx, self.dispatcher.dispatch(command, ctx)).await
    }

    async fn slash_command(
        &self,
        interaction: &IncomingInteraction,
    ) -> Result<FinalizedResponse, InteractionError> {
        let ctx = interaction.context()?;
        let Some(command) = interaction.command.as_ref() else {
            return Err(InteractionError::UnknownCommand("application command without name".into()));
        };

        let call = async {
            self.dispatcher
                .service()
                .slash_command(&ctx, command)
                .await
                .map_err(InteractionError::from)
        };
        let message = self.within_budget(&command.name, &ctx, call).await?;

        Ok(message.finalize()?)
    }

    async fn within_budget<F>(
        &self,
        command: &str,
        ctx: &HandlerContext,
        call: F,
    ) -> Result<Message, InteractionError>
    where
        F: std::future::Future<Output = Result<Message, InteractionError>>,
    {
        match tokio::time::timeout(self.response_budget, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    event_name = "interaction.subsystem.timeout",
                    correlation_id = %ctx.interaction_id,
                    command,
                    budget_ms = self.response_budget.as_millis() as u64,
                    "subsystem exceeded the response budget"
                );
                Err(InteractionError::SubsystemFailure(format!(
                    "{command} exceeded {}ms",
                    self.response_budget.as_millis()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use ed25519_dalek::{Signer, SigningKey};
    use pullbot_core::InteractionError;
    use serde_json::{json, Value};

    use super::InteractionPipeline;
    use crate::{
        commands::StatKind,
        dispatch::{DispatchFeatures, Dispatcher},
        interaction::SlashCommand,
        response::{FinalizedResponse, Message, ResponsePayload},
        service::{
            GachaRequest, GameService, GiveRequest, HandlerContext, LikeRequest, ListRequest,
            NoopGameService, ServiceError, ServiceResult, StealRequest, TradeRequest,
        },
        signature::{SignatureVerifier, SignedRequest},
    };

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[11u8; 32])
    }

    fn pipeline_with(service: Arc<dyn GameService>, budget: Duration) -> InteractionPipeline {
        InteractionPipeline::new(
            SignatureVerifier::new(signing_key().verifying_key()),
            Dispatcher::new(service, DispatchFeatures::default()),
            budget,
        )
    }

    async fn send(
        pipeline: &InteractionPipeline,
        body: &Value,
    ) -> Result<FinalizedResponse, InteractionError> {
        let body = body.to_string();
        let timestamp = "1700000000";
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = hex::encode(signing_key().sign(&message).to_bytes());

        pipeline
            .handle(SignedRequest { body: body.as_bytes(), signature: &signature, timestamp })
            .await
    }

    fn component(custom_id: &str, user: &str) -> Value {
        json!({
            "id": "interaction_id",
            "token": "token",
            "type": 3,
            "guild_id": "guild_id",
            "member": { "user": { "id": user } },
            "data": { "custom_id": custom_id }
        })
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let pipeline = pipeline_with(Arc::new(NoopGameService), Duration::from_secs(1));
        let response = send(&pipeline, &json!({ "id": "1", "type": 1 })).await.expect("pong");

        assert_eq!(response.payload, ResponsePayload::pong());
    }

    #[tokio::test]
    async fn bad_signature_never_reaches_routing() {
        let pipeline = pipeline_with(Arc::new(NoopGameService), Duration::from_secs(1));
        let result = pipeline
            .handle(SignedRequest { body: br#"{"type":1}"#, signature: "00", timestamp: "1" })
            .await;

        assert_eq!(result, Err(InteractionError::InvalidSignature));
    }

    #[tokio::test]
    async fn malformed_json_is_a_transport_rejection() {
        let pipeline = pipeline_with(Arc::new(NoopGameService), Duration::from_secs(1));
        let result = send(&pipeline, &json!("not an interaction")).await;

        assert!(matches!(result, Err(InteractionError::MalformedBody(_))));
    }

    #[tokio::test]
    async fn autocomplete_fails_closed() {
        let pipeline = pipeline_with(Arc::new(NoopGameService), Duration::from_secs(1));
        let body = json!({ "id": "1", "type": 4, "user": { "id": "u" }, "data": { "name": "x" } });

        let response = send(&pipeline, &body).await.expect("in-band rejection");
        assert_eq!(response.payload, ResponsePayload::rejection());
    }

    struct FailingService;

    #[async_trait]
    impl GameService for FailingService {
        async fn media(&self, _ctx: &HandlerContext, _id: &str) -> ServiceResult {
            Err(ServiceError::Failed("database connection refused".to_owned()))
        }

        async fn character(&self, _ctx: &HandlerContext, _id: &str) -> ServiceResult {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Message::new())
        }

        async fn media_characters(
            &self,
            ctx: &HandlerContext,
            id: &str,
            index: usize,
        ) -> ServiceResult {
            NoopGameService.media_characters(ctx, id, index).await
        }

        async fn list(&self, ctx: &HandlerContext, request: ListRequest) -> ServiceResult {
            NoopGameService.list(ctx, request).await
        }

        async fn like(&self, ctx: &HandlerContext, request: LikeRequest) -> ServiceResult {
            NoopGameService.like(ctx, request).await
        }

        async fn likes_list(
            &self,
            ctx: &HandlerContext,
            user_id: &str,
            filter: bool,
            index: usize,
        ) -> ServiceResult {
            NoopGameService.likes_list(ctx, user_id, filter, index).await
        }

        async fn media_found(
            &self,
            ctx: &HandlerContext,
            media_id: &str,
            index: usize,
        ) -> ServiceResult {
            NoopGameService.media_found(ctx, media_id, index).await
        }

        async fn gacha(&self, ctx: &HandlerContext, request: GachaRequest) -> ServiceResult {
            NoopGameService.gacha(ctx, request).await
        }

        async fn confirm_normal(
            &self,
            ctx: &HandlerContext,
            user_id: &str,
            amount: u32,
        ) -> ServiceResult {
            NoopGameService.confirm_normal(ctx, user_id, amount).await
        }

        async fn confirm_guaranteed(
            &self,
            ctx: &HandlerContext,
            user_id: &str,
            stars: u32,
        ) -> ServiceResult {
            NoopGameService.confirm_guaranteed(ctx, user_id, stars).await
        }

        async fn guaranteed(
            &self,
            ctx: &HandlerContext,
            user_id: &str,
            stars: u32,
        ) -> ServiceResult {
            NoopGameService.guaranteed(ctx, user_id, stars).await
        }

        async fn now(&self, ctx: &HandlerContext, user_id: &str, mention: bool) -> ServiceResult {
            NoopGameService.now(ctx, user_id, mention).await
        }

        async fn help_pages(&self, ctx: &HandlerContext, index: usize) -> ServiceResult {
            NoopGameService.help_pages(ctx, index).await
        }

        async fn give(&self, ctx: &HandlerContext, request: GiveRequest) -> ServiceResult {
            NoopGameService.give(ctx, request).await
        }

        async fn trade_accepted(
            &self,
            ctx: &HandlerContext,
            request: TradeRequest,
        ) -> ServiceResult {
            NoopGameService.trade_accepted(ctx, request).await
        }

        async fn synthesis_confirmed(
            &self,
            ctx: &HandlerContext,
            user_id: &str,
            target: u32,
        ) -> ServiceResult {
            NoopGameService.synthesis_confirmed(ctx, user_id, target).await
        }

        async fn steal_attempt(
            &self,
            ctx: &HandlerContext,
            request: StealRequest,
        ) -> ServiceResult {
            NoopGameService.steal_attempt(ctx, request).await
        }

        async fn steal_sacrifices(
            &self,
            ctx: &HandlerContext,
            request: StealRequest,
        ) -> ServiceResult {
            NoopGameService.steal_sacrifices(ctx, request).await
        }

        async fn pack_pages(&self, ctx: &HandlerContext, index: usize) -> ServiceResult {
            NoopGameService.pack_pages(ctx, index).await
        }

        async fn popular_packs(&self, ctx: &HandlerContext, index: usize) -> ServiceResult {
            NoopGameService.popular_packs(ctx, index).await
        }

        async fn install_pack(&self, ctx: &HandlerContext, pack_id: &str) -> ServiceResult {
            NoopGameService.install_pack(ctx, pack_id).await
        }

        async fn uninstall_pack(&self, ctx: &HandlerContext, pack_id: &str) -> ServiceResult {
            NoopGameService.uninstall_pack(ctx, pack_id).await
        }

        async fn update_stats(
            &self,
            ctx: &HandlerContext,
            user_id: &str,
            character_id: &str,
            kind: StatKind,
        ) -> ServiceResult {
            NoopGameService.update_stats(ctx, user_id, character_id, kind).await
        }

        async fn slash_command(
            &self,
            _ctx: &HandlerContext,
            _command: &SlashCommand,
        ) -> ServiceResult {
            Err(ServiceError::Unavailable("slash commands".to_owned()))
        }
    }

    #[tokio::test]
    async fn subsystem_errors_become_the_generic_failure_embed() {
        let pipeline = pipeline_with(Arc::new(FailingService), Duration::from_secs(1));
        let response =
            send(&pipeline, &component("media=media_id", "user_id")).await.expect("in-band");

        assert_eq!(response.payload, ResponsePayload::failure());
        let text = serde_json::to_string(&response.payload).expect("json");
        assert!(!text.contains("database"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_subsystems_are_cut_off_at_the_budget() {
        let pipeline = pipeline_with(Arc::new(FailingService), Duration::from_millis(2500));
        let response = send(&pipeline, &component("character=character_id", "user_id"))
            .await
            .expect("in-band");

        assert_eq!(response.payload, ResponsePayload::failure());
    }

    #[tokio::test]
    async fn slash_commands_reach_the_service() {
        let pipeline = pipeline_with(Arc::new(NoopGameService), Duration::from_secs(1));
        let body = json!({
            "id": "1",
            "token": "token",
            "type": 2,
            "user": { "id": "user_id" },
            "data": { "name": "gacha" }
        });

        let response = send(&pipeline, &body).await.expect("response");
        let value = serde_json::to_value(&response.payload).expect("json");
        assert_eq!(value["type"], json!(4));
        assert_eq!(value["data"]["embeds"][0]["description"], json!("/gacha"));

        let failing = pipeline_with(Arc::new(FailingService), Duration::from_secs(1));
        let response = send(&failing, &body).await.expect("response");
        assert_eq!(response.payload, ResponsePayload::failure());
    }

    #[tokio::test]
    async fn component_without_invoker_is_malformed() {
        let pipeline = pipeline_with(Arc::new(NoopGameService), Duration::from_secs(1));
        let body = json!({
            "id": "1",
            "token": "t",
            "type": 3,
            "data": { "custom_id": "media=m" }
        });

        assert!(matches!(send(&pipeline, &body).await, Err(InteractionError::MalformedBody(_))));
    }
}
