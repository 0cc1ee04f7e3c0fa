//! Discord interaction edge
//!
//! This crate turns signed interaction webhooks into responses:
//! - **Signatures** (`signature`) - ed25519 check over `timestamp || body`
//! - **Interactions** (`interaction`) - the inbound JSON model
//! - **Commands** (`commands`) - custom identifier codec (`name=arg=a&b`)
//! - **Guard** (`guard`) - who may press which component
//! - **Dispatch** (`dispatch`) - one subsystem call per command
//! - **Responses** (`response`) - message builder, payloads, multipart bodies
//!
//! # Architecture
//!
//! ```text
//! POST body → SignatureVerifier → IncomingInteraction → DecodedCommand
//!                                                           ↓
//!          ResponsePayload ← Message ← GameService ← Dispatcher ← PermissionGuard
//! ```
//!
//! # Key Types
//!
//! - `InteractionPipeline` - end-to-end handling of one request
//! - `ComponentCommand` - typed form of every custom identifier
//! - `GameService` - trait implemented by the game subsystems
//! - `Message` - handler response builder, finalized once by the pipeline

pub mod commands;
pub mod dispatch;
pub mod guard;
pub mod interaction;
pub mod pipeline;
pub mod response;
pub mod service;
pub mod signature;

pub use commands::{CommandError, ComponentCommand, DecodedCommand};
pub use dispatch::{DispatchFeatures, Dispatcher, RoutePolicy};
pub use guard::{PermissionGuard, Verdict};
pub use interaction::{IncomingInteraction, InteractionKind, SlashCommand};
pub use pipeline::InteractionPipeline;
pub use response::{FinalizedResponse, Message, MessageType, ResponseBody, ResponsePayload};
pub use service::{GameService, HandlerContext, NoopGameService, ServiceError};
pub use signature::{SignatureVerifier, SignedRequest, SIGNATURE_HEADER, TIMESTAMP_HEADER};
