use std::sync::Arc;

use common::{
    env_config::{PricingConfig, PromptConfig},
    error::{AppError, Res},
    events::{InboundEvent, OutboundCommand, UserId},
    misc::{RequestKind, format_request_number},
};
use db::dtos::{activation::ActivationCreateRequest, purchase::PurchaseCreateRequest};
use sqlx::SqlitePool;

use crate::{
    messages,
    session::{Session, SessionStore},
    workflow::{self, Field, InputKind, IntakeState, Track},
};

/// Customer side of the bot: drives the purchase and activation tracks and
/// the payment sub-flow, writing every accepted step through to the store.
pub struct IntakeService {
    pool: Arc<SqlitePool>,
    sessions: SessionStore,
    pricing: PricingConfig,
    prompts: PromptConfig,
}

/// Outcome of persisting one captured field.
enum Stored {
    Ok,
    /// The row the session points at no longer exists, e.g. deleted by staff.
    Missing,
}

impl IntakeService {
    pub fn new(pool: Arc<SqlitePool>, pricing: PricingConfig, prompts: PromptConfig) -> Self {
        Self {
            pool,
            sessions: SessionStore::new(),
            pricing,
            prompts,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one customer event and returns the replies for it.
    ///
    /// Store failures never escape: the step is not advanced and the user is
    /// told to try again.
    pub async fn handle(&self, event: &InboundEvent) -> Vec<OutboundCommand> {
        let user_id = event.user_id();
        match self.dispatch(event).await {
            Ok(commands) => commands,
            Err(error) => {
                log::error!("Intake step failed for user {}: {}", user_id, error);
                vec![messages::storage_failure(user_id)]
            }
        }
    }

    /// Drops any progress and shows the main menu.
    pub fn reset(&self, user_id: UserId) -> Vec<OutboundCommand> {
        self.sessions.clear(user_id);
        vec![messages::welcome(user_id)]
    }

    async fn dispatch(&self, event: &InboundEvent) -> Res<Vec<OutboundCommand>> {
        let user_id = event.user_id();
        if let Some(command) = event.command() {
            return Ok(self.command(user_id, command));
        }

        match event {
            InboundEvent::SessionReset { .. } => Ok(self.reset(user_id)),
            InboundEvent::Text { text, username, .. } => match self.sessions.get(user_id) {
                Some(session) => {
                    self.step(user_id, session, InputKind::Text, text, username.as_deref())
                        .await
                }
                None => Ok(vec![messages::welcome(user_id)]),
            },
            InboundEvent::Photo { file_ref, .. } | InboundEvent::Document { file_ref, .. } => {
                match self.sessions.get(user_id) {
                    Some(session) => {
                        self.step(user_id, session, InputKind::File, file_ref, None)
                            .await
                    }
                    None => Ok(Vec::new()),
                }
            }
            InboundEvent::Button { action_id, .. } => self.button(user_id, action_id).await,
            InboundEvent::PaymentConfirmed {
                charge_ref, amount, ..
            } => self.payment_confirmed(user_id, charge_ref, *amount).await,
            InboundEvent::PreCheckout { query_id, .. } => {
                Ok(vec![OutboundCommand::AnswerPreCheckout {
                    query_id: query_id.clone(),
                    ok: true,
                }])
            }
        }
    }

    fn command(&self, user_id: UserId, command: &str) -> Vec<OutboundCommand> {
        match command {
            "start" => self.reset(user_id),
            "cancel" => self.cancel(user_id),
            other => {
                log::debug!("Ignoring command /{} from user {}", other, user_id);
                Vec::new()
            }
        }
    }

    fn cancel(&self, user_id: UserId) -> Vec<OutboundCommand> {
        if let Some(session) = self.sessions.clear(user_id) {
            log::info!(
                "User {} cancelled {:?} at {:?}",
                user_id,
                session.track,
                session.state
            );
        }
        vec![messages::cancelled(user_id)]
    }

    async fn button(&self, user_id: UserId, action_id: &str) -> Res<Vec<OutboundCommand>> {
        match action_id {
            messages::ACTION_BUY => Ok(self.start(user_id, Track::Purchase)),
            messages::ACTION_ACTIVATE => Ok(self.start(user_id, Track::Activation)),
            messages::ACTION_CANCEL => Ok(self.cancel(user_id)),
            messages::ACTION_SKIP_SERIAL_PHOTO | messages::ACTION_SKIP_BOX_PHOTO => {
                let Some(session) = self.sessions.get(user_id) else {
                    return Ok(vec![messages::welcome(user_id)]);
                };
                let expected = if action_id == messages::ACTION_SKIP_SERIAL_PHOTO {
                    IntakeState::AwaitingSerialPhoto
                } else {
                    IntakeState::AwaitingBoxSerialPhoto
                };
                if session.state != expected {
                    // button from an earlier message
                    return Ok(vec![messages::unexpected_input(user_id, session.state)]);
                }
                self.step(user_id, session, InputKind::Skip, "", None).await
            }
            other => {
                log::debug!("Unknown button {} from user {}", other, user_id);
                Ok(Vec::new())
            }
        }
    }

    /// Starts a track from scratch. Progress in any other track is discarded;
    /// rows it already created stay in the store.
    fn start(&self, user_id: UserId, track: Track) -> Vec<OutboundCommand> {
        self.sessions.start(user_id, track);
        log::info!("User {} started {:?}", user_id, track);
        vec![messages::track_intro(user_id, track)]
    }

    /// Applies one input to the session: validate, persist, then advance.
    async fn step(
        &self,
        user_id: UserId,
        mut session: Session,
        input: InputKind,
        raw: &str,
        username: Option<&str>,
    ) -> Res<Vec<OutboundCommand>> {
        let Some(rule) = workflow::rule(session.track, session.state, input) else {
            return Ok(vec![messages::unexpected_input(user_id, session.state)]);
        };

        let mut replies = Vec::new();
        match rule.capture {
            Some(field) => {
                let Some(value) = field.validate(raw) else {
                    return Ok(vec![messages::invalid(user_id, field)]);
                };
                let stored = self
                    .store(user_id, &mut session, field, value, username, &mut replies)
                    .await?;
                if let Stored::Missing = stored {
                    log::warn!(
                        "Request of user {} vanished during {:?}, dropping session",
                        user_id,
                        session.state
                    );
                    self.sessions.clear(user_id);
                    return Ok(vec![messages::request_missing(user_id)]);
                }
            }
            None => replies.push(match session.state {
                IntakeState::AwaitingSerialPhoto => messages::serial_photo_skipped(user_id),
                _ => messages::box_photo_skipped(user_id),
            }),
        }

        let from = session.state;
        session.state = rule.next;
        replies.extend(self.enter(user_id, &session, from));

        if session.state == IntakeState::Done {
            self.sessions.clear(user_id);
        } else {
            self.sessions.put(user_id, session);
        }
        Ok(replies)
    }

    /// Writes a validated field to the store. Session fields change only
    /// after the write succeeded.
    async fn store(
        &self,
        user_id: UserId,
        session: &mut Session,
        field: Field,
        value: String,
        username: Option<&str>,
        replies: &mut Vec<OutboundCommand>,
    ) -> Res<Stored> {
        let pool = self.pool.as_ref();
        let updated = match field {
            Field::Phone => {
                session.phone = Some(value);
                true
            }
            Field::Name => {
                let phone = session
                    .phone
                    .clone()
                    .ok_or_else(|| AppError::Internal("name step reached without a phone".into()))?;
                let username = username.map(str::to_string);
                match session.track {
                    Track::Purchase => {
                        let purchase = db::purchase::insert_purchase(
                            pool,
                            PurchaseCreateRequest {
                                user_id,
                                phone,
                                name: value,
                                username,
                            },
                        )
                        .await?;
                        log::info!("Purchase {} created for user {}", purchase.id, user_id);
                        replies.push(messages::purchase_created(
                            user_id,
                            &purchase.request_number(),
                        ));
                    }
                    Track::Activation => {
                        let activation = db::activation::insert_activation(
                            pool,
                            ActivationCreateRequest {
                                user_id,
                                phone,
                                name: value,
                                username,
                            },
                        )
                        .await?;
                        log::info!("Activation {} created for user {}", activation.id, user_id);
                        session.activation_id = Some(activation.id);
                        replies.push(messages::activation_created(
                            user_id,
                            &activation.request_number(),
                        ));
                    }
                }
                true
            }
            Field::Serial => {
                db::activation::set_serial_number(pool, activation_id(session)?, &value).await?
            }
            Field::SerialPhoto => {
                db::activation::set_serial_photo(pool, activation_id(session)?, &value).await?
            }
            Field::BoxSerial => {
                db::activation::set_box_serial_number(pool, activation_id(session)?, &value)
                    .await?
            }
            Field::BoxSerialPhoto => {
                db::activation::set_box_serial_photo(pool, activation_id(session)?, &value).await?
            }
            Field::Kit => match db::activation::complete_with_kit(pool, user_id, &value).await? {
                Some(id) => {
                    log::info!("Activation {} completed with kit {}", id, value);
                    true
                }
                None => false,
            },
        };

        Ok(if updated { Stored::Ok } else { Stored::Missing })
    }

    /// Prompts shown on entering the session's current state.
    fn enter(&self, user_id: UserId, session: &Session, from: IntakeState) -> Vec<OutboundCommand> {
        match session.state {
            IntakeState::AwaitingPhone => vec![messages::track_intro(user_id, session.track)],
            IntakeState::AwaitingName => vec![messages::ask_name(user_id)],
            IntakeState::AwaitingSerial => messages::ask_serial(user_id, &self.prompts),
            IntakeState::AwaitingSerialPhoto => vec![messages::ask_serial_photo(user_id)],
            IntakeState::AwaitingBoxSerial => messages::ask_box_serial(user_id, &self.prompts),
            IntakeState::AwaitingBoxSerialPhoto => vec![messages::ask_box_serial_photo(user_id)],
            IntakeState::AwaitingKit => Vec::new(),
            IntakeState::Done => match (session.track, from) {
                (Track::Purchase, _) => Vec::new(),
                (Track::Activation, IntakeState::AwaitingKit) => vec![messages::kit_saved(user_id)],
                (Track::Activation, _) => {
                    vec![messages::activation_received(user_id, &self.pricing)]
                }
            },
        }
    }

    /// Confirms the user's latest pending activation. A repeated confirmation
    /// finds nothing pending and changes nothing.
    async fn payment_confirmed(
        &self,
        user_id: UserId,
        charge_ref: &str,
        amount: i64,
    ) -> Res<Vec<OutboundCommand>> {
        let confirmed =
            db::activation::confirm_payment(self.pool.as_ref(), user_id, charge_ref).await?;

        let Some(activation_id) = confirmed else {
            log::warn!(
                "Payment {} ({}) from user {} matched no pending activation",
                charge_ref,
                amount,
                user_id
            );
            return Ok(vec![messages::no_pending_payment(user_id)]);
        };

        log::info!(
            "Payment {} ({}) confirmed activation {} of user {}",
            charge_ref,
            amount,
            activation_id,
            user_id
        );
        self.sessions.put(
            user_id,
            Session {
                track: Track::Activation,
                state: IntakeState::AwaitingKit,
                phone: None,
                activation_id: Some(activation_id),
            },
        );
        Ok(messages::payment_received(
            user_id,
            &format_request_number(RequestKind::Activation, activation_id),
        ))
    }
}

fn activation_id(session: &Session) -> Res<i64> {
    session
        .activation_id
        .ok_or_else(|| AppError::Internal("activation step reached without a request".into()))
}
