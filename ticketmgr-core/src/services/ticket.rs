//! Ticket service - one method per backend operation
//!
//! Every method issues a single request through the `Transport` port and
//! folds whatever comes back into an [`Outcome`]: transport errors, error
//! statuses and malformed bodies all end up in the failure slot, never as a
//! returned error.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use super::logging::{events, LogEvent};
use super::secrets::TotpSecretService;
use crate::domain::{
    Credential, EntityDetail, EntityKind, Event, Failure, LoginOutcome, NewEvent, Outcome,
    Registration, TicketCheck,
};
use crate::ports::{EventSink, RawResponse, RequestOptions, Transport};

/// Body of a successful `ticket/new` call
#[derive(Debug, Deserialize)]
struct IssuedSecret {
    success: String,
}

/// Keys the backend puts its error text under, in order of preference
const MESSAGE_KEYS: [&str; 3] = ["message", "detail", "error"];

/// Percent-encode one path segment
const UNEXPECTED_SHAPE: &str = "response did not have the expected shape";

fn segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// `{status_code, message}` for an error response that carries a message
fn api_failure(response: &RawResponse, body: Option<&JsonValue>) -> Option<Failure> {
    let body = body?;
    MESSAGE_KEYS
        .iter()
        .find_map(|key| body.get(*key).and_then(JsonValue::as_str))
        .map(|message| Failure::api(response.status, message))
}

/// Facade over the ticketing backend
pub struct TicketService<T: Transport> {
    transport: T,
    sink: Option<Arc<dyn EventSink>>,
}

impl<T: Transport> TicketService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            sink: None,
        }
    }

    /// Report failures to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn record(&self, event: LogEvent) {
        if let Some(sink) = &self.sink {
            sink.record(event);
        }
    }

    /// One request; `None` when no response was obtained
    async fn send(
        &self,
        operation: &str,
        path: &str,
        options: RequestOptions,
    ) -> Option<RawResponse> {
        match self.transport.call(path, options).await {
            Ok(response) => Some(response),
            Err(e) => {
                self.record(
                    LogEvent::new(events::TRANSPORT_FAILED)
                        .with_operation(operation)
                        .with_error(e.to_string()),
                );
                None
            }
        }
    }

    /// Shape a response: 2xx bodies go through `decode`, error statuses
    /// become `{status_code, message}` when a message is present
    fn interpret<D>(
        &self,
        operation: &str,
        response: RawResponse,
        decode: impl FnOnce(JsonValue) -> serde_json::Result<D>,
    ) -> Outcome<D> {
        let body = response.json();

        if !response.is_success() {
            let failure = api_failure(&response, body.as_ref());
            let mut event = LogEvent::new(events::REQUEST_FAILED)
                .with_operation(operation)
                .with_status(response.status);
            if let Some(message) = failure.as_ref().and_then(Failure::message) {
                event = event.with_error(message);
            }
            self.record(event);
            return Outcome::Failed(failure);
        }

        match body.map(decode) {
            Some(Ok(value)) => Outcome::Ok(value),
            Some(Err(e)) => {
                self.record(
                    LogEvent::new(events::DECODE_FAILED)
                        .with_operation(operation)
                        .with_status(response.status)
                        .with_error(UNEXPECTED_SHAPE)
                        .with_error_details(e.to_string()),
                );
                Outcome::unclassified()
            }
            None => {
                self.record(
                    LogEvent::new(events::DECODE_FAILED)
                        .with_operation(operation)
                        .with_status(response.status)
                        .with_error("body is not JSON"),
                );
                Outcome::unclassified()
            }
        }
    }

    async fn fetch<D: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        options: RequestOptions,
    ) -> Outcome<D> {
        match self.send(operation, path, options).await {
            Some(response) => self.interpret(operation, response, serde_json::from_value),
            None => Outcome::unclassified(),
        }
    }

    async fn fetch_entity(
        &self,
        operation: &str,
        kind: EntityKind,
        path: &str,
        options: RequestOptions,
    ) -> Outcome<EntityDetail> {
        match self.send(operation, path, options).await {
            Some(response) => {
                self.interpret(operation, response, |body| EntityDetail::decode(kind, body))
            }
            None => Outcome::unclassified(),
        }
    }

    /// Sign up a new user
    ///
    /// A rejected sign-up keeps the backend's error body as is (field
    /// validation errors), rather than the `{status_code, message}` shape.
    pub async fn register(&self, registration: &Registration) -> Outcome<EntityDetail> {
        const OP: &str = "register";
        let body = match serde_json::to_value(registration) {
            Ok(body) => body,
            Err(_) => return Outcome::unclassified(),
        };
        let Some(response) = self
            .send(OP, "user", RequestOptions::post().json(body))
            .await
        else {
            return Outcome::unclassified();
        };

        if response.is_success() {
            return self.interpret(OP, response, |body| {
                EntityDetail::decode(EntityKind::User, body)
            });
        }

        self.record(
            LogEvent::new(events::REQUEST_FAILED)
                .with_operation(OP)
                .with_status(response.status),
        );
        match response.json() {
            Some(body) if body.as_object().is_some_and(|o| !o.is_empty()) => {
                Outcome::Failed(Some(Failure::Body(body)))
            }
            _ => Outcome::unclassified(),
        }
    }

    /// Log in; the entity kind is read from the shape of the response
    pub async fn login(&self, credential: &Credential) -> LoginOutcome {
        const OP: &str = "login";
        let body = json!({
            "username": credential.username,
            "password": credential.password,
        });
        let Some(response) = self
            .send(OP, "login", RequestOptions::post().json(body))
            .await
        else {
            return LoginOutcome::Rejected(None);
        };

        let Some(body) = response.json() else {
            self.record(
                LogEvent::new(events::DECODE_FAILED)
                    .with_operation(OP)
                    .with_status(response.status)
                    .with_error("body is not JSON"),
            );
            return LoginOutcome::Rejected(None);
        };

        if !response.is_success() {
            let failure = api_failure(&response, Some(&body));
            let mut event = LogEvent::new(events::REQUEST_FAILED)
                .with_operation(OP)
                .with_status(response.status);
            if let Some(message) = failure.as_ref().and_then(Failure::message) {
                event = event.with_error(message);
            }
            self.record(event);
            return LoginOutcome::Rejected(failure);
        }

        let Some(kind) = EntityKind::sniff(&body) else {
            return LoginOutcome::Ambiguous(body);
        };
        match EntityDetail::decode(kind, body) {
            Ok(detail) => LoginOutcome::Entity(detail),
            Err(e) => {
                self.record(
                    LogEvent::new(events::DECODE_FAILED)
                        .with_operation(OP)
                        .with_status(response.status)
                        .with_error(UNEXPECTED_SHAPE)
                        .with_error_details(e.to_string()),
                );
                LoginOutcome::Rejected(None)
            }
        }
    }

    /// End the session; a success status is enough, the body is ignored
    pub async fn logout(&self) -> Outcome<()> {
        const OP: &str = "logout";
        let Some(response) = self.send(OP, "logout", RequestOptions::get()).await else {
            return Outcome::unclassified();
        };
        if response.is_success() {
            return Outcome::Ok(());
        }
        self.interpret(OP, response, |_| Ok(()))
    }

    /// Profile of any entity kind by username
    pub async fn entity_details(&self, username: &str) -> Outcome<EntityDetail> {
        self.fetch(
            "entityDetails",
            &format!("user/{}", segment(username)),
            RequestOptions::get(),
        )
        .await
    }

    pub async fn event_details(&self, event_uuid: &Uuid) -> Outcome<Event> {
        self.fetch("eventDetails", &format!("event/{}", event_uuid), RequestOptions::get())
            .await
    }

    /// All events, in backend order
    pub async fn event_list(&self) -> Outcome<Vec<Event>> {
        self.fetch("eventList", "event", RequestOptions::get()).await
    }

    /// Entities of one kind registered to an event
    pub async fn event_registered_entity_list(
        &self,
        event_uuid: &Uuid,
        kind: EntityKind,
    ) -> Outcome<Vec<EntityDetail>> {
        const OP: &str = "eventRegisteredEntityList";
        let path = format!("event/{}/{}", event_uuid, kind.key());
        let Some(response) = self.send(OP, &path, RequestOptions::get()).await else {
            return Outcome::unclassified();
        };
        self.interpret(OP, response, |body| {
            Vec::<JsonValue>::deserialize(body)?
                .into_iter()
                .map(|entry| EntityDetail::decode(kind, entry))
                .collect()
        })
    }

    /// Create an event; the backend assigns its uuid
    pub async fn create_new_event(&self, event: &NewEvent) -> Outcome<Event> {
        let body = match serde_json::to_value(event) {
            Ok(body) => body,
            Err(_) => return Outcome::unclassified(),
        };
        self.fetch("createNewEvent", "event", RequestOptions::post().json(body))
            .await
    }

    /// Events a user is enrolled in
    pub async fn user_events(&self, username: &str) -> Outcome<Vec<Event>> {
        self.fetch(
            "userEvents",
            &format!("user/{}/event", segment(username)),
            RequestOptions::get(),
        )
        .await
    }

    /// Enroll a user in an event (admin session required)
    pub async fn enroll_user_in_event(&self, username: &str, event_uuid: &Uuid) -> Outcome<Event> {
        self.fetch(
            "enrollUserInEvent",
            &format!("user/{}/event", segment(username)),
            RequestOptions::post().json(json!({ "event_uuid": event_uuid })),
        )
        .await
    }

    /// Add a user to an event's roster
    pub async fn add_user_to_event(
        &self,
        event_uuid: &Uuid,
        user_uuid: &Uuid,
    ) -> Outcome<EntityDetail> {
        self.fetch_entity(
            "addUserToEvent",
            EntityKind::User,
            &format!("event/{}/user", event_uuid),
            RequestOptions::post().json(json!({ "user_uuid": user_uuid })),
        )
        .await
    }

    /// Add an admin to an event
    pub async fn add_admin_to_event(
        &self,
        event_uuid: &Uuid,
        admin_username: &str,
    ) -> Outcome<EntityDetail> {
        self.fetch_entity(
            "addAdminToEvent",
            EntityKind::Admin,
            &format!("event/{}/admin", event_uuid),
            RequestOptions::post().json(json!({ "admin_username": admin_username })),
        )
        .await
    }

    /// Ask the ticket authority for the secret of a user's ticket
    pub async fn request_ticket_secret(&self, user_uuid: &Uuid, event_uuid: &Uuid) -> Outcome<String> {
        self.fetch::<IssuedSecret>(
            "requestTicketSecret",
            "ticket/new",
            RequestOptions::post().json(json!({
                "user_uuid": user_uuid,
                "event_uuid": event_uuid,
            })),
        )
        .await
        .map(|issued| issued.success)
    }

    /// Check a ticket code with the ticket authority
    pub async fn authenticate_ticket(
        &self,
        user_uuid: &Uuid,
        event_uuid: &Uuid,
        code: &str,
    ) -> Outcome<TicketCheck> {
        self.fetch(
            "authenticateTicket",
            "ticket/auth",
            RequestOptions::post().json(json!({
                "user_uuid": user_uuid,
                "event_uuid": event_uuid,
                "ticket_totp": code,
            })),
        )
        .await
    }

    /// Fetch the ticket secret and keep it in the local store
    ///
    /// Fails with an empty payload when the secret could not be saved.
    pub async fn claim_ticket(
        &self,
        secrets: &TotpSecretService,
        user_uuid: &Uuid,
        event_uuid: &Uuid,
    ) -> Outcome<String> {
        match self.request_ticket_secret(user_uuid, event_uuid).await {
            Outcome::Ok(secret) => {
                if secrets.save_totp_secret(event_uuid, &secret) {
                    Outcome::Ok(secret)
                } else {
                    self.record(
                        LogEvent::new(events::REQUEST_FAILED)
                            .with_operation("claimTicket")
                            .with_error(format!("could not save secret in {} store", secrets.store_name())),
                    );
                    Outcome::unclassified()
                }
            }
            failed => failed,
        }
    }

    /// Current code for a claimed ticket, from the local store
    pub fn current_ticket_code(&self, secrets: &TotpSecretService, event_uuid: &Uuid) -> Option<String> {
        secrets.current_code(event_uuid)
    }
}
