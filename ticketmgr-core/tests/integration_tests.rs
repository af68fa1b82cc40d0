//! Integration tests for the public ticketmgr-core API
//!
//! Run with: cargo test --test integration_tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

use ticketmgr_core::adapters::duckdb_store::DuckDbSecretStore;
use ticketmgr_core::adapters::memory_store::MemorySecretStore;
use ticketmgr_core::config::{ApiSettings, Config};
use ticketmgr_core::ports::{RawResponse, RequestOptions, SecretStore, Transport};
use ticketmgr_core::services::{EntryPoint, LoggingService, TicketService, TotpSecretService};
use ticketmgr_core::{
    Credential, EntityKind, LoginOutcome, Outcome, TicketCode, TicketmgrContext, TransportError,
};

/// Transport that replays a fixed list of responses
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<RawResponse>>,
    paths: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn with(responses: Vec<(u16, &str)>) -> Self {
        Self {
            script: Mutex::new(
                responses
                    .into_iter()
                    .map(|(status, body)| RawResponse::new(status, body))
                    .collect(),
            ),
            paths: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, path: &str, _options: RequestOptions) -> Result<RawResponse, TransportError> {
        self.paths.lock().unwrap().push(path.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connect("script exhausted".to_string()))
    }
}

fn unreachable_base_uri() -> String {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    format!("http://127.0.0.1:{}/api/", port)
}

#[tokio::test]
async fn test_user_session_flow() {
    let event_uuid = Uuid::new_v4();
    let user_uuid = Uuid::new_v4();
    let login = json!({
        "user": {"username": "u1", "email": "u1@domain.com", "first_name": "U", "last_name": "One"},
        "uuid": user_uuid,
        "event_count": 1
    })
    .to_string();
    let events = json!([{
        "title": "Concert",
        "description": "Live",
        "datetime": "2030-05-01T20:00:00Z",
        "uuid": event_uuid
    }])
    .to_string();
    let secret = json!({"success": "12345678901234567890"}).to_string();

    let transport = ScriptedTransport::with(vec![
        (200, login.as_str()),
        (200, events.as_str()),
        (200, secret.as_str()),
        (200, ""),
    ]);
    let service = TicketService::new(transport);
    let secrets = TotpSecretService::new(Arc::new(MemorySecretStore::new()));

    let outcome = service.login(&Credential::new("u1", "pw")).await;
    assert_eq!(outcome.kind(), Some(EntityKind::User));
    let me = outcome.detail().unwrap().uuid().unwrap();

    let my_events = service.user_events("u1").await.ok().unwrap();
    assert_eq!(my_events.len(), 1);

    let claimed = service.claim_ticket(&secrets, &me, &my_events[0].uuid).await;
    assert!(claimed.is_ok());
    assert!(service.current_ticket_code(&secrets, &event_uuid).is_some());

    assert_eq!(service.logout().await, Outcome::Ok(()));
    assert_eq!(
        *service.transport().paths.lock().unwrap(),
        vec!["login", "user/u1/event", "ticket/new", "logout"]
    );
}

#[tokio::test]
async fn test_outcomes_serialize_as_pairs() {
    let service = TicketService::new(ScriptedTransport::with(vec![
        (404, r#"{"error": "Event does not exist."}"#),
        (200, r#"{"message": "Logged in as superuser."}"#),
    ]));

    let details = service.event_details(&Uuid::new_v4()).await;
    assert_eq!(
        serde_json::to_value(&details).unwrap(),
        json!([false, {"status_code": 404, "message": "Event does not exist."}])
    );

    let login = service.login(&Credential::new("root", "pw")).await;
    assert!(matches!(login, LoginOutcome::Ambiguous(_)));
    assert_eq!(
        serde_json::to_value(&login).unwrap(),
        json!([null, {"message": "Logged in as superuser."}])
    );
}

#[test]
fn test_secret_store_round_trip_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let event_uuid = Uuid::new_v4();

    {
        let store = DuckDbSecretStore::open(temp_dir.path(), None).unwrap();
        let secrets = TotpSecretService::new(Arc::new(store));
        assert!(secrets.save_totp_secret(&event_uuid, "12345678901234567890"));
    }

    let store = DuckDbSecretStore::open(temp_dir.path(), None).unwrap();
    assert_eq!(store.name(), "duckdb");
    let secrets = TotpSecretService::new(Arc::new(store));

    assert_eq!(
        secrets.get_totp_secret(&event_uuid).as_deref(),
        Some("12345678901234567890")
    );
    assert_eq!(secrets.get_totp_secret(&Uuid::new_v4()), None);

    let expected = TicketCode::new("12345678901234567890").unwrap().at(1_700_000_000);
    assert_eq!(secrets.ticket_code(&event_uuid).unwrap().at(1_700_000_000), expected);
}

#[test]
fn test_secret_store_shared_across_threads() {
    let temp_dir = TempDir::new().unwrap();
    let store: Arc<dyn SecretStore> = Arc::new(DuckDbSecretStore::open(temp_dir.path(), None).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for j in 0..10 {
                    store.put(&format!("event-{}-{}", i, j), &format!("secret-{}", j)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..4 {
        for j in 0..10 {
            assert_eq!(
                store.fetch(&format!("event-{}-{}", i, j)).unwrap(),
                Some(format!("secret-{}", j))
            );
        }
    }
}

#[tokio::test]
async fn test_context_wires_logging_and_stores() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.api = ApiSettings::with_base_uri(unreachable_base_uri());

    let context = TicketmgrContext::with_config(temp_dir.path(), config, EntryPoint::Library).unwrap();

    assert_eq!(context.tickets.event_list().await, Outcome::Failed(None));
    assert_eq!(context.secrets.store_name(), "duckdb");

    let errors = context.logging.get_errors(10).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].event, "transport_failed");
    assert_eq!(errors[0].operation.as_deref(), Some("eventList"));
    assert_eq!(errors[0].entry_point, "library");

    assert!(temp_dir.path().join("logs.duckdb").exists());
    assert!(temp_dir.path().join("secrets.duckdb").exists());
}

#[test]
fn test_context_rejects_bad_base_uri() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.api = ApiSettings::with_base_uri("::not a uri::");

    assert!(TicketmgrContext::with_config(temp_dir.path(), config, EntryPoint::Cli).is_err());
}

#[test]
fn test_logs_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let logging = LoggingService::new(temp_dir.path(), EntryPoint::Cli, "0.1.0").unwrap();
        logging.log_command("events").unwrap();
    }
    let logging = LoggingService::new(temp_dir.path(), EntryPoint::Cli, "0.1.0").unwrap();
    assert_eq!(logging.count().unwrap(), 1);
}
