use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rcommon::BoxFuture;
use rprovider::{
    NormalizedResponse, ProviderClient, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderId, ProviderRegistry, ReliabilityExecutor, Sleeper,
};
use rstore::{ManagedTurnStore, SqliteTurnStore, TurnStoreConfig, create_turn_store};
use rturn::{
    AgentConfig, AgentId, ClaimToken, EventStatus, IdempotencyClaim, IdempotencyKey, MessageRole,
    ProviderEvent, SessionId, SessionRecord, TenantId, TranscriptMessage, TurnCommit,
    TurnErrorKind, TurnOrchestrator, TurnRequest, TurnResult, TurnStore, UsageEvent,
};

fn temp_db(prefix: &str) -> PathBuf {
    let unique = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("rstore-{prefix}-{unique}"))
        .join("relay.sqlite3")
}

fn tenant() -> TenantId {
    TenantId::from("T")
}

fn session() -> SessionId {
    SessionId::from("S")
}

fn result() -> TurnResult {
    TurnResult {
        reply_text: "hello from B".to_string(),
        provider_used: ProviderId::VendorB,
        tokens_in: 5,
        tokens_out: 40,
        cost: 0.000135,
        latency_ms: None,
    }
}

fn commit(key: &str, claim: ClaimToken) -> TurnCommit {
    TurnCommit {
        tenant_id: tenant(),
        session_id: session(),
        idempotency_key: IdempotencyKey::from(key),
        claim,
        assistant_message: "hello from B".to_string(),
        usage: UsageEvent {
            tenant_id: tenant(),
            agent_id: AgentId::from("A"),
            session_id: session(),
            provider: ProviderId::VendorB,
            tokens_in: 5,
            tokens_out: 40,
            cost: 0.000135,
        },
        result: result(),
    }
}

async fn claim(
    store: &SqliteTurnStore,
    tenant_id: &TenantId,
    key: &str,
    lease: Duration,
) -> ClaimToken {
    match store
        .claim_idempotent(tenant_id, &IdempotencyKey::from(key), lease)
        .await
        .expect("claim")
    {
        IdempotencyClaim::Claimed(token) => token,
        other => panic!("expected to own '{key}', got {other:?}"),
    }
}

#[tokio::test]
async fn claims_are_exclusive_until_released_or_completed() {
    let store = SqliteTurnStore::new_in_memory().expect("store");
    let key = IdempotencyKey::from("k1");
    let lease = Duration::from_secs(60);

    let first = claim(&store, &tenant(), "k1", lease).await;
    assert_eq!(first, ClaimToken::FIRST);
    assert_eq!(
        store.claim_idempotent(&tenant(), &key, lease).await.expect("claim"),
        IdempotencyClaim::InFlight
    );
    assert_eq!(
        claim(&store, &TenantId::from("other"), "k1", lease).await,
        ClaimToken::FIRST,
        "keys are scoped per tenant"
    );

    store
        .release_idempotent(&tenant(), &key, first)
        .await
        .expect("release");
    let second = claim(&store, &tenant(), "k1", lease).await;
    assert_eq!(second, first.next());

    store
        .finalize_turn(commit("k1", second))
        .await
        .expect("finalize");
    store
        .release_idempotent(&tenant(), &key, second)
        .await
        .expect("release is a no-op");
    assert_eq!(
        store.claim_idempotent(&tenant(), &key, lease).await.expect("claim"),
        IdempotencyClaim::Completed(result())
    );
}

#[tokio::test]
async fn takeover_supersedes_the_expired_holder() {
    let store = SqliteTurnStore::new_in_memory().expect("store");
    let key = IdempotencyKey::from("k-lease");
    let lease = Duration::from_secs(60);

    let stale = claim(&store, &tenant(), "k-lease", lease).await;
    let current = claim(&store, &tenant(), "k-lease", Duration::ZERO).await;
    assert!(current > stale);

    store
        .release_idempotent(&tenant(), &key, stale)
        .await
        .expect("stale release");
    assert_eq!(
        store.claim_idempotent(&tenant(), &key, lease).await.expect("claim"),
        IdempotencyClaim::InFlight,
        "the current holder keeps the key"
    );

    let error = store
        .finalize_turn(commit("k-lease", stale))
        .await
        .expect_err("stale finalize");
    assert_eq!(error.kind, TurnErrorKind::Store);
    assert!(store.list_usage_events(&tenant()).await.expect("usage").is_empty());

    store
        .finalize_turn(commit("k-lease", current))
        .await
        .expect("current finalize");
    assert_eq!(
        store.find_idempotent(&tenant(), &key).await.expect("lookup"),
        Some(result())
    );
}

#[tokio::test]
async fn second_finalize_for_a_key_is_rolled_back() {
    let store = SqliteTurnStore::new_in_memory().expect("store");
    let token = claim(&store, &tenant(), "k-dup", Duration::from_secs(60)).await;

    store
        .finalize_turn(commit("k-dup", token))
        .await
        .expect("first finalize");
    let error = store
        .finalize_turn(commit("k-dup", token))
        .await
        .expect_err("duplicate finalize");
    assert_eq!(error.kind, TurnErrorKind::Store);

    let unclaimed = store
        .finalize_turn(commit("k-never-claimed", ClaimToken::FIRST))
        .await
        .expect_err("no claim");
    assert_eq!(unclaimed.kind, TurnErrorKind::Store);

    assert_eq!(store.list_usage_events(&tenant()).await.expect("usage").len(), 1);
    assert_eq!(
        store
            .load_transcript(&tenant(), &session())
            .await
            .expect("transcript")
            .len(),
        1
    );
    assert_eq!(
        store
            .find_idempotent(&tenant(), &IdempotencyKey::from("k-dup"))
            .await
            .expect("lookup"),
        Some(result())
    );
}

#[tokio::test]
async fn finalize_is_all_or_nothing_when_a_write_fails() {
    let path = temp_db("atomic");
    let store = SqliteTurnStore::new(&path).expect("store");

    let sabotage = rusqlite::Connection::open(&path).expect("second connection");
    sabotage
        .execute_batch(
            "
            CREATE TRIGGER reject_usage BEFORE INSERT ON usage_events
            BEGIN
                SELECT RAISE(ABORT, 'usage rejected');
            END;
            ",
        )
        .expect("install trigger");

    store
        .append_message(&tenant(), &session(), MessageRole::User, "hello")
        .await
        .expect("user message");
    let token = claim(&store, &tenant(), "k-atomic", Duration::from_secs(60)).await;

    let error = store
        .finalize_turn(commit("k-atomic", token))
        .await
        .expect_err("usage insert aborts");
    assert_eq!(error.kind, TurnErrorKind::Store);

    assert_eq!(
        store
            .load_transcript(&tenant(), &session())
            .await
            .expect("transcript"),
        vec![TranscriptMessage::new(MessageRole::User, "hello")]
    );
    assert_eq!(
        store
            .find_idempotent(&tenant(), &IdempotencyKey::from("k-atomic"))
            .await
            .expect("lookup"),
        None
    );
    assert_eq!(
        store
            .claim_idempotent(&tenant(), &IdempotencyKey::from("k-atomic"), Duration::from_secs(60))
            .await
            .expect("claim"),
        IdempotencyClaim::InFlight,
        "the pending claim survives the rolled back finalize"
    );
}

#[tokio::test]
async fn provider_events_keep_insertion_order_and_fields() {
    let store = SqliteTurnStore::new_in_memory().expect("store");
    let failure = ProviderEvent {
        tenant_id: tenant(),
        agent_id: AgentId::from("A"),
        session_id: session(),
        provider: ProviderId::VendorA,
        attempt: 4,
        status: EventStatus::Fail,
        http_code: Some(500),
        latency_ms: None,
        error_kind: Some(ProviderErrorKind::Http),
    };
    let success = ProviderEvent {
        provider: ProviderId::VendorB,
        attempt: 1,
        status: EventStatus::Success,
        http_code: Some(200),
        latency_ms: Some(120),
        error_kind: None,
        ..failure.clone()
    };

    store.append_provider_event(failure.clone()).await.expect("fail event");
    store.append_provider_event(success.clone()).await.expect("success event");

    assert_eq!(
        store.list_provider_events(&tenant()).await.expect("events"),
        vec![failure, success]
    );
    assert!(
        store
            .list_provider_events(&TenantId::from("other"))
            .await
            .expect("events")
            .is_empty()
    );
}

struct FlakyVendorA;

impl ProviderClient for FlakyVendorA {
    fn id(&self) -> ProviderId {
        ProviderId::VendorA
    }

    fn call<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> ProviderFuture<'a, Result<NormalizedResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::server_error("vendorA error")) })
    }
}

struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _delay: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }
}

struct SteadyVendorB;

impl ProviderClient for SteadyVendorB {
    fn id(&self) -> ProviderId {
        ProviderId::VendorB
    }

    fn call<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> ProviderFuture<'a, Result<NormalizedResponse, ProviderError>> {
        Box::pin(async { Ok(NormalizedResponse::new(ProviderId::VendorB, "hello from B", 5, 40)) })
    }
}

#[tokio::test]
async fn committed_turns_survive_reopening_the_database() {
    let path = temp_db("reopen");
    let first = {
        let store = Arc::new(SqliteTurnStore::new(&path).expect("store"));
        store
            .insert_agent(
                &AgentConfig::new("A", "T", ProviderId::VendorA, "be brief")
                    .with_fallback(ProviderId::VendorB),
            )
            .expect("agent");
        store
            .insert_session(&SessionRecord::new("S", "T", "A"))
            .expect("session");

        let mut registry = ProviderRegistry::new();
        registry.register(FlakyVendorA);
        registry.register(SteadyVendorB);
        let orchestrator = TurnOrchestrator::builder(registry, store as Arc<dyn TurnStore>)
            .executor(ReliabilityExecutor::new().with_sleeper(Arc::new(InstantSleeper)))
            .build()
            .expect("orchestrator");

        orchestrator
            .handle_turn(TurnRequest::new("T", "S", "hello", "k1"))
            .await
            .expect("turn")
    };
    assert_eq!(first.provider_used, ProviderId::VendorB);

    let reopened = create_turn_store(TurnStoreConfig::Sqlite { path }).expect("reopen");
    let cached = reopened
        .find_idempotent(&tenant(), &IdempotencyKey::from("k1"))
        .await
        .expect("lookup")
        .expect("committed result");
    assert_eq!(
        serde_json::to_string(&cached).expect("encode"),
        serde_json::to_string(&first).expect("encode")
    );

    let events = reopened.list_provider_events(&tenant()).await.expect("events");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].attempt, 4);
    assert_eq!(events[1].status, EventStatus::Success);

    let transcript = reopened
        .load_transcript(&tenant(), &session())
        .await
        .expect("transcript");
    assert_eq!(
        transcript,
        vec![
            TranscriptMessage::new(MessageRole::User, "hello"),
            TranscriptMessage::new(MessageRole::Assistant, "hello from B"),
        ]
    );
}

#[tokio::test]
async fn factory_builds_in_memory_store() {
    let store = create_turn_store(TurnStoreConfig::InMemory).expect("in-memory store");
    assert_eq!(
        store
            .load_session(&tenant(), &session())
            .await
            .expect("load"),
        None
    );

    store
        .upsert_session(&SessionRecord::new("S", "T", "A"))
        .expect("seed session");
    assert_eq!(
        store
            .load_session(&tenant(), &session())
            .await
            .expect("load"),
        Some(SessionRecord::new("S", "T", "A"))
    );

    let config: TurnStoreConfig =
        serde_json::from_str(r#"{"kind": "sqlite", "path": "/tmp/relay.sqlite3"}"#).expect("parse");
    assert_eq!(
        config,
        TurnStoreConfig::Sqlite {
            path: PathBuf::from("/tmp/relay.sqlite3")
        }
    );
}
