use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rcommon::{AgentId, BoxFuture, IdempotencyKey, SessionId, TenantId};
use rprovider::{ProviderErrorKind, ProviderId};
use rturn::{
    AgentConfig, ClaimToken, EventStatus, IdempotencyClaim, MessageRole, ProviderEvent, SessionRecord,
    TranscriptMessage, TurnCommit, TurnError, TurnResult, TurnStore, UsageEvent,
};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use crate::error::StoreError;

const STATE_PENDING: &str = "pending";
const STATE_RELEASED: &str = "released";
const STATE_COMPLETE: &str = "complete";

#[derive(Debug)]
pub struct SqliteTurnStore {
    connection: Mutex<Connection>,
}

impl SqliteTurnStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                StoreError::storage(format!("failed to create sqlite parent directory: {error}"))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            StoreError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            StoreError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                StoreError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::storage("sqlite turn store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS sessions (
                tenant_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                PRIMARY KEY (tenant_id, session_id)
            );

            CREATE TABLE IF NOT EXISTS agents (
                tenant_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                name TEXT NOT NULL,
                primary_provider TEXT NOT NULL,
                fallback_provider TEXT,
                system_prompt TEXT NOT NULL,
                PRIMARY KEY (tenant_id, agent_id)
            );

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_session
            ON messages(tenant_id, session_id, id);

            CREATE TABLE IF NOT EXISTS provider_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                attempt INTEGER NOT NULL,
                status TEXT NOT NULL,
                http_code INTEGER,
                latency_ms INTEGER,
                error_kind TEXT,
                created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_provider_events_tenant
            ON provider_events(tenant_id, id);

            CREATE TABLE IF NOT EXISTS usage_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                tokens_in INTEGER NOT NULL,
                tokens_out INTEGER NOT NULL,
                cost REAL NOT NULL,
                created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_usage_events_tenant
            ON usage_events(tenant_id, id);

            CREATE TABLE IF NOT EXISTS idempotency_keys (
                tenant_id TEXT NOT NULL,
                key TEXT NOT NULL,
                state TEXT NOT NULL,
                response_json TEXT,
                claimed_at_ms INTEGER NOT NULL,
                claim_generation INTEGER NOT NULL,
                PRIMARY KEY (tenant_id, key)
            );
            ",
        )
        .map_err(|error| {
            StoreError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    pub fn insert_session(&self, session: &SessionRecord) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "
            INSERT INTO sessions (tenant_id, session_id, agent_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(tenant_id, session_id) DO UPDATE SET
                agent_id = excluded.agent_id
            ",
            params![
                session.tenant_id.as_str(),
                session.id.as_str(),
                session.agent_id.as_str()
            ],
        )
        .map_err(|error| StoreError::storage(format!("failed to upsert session: {error}")))?;
        Ok(())
    }

    pub fn insert_agent(&self, agent: &AgentConfig) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "
            INSERT INTO agents (
                tenant_id,
                agent_id,
                name,
                primary_provider,
                fallback_provider,
                system_prompt
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(tenant_id, agent_id) DO UPDATE SET
                name = excluded.name,
                primary_provider = excluded.primary_provider,
                fallback_provider = excluded.fallback_provider,
                system_prompt = excluded.system_prompt
            ",
            params![
                agent.tenant_id.as_str(),
                agent.id.as_str(),
                &agent.name,
                agent.primary_provider.as_str(),
                agent.fallback_provider.map(ProviderId::as_str),
                &agent.system_prompt,
            ],
        )
        .map_err(|error| StoreError::storage(format!("failed to upsert agent: {error}")))?;
        Ok(())
    }

    pub fn delete_session(
        &self,
        tenant_id: &TenantId,
        session_id: &SessionId,
    ) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "DELETE FROM sessions WHERE tenant_id = ?1 AND session_id = ?2",
            params![tenant_id.as_str(), session_id.as_str()],
        )
        .map_err(|error| StoreError::storage(format!("failed to delete session: {error}")))?;
        Ok(())
    }
}

impl TurnStore for SqliteTurnStore {
    fn find_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
    ) -> BoxFuture<'a, Result<Option<TurnResult>, TurnError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let payload = conn
                .query_row(
                    "
                    SELECT response_json
                    FROM idempotency_keys
                    WHERE tenant_id = ?1 AND key = ?2 AND state = ?3
                    ",
                    params![tenant_id.as_str(), key.as_str(), STATE_COMPLETE],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()
                .map_err(|error| {
                    StoreError::storage(format!("failed to look up idempotency key: {error}"))
                })?
                .flatten();

            Ok(payload.as_deref().map(decode_result).transpose()?)
        })
    }

    fn claim_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
        lease: Duration,
    ) -> BoxFuture<'a, Result<IdempotencyClaim, TurnError>> {
        Box::pin(async move {
            let now = now_ms()?;
            let mut conn = self.connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|error| {
                    StoreError::storage(format!("failed to begin claim transaction: {error}"))
                })?;

            let first = ClaimToken::FIRST;
            let inserted = tx
                .execute(
                    "
                    INSERT INTO idempotency_keys (
                        tenant_id,
                        key,
                        state,
                        response_json,
                        claimed_at_ms,
                        claim_generation
                    )
                    VALUES (?1, ?2, ?3, NULL, ?4, ?5)
                    ON CONFLICT(tenant_id, key) DO NOTHING
                    ",
                    params![
                        tenant_id.as_str(),
                        key.as_str(),
                        STATE_PENDING,
                        now,
                        to_sql_int(first.generation())?,
                    ],
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to insert idempotency claim: {error}"))
                })?;

            let claim = if inserted == 1 {
                IdempotencyClaim::Claimed(first)
            } else {
                let (state, payload, claimed_at_ms, generation) = tx
                    .query_row(
                        "
                        SELECT state, response_json, claimed_at_ms, claim_generation
                        FROM idempotency_keys
                        WHERE tenant_id = ?1 AND key = ?2
                        ",
                        params![tenant_id.as_str(), key.as_str()],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, Option<String>>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, i64>(3)?,
                            ))
                        },
                    )
                    .map_err(|error| {
                        StoreError::storage(format!("failed to read idempotency claim: {error}"))
                    })?;

                match (state.as_str(), payload) {
                    (STATE_COMPLETE, Some(payload)) => {
                        IdempotencyClaim::Completed(decode_result(&payload)?)
                    }
                    (STATE_PENDING, _) if now.saturating_sub(claimed_at_ms) < lease_ms(lease) => {
                        IdempotencyClaim::InFlight
                    }
                    (STATE_PENDING | STATE_RELEASED, _) => {
                        let token = ClaimToken::new(from_sql_int(generation)?).next();
                        tx.execute(
                            "
                            UPDATE idempotency_keys
                            SET state = ?3, claimed_at_ms = ?4, claim_generation = ?5
                            WHERE tenant_id = ?1 AND key = ?2
                            ",
                            params![
                                tenant_id.as_str(),
                                key.as_str(),
                                STATE_PENDING,
                                now,
                                to_sql_int(token.generation())?,
                            ],
                        )
                        .map_err(|error| {
                            StoreError::storage(format!(
                                "failed to renew idempotency claim: {error}"
                            ))
                        })?;
                        IdempotencyClaim::Claimed(token)
                    }
                    (other, _) => {
                        return Err(StoreError::encoding(format!(
                            "invalid idempotency state '{other}'"
                        ))
                        .into());
                    }
                }
            };

            tx.commit().map_err(|error| {
                StoreError::storage(format!("failed to commit idempotency claim: {error}"))
            })?;
            Ok(claim)
        })
    }

    fn release_idempotent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        key: &'a IdempotencyKey,
        token: ClaimToken,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let generation = to_sql_int(token.generation())?;
            let conn = self.connection()?;
            conn.execute(
                "
                UPDATE idempotency_keys
                SET state = ?3
                WHERE tenant_id = ?1 AND key = ?2 AND state = ?4 AND claim_generation = ?5
                ",
                params![
                    tenant_id.as_str(),
                    key.as_str(),
                    STATE_RELEASED,
                    STATE_PENDING,
                    generation
                ],
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to release idempotency claim: {error}"))
            })?;
            Ok(())
        })
    }

    fn load_session<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Option<SessionRecord>, TurnError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let agent_id = conn
                .query_row(
                    "SELECT agent_id FROM sessions WHERE tenant_id = ?1 AND session_id = ?2",
                    params![tenant_id.as_str(), session_id.as_str()],
                    |row| row.get::<_, String>(0),
                )
                .optional()
                .map_err(|error| StoreError::storage(format!("failed to load session: {error}")))?;

            Ok(agent_id.map(|agent_id| {
                SessionRecord::new(session_id.clone(), tenant_id.clone(), agent_id)
            }))
        })
    }

    fn load_agent<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        agent_id: &'a AgentId,
    ) -> BoxFuture<'a, Result<Option<AgentConfig>, TurnError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let row = conn
                .query_row(
                    "
                    SELECT name, primary_provider, fallback_provider, system_prompt
                    FROM agents
                    WHERE tenant_id = ?1 AND agent_id = ?2
                    ",
                    params![tenant_id.as_str(), agent_id.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()
                .map_err(|error| StoreError::storage(format!("failed to load agent: {error}")))?;

            let Some((name, primary, fallback, system_prompt)) = row else {
                return Ok(None);
            };

            let mut agent = AgentConfig::new(
                agent_id.clone(),
                tenant_id.clone(),
                provider_from_str(&primary)?,
                system_prompt,
            )
            .with_name(name);
            if let Some(fallback) = fallback {
                agent = agent.with_fallback(provider_from_str(&fallback)?);
            }
            Ok(Some(agent))
        })
    }

    fn append_message<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
        role: MessageRole,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let now = now_ms()?;
            let conn = self.connection()?;
            insert_message(&conn, tenant_id, session_id, role, text, now)?;
            Ok(())
        })
    }

    fn append_provider_event<'a>(
        &'a self,
        event: ProviderEvent,
    ) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let now = now_ms()?;
            let latency_ms = event.latency_ms.map(to_sql_int).transpose()?;
            let conn = self.connection()?;
            conn.execute(
                "
                INSERT INTO provider_events (
                    tenant_id,
                    agent_id,
                    session_id,
                    provider,
                    attempt,
                    status,
                    http_code,
                    latency_ms,
                    error_kind,
                    created_at_ms
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
                params![
                    event.tenant_id.as_str(),
                    event.agent_id.as_str(),
                    event.session_id.as_str(),
                    event.provider.as_str(),
                    i64::from(event.attempt),
                    event.status.as_str(),
                    event.http_code.map(i64::from),
                    latency_ms,
                    event.error_kind.map(ProviderErrorKind::label),
                    now,
                ],
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to append provider event: {error}"))
            })?;
            Ok(())
        })
    }

    fn finalize_turn<'a>(&'a self, commit: TurnCommit) -> BoxFuture<'a, Result<(), TurnError>> {
        Box::pin(async move {
            let now = now_ms()?;
            let payload = serde_json::to_string(&commit.result).map_err(|error| {
                StoreError::encoding(format!("failed to encode turn result: {error}"))
            })?;

            let mut conn = self.connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|error| {
                    StoreError::storage(format!("failed to begin finalize transaction: {error}"))
                })?;

            let claim = tx
                .query_row(
                    "
                    SELECT state, claim_generation
                    FROM idempotency_keys
                    WHERE tenant_id = ?1 AND key = ?2
                    ",
                    params![commit.tenant_id.as_str(), commit.idempotency_key.as_str()],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                )
                .optional()
                .map_err(|error| {
                    StoreError::storage(format!("failed to read idempotency state: {error}"))
                })?;
            let generation = to_sql_int(commit.claim.generation())?;
            match claim {
                Some((state, held)) if state == STATE_PENDING && held == generation => {}
                Some((state, _)) if state == STATE_COMPLETE => {
                    return Err(StoreError::conflict(format!(
                        "idempotency key '{}' is already committed",
                        commit.idempotency_key
                    ))
                    .into());
                }
                _ => {
                    return Err(StoreError::conflict(format!(
                        "idempotency key '{}' is not claimed by {}",
                        commit.idempotency_key, commit.claim
                    ))
                    .into());
                }
            }

            insert_message(
                &tx,
                &commit.tenant_id,
                &commit.session_id,
                MessageRole::Assistant,
                &commit.assistant_message,
                now,
            )?;

            let usage = &commit.usage;
            tx.execute(
                "
                INSERT INTO usage_events (
                    tenant_id,
                    agent_id,
                    session_id,
                    provider,
                    tokens_in,
                    tokens_out,
                    cost,
                    created_at_ms
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
                params![
                    usage.tenant_id.as_str(),
                    usage.agent_id.as_str(),
                    usage.session_id.as_str(),
                    usage.provider.as_str(),
                    i64::from(usage.tokens_in),
                    i64::from(usage.tokens_out),
                    usage.cost,
                    now,
                ],
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to append usage event: {error}"))
            })?;

            tx.execute(
                "
                UPDATE idempotency_keys
                SET state = ?3, response_json = ?4
                WHERE tenant_id = ?1 AND key = ?2
                ",
                params![
                    commit.tenant_id.as_str(),
                    commit.idempotency_key.as_str(),
                    STATE_COMPLETE,
                    payload,
                ],
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to record idempotent response: {error}"))
            })?;

            tx.commit().map_err(|error| {
                StoreError::storage(format!("failed to commit turn: {error}"))
            })?;
            Ok(())
        })
    }

    fn load_transcript<'a>(
        &'a self,
        tenant_id: &'a TenantId,
        session_id: &'a SessionId,
    ) -> BoxFuture<'a, Result<Vec<TranscriptMessage>, TurnError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut stmt = conn
                .prepare(
                    "
                    SELECT role, content
                    FROM messages
                    WHERE tenant_id = ?1 AND session_id = ?2
                    ORDER BY id ASC
                    ",
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare transcript query: {error}"))
                })?;
            let rows = stmt
                .query_map(params![tenant_id.as_str(), session_id.as_str()], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|error| {
                    StoreError::storage(format!("failed to query transcript rows: {error}"))
                })?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, content) = row.map_err(|error| {
                    StoreError::storage(format!("failed to read transcript row: {error}"))
                })?;
                let role = MessageRole::from_label(&role).ok_or_else(|| {
                    StoreError::encoding(format!("unknown message role '{role}'"))
                })?;
                messages.push(TranscriptMessage::new(role, content));
            }
            Ok(messages)
        })
    }

    fn list_usage_events<'a>(
        &'a self,
        tenant_id: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<UsageEvent>, TurnError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut stmt = conn
                .prepare(
                    "
                    SELECT agent_id, session_id, provider, tokens_in, tokens_out, cost
                    FROM usage_events
                    WHERE tenant_id = ?1
                    ORDER BY id ASC
                    ",
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare usage query: {error}"))
                })?;
            let rows = stmt
                .query_map(params![tenant_id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, u32>(4)?,
                        row.get::<_, f64>(5)?,
                    ))
                })
                .map_err(|error| {
                    StoreError::storage(format!("failed to query usage rows: {error}"))
                })?;

            let mut events = Vec::new();
            for row in rows {
                let (agent_id, session_id, provider, tokens_in, tokens_out, cost) =
                    row.map_err(|error| {
                        StoreError::storage(format!("failed to read usage row: {error}"))
                    })?;
                events.push(UsageEvent {
                    tenant_id: tenant_id.clone(),
                    agent_id: AgentId::from(agent_id),
                    session_id: SessionId::from(session_id),
                    provider: provider_from_str(&provider)?,
                    tokens_in,
                    tokens_out,
                    cost,
                });
            }
            Ok(events)
        })
    }

    fn list_provider_events<'a>(
        &'a self,
        tenant_id: &'a TenantId,
    ) -> BoxFuture<'a, Result<Vec<ProviderEvent>, TurnError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut stmt = conn
                .prepare(
                    "
                    SELECT agent_id, session_id, provider, attempt, status,
                           http_code, latency_ms, error_kind
                    FROM provider_events
                    WHERE tenant_id = ?1
                    ORDER BY id ASC
                    ",
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare provider event query: {error}"))
                })?;
            let rows = stmt
                .query_map(params![tenant_id.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<u16>>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                })
                .map_err(|error| {
                    StoreError::storage(format!("failed to query provider events: {error}"))
                })?;

            let mut events = Vec::new();
            for row in rows {
                let (agent_id, session_id, provider, attempt, status, http_code, latency, kind) =
                    row.map_err(|error| {
                        StoreError::storage(format!("failed to read provider event row: {error}"))
                    })?;
                let status = EventStatus::from_label(&status).ok_or_else(|| {
                    StoreError::encoding(format!("unknown provider event status '{status}'"))
                })?;
                let error_kind = kind
                    .map(|label| {
                        ProviderErrorKind::from_label(&label).ok_or_else(|| {
                            StoreError::encoding(format!("unknown provider error kind '{label}'"))
                        })
                    })
                    .transpose()?;
                events.push(ProviderEvent {
                    tenant_id: tenant_id.clone(),
                    agent_id: AgentId::from(agent_id),
                    session_id: SessionId::from(session_id),
                    provider: provider_from_str(&provider)?,
                    attempt,
                    status,
                    http_code,
                    latency_ms: latency.map(from_sql_int).transpose()?,
                    error_kind,
                });
            }
            Ok(events)
        })
    }
}

fn insert_message(
    conn: &Connection,
    tenant_id: &TenantId,
    session_id: &SessionId,
    role: MessageRole,
    text: &str,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "
        INSERT INTO messages (tenant_id, session_id, role, content, created_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ",
        params![
            tenant_id.as_str(),
            session_id.as_str(),
            role.as_str(),
            text,
            now
        ],
    )
    .map_err(|error| StoreError::storage(format!("failed to append message: {error}")))?;
    Ok(())
}

fn decode_result(payload: &str) -> Result<TurnResult, StoreError> {
    serde_json::from_str(payload)
        .map_err(|error| StoreError::encoding(format!("failed to decode turn result: {error}")))
}

fn provider_from_str(value: &str) -> Result<ProviderId, StoreError> {
    value
        .parse()
        .map_err(|error| StoreError::encoding(format!("{error}")))
}

fn now_ms() -> Result<i64, StoreError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|error| StoreError::storage(format!("system clock before unix epoch: {error}")))?;
    i64::try_from(elapsed.as_millis())
        .map_err(|_| StoreError::storage("system clock out of range"))
}

fn lease_ms(lease: Duration) -> i64 {
    i64::try_from(lease.as_millis()).unwrap_or(i64::MAX)
}

fn to_sql_int(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::encoding(format!("value {value} exceeds sqlite integer range")))
}

fn from_sql_int(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::encoding(format!("negative value {value} in unsigned column")))
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("RELAY_DATABASE_PATH") {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".relay").join("relay.sqlite3");
    }

    PathBuf::from("relay.sqlite3")
}
