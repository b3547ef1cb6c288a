//! Storage for intents (C2). Single-statement operations take `&mut
//! PgConnection`.

use {
    crate::{Address, Hash},
    chrono::{DateTime, Utc},
    model::{Intent, IntentPayload, IntentStatus},
    sqlx::PgConnection,
};

#[derive(Debug, sqlx::FromRow)]
struct IntentRow {
    intent_hash: Hash,
    token_in: Address,
    token_out: Address,
    amount_in: String,
    max_slippage_bps: i16,
    deadline: i64,
    chain_id: i64,
    receiver: Address,
    nonce: String,
    signature: Vec<u8>,
    signer: Address,
    status: IntentStatus,
    best_bid_id: Option<uuid::Uuid>,
    total_bids: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<IntentRow> for Intent {
    type Error = anyhow::Error;

    fn try_from(row: IntentRow) -> Result<Self, Self::Error> {
        let signature: [u8; 65] = row
            .signature
            .try_into()
            .map_err(|_| anyhow::anyhow!("stored signature is not 65 bytes"))?;
        Ok(Intent {
            intent_hash: alloy_primitives::B256::from(row.intent_hash.0),
            payload: IntentPayload {
                token_in: alloy_primitives::Address::from(row.token_in.0),
                token_out: alloy_primitives::Address::from(row.token_out.0),
                amount_in: row.amount_in.parse()?,
                max_slippage_bps: row.max_slippage_bps as u16,
                deadline: row.deadline,
                chain_id: row.chain_id as u64,
                receiver: alloy_primitives::Address::from(row.receiver.0),
                nonce: row.nonce.parse()?,
            },
            signature,
            signer: alloy_primitives::Address::from(row.signer.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
            expires_at: row.expires_at,
            status: row.status,
            best_bid_id: row.best_bid_id.map(model::bid::BidId),
            total_bids: row.total_bids,
        })
    }
}

fn decode(row: IntentRow) -> Result<Intent, sqlx::Error> {
    row.try_into().map_err(|err: anyhow::Error| sqlx::Error::Decode(err.into()))
}

fn addr(value: alloy_primitives::Address) -> Address {
    Address(value.as_slice().try_into().expect("address is 20 bytes"))
}

fn hash(value: alloy_primitives::B256) -> Hash {
    Hash(value.0)
}

/// Inserts a newly-admitted intent. Violates the primary key and returns
/// `Err` if `intent_hash` is already known; the caller maps that to
/// [`model::ErrorKind::Duplicate`].
pub async fn insert(ex: &mut PgConnection, intent: &Intent) -> sqlx::Result<()> {
    const QUERY: &str = r#"
INSERT INTO intents (
    intent_hash, token_in, token_out, amount_in, max_slippage_bps,
    deadline, chain_id, receiver, nonce, signature, signer, status,
    best_bid_id, total_bids, created_at, updated_at, expires_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
    ;"#;
    sqlx::query(QUERY)
        .bind(addr(intent.payload.token_in))
        .bind(addr(intent.payload.token_out))
        .bind(intent.payload.amount_in.to_string())
        .bind(intent.payload.max_slippage_bps as i16)
        .bind(intent.payload.deadline)
        .bind(intent.payload.chain_id as i64)
        .bind(addr(intent.payload.receiver))
        .bind(intent.payload.nonce.to_string())
        .bind(&intent.signature[..])
        .bind(addr(intent.signer))
        .bind(intent.status)
        .bind(intent.best_bid_id.map(|id| id.0))
        .bind(intent.total_bids)
        .bind(intent.created_at)
        .bind(intent.updated_at)
        .bind(intent.expires_at)
        .bind(hash(intent.intent_hash))
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn by_hash(ex: &mut PgConnection, intent_hash: &Hash) -> sqlx::Result<Option<Intent>> {
    const QUERY: &str = "SELECT * FROM intents WHERE intent_hash = $1";
    let row: Option<IntentRow> = sqlx::query_as(QUERY).bind(intent_hash).fetch_optional(ex).await?;
    row.map(decode).transpose()
}

/// Updates status and `updated_at` in one statement. Callers enforce valid
/// transitions before invoking this.
pub async fn update_status(
    ex: &mut PgConnection,
    intent_hash: &Hash,
    status: IntentStatus,
    now: DateTime<Utc>,
) -> sqlx::Result<()> {
    const QUERY: &str = "UPDATE intents SET status = $1, updated_at = $2 WHERE intent_hash = $3";
    sqlx::query(QUERY)
        .bind(status)
        .bind(now)
        .bind(intent_hash)
        .execute(ex)
        .await?;
    Ok(())
}

/// Sets the intent's current leader. Called by the auction controller in the
/// same transaction as the bid insert/score update that produced it (§4.3).
pub async fn update_best_bid(
    ex: &mut PgConnection,
    intent_hash: &Hash,
    best_bid_id: model::bid::BidId,
) -> sqlx::Result<()> {
    const QUERY: &str = "UPDATE intents SET best_bid_id = $1 WHERE intent_hash = $2";
    sqlx::query(QUERY).bind(best_bid_id.0).bind(intent_hash).execute(ex).await?;
    Ok(())
}

/// All non-terminal intents (`NEW`, `BROADCASTING`, `BIDDING`) whose
/// `expires_at` has already passed. Driven by the expiry reaper (C9); `NEW`
/// is included as a backstop in case a crash ever leaves a row stranded
/// before it reaches `BROADCASTING`.
pub async fn expired_open(ex: &mut PgConnection, now: DateTime<Utc>) -> sqlx::Result<Vec<Hash>> {
    const QUERY: &str = "SELECT intent_hash FROM intents \
        WHERE status IN ('NEW', 'BROADCASTING', 'BIDDING') AND expires_at <= $1";
    let rows: Vec<(Hash,)> = sqlx::query_as(QUERY).bind(now).fetch_all(ex).await?;
    Ok(rows.into_iter().map(|(hash,)| hash).collect())
}

#[cfg(test)]
mod tests {
    use {super::*, sqlx::Connection};

    fn sample_intent() -> Intent {
        let now = Utc::now();
        Intent::new(
            alloy_primitives::B256::repeat_byte(1),
            IntentPayload {
                token_in: alloy_primitives::Address::ZERO,
                token_out: alloy_primitives::Address::repeat_byte(2),
                amount_in: alloy_primitives::U256::from(1_000u64),
                max_slippage_bps: 50,
                deadline: now.timestamp() + 300,
                chain_id: 1,
                receiver: alloy_primitives::Address::ZERO,
                nonce: alloy_primitives::U256::from(1u8),
            },
            [7u8; 65],
            alloy_primitives::Address::repeat_byte(3),
            now,
        )
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_roundtrip() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let intent = sample_intent();
        insert(&mut db, &intent).await.unwrap();

        let intent_hash = hash(intent.intent_hash);
        let loaded = by_hash(&mut db, &intent_hash).await.unwrap().unwrap();
        assert_eq!(loaded.intent_hash, intent.intent_hash);
        assert_eq!(loaded.status, IntentStatus::New);

        update_status(&mut db, &intent_hash, IntentStatus::Bidding, Utc::now()).await.unwrap();
        let loaded = by_hash(&mut db, &intent_hash).await.unwrap().unwrap();
        assert_eq!(loaded.status, IntentStatus::Bidding);
    }
}
