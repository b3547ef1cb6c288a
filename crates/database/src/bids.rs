//! Storage for bids (C3). [`insert`] runs inside the auction controller's
//! transaction: it writes the bid row and bumps the parent intent's
//! `total_bids` atomically, so a crash between the two writes can never
//! leave them inconsistent. The controller commits `best_bid_id` separately
//! via [`crate::intents::update_best_bid`] once it has ranked every
//! accepted bid, not just this one.

use {
    crate::{Address, Hash, PgTransaction},
    chrono::{DateTime, Utc},
    model::{
        bid::{Bid, BidId, BidPayload, BidStatus},
        Amount,
    },
    sqlx::PgConnection,
};

#[derive(Debug, sqlx::FromRow)]
struct BidRow {
    bid_id: uuid::Uuid,
    intent_hash: Hash,
    quote_out: String,
    solver_fee_bps: i16,
    calldata_hint: Vec<u8>,
    ttl_ms: i32,
    solver_signature: Vec<u8>,
    solver_id: Address,
    arrived_at: DateTime<Utc>,
    score: Option<f64>,
    rank: Option<i32>,
    status: BidStatus,
}

impl TryFrom<BidRow> for Bid {
    type Error = anyhow::Error;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        let solver_signature: [u8; 65] = row
            .solver_signature
            .try_into()
            .map_err(|_| anyhow::anyhow!("stored solver signature is not 65 bytes"))?;
        Ok(Bid {
            bid_id: BidId(row.bid_id),
            payload: BidPayload {
                intent_hash: alloy_primitives::B256::from(row.intent_hash.0),
                quote_out: row.quote_out.parse::<Amount>()?,
                solver_fee_bps: row.solver_fee_bps as u16,
                calldata_hint: row.calldata_hint,
                ttl_ms: row.ttl_ms as u32,
            },
            solver_signature,
            solver_id: alloy_primitives::Address::from(row.solver_id.0),
            arrived_at: row.arrived_at,
            score: row.score,
            rank: row.rank.map(|rank| rank as u32),
            status: row.status,
        })
    }
}

fn decode(row: BidRow) -> Result<Bid, sqlx::Error> {
    row.try_into().map_err(|err: anyhow::Error| sqlx::Error::Decode(err.into()))
}

fn addr(value: alloy_primitives::Address) -> Address {
    Address(value.as_slice().try_into().expect("address is 20 bytes"))
}

fn hash(value: alloy_primitives::B256) -> Hash {
    Hash(value.0)
}

/// Inserts `bid` (already scored/ranked by the caller, see §4.6) and bumps
/// the parent intent's `total_bids`. The caller is responsible for also
/// calling [`crate::intents::update_best_bid`] in the same transaction when
/// this bid becomes (or stays) the auction's leader — the auction
/// controller, not this store, decides who leads, since that decision
/// depends on every other accepted bid's score, not just this one's
/// `quote_out`.
pub async fn insert(tx: &mut PgTransaction<'_>, bid: &Bid) -> sqlx::Result<()> {
    const INSERT: &str = r#"
INSERT INTO bids (
    bid_id, intent_hash, quote_out, solver_fee_bps, calldata_hint, ttl_ms,
    solver_signature, solver_id, arrived_at, score, rank, status
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    ;"#;
    sqlx::query(INSERT)
        .bind(bid.bid_id.0)
        .bind(hash(bid.payload.intent_hash))
        .bind(bid.payload.quote_out.to_string())
        .bind(bid.payload.solver_fee_bps as i16)
        .bind(&bid.payload.calldata_hint)
        .bind(bid.payload.ttl_ms as i32)
        .bind(&bid.solver_signature[..])
        .bind(addr(bid.solver_id))
        .bind(bid.arrived_at)
        .bind(bid.score)
        .bind(bid.rank.map(|rank| rank as i32))
        .bind(bid.status)
        .execute(&mut **tx)
        .await?;

    const BUMP_COUNT: &str = "UPDATE intents SET total_bids = total_bids + 1 WHERE intent_hash = $1";
    sqlx::query(BUMP_COUNT)
        .bind(hash(bid.payload.intent_hash))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Ordered `score DESC, arrived_at ASC` (§4.3/§4.6's tie-break), not insertion
/// order: unscored bids (score still `NULL`, e.g. a just-admitted bid read
/// back before scoring) sort after every scored one.
pub async fn by_intent(ex: &mut PgConnection, intent_hash: &Hash) -> sqlx::Result<Vec<Bid>> {
    const QUERY: &str =
        "SELECT * FROM bids WHERE intent_hash = $1 ORDER BY score DESC NULLS LAST, arrived_at ASC";
    let rows: Vec<BidRow> = sqlx::query_as(QUERY).bind(intent_hash).fetch_all(ex).await?;
    rows.into_iter().map(decode).collect()
}

pub async fn update_status(ex: &mut PgConnection, bid_id: BidId, status: BidStatus) -> sqlx::Result<()> {
    const QUERY: &str = "UPDATE bids SET status = $1 WHERE bid_id = $2";
    sqlx::query(QUERY).bind(status).bind(bid_id.0).execute(ex).await?;
    Ok(())
}

/// Persists final scores and ranks once an auction closes (§4.6).
pub async fn set_score_and_rank(
    ex: &mut PgConnection,
    bid_id: BidId,
    score: f64,
    rank: u32,
    status: BidStatus,
) -> sqlx::Result<()> {
    const QUERY: &str = "UPDATE bids SET score = $1, rank = $2, status = $3 WHERE bid_id = $4";
    sqlx::query(QUERY)
        .bind(score)
        .bind(rank as i32)
        .bind(status)
        .bind(bid_id.0)
        .execute(ex)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, model::{Intent, IntentPayload}, sqlx::Connection};

    fn sample_intent() -> Intent {
        let now = Utc::now();
        Intent::new(
            alloy_primitives::B256::repeat_byte(9),
            IntentPayload {
                token_in: alloy_primitives::Address::ZERO,
                token_out: alloy_primitives::Address::repeat_byte(2),
                amount_in: Amount::from(1_000u64),
                max_slippage_bps: 50,
                deadline: now.timestamp() + 300,
                chain_id: 1,
                receiver: alloy_primitives::Address::ZERO,
                nonce: Amount::from(1u8),
            },
            [1u8; 65],
            alloy_primitives::Address::repeat_byte(3),
            now,
        )
    }

    fn sample_bid(intent_hash: alloy_primitives::B256, quote_out: u64) -> Bid {
        Bid::new(
            BidPayload {
                intent_hash,
                quote_out: Amount::from(quote_out),
                solver_fee_bps: 5,
                calldata_hint: vec![1, 2, 3],
                ttl_ms: 1_000,
            },
            [2u8; 65],
            alloy_primitives::Address::repeat_byte(4),
            Utc::now(),
        )
    }

    #[tokio::test]
    #[ignore]
    async fn inserting_three_bids_bumps_total_and_caller_sets_the_leader() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let intent = sample_intent();
        crate::intents::insert(&mut db, &intent).await.unwrap();

        let first = sample_bid(intent.intent_hash, 100);
        insert(&mut db, &first).await.unwrap();
        let second = sample_bid(intent.intent_hash, 200);
        insert(&mut db, &second).await.unwrap();
        let worse = sample_bid(intent.intent_hash, 50);
        insert(&mut db, &worse).await.unwrap();

        let intent_hash = hash(intent.intent_hash);
        crate::intents::update_best_bid(&mut db, &intent_hash, second.bid_id).await.unwrap();
        let loaded = crate::intents::by_hash(&mut db, &intent_hash).await.unwrap().unwrap();
        assert_eq!(loaded.best_bid_id, Some(second.bid_id));
        assert_eq!(loaded.total_bids, 3);
    }
}
