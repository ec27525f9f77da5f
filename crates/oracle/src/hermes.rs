//! Hermes HTTP client for signed Pyth price updates.

use alloy::primitives::{Bytes, B256};
use meridian_primitives::PriceQuote;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::{OracleError, PriceUpdate};

/// Client for the Hermes price service.
pub struct HermesClient {
    base_url: Url,
    client: reqwest::Client,
}

impl HermesClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Fetches the latest signed update for the given feed ids, returning
    /// the binary payloads and the parsed quotes they certify.
    pub async fn latest_update(&self, feed_ids: &[B256]) -> Result<PriceUpdate, OracleError> {
        if feed_ids.is_empty() {
            return Err(OracleError::EmptyFeedSet);
        }

        let mut url = self
            .base_url
            .join("v2/updates/price/latest")
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for id in feed_ids {
                query.append_pair("ids[]", &format!("{id:#x}"));
            }
            query.append_pair("encoding", "hex");
            query.append_pair("parsed", "true");
        }

        debug!(%url, feeds = feed_ids.len(), "fetching latest price update");
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<LatestUpdateResponse>()
            .await?;

        parse_update(feed_ids, response)
    }
}

/// Wire shape of `GET /v2/updates/price/latest`.
#[derive(Debug, Deserialize)]
struct LatestUpdateResponse {
    binary: BinaryUpdate,
    parsed: Vec<ParsedFeed>,
}

#[derive(Debug, Deserialize)]
struct BinaryUpdate {
    data: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ParsedFeed {
    id: String,
    price: FeedPrice,
}

#[derive(Debug, Deserialize)]
struct FeedPrice {
    price: String,
    conf: String,
    expo: i32,
    publish_time: i64,
}

fn parse_update(
    requested: &[B256],
    response: LatestUpdateResponse,
) -> Result<PriceUpdate, OracleError> {
    let data = response
        .binary
        .data
        .iter()
        .map(|payload| {
            hex::decode(payload.trim_start_matches("0x"))
                .map(Bytes::from)
                .map_err(|e| OracleError::MalformedResponse(format!("binary payload: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut quotes = Vec::with_capacity(requested.len());
    for id in requested {
        let feed = response
            .parsed
            .iter()
            .find(|feed| parse_feed_id(&feed.id).as_ref() == Some(id))
            .ok_or(OracleError::MissingQuote(*id))?;

        let quote = PriceQuote {
            id: *id,
            price: feed
                .price
                .price
                .parse()
                .map_err(|e| OracleError::MalformedResponse(format!("price: {e}")))?,
            conf: feed
                .price
                .conf
                .parse()
                .map_err(|e| OracleError::MalformedResponse(format!("conf: {e}")))?,
            expo: feed.price.expo,
            publish_time: feed.price.publish_time.max(0) as u64,
        }
        .validated()?;
        quotes.push(quote);
    }

    Ok(PriceUpdate { data, quotes })
}

fn parse_feed_id(raw: &str) -> Option<B256> {
    let bytes = hex::decode(raw.trim_start_matches("0x")).ok()?;
    (bytes.len() == 32).then(|| B256::from_slice(&bytes))
}
