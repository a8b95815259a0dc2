// 📄 Paginated Fetcher - count first, then fixed-size pages
//
// Protocol:
//   1. count-only request for the filter           → total
//   2. pages = ceil(total / PAGE_SIZE)
//   3. `pages` sequential requests, start = k * PAGE_SIZE
//   4. complete = (records accumulated == total)
//
// A short or long result is reported through `complete`, never raised.

use crate::client::{ApiClient, Endpoint, Transport};
use crate::entities::Lancamento;
use crate::error::ApiError;
use crate::schema::{decode_records, EntitySchema, SchemaReport};
use anyhow::Result;
use chrono::NaiveDate;
use log::{info, warn};
use serde_json::Value;

pub const PAGE_SIZE: usize = 500;

/// Transactions of one account within an inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionQuery {
    pub account_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TransactionQuery {
    pub fn new(account_id: i64, start: NaiveDate, end: NaiveDate) -> Self {
        TransactionQuery {
            account_id,
            start,
            end,
        }
    }

    fn filter(&self) -> Vec<(&'static str, String)> {
        vec![
            ("account_id", self.account_id.to_string()),
            ("start_date", self.start.format("%Y-%m-%d").to_string()),
            ("end_date", self.end.format("%Y-%m-%d").to_string()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Paginated<T> {
    /// (page index, record) in page order, then within-page order
    pub records: Vec<(usize, T)>,

    /// Total reported by the count request
    pub expected: usize,

    /// Page requests issued (count request excluded)
    pub pages: usize,

    /// records.len() == expected
    pub complete: bool,

    pub report: SchemaReport,
}

pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size)
}

/// Read the total out of a count-mode reply: a bare number, or an object
/// with `count` / `total`
pub fn parse_total(endpoint: &str, body: &Value) -> Result<usize> {
    let as_count = |v: &Value| -> Option<usize> {
        match v {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                        .map(|f| f as u64)
                })
                .map(|n| n as usize),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    };

    let total = match body {
        Value::Object(map) => map.get("count").or_else(|| map.get("total")).and_then(as_count),
        other => as_count(other),
    };

    total.ok_or_else(|| {
        ApiError::Count {
            endpoint: endpoint.to_string(),
            body: body.to_string(),
        }
        .into()
    })
}

/// Fetch every page of `endpoint` matching `filter`
pub fn fetch_paginated<T, E>(
    client: &mut ApiClient<T>,
    endpoint: Endpoint,
    filter: &[(&'static str, String)],
) -> Result<Paginated<E>>
where
    T: Transport,
    E: EntitySchema,
{
    let mut count_params = filter.to_vec();
    count_params.push(("count", "true".to_string()));
    let expected = parse_total(endpoint.path(), &client.get_json(endpoint, &count_params)?)?;

    let pages = page_count(expected, PAGE_SIZE);
    let mut records = Vec::with_capacity(expected);
    let mut report = SchemaReport {
        endpoint: endpoint.path().to_string(),
        ..SchemaReport::default()
    };

    for page in 0..pages {
        let mut params = filter.to_vec();
        params.push(("limit", PAGE_SIZE.to_string()));
        params.push(("start", (page * PAGE_SIZE).to_string()));

        let payload = client.get_json(endpoint, &params)?;
        let decoded = decode_records::<E>(endpoint.path(), payload)?;

        report.merge(decoded.report);
        records.extend(decoded.records.into_iter().map(|record| (page, record)));
    }

    let complete = records.len() == expected;

    Ok(Paginated {
        records,
        expected,
        pages,
        complete,
        report,
    })
}

/// All transactions of one account in a date range
pub fn fetch_transactions<T: Transport>(
    client: &mut ApiClient<T>,
    query: &TransactionQuery,
) -> Result<Paginated<Lancamento>> {
    let result = fetch_paginated(client, Endpoint::Lancamentos, &query.filter())?;

    info!(
        "lancamentos conta={} {}..{}: {} of {} record(s) in {} page(s)",
        query.account_id,
        query.start,
        query.end,
        result.records.len(),
        result.expected,
        result.pages
    );

    if !result.complete {
        warn!(
            "lancamentos conta={} {}..{}: API reported {} record(s) but {} were retrieved",
            query.account_id,
            query.start,
            query.end,
            result.expected,
            result.records.len()
        );
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{FakeTransport, Params};
    use serde_json::json;

    fn page_of(start: usize, len: usize) -> Value {
        Value::Array(
            (start..start + len)
                .map(|i| json!({ "id": i as i64, "valor": 1.0, "conta_id": 7 }))
                .collect(),
        )
    }

    /// Fake API holding `actual` transactions but reporting `reported`
    fn api(reported: usize, actual: usize) -> impl FnMut(&str, &Params) -> (u16, Value) {
        move |_: &str, params: &Params| {
            if params.contains_key("count") {
                return (200, json!({ "count": reported }));
            }
            let start: usize = params["start"].parse().unwrap();
            let limit: usize = params["limit"].parse().unwrap();
            let len = actual.saturating_sub(start).min(limit);
            (200, page_of(start, len))
        }
    }

    fn query() -> TransactionQuery {
        TransactionQuery::new(
            7,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 500), 0);
        assert_eq!(page_count(1, 500), 1);
        assert_eq!(page_count(500, 500), 1);
        assert_eq!(page_count(501, 500), 2);
        assert_eq!(page_count(1200, 500), 3);
    }

    #[test]
    fn test_parse_total_shapes() {
        assert_eq!(parse_total("x", &json!(1200)).unwrap(), 1200);
        assert_eq!(parse_total("x", &json!({ "count": 3 })).unwrap(), 3);
        assert_eq!(parse_total("x", &json!({ "total": "42" })).unwrap(), 42);
        assert_eq!(parse_total("x", &json!(1200.0)).unwrap(), 1200);
        assert_eq!(parse_total("x", &json!({ "count": 7.0 })).unwrap(), 7);
        assert!(parse_total("x", &json!(12.5)).is_err());
        assert!(parse_total("x", &json!(-3)).is_err());
        assert!(parse_total("x", &json!([1, 2])).is_err());
        assert!(parse_total("x", &json!({ "n": 1 })).is_err());
    }

    #[test]
    fn test_1200_records_three_pages() {
        let mut client = ApiClient::new(FakeTransport::new(api(1200, 1200)), "https://x", "tok");

        let result = fetch_transactions(&mut client, &query()).unwrap();

        let requests = client.transport().requests_to("lancamentos");
        assert_eq!(requests.len(), 4);
        assert!(requests[0].contains_key("count"));

        let offsets: Vec<&str> = requests[1..].iter().map(|p| p["start"].as_str()).collect();
        assert_eq!(offsets, vec!["0", "500", "1000"]);
        assert!(requests[1..].iter().all(|p| p["limit"] == "500"));

        assert_eq!(result.pages, 3);
        assert_eq!(result.expected, 1200);
        assert_eq!(result.records.len(), 1200);
        assert!(result.complete);
    }

    #[test]
    fn test_filter_params_on_every_request() {
        let mut client = ApiClient::new(FakeTransport::new(api(10, 10)), "https://x", "tok");
        fetch_transactions(&mut client, &query()).unwrap();

        for params in client.transport().requests_to("lancamentos") {
            assert_eq!(params["account_id"], "7");
            assert_eq!(params["start_date"], "2024-01-01");
            assert_eq!(params["end_date"], "2024-01-31");
            assert!(!params.contains_key("conta_id"));
        }
    }

    #[test]
    fn test_records_keep_page_order_and_index() {
        let mut client = ApiClient::new(FakeTransport::new(api(1200, 1200)), "https://x", "tok");
        let result = fetch_transactions(&mut client, &query()).unwrap();

        let ids: Vec<i64> = result.records.iter().map(|(_, l)| l.id).collect();
        assert_eq!(ids, (0..1200).collect::<Vec<i64>>());
        assert_eq!(result.records[0].0, 0);
        assert_eq!(result.records[499].0, 0);
        assert_eq!(result.records[500].0, 1);
        assert_eq!(result.records[1199].0, 2);
    }

    #[test]
    fn test_short_fetch_is_flagged_not_raised() {
        let mut client = ApiClient::new(FakeTransport::new(api(1200, 1100)), "https://x", "tok");

        let result = fetch_transactions(&mut client, &query()).unwrap();

        assert_eq!(result.pages, 3);
        assert_eq!(result.records.len(), 1100);
        assert!(!result.complete);
    }

    #[test]
    fn test_long_fetch_is_flagged_not_raised() {
        // count says 1000 but every page overflows the limit
        let transport = FakeTransport::new(|_: &str, params: &Params| {
            if params.contains_key("count") {
                return (200, json!({ "count": 1000 }));
            }
            let start: usize = params["start"].parse().unwrap();
            (200, page_of(start, 600))
        });
        let mut client = ApiClient::new(transport, "https://x", "tok");

        let result = fetch_transactions(&mut client, &query()).unwrap();

        assert_eq!(result.pages, 2);
        assert_eq!(result.expected, 1000);
        assert_eq!(result.records.len(), 1200);
        assert!(!result.complete);
    }

    #[test]
    fn test_zero_total_issues_no_pages() {
        let mut client = ApiClient::new(FakeTransport::new(api(0, 0)), "https://x", "tok");

        let result = fetch_transactions(&mut client, &query()).unwrap();

        assert_eq!(client.transport().requests.len(), 1);
        assert!(result.records.is_empty());
        assert!(result.complete);
    }

    #[test]
    fn test_page_failure_propagates() {
        let transport = FakeTransport::new(|_: &str, params: &Params| {
            if params.contains_key("count") {
                (200, json!(600))
            } else if params["start"] == "500" {
                (502, json!("bad gateway"))
            } else {
                (200, page_of(0, 500))
            }
        });
        let mut client = ApiClient::new(transport, "https://x", "tok");

        assert!(fetch_transactions(&mut client, &query()).is_err());
    }
}
