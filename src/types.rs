//! Domain records exchanged with clients and the database

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::QueryParam;

/// A cash register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Register {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// An item that can be sold at a register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterItem {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub icon: String,
}

/// Transaction as submitted by a register client
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterTransaction {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Total in euros
    pub total: f64,
    /// Article name to number sold
    #[serde(default)]
    pub articles: BTreeMap<String, i64>,
}

/// Transaction as stored
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub title: String,
    pub description: Option<String>,
    pub amount: f64,
    /// Username of the person who booked it
    pub by: String,
    pub register: Uuid,
}

impl Transaction {
    pub fn new(submitted: &RegisterTransaction, by: &str, register: Uuid) -> Self {
        Self {
            title: submitted.title.clone(),
            description: submitted.description.clone(),
            amount: submitted.total,
            by: by.to_string(),
            register,
        }
    }

    /// Parameters for `insert-transaction`
    pub fn params(&self) -> Vec<QueryParam> {
        vec![
            QueryParam::Text(self.title.clone()),
            QueryParam::OptionalText(self.description.clone()),
            QueryParam::Float(self.amount),
            QueryParam::Text(self.by.clone()),
            QueryParam::Uuid(self.register),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleStatistic {
    pub name: String,
    pub count: i64,
}

/// Raw `from`/`until` query parameters, in unix seconds
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsParams {
    pub from: Option<String>,
    pub until: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsWindow {
    pub from: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl StatisticsWindow {
    /// Resolve the window; `None` when a bound is not a usable unix timestamp.
    ///
    /// Without bounds the window is the last 24 hours. A missing `until`
    /// means now and a missing `from` means the unix epoch.
    pub fn resolve(params: &StatisticsParams, now: DateTime<Utc>) -> Option<Self> {
        let from = match params.from.as_deref() {
            Some(raw) => Some(unix_seconds(raw)?),
            None => None,
        };
        let until = match params.until.as_deref() {
            Some(raw) => Some(unix_seconds(raw)?),
            None => None,
        };

        let window = match (from, until) {
            (None, None) => Self {
                from: now - Duration::hours(24),
                until: now,
            },
            (Some(from), None) => Self { from, until: now },
            (None, Some(until)) => Self {
                from: DateTime::<Utc>::UNIX_EPOCH,
                until,
            },
            (Some(from), Some(until)) => Self { from, until },
        };
        Some(window)
    }

    pub fn params(&self) -> Vec<QueryParam> {
        vec![
            QueryParam::Timestamp(self.from),
            QueryParam::Timestamp(self.until),
        ]
    }
}

fn unix_seconds(raw: &str) -> Option<DateTime<Utc>> {
    let seconds = raw.trim().parse::<i64>().ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(from: Option<&str>, until: Option<&str>) -> StatisticsParams {
        StatisticsParams {
            from: from.map(str::to_string),
            until: until.map(str::to_string),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_window_defaults_to_last_day() {
        let window = StatisticsWindow::resolve(&params(None, None), now()).unwrap();
        assert_eq!(window.until, now());
        assert_eq!(window.from, now() - Duration::hours(24));
    }

    #[test]
    fn test_window_open_ends() {
        let window = StatisticsWindow::resolve(&params(Some("1600000000"), None), now()).unwrap();
        assert_eq!(window.from.timestamp(), 1_600_000_000);
        assert_eq!(window.until, now());

        let window = StatisticsWindow::resolve(&params(None, Some("1600000000")), now()).unwrap();
        assert_eq!(window.from.timestamp(), 0);
        assert_eq!(window.until.timestamp(), 1_600_000_000);
    }

    #[test]
    fn test_window_both_bounds() {
        let window =
            StatisticsWindow::resolve(&params(Some("100"), Some("200")), now()).unwrap();
        assert_eq!(window.from.timestamp(), 100);
        assert_eq!(window.until.timestamp(), 200);
    }

    #[test]
    fn test_window_rejects_non_numeric_bounds() {
        assert!(StatisticsWindow::resolve(&params(Some("yesterday"), None), now()).is_none());
        assert!(StatisticsWindow::resolve(&params(None, Some("1.5")), now()).is_none());
        assert!(StatisticsWindow::resolve(&params(Some(""), None), now()).is_none());
    }

    #[test]
    fn test_transaction_params_follow_statement_order() {
        let submitted: RegisterTransaction = serde_json::from_str(
            r#"{"title": "Evening show", "total": 12.5, "articles": {"Popcorn": 2}}"#,
        )
        .unwrap();
        let register = Uuid::new_v4();
        let transaction = Transaction::new(&submitted, "alice", register);

        assert_eq!(
            transaction.params(),
            vec![
                QueryParam::Text("Evening show".to_string()),
                QueryParam::OptionalText(None),
                QueryParam::Float(12.5),
                QueryParam::Text("alice".to_string()),
                QueryParam::Uuid(register),
            ]
        );
    }
}
