//! Operator chat.
//!
//! Messages naming a mission or drone (`mission status <id>`,
//! `drone status <id>`) get that record attached as read-only context for
//! the chat oracle.

use serde_json::{json, Value};
use survey_oracle::OracleAdapter;

use crate::persistence::Repositories;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatSubject {
    Mission(String),
    Drone(String),
}

/// Find the first `mission status <id>` or `drone status <id>` phrase,
/// ignoring ASCII case in the keywords.
pub fn parse_subject(message: &str) -> Option<ChatSubject> {
    let lower = message.to_ascii_lowercase();
    let mission = find_id(message, &lower, "mission status ");
    let drone = find_id(message, &lower, "drone status ");
    match (mission, drone) {
        (Some((m_at, id)), Some((d_at, _))) if m_at < d_at => Some(ChatSubject::Mission(id)),
        (Some((_, id)), None) => Some(ChatSubject::Mission(id)),
        (_, Some((_, id))) => Some(ChatSubject::Drone(id)),
        (None, None) => None,
    }
}

fn find_id(message: &str, lower: &str, keyword: &str) -> Option<(usize, String)> {
    let at = lower.find(keyword)?;
    let rest = &message[at + keyword.len()..];
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if id.is_empty() {
        None
    } else {
        Some((at, id))
    }
}

/// Answer an operator message. Never fails; oracle trouble yields a fixed
/// apology.
pub async fn reply(repos: &Repositories, oracle: &OracleAdapter, message: &str) -> String {
    let context = match parse_subject(message) {
        Some(subject) => lookup(repos, &subject).await,
        None => None,
    };
    oracle.chat(message, context.as_ref()).await
}

async fn lookup(repos: &Repositories, subject: &ChatSubject) -> Option<Value> {
    let (kind, id, record) = match subject {
        ChatSubject::Mission(id) => (
            "mission",
            id,
            repos
                .missions
                .get(id)
                .await
                .map(|m| m.map(|m| json!(m))),
        ),
        ChatSubject::Drone(id) => (
            "drone",
            id,
            repos.drones.get(id).await.map(|d| d.map(|d| json!(d))),
        ),
    };
    match record {
        Ok(Some(record)) => {
            let mut context = serde_json::Map::new();
            context.insert(kind.to_string(), record);
            Some(Value::Object(context))
        }
        Ok(None) => Some(json!({ "notFound": { "kind": kind, "id": id } })),
        Err(err) => {
            tracing::warn!("Chat lookup of {} {} failed: {:#}", kind, id, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use survey_core::{Drone, DroneStatus, GeoPoint};

    #[test]
    fn parses_subjects() {
        assert_eq!(
            parse_subject("What is the Mission Status 3f2a-b1?"),
            Some(ChatSubject::Mission("3f2a-b1".to_string()))
        );
        assert_eq!(
            parse_subject("drone status d_7 please"),
            Some(ChatSubject::Drone("d_7".to_string()))
        );
        assert_eq!(
            parse_subject("drone status d-1 and mission status m-1"),
            Some(ChatSubject::Drone("d-1".to_string()))
        );
        assert_eq!(parse_subject("mission status "), None);
        assert_eq!(parse_subject("help"), None);
    }

    #[tokio::test]
    async fn lookup_attaches_record_or_not_found() {
        let repos = Repositories::in_memory();
        let drone = Drone {
            id: "d-1".to_string(),
            name: "Scout".to_string(),
            serial_number: "SN-1".to_string(),
            status: DroneStatus::Charging,
            battery_level: 40.0,
            location: GeoPoint::default(),
            specifications: Default::default(),
            maintenance_history: Vec::new(),
            last_mission: None,
            last_seen: Utc::now(),
        };
        repos.drones.save(&drone).await.unwrap();

        let found = lookup(&repos, &ChatSubject::Drone("d-1".to_string()))
            .await
            .unwrap();
        assert_eq!(found["drone"]["status"], "charging");

        let missing = lookup(&repos, &ChatSubject::Mission("m-9".to_string()))
            .await
            .unwrap();
        assert_eq!(missing["notFound"]["kind"], "mission");
    }

    #[tokio::test]
    async fn disabled_oracle_apologizes() {
        let repos = Repositories::in_memory();
        let answer = reply(&repos, &OracleAdapter::disabled(), "help").await;
        assert_eq!(answer, survey_oracle::adapter::CHAT_FAILURE_REPLY);
    }
}
