use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Buyer/seller chat thread; `members` is `[userId, sellerId]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    pub group_title: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_message_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Most recently active first.
pub fn sort_by_activity(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn conversation(id: &str, created: i64, updated: i64) -> Conversation {
        let base = Utc::now();
        Conversation {
            id: id.into(),
            group_title: format!("u1s{id}"),
            members: vec!["u1".into(), format!("s{id}")],
            last_message: None,
            last_message_id: None,
            created_at: base + Duration::minutes(created),
            updated_at: base + Duration::minutes(updated),
        }
    }

    #[test]
    fn newest_activity_comes_first() {
        let mut list = vec![
            conversation("a", 0, 5),
            conversation("b", 1, 9),
            conversation("c", 2, 5),
        ];
        sort_by_activity(&mut list);
        let ids: Vec<_> = list.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }
}
