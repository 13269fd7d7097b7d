use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    pub user_id: String,
    pub socket_id: String,
}

/// Who is connected, and on which socket.
///
/// One entry per user: the first socket a user registers from keeps the
/// route until it disconnects, later sockets of the same user are ignored.
/// Entries keep registration order, which is the order broadcast to clients.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<OnlineUser>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `user_id` already has a socket.
    pub fn put(&mut self, user_id: &str, socket_id: &str) -> bool {
        if self.lookup(user_id).is_some() {
            return false;
        }
        self.entries.push(OnlineUser {
            user_id: user_id.to_string(),
            socket_id: socket_id.to_string(),
        });
        true
    }

    /// Drops every entry routed through `socket_id`; returns how many went.
    pub fn remove(&mut self, socket_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|u| u.socket_id != socket_id);
        before - self.entries.len()
    }

    pub fn lookup(&self, user_id: &str) -> Option<&OnlineUser> {
        self.entries.iter().find(|u| u.user_id == user_id)
    }

    pub fn users(&self) -> &[OnlineUser] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registration_wins() {
        let mut reg = Registry::new();
        assert!(reg.put("alice", "sock-1"));
        assert!(!reg.put("alice", "sock-2"));
        assert_eq!(reg.lookup("alice").unwrap().socket_id, "sock-1");
        assert_eq!(reg.users().len(), 1);
    }

    #[test]
    fn remove_is_by_socket() {
        let mut reg = Registry::new();
        reg.put("alice", "sock-1");
        reg.put("bob", "sock-2");

        // alice's ignored second socket going away changes nothing
        assert_eq!(reg.remove("sock-9"), 0);
        assert_eq!(reg.remove("sock-1"), 1);
        assert!(reg.lookup("alice").is_none());
        assert_eq!(reg.lookup("bob").unwrap().socket_id, "sock-2");
    }

    #[test]
    fn user_can_register_again_after_disconnect() {
        let mut reg = Registry::new();
        reg.put("alice", "sock-1");
        reg.remove("sock-1");
        assert!(reg.put("alice", "sock-3"));
        assert_eq!(reg.lookup("alice").unwrap().socket_id, "sock-3");
    }

    #[test]
    fn roster_keeps_registration_order() {
        let mut reg = Registry::new();
        reg.put("carol", "s3");
        reg.put("alice", "s1");
        let ids: Vec<_> = reg.users().iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, ["carol", "alice"]);
        let json = serde_json::to_value(reg.users()).unwrap();
        assert_eq!(json[0]["socketId"], "s3");
    }
}
