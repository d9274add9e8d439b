//! Chat access list.

use std::collections::HashSet;

/// The chats allowed to reach the bot.
///
/// An empty list allows nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    allowed: HashSet<i64>,
}

impl AccessList {
    /// Creates an access list from chat ids.
    pub fn new(chat_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed: chat_ids.into_iter().collect(),
        }
    }

    /// Returns whether updates from `chat_id` are accepted.
    pub fn allows(&self, chat_id: i64) -> bool {
        self.allowed.contains(&chat_id)
    }

    /// Returns the number of allowed chats.
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Returns `true` if no chat is allowed.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl FromIterator<i64> for AccessList {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_listed_chats_only() {
        let acl: AccessList = [42, -100].into_iter().collect();
        assert!(acl.allows(42));
        assert!(acl.allows(-100));
        assert!(!acl.allows(7));
        assert_eq!(acl.len(), 2);
    }

    #[test]
    fn test_empty_list_allows_nobody() {
        let acl = AccessList::default();
        assert!(acl.is_empty());
        assert!(!acl.allows(0));
        assert!(!acl.allows(42));
    }
}
