//! OneBot v11 API response types.

use serde::{Deserialize, Serialize};

/// An entry of `get_group_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupInfo {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub max_member_count: u32,
}

/// An entry of `get_friend_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendInfo {
    pub user_id: i64,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub remark: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_list_tolerates_missing_fields() {
        let groups: Vec<GroupInfo> = serde_json::from_value(json!([
            { "group_id": 1, "group_name": "a", "member_count": 3, "max_member_count": 200 },
            { "group_id": 2 },
        ]))
        .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].group_id, 2);
        assert!(groups[1].group_name.is_empty());
    }
}
