/// 列表缓存键片段
const LIST_SEGMENT: &str = "list";

/// 单条记录缓存键片段
const ITEM_SEGMENT: &str = "item";

/// 集合下所有缓存键的公共前缀，写操作后按前缀失效
pub fn collection_prefix(collection: &str) -> String {
    format!("{}:", collection)
}

/// 生成列表缓存键，筛选条件序列化后拼进键里
pub fn list_key(collection: &str, scope: &str, filter: &str) -> String {
    format!("{}:{}:{}:{}", collection, LIST_SEGMENT, scope, filter)
}

/// 生成单条记录缓存键
pub fn item_key(collection: &str, scope: &str, id_or_slug: &str) -> String {
    format!("{}:{}:{}:{}", collection, ITEM_SEGMENT, scope, id_or_slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_share_collection_prefix() {
        let prefix = collection_prefix("properties");
        assert!(list_key("properties", "public", "{}").starts_with(&prefix));
        assert!(item_key("properties", "admin", "abc").starts_with(&prefix));
        assert!(!item_key("projects", "admin", "abc").starts_with(&prefix));
    }
}
