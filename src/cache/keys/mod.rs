/// 缓存键
/// 令牌ID以十进制字符串作为键，推送、读取、删除和扫描使用同一种编码

/// 匹配全部键
pub const MATCH_ALL: &str = "*";

pub fn token_key(id: i64) -> String {
    id.to_string()
}

/// 解析扫描到的键；非数字键返回 None
pub fn parse_token_id(key: &str) -> Option<i64> {
    key.parse().ok()
}
