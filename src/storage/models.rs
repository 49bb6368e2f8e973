/// 短链接记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub id: String,
    pub original_url: String,
    pub owner_id: String,
    pub deleted: bool,
}

impl UrlRecord {
    pub fn new(
        id: impl Into<String>,
        original_url: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            original_url: original_url.into(),
            owner_id: owner_id.into(),
            deleted: false,
        }
    }
}

/// 按用户列出时的单条结果
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlPair {
    pub id: String,
    pub original_url: String,
}

/// 带完整短链接地址的列表项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUrlPair {
    pub short_url: String,
    pub original_url: String,
}

/// 待删除项，仅存在于删除缓冲区中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub record_id: String,
    pub owner_id: String,
}

impl PendingDeletion {
    /// 为同一用户的一批 id 构造待删除项
    pub fn batch(owner_id: &str, ids: &[String]) -> Vec<PendingDeletion> {
        ids.iter()
            .map(|id| PendingDeletion {
                record_id: id.clone(),
                owner_id: owner_id.to_string(),
            })
            .collect()
    }
}
