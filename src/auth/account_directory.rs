use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 账户状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// 账户公开信息（不含任何凭据）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: AccountStatus,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// 用户查找接口：按用户名或邮箱解析账户
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<Account>>;
}

/// 内存账户目录，启动时从配置加载
pub struct InMemoryAccountDirectory {
    accounts: RwLock<Vec<Account>>,
}

impl InMemoryAccountDirectory {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<Account>> {
        let login = login.trim();
        if login.is_empty() {
            return Ok(None);
        }

        // 用户名精确匹配，邮箱忽略大小写
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .find(|a| a.username == login || a.email.eq_ignore_ascii_case(login))
            .cloned())
    }
}
