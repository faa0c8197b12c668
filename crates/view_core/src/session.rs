use async_trait::async_trait;
use shared::domain::SessionUser;
use tokio::sync::RwLock;

/// Source of the signed-in user. Authentication itself lives elsewhere.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self) -> Option<SessionUser>;
}

pub struct AnonymousSession;

#[async_trait]
impl SessionProvider for AnonymousSession {
    async fn current_user(&self) -> Option<SessionUser> {
        None
    }
}

#[derive(Default)]
pub struct StaticSession {
    user: RwLock<Option<SessionUser>>,
}

impl StaticSession {
    pub fn signed_in(user: SessionUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub async fn sign_in(&self, user: SessionUser) {
        *self.user.write().await = Some(user);
    }

    pub async fn sign_out(&self) {
        self.user.write().await.take();
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Option<SessionUser> {
        self.user.read().await.clone()
    }
}
