use super::{Engagement, Session, SessionId};
use std::{collections::HashMap, sync::Arc};
use tokio::{sync::Mutex, task::JoinHandle};

pub type SessionHandle<E> = Arc<Mutex<Session<E>>>;

/// All live sessions of one variant.  Cloning shares the same sessions.
pub struct Registry<E> {
    entries: Arc<Mutex<HashMap<SessionId, Entry<E>>>>,
}

struct Entry<E> {
    session: SessionHandle<E>,
    refresh: Option<JoinHandle<()>>,
}

impl<E> Clone for Registry<E> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<E: Engagement> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engagement> Registry<E> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn insert(&self, session: Session<E>) -> SessionHandle<E> {
        let id = session.id();
        let session = Arc::new(Mutex::new(session));
        self.entries.lock().await.insert(
            id,
            Entry {
                session: Arc::clone(&session),
                refresh: None,
            },
        );
        session
    }

    pub async fn get(&self, id: SessionId) -> Option<SessionHandle<E>> {
        self.entries
            .lock()
            .await
            .get(&id)
            .map(|entry| Arc::clone(&entry.session))
    }

    /// Hand ownership of the refresh task to the registry.  If the session is already gone the
    /// task is stopped.
    pub async fn attach(&self, id: SessionId, task: JoinHandle<()>) {
        match self.entries.lock().await.get_mut(&id) {
            Some(entry) => entry.refresh = Some(task),
            None => task.abort(),
        }
    }

    /// Forget a session.  Its refresh task, if still running, is left to notice on its own.
    pub async fn remove(&self, id: SessionId) -> bool {
        self.entries.lock().await.remove(&id).is_some()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Close every session and stop every refresh task
    pub async fn shutdown(&self) {
        let entries: Vec<Entry<E>> = self.entries.lock().await.drain().map(|(_, e)| e).collect();
        for entry in entries {
            if let Some(task) = entry.refresh {
                task.abort();
            }
            entry.session.lock().await.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::giveaway::Giveaway;
    use super::*;
    use serenity::all::UserId;
    use std::time::Duration;
    use tokio::{sync::oneshot, time::Instant};

    fn session() -> Session<Giveaway> {
        let giveaway = Giveaway::new(UserId::new(1), "Car", None, 1, 0).unwrap();
        Session::new(UserId::new(1), 60, Instant::now(), giveaway)
    }

    /// A long-running task; the receiver errors once the task is dropped
    fn sleeper() -> (JoinHandle<()>, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            let _ = tx.send(());
        });
        (task, rx)
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let registry = Registry::new();
        let s = session();
        let id = s.id();

        registry.insert(s).await;
        assert!(registry.get(id).await.is_some());
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn clones_share_sessions() {
        let registry = Registry::new();
        let other = registry.clone();
        let s = session();
        let id = s.id();

        registry.insert(s).await;
        assert!(other.get(id).await.is_some());
    }

    #[tokio::test]
    async fn attaching_to_missing_session_stops_task() {
        let registry: Registry<Giveaway> = Registry::new();
        let (task, stopped) = sleeper();

        registry.attach(SessionId::next(), task).await;

        assert!(stopped.await.is_err());
    }

    #[tokio::test]
    async fn shutdown_closes_and_stops_everything() {
        let registry = Registry::new();
        let handle = registry.insert(session()).await;
        let id = handle.lock().await.id();
        let (task, stopped) = sleeper();
        registry.attach(id, task).await;

        registry.shutdown().await;

        assert_eq!(registry.len().await, 0);
        assert_eq!(handle.lock().await.state(), super::super::SessionState::Closed);
        assert!(stopped.await.is_err());
    }
}
