// ── Session store ──
//
// Single source of truth for "is there an authenticated operator, and who".
// The bearer token and the identity record are persisted under two
// well-known keys so a restarted process can pick the session back up
// without a round trip. Any 401 from any endpoint clears both.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use fleetwatch_api::{ApiClient, AuthObserver, User};

use crate::error::CoreError;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key for the JSON-encoded [`User`].
pub const USER_KEY: &str = "user";

// ── Credential storage ───────────────────────────────────────────────

/// Durable string key/value storage for the session.
pub trait CredentialStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}

/// A JSON object file, rewritten on every change.
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(storage_error(&self.path, &e)),
        };
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;
        }
        let contents =
            serde_json::to_string_pretty(map).map_err(|e| CoreError::Internal(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| storage_error(&tmp, &e))?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, &e))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_map()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        map.insert(key.to_owned(), value.to_owned());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| storage_error(path, &e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restrict_permissions(_path: &Path) -> Result<(), CoreError> {
    Ok(())
}

fn storage_error(path: &Path, err: &std::io::Error) -> CoreError {
    CoreError::Storage {
        message: format!("{}: {err}", path.display()),
    }
}

/// In-process storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, key: &str) -> Result<Option<String>, CoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(User),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Unauthenticated => None,
        }
    }
}

/// Clears persisted state when the client reports a 401.
struct SessionInvalidator {
    store: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<SessionState>>,
}

impl AuthObserver for SessionInvalidator {
    fn unauthorized(&self) {
        if let Err(e) = clear_persisted(self.store.as_ref()) {
            warn!(error = %e, "failed to clear persisted session after 401");
        }
        self.state.send_replace(SessionState::Unauthenticated);
    }
}

fn clear_persisted(store: &dyn CredentialStore) -> Result<(), CoreError> {
    store.remove(TOKEN_KEY)?;
    store.remove(USER_KEY)
}

/// The authenticated-operator context handed to every network-calling
/// component.
///
/// Owns the only write path to the credential: `login`, `restore`,
/// `logout`, and the 401 hook it installs on the client.
pub struct Session {
    client: Arc<ApiClient>,
    store: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<SessionState>>,
}

impl Session {
    /// Wrap `client`, installing the 401 hook. Starts unauthenticated;
    /// call [`restore`](Self::restore) to pick up a persisted session.
    pub fn new(client: Arc<ApiClient>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        let state = Arc::new(state);
        client.set_auth_observer(Arc::new(SessionInvalidator {
            store: Arc::clone(&store),
            state: Arc::clone(&state),
        }));
        Self {
            client,
            store,
            state,
        }
    }

    /// The shared API client, credential attached when authenticated.
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Load a persisted session. No revalidation call is made: the token
    /// is trusted until some request comes back 401.
    ///
    /// Returns `true` only when both the token and a decodable identity
    /// were present. A half-written session is discarded.
    pub fn restore(&self) -> Result<bool, CoreError> {
        let token = self.store.load(TOKEN_KEY)?;
        let user = self.store.load(USER_KEY)?;

        match (token, user) {
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => {
                    debug!(user = %user.username, "restored persisted session");
                    self.client.set_token(SecretString::from(token));
                    self.state.send_replace(SessionState::Authenticated(user));
                    Ok(true)
                }
                Err(e) => {
                    warn!(error = %e, "persisted identity is unreadable, discarding session");
                    clear_persisted(self.store.as_ref())?;
                    Ok(false)
                }
            },
            (None, None) => Ok(false),
            _ => {
                debug!("discarding half-persisted session");
                clear_persisted(self.store.as_ref())?;
                Ok(false)
            }
        }
    }

    /// Exchange credentials for a token and persist the result.
    ///
    /// Rejected credentials come back as [`CoreError::Auth`] and nothing is
    /// retried. A 401 also drops any session held before the attempt, the
    /// same as a 401 from any other endpoint.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<User, CoreError> {
        let resp = self.client.login(username, password).await?;
        let user_json =
            serde_json::to_string(&resp.user).map_err(|e| CoreError::Internal(e.to_string()))?;

        self.store.save(TOKEN_KEY, &resp.token)?;
        self.store.save(USER_KEY, &user_json)?;
        self.client.set_token(SecretString::from(resp.token));
        self.state
            .send_replace(SessionState::Authenticated(resp.user.clone()));

        info!(user = %resp.user.username, role = %resp.user.role, "logged in");
        Ok(resp.user)
    }

    /// Forget the credential locally. The backend keeps no session to end.
    pub fn logout(&self) -> Result<(), CoreError> {
        self.client.clear_token();
        let result = clear_persisted(self.store.as_ref());
        self.state.send_replace(SessionState::Unauthenticated);
        info!("logged out");
        result
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Authenticated(_))
    }

    /// Watch state transitions (e.g. to route back to login after a 401).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleetwatch_api::TransportConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ops".into(),
            email: None,
            role: "admin".into(),
            created: None,
            last_login: None,
        }
    }

    async fn setup() -> (MockServer, Session, Arc<MemoryCredentialStore>) {
        let server = MockServer::start().await;
        let client = ApiClient::new(server.uri().parse().unwrap(), &TransportConfig::default())
            .unwrap();
        let store = Arc::new(MemoryCredentialStore::default());
        let session = Session::new(Arc::new(client), store.clone());
        (server, session, store)
    }

    #[tokio::test]
    async fn restore_requires_token_and_identity() {
        let (_server, session, store) = setup().await;
        assert!(!session.restore().unwrap());

        store.save(TOKEN_KEY, "jwt").unwrap();
        assert!(!session.restore().unwrap());
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None, "half session is discarded");

        let user = sample_user();
        store.save(TOKEN_KEY, "jwt").unwrap();
        store
            .save(USER_KEY, &serde_json::to_string(&user).unwrap())
            .unwrap();
        assert!(session.restore().unwrap());
        assert!(session.client().has_token());
        assert_eq!(session.current_user(), Some(user));
    }

    #[tokio::test]
    async fn login_persists_and_attaches_token() {
        let (server, session, store) = setup().await;
        let user = sample_user();

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt-1", "user": user })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/agents"))
            .and(header("authorization", "Bearer jwt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut rx = session.subscribe();
        let logged_in = session
            .login("ops", &SecretString::from("pw"))
            .await
            .unwrap();

        assert_eq!(logged_in, user);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().user(), Some(&user));
        assert_eq!(store.load(TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
        assert!(store.load(USER_KEY).unwrap().is_some());

        session.client().list_agents().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_login_is_auth_error() {
        let (server, session, store) = setup().await;

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let err = session
            .login("ops", &SecretString::from("wrong"))
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert!(!session.is_authenticated());
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn any_401_clears_persisted_session() {
        let (server, session, store) = setup().await;
        store.save(TOKEN_KEY, "jwt").unwrap();
        store
            .save(USER_KEY, &serde_json::to_string(&sample_user()).unwrap())
            .unwrap();
        assert!(session.restore().unwrap());

        Mock::given(method("GET"))
            .and(path(format!("/api/images/{}", Uuid::nil())))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = session.client().get_image(Uuid::nil()).await.unwrap_err();

        assert!(err.is_auth_expired());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.load(USER_KEY).unwrap(), None);
        assert!(!session.client().has_token());
    }

    #[tokio::test]
    async fn rejected_login_drops_restored_session() {
        let (server, session, store) = setup().await;
        store.save(TOKEN_KEY, "jwt").unwrap();
        store
            .save(USER_KEY, &serde_json::to_string(&sample_user()).unwrap())
            .unwrap();
        assert!(session.restore().unwrap());

        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let err = session
            .login("ops", &SecretString::from("wrong"))
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(!session.client().has_token());
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.load(USER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (_server, session, store) = setup().await;
        store.save(TOKEN_KEY, "jwt").unwrap();
        store
            .save(USER_KEY, &serde_json::to_string(&sample_user()).unwrap())
            .unwrap();
        session.restore().unwrap();

        session.logout().unwrap();

        assert!(!session.is_authenticated());
        assert!(!session.client().has_token());
        assert_eq!(store.load(USER_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_round_trips_and_tolerates_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
        store.save(TOKEN_KEY, "jwt").unwrap();
        store.save(USER_KEY, "{}").unwrap();
        assert_eq!(store.load(TOKEN_KEY).unwrap().as_deref(), Some("jwt"));

        store.remove(TOKEN_KEY).unwrap();
        assert_eq!(store.load(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.load(USER_KEY).unwrap().as_deref(), Some("{}"));

        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(USER_KEY).unwrap(), None);
    }
}
