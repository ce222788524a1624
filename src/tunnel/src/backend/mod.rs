use async_trait::async_trait;
use thiserror::Error;

pub mod session;

/// Error string some drivers report for a rejected login without attaching
/// a server code.
pub const AUTH_ERROR_TEXT: &str = "authentication error";
/// MySQL ER_ACCESS_DENIED_ERROR, substituted for [AUTH_ERROR_TEXT].
pub const ER_ACCESS_DENIED: u16 = 1045;

/// Column metadata forwarded verbatim into the fields header of the
/// response framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    pub name: String,
    pub table: String,
    pub type_code: u32,
    pub flags: u32,
    pub display_len: u32,
}

/// One row of text-protocol column values; `None` is SQL NULL.
pub type RowValues = Vec<Option<Vec<u8>>>;

/// Fully materialised result of one statement.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub fields: Vec<FieldMeta>,
    pub rows: Vec<RowValues>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Driver(#[from] mysql_async::Error),
    #[error("invalid backend port {0:?}")]
    BadPort(String),
}

/// Maps a session error onto the (code, message) pair the framing carries.
///
/// Typed server errors keep their code and message. An untyped error whose
/// rendering is exactly [AUTH_ERROR_TEXT] becomes code 1045 so clients can
/// still present a login failure. Every other untyped error reports as code
/// zero with an empty message; existing clients depend on that shape.
pub fn check_error(err: &SessionError) -> (u16, Vec<u8>) {
    if let SessionError::Driver(mysql_async::Error::Server(server_err)) = err {
        if server_err.code > 0 {
            return (server_err.code, server_err.message.clone().into_bytes());
        }
    }
    if err.to_string() == AUTH_ERROR_TEXT {
        return (ER_ACCESS_DENIED, AUTH_ERROR_TEXT.as_bytes().to_vec());
    }
    (0, Vec::new())
}

/// The narrow MySQL capability the dispatcher consumes.
#[async_trait]
pub trait BackendSession: Send + Sized {
    async fn select_db(&mut self, database: &str) -> Result<(), SessionError>;

    async fn run_query(&mut self, statement: &str) -> Result<QueryOutcome, SessionError>;

    /// Releases the underlying connection. Called exactly once on every
    /// path out of the dispatcher.
    async fn close(self);
}

/// Opens one fresh backend session per tunnel request.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    type Session: BackendSession;

    async fn connect(
        &self,
        host: &str,
        port: &str,
        user: &str,
        password: &str,
    ) -> Result<Self::Session, SessionError>;
}
