pub mod app;
pub mod config;
pub mod session;
pub mod storage;

// Re-export client types for convenience
pub use app::App;
pub use vigil_client::{
    ClientError, Credentials, Enrollment, ErrorKind, ListenerEvent, ServerEndpoint, Session,
    SignupForm, StreamEntry,
};
