pub mod auth;
pub mod context;
pub mod enroll;
pub mod error;
pub mod notify;
pub mod probe;
pub mod streams;
pub mod trained;
pub mod validate;

mod wire;

// Re-export commonly used types
pub use auth::{AuthFlow, AuthState, Credentials, SignupForm};
pub use context::{ApiClient, ServerEndpoint, Session};
pub use enroll::Enrollment;
pub use error::{ClientError, ErrorKind, Result};
pub use notify::{ListenerEvent, ListenerOptions, NotificationEvent, NotificationListener};
pub use streams::{StreamEntry, StreamRegistry, UrlStrategy};
pub use trained::TrainedData;
