mod callback;
mod error;
mod machine;
mod state_token;
mod traits;
mod types;
mod validation;

pub use callback::{parse_callback, strip_callback_params};
pub use error::AuthError;
pub use machine::HandshakeState;
pub use state_token::{decode_state, encode_state, generate_nonce};
pub use traits::{IdentityProvider, Navigator, Result, SessionBackend};
pub use types::{CallbackParams, HandshakePhase, TokenInfo, UserInfo};
pub use validation::validate_redirect_target;
