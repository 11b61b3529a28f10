use std::sync::Arc;

use nightwatch_auth::{JwtManager, OtpAuthenticator};
use nightwatch_store::Store;

use crate::config::NightwatchConfig;

/// Shared application state passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub jwt: Arc<JwtManager>,
    pub otp: Arc<OtpAuthenticator>,
    pub config: Arc<NightwatchConfig>,
}
