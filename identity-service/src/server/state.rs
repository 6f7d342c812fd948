// App state for Axum server
use std::sync::Arc;

use identity_resolver::IdentityResolver;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<IdentityResolver>,
}
