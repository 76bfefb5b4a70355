use std::sync::Arc;
use crate::{
    auth::TokenVerifier,
    config::Settings,
    service::ServiceContext,
};

#[derive(Clone)]
pub struct AppState {
    pub service_context: Arc<ServiceContext>,
    pub token_verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(service_context: Arc<ServiceContext>, settings: &Settings) -> Self {
        let token_verifier = Arc::new(TokenVerifier::new(&settings.auth));
        Self {
            service_context,
            token_verifier,
        }
    }
}
