use crate::{
    handshake::{HandshakeConfig, HandshakeValidator},
    oidc::ProviderConfig,
};

/// Shared state of the HTTP surface.
pub struct GateState {
    validator: HandshakeValidator,
    provider: ProviderConfig,
}

impl GateState {
    #[must_use]
    pub fn new(validator: HandshakeValidator, provider: ProviderConfig) -> Self {
        Self {
            validator,
            provider,
        }
    }

    #[must_use]
    pub fn validator(&self) -> &HandshakeValidator {
        &self.validator
    }

    #[must_use]
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    #[must_use]
    pub fn config(&self) -> &HandshakeConfig {
        self.validator.config()
    }
}
