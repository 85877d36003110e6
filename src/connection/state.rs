//! Establishment state machine

use crate::{Error, Result};

/// Establishment state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstablishState {
    /// Nothing done yet
    Init,

    /// Options validated, nothing applied to the transport
    OptionsValidated,

    /// Transport settings and plugin configuration applied
    PluginConfigured,

    /// Failover loop running
    Connecting,

    /// Bound to one endpoint
    Connected,

    /// Attempt failed; terminal
    Failed,
}

impl EstablishState {
    /// Check if transition is valid
    pub fn can_transition_to(&self, next: EstablishState) -> bool {
        use EstablishState::*;

        matches!(
            (self, next),
            (Init, OptionsValidated)
                | (OptionsValidated, PluginConfigured)
                | (PluginConfigured, Connecting)
                | (Connecting, Connected)
                | (Init | OptionsValidated | PluginConfigured | Connecting, Failed)
        )
    }

    /// Transition to new state
    pub fn transition(&mut self, next: EstablishState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidState {
                expected: format!("valid transition from {:?}", self),
                actual: format!("{:?}", next),
            });
        }
        tracing::trace!(from = %self, to = %next, "establish state");
        *self = next;
        Ok(())
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Failed)
    }
}

impl std::fmt::Display for EstablishState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::OptionsValidated => write!(f, "options_validated"),
            Self::PluginConfigured => write!(f, "plugin_configured"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let mut state = EstablishState::Init;
        assert!(state.transition(EstablishState::OptionsValidated).is_ok());
        assert!(state.transition(EstablishState::PluginConfigured).is_ok());
        assert!(state.transition(EstablishState::Connecting).is_ok());
        assert!(state.transition(EstablishState::Connected).is_ok());
        assert!(state.is_terminal());
    }

    #[test]
    fn test_invalid_transition() {
        let mut state = EstablishState::Init;
        assert!(state.transition(EstablishState::Connecting).is_err());
        assert_eq!(state, EstablishState::Init);
    }

    #[test]
    fn test_fail_from_any_live_state() {
        for start in [
            EstablishState::Init,
            EstablishState::OptionsValidated,
            EstablishState::PluginConfigured,
            EstablishState::Connecting,
        ] {
            let mut state = start;
            assert!(state.transition(EstablishState::Failed).is_ok());
        }
    }

    #[test]
    fn test_terminal_states_stay() {
        let mut state = EstablishState::Connected;
        assert!(state.transition(EstablishState::Failed).is_err());
        let mut state = EstablishState::Failed;
        assert!(state.transition(EstablishState::Connecting).is_err());
    }
}
