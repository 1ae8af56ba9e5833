use crate::dom::NodeId;

/// A submit event targeted at a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitEvent {
    target: NodeId,
    default_prevented: bool,
}

impl SubmitEvent {
    pub fn new(target: NodeId) -> Self {
        Self {
            target,
            default_prevented: false,
        }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Suppresses the native submission and its validation UI.
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// What happened when a form was submitted through the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    /// Every field passed the validation pass.
    pub valid: bool,
    /// Native submission was suppressed. Always true for a validated form;
    /// the host decides how to proceed on `valid`.
    pub default_prevented: bool,
}
