//! Explicit state machine for the guest order wizard.
//!
//! The frontend holds the wizard state and asks the backend to validate
//! each transition, so every step gate lives in one place instead of being
//! scattered across screens. Steps move strictly forward via `advance` and
//! backward via `back`; the customization step is skipped in both
//! directions when the chosen drink has no option categories.

use serde::{Deserialize, Serialize};

use crate::errors::OrderError;
use crate::orders::{validate_guest_name, SubmitOrderRequest};

/// The five wizard screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    DrinkSelection,
    Customization,
    GuestInfo,
    Review,
    Success,
}

/// Everything `advance` needs to know about the store for the current
/// drink. Looked up by the command layer so the machine stays pure.
#[derive(Debug, Clone, Default)]
pub struct StepContext {
    /// The chosen drink has at least one option category bound to it.
    pub drink_has_options: bool,
    /// Names of required option categories with no selection yet.
    pub missing_required: Vec<String>,
}

/// Wizard state as held by the frontend between transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardState {
    pub step: WizardStep,
    #[serde(default)]
    pub request: SubmitOrderRequest,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: WizardStep::DrinkSelection,
            request: SubmitOrderRequest::default(),
        }
    }
}

/// Validate the current step's inputs and return the step that follows.
///
/// `Review -> Success` only validates; the caller performs the actual
/// submission and moves to `Success` when it lands.
pub fn advance(state: &WizardState, context: &StepContext) -> Result<WizardStep, OrderError> {
    match state.step {
        WizardStep::DrinkSelection => {
            if state.request.drink_id.trim().is_empty() {
                return Err(OrderError::validation("Please select a drink"));
            }
            if context.drink_has_options {
                Ok(WizardStep::Customization)
            } else {
                Ok(WizardStep::GuestInfo)
            }
        }
        WizardStep::Customization => {
            if !context.missing_required.is_empty() {
                return Err(OrderError::validation(format!(
                    "Please choose: {}",
                    context.missing_required.join(", ")
                )));
            }
            Ok(WizardStep::GuestInfo)
        }
        WizardStep::GuestInfo => {
            validate_guest_name(&state.request.guest_name)?;
            Ok(WizardStep::Review)
        }
        WizardStep::Review => Ok(WizardStep::Success),
        WizardStep::Success => Err(OrderError::validation(
            "This order is already placed; start a new one",
        )),
    }
}

/// The step shown when the guest goes back, or `None` where backing out is
/// not allowed (the first step, and the success screen).
pub fn back(step: WizardStep, drink_has_options: bool) -> Option<WizardStep> {
    match step {
        WizardStep::DrinkSelection | WizardStep::Success => None,
        WizardStep::Customization => Some(WizardStep::DrinkSelection),
        WizardStep::GuestInfo => {
            if drink_has_options {
                Some(WizardStep::Customization)
            } else {
                Some(WizardStep::DrinkSelection)
            }
        }
        WizardStep::Review => Some(WizardStep::GuestInfo),
    }
}
