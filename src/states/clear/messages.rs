use enum_display::EnumDisplay;
use serde::{Deserialize, Serialize};

use crate::records::clear_request::ClearRequest;

/// Decision entered by the receiver when answering a pending request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub accept: bool,
    pub note: Option<String>,
}

/// Everything a clearing session can observe: row changes fanned out by the
/// store (`Opened`, `Settled`) and locally injected user input (`Respond`,
/// `ConfirmClear`).
#[derive(Clone, Debug, EnumDisplay, Serialize, Deserialize)]
pub enum ClearEvent {
    Opened(ClearRequest),
    Settled(ClearRequest),
    Respond(Decision),
    ConfirmClear,
}
