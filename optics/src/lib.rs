//! Client for the VAPIX Optics Control API (`opticscontrol.cgi`).
//!
//! Every call builds one JSON request envelope and hands it to a shared
//! [`VapixTransport`]. Values are forwarded as given; range checking is left
//! to the camera.

use std::fmt::Display;

use serde_json::{Map, Value, json};
use utilities::vapix::{HttpMethod, VapixTransport};

pub mod error;
pub mod types;

pub use error::OpticsControlError;
pub use types::{IrCutFilterState, RELATIVE_STEP, RelativeStep, relative_step};

pub const OPTICS_CONTROL_PATH: &str = "opticscontrol.cgi";
pub const API_VERSION: &str = "1.2";

/// `(zoom, focus)` flags used by [`OpticsControl::calibrate_default`].
pub const CALIBRATE_DEFAULTS: (bool, bool) = (true, true);
/// `(zoom, focus)` flags used by [`OpticsControl::reset_default`].
pub const RESET_DEFAULTS: (bool, bool) = (false, true);

/// Remote method names.
pub mod method {
    pub const GET_OPTICS: &str = "getOptics";
    pub const GET_CAPABILITIES: &str = "getCapabilities";
    pub const SET_FOCUS: &str = "setFocus";
    pub const SET_RELATIVE_FOCUS: &str = "setRelativeFocus";
    pub const SET_MAGNIFICATION: &str = "setMagnification";
    pub const SET_RELATIVE_MAGNIFICATION: &str = "setRelativeMagnification";
    pub const CALIBRATE: &str = "calibrate";
    pub const RESET: &str = "reset";
    pub const SET_FOCUS_WINDOW: &str = "setFocusWindow";
    pub const PERFORM_AUTOFOCUS: &str = "performAutofocus";
    pub const SET_TEMPERATURE_COMPENSATION: &str = "setTemperatureCompensation";
    pub const SET_IR_CUT_FILTER_STATE: &str = "setIrCutFilterState";
    pub const SET_IR_COMPENSATION: &str = "setIrCompensation";
}

pub type Result<T> = std::result::Result<T, OpticsControlError>;

/// Builds `{"apiVersion": "1.2", "method": ..., "params"?: ...}`.
pub fn request_envelope(method: &str, params: Option<Value>) -> Value {
    let mut envelope = json!({
        "apiVersion": API_VERSION,
        "method": method,
    });

    if let Some(params) = params {
        envelope["params"] = params;
    }

    envelope
}

/// Builds `{"optics": [{"opticsId": "<id>", ...fields}]}` for a single unit.
pub fn optics_params(optics_id: impl Display, fields: impl FnOnce(&mut Map<String, Value>)) -> Value {
    let mut entry = Map::new();
    entry.insert("opticsId".to_string(), Value::String(optics_id.to_string()));
    fields(&mut entry);

    json!({ "optics": [Value::Object(entry)] })
}

pub struct OpticsControl<'a, T: VapixTransport + ?Sized> {
    api: &'a T,
}

impl<'a, T: VapixTransport + ?Sized> OpticsControl<'a, T> {
    pub fn new(api: &'a T) -> Self {
        Self { api }
    }

    /// Sends an arbitrary method to the optics endpoint and returns the
    /// decoded body. The typed methods below all go through here.
    pub fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        tracing::debug!(method, "Optics control request");

        let envelope = request_envelope(method, params);
        self.api
            .send_json(OPTICS_CONTROL_PATH, HttpMethod::Post, &envelope)
            .map_err(OpticsControlError::from)
    }

    fn send_to_optics(
        &self,
        method: &str,
        optics_id: impl Display,
        fields: impl FnOnce(&mut Map<String, Value>),
    ) -> Result<()> {
        self.call(method, Some(optics_params(optics_id, fields)))
            .map(|_| ())
    }

    /// Returns `true` when the optics description can be fetched. Any error
    /// is treated as "not available".
    pub fn is_available(&self) -> bool {
        match self.get_optics() {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Optics control not available");
                false
            }
        }
    }

    pub fn get_optics(&self) -> Result<Value> {
        self.call(method::GET_OPTICS, None)
    }

    pub fn get_capabilities(&self) -> Result<Value> {
        self.call(method::GET_CAPABILITIES, None)
    }

    /// Sets the absolute focus position, nominally `0.0..=1.0`.
    pub fn set_focus(&self, optics_id: impl Display, position: f64) -> Result<()> {
        self.send_to_optics(method::SET_FOCUS, optics_id, |p| {
            p.insert("position".to_string(), json!(position));
        })
    }

    /// Moves focus by one step. See [`RelativeStep`] for the accepted tokens.
    pub fn set_relative_focus(&self, optics_id: impl Display, step: impl AsRef<str>) -> Result<()> {
        self.send_to_optics(method::SET_RELATIVE_FOCUS, optics_id, |p| {
            p.insert("type".to_string(), json!(step.as_ref()));
        })
    }

    pub fn set_magnification(&self, optics_id: impl Display, magnification: f64) -> Result<()> {
        self.send_to_optics(method::SET_MAGNIFICATION, optics_id, |p| {
            p.insert("magnification".to_string(), json!(magnification));
        })
    }

    pub fn set_relative_magnification(
        &self,
        optics_id: impl Display,
        step: impl AsRef<str>,
    ) -> Result<()> {
        self.send_to_optics(method::SET_RELATIVE_MAGNIFICATION, optics_id, |p| {
            p.insert("type".to_string(), json!(step.as_ref()));
        })
    }

    pub fn calibrate(&self, optics_id: impl Display, zoom: bool, focus: bool) -> Result<()> {
        self.send_to_optics(method::CALIBRATE, optics_id, |p| {
            p.insert("zoom".to_string(), json!(zoom));
            p.insert("focus".to_string(), json!(focus));
        })
    }

    /// Calibrates both zoom and focus.
    pub fn calibrate_default(&self, optics_id: impl Display) -> Result<()> {
        let (zoom, focus) = CALIBRATE_DEFAULTS;
        self.calibrate(optics_id, zoom, focus)
    }

    pub fn reset(&self, optics_id: impl Display, zoom: bool, focus: bool) -> Result<()> {
        self.send_to_optics(method::RESET, optics_id, |p| {
            p.insert("zoom".to_string(), json!(zoom));
            p.insert("focus".to_string(), json!(focus));
        })
    }

    /// Resets focus only, leaving zoom where it is.
    pub fn reset_default(&self, optics_id: impl Display) -> Result<()> {
        let (zoom, focus) = RESET_DEFAULTS;
        self.reset(optics_id, zoom, focus)
    }

    /// Sets the autofocus window. All values are normalized to the image,
    /// `(x, y)` being the upper-left corner.
    pub fn set_focus_window(
        &self,
        optics_id: impl Display,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        self.send_to_optics(method::SET_FOCUS_WINDOW, optics_id, |p| {
            p.insert("focusWindowUpperLeftX".to_string(), json!(x));
            p.insert("focusWindowUpperLeftY".to_string(), json!(y));
            p.insert("focusWindowWidth".to_string(), json!(width));
            p.insert("focusWindowHeight".to_string(), json!(height));
        })
    }

    pub fn perform_autofocus(&self, optics_id: impl Display) -> Result<()> {
        self.send_to_optics(method::PERFORM_AUTOFOCUS, optics_id, |_| {})
    }

    pub fn set_temperature_compensation(&self, optics_id: impl Display, enabled: bool) -> Result<()> {
        self.send_to_optics(method::SET_TEMPERATURE_COMPENSATION, optics_id, |p| {
            p.insert("enable".to_string(), json!(enabled));
        })
    }

    /// `state` is one of `"on"`, `"off"` or `"auto"` (see [`IrCutFilterState`]).
    pub fn set_ir_cut_filter_state(&self, optics_id: impl Display, state: impl AsRef<str>) -> Result<()> {
        self.send_to_optics(method::SET_IR_CUT_FILTER_STATE, optics_id, |p| {
            p.insert("state".to_string(), json!(state.as_ref()));
        })
    }

    pub fn set_ir_compensation(&self, optics_id: impl Display, enabled: bool) -> Result<()> {
        self.send_to_optics(method::SET_IR_COMPENSATION, optics_id, |p| {
            p.insert("enable".to_string(), json!(enabled));
        })
    }
}
