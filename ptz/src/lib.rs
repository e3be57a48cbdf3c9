//! Client for the legacy VAPIX PTZ CGI (`com/ptz.cgi`).

use std::fmt::Display;

use utilities::vapix::{HttpMethod, VapixError, VapixTransport};

pub const PTZ_PATH: &str = "com/ptz.cgi";

#[derive(Debug, thiserror::Error)]
pub enum PtzError {
    #[error(transparent)]
    Transport(#[from] VapixError),

    #[error("Invalid position reply: {0}")]
    InvalidPosition(String),
}

pub type Result<T> = std::result::Result<T, PtzError>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtzPosition {
    pub pan: f32,
    pub tilt: f32,
    pub zoom: f32,
}

impl PtzPosition {
    /// Parses a `query=position` reply (`pan=..`, `tilt=..`, `zoom=..` on
    /// separate lines, possibly followed by other values).
    pub fn parse(reply: &str) -> Result<Self> {
        let value = |key: &str| -> Result<f32> {
            reply
                .split_whitespace()
                .filter_map(|pair| pair.split_once('='))
                .find(|(k, _)| *k == key)
                .ok_or_else(|| PtzError::InvalidPosition(format!("missing '{}'", key)))?
                .1
                .parse::<f32>()
                .map_err(|e| PtzError::InvalidPosition(format!("{}: {}", key, e)))
        };

        Ok(Self {
            pan: value("pan")?,
            tilt: value("tilt")?,
            zoom: value("zoom")?,
        })
    }
}

fn arg(key: &str, value: impl Display) -> (String, String) {
    (key.to_string(), value.to_string())
}

pub struct PtzControl<'a, T: VapixTransport + ?Sized> {
    api: &'a T,
}

impl<'a, T: VapixTransport + ?Sized> PtzControl<'a, T> {
    pub fn new(api: &'a T) -> Self {
        Self { api }
    }

    fn send(&self, params: &[(String, String)]) -> Result<String> {
        tracing::debug!(?params, "PTZ request");
        Ok(self.api.send_query(PTZ_PATH, HttpMethod::Get, params)?)
    }

    pub fn get_current_position(&self) -> Result<PtzPosition> {
        let reply = self.send(&[arg("query", "position")])?;
        PtzPosition::parse(&reply)
    }

    pub fn absolute_move(&self, pan: f32, tilt: f32, zoom: f32, speed: f32) -> Result<()> {
        self.send(&[
            arg("pan", pan),
            arg("tilt", tilt),
            arg("zoom", zoom),
            arg("speed", speed),
        ])
        .map(|_| ())
    }

    pub fn relative_move(&self, pan: f32, tilt: f32, zoom: f32, speed: f32) -> Result<()> {
        self.send(&[
            arg("rpan", pan),
            arg("rtilt", tilt),
            arg("rzoom", zoom),
            arg("speed", speed),
        ])
        .map(|_| ())
    }

    pub fn continuous_move(&self, pan_speed: i32, tilt_speed: i32, zoom_speed: i32) -> Result<()> {
        self.send(&[
            arg("continuouspantiltmove", format!("{},{}", pan_speed, tilt_speed)),
            arg("continuouszoommove", zoom_speed),
        ])
        .map(|_| ())
    }

    pub fn continuous_pantilt(&self, pan_speed: i32, tilt_speed: i32) -> Result<()> {
        self.send(&[arg(
            "continuouspantiltmove",
            format!("{},{}", pan_speed, tilt_speed),
        )])
        .map(|_| ())
    }

    pub fn continuous_zoom(&self, zoom_speed: i32) -> Result<()> {
        self.send(&[arg("continuouszoommove", zoom_speed)])
            .map(|_| ())
    }

    pub fn stop_move(&self) -> Result<()> {
        self.send(&[
            arg("continuouspantiltmove", "0,0"),
            arg("continuouszoommove", "0"),
        ])
        .map(|_| ())
    }

    /// Centers the view on pixel `(x, y)` of the current image.
    pub fn center_move(&self, x: i32, y: i32, speed: i32) -> Result<()> {
        self.send(&[arg("center", format!("{},{}", x, y)), arg("speed", speed)])
            .map(|_| ())
    }

    pub fn area_zoom(&self, x: i32, y: i32, zoom: i32, speed: i32) -> Result<()> {
        self.send(&[
            arg("areazoom", format!("{},{},{}", x, y, zoom)),
            arg("speed", speed),
        ])
        .map(|_| ())
    }

    /// Relative named move such as `"up"`, `"downleft"` or `"home"`.
    pub fn move_to(&self, position: &str, speed: i32) -> Result<()> {
        self.send(&[arg("move", position), arg("speed", speed)])
            .map(|_| ())
    }

    pub fn go_home(&self, speed: i32) -> Result<()> {
        self.move_to("home", speed)
    }
}
