use crate::models::Command;

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Parses one request line such as `focus:1:0.5` or `ptz:home:100`.
pub fn parse_command(cmd_str: &str) -> Option<Command> {
    let parts: Vec<&str> = cmd_str.trim().split(':').collect();

    let command = match parts[0] {
        "available" if parts.len() == 1 => Command::Available,
        "optics" if parts.len() == 1 => Command::GetOptics,
        "capabilities" if parts.len() == 1 => Command::GetCapabilities,
        "focus" => {
            if parts.len() != 3 {
                return None;
            }
            let position = parts[2].parse::<f64>().ok()?;

            Command::Focus {
                optics_id: parts[1].to_string(),
                position,
            }
        }
        "rfocus" => {
            if parts.len() != 3 {
                return None;
            }
            let step = parts[2].parse().ok()?;

            Command::RelativeFocus {
                optics_id: parts[1].to_string(),
                step,
            }
        }
        "zoom" => {
            if parts.len() != 3 {
                return None;
            }
            let magnification = parts[2].parse::<f64>().ok()?;

            Command::Magnification {
                optics_id: parts[1].to_string(),
                magnification,
            }
        }
        "rzoom" => {
            if parts.len() != 3 {
                return None;
            }
            let step = parts[2].parse().ok()?;

            Command::RelativeMagnification {
                optics_id: parts[1].to_string(),
                step,
            }
        }
        // Two variants: "calibrate:id" or "calibrate:id:zoom:focus", same for reset
        "calibrate" | "reset" => {
            let (zoom, focus) = match parts.len() {
                2 if parts[0] == "calibrate" => optics::CALIBRATE_DEFAULTS,
                2 => optics::RESET_DEFAULTS,
                4 => (parse_flag(parts[2])?, parse_flag(parts[3])?),
                _ => return None,
            };
            let optics_id = parts[1].to_string();

            if parts[0] == "calibrate" {
                Command::Calibrate {
                    optics_id,
                    zoom,
                    focus,
                }
            } else {
                Command::Reset {
                    optics_id,
                    zoom,
                    focus,
                }
            }
        }
        "window" => {
            if parts.len() != 6 {
                return None;
            }
            let x = parts[2].parse::<f64>().ok()?;
            let y = parts[3].parse::<f64>().ok()?;
            let width = parts[4].parse::<f64>().ok()?;
            let height = parts[5].parse::<f64>().ok()?;

            Command::FocusWindow {
                optics_id: parts[1].to_string(),
                x,
                y,
                width,
                height,
            }
        }
        "autofocus" => {
            if parts.len() != 2 {
                return None;
            }

            Command::Autofocus {
                optics_id: parts[1].to_string(),
            }
        }
        "tempcomp" | "ircomp" => {
            if parts.len() != 3 {
                return None;
            }
            let optics_id = parts[1].to_string();
            let enabled = parse_flag(parts[2])?;

            if parts[0] == "tempcomp" {
                Command::TemperatureCompensation { optics_id, enabled }
            } else {
                Command::IrCompensation { optics_id, enabled }
            }
        }
        "ircut" => {
            if parts.len() != 3 {
                return None;
            }
            let state = parts[2].parse().ok()?;

            Command::IrCutFilter {
                optics_id: parts[1].to_string(),
                state,
            }
        }
        "ptz" => match &parts[1..] {
            ["position"] => Command::PtzPosition,
            ["stop"] => Command::PtzStop,
            ["home", speed] => Command::PtzHome {
                speed: speed.parse().ok()?,
            },
            _ => return None,
        },
        _ => return None,
    };

    if let Command::Focus { optics_id, .. }
    | Command::RelativeFocus { optics_id, .. }
    | Command::Magnification { optics_id, .. }
    | Command::RelativeMagnification { optics_id, .. }
    | Command::Calibrate { optics_id, .. }
    | Command::Reset { optics_id, .. }
    | Command::FocusWindow { optics_id, .. }
    | Command::Autofocus { optics_id }
    | Command::TemperatureCompensation { optics_id, .. }
    | Command::IrCutFilter { optics_id, .. }
    | Command::IrCompensation { optics_id, .. } = &command
    {
        if optics_id.is_empty() {
            return None;
        }
    }

    Some(command)
}
