use rotor_proto::command::encode_calibration;
use rotor_proto::CalibrationValues;
use tracing::debug;

use crate::channel::{LinkHandle, LinkState};

/// One-shot calibration transfer: exactly one `CALIB:` token per call.
/// No-op when the channel is not connected or no calibration is held.
/// Returns whether the token was handed to the channel.
pub fn send_calibration(link: &LinkHandle, calib: Option<&CalibrationValues>) -> bool {
    let Some(calib) = calib else {
        debug!("link: no calibration to send");
        return false;
    };
    if link.state() != LinkState::Connected {
        debug!("link: not connected, calibration not sent");
        return false;
    }
    link.send(encode_calibration(calib)).is_ok()
}
