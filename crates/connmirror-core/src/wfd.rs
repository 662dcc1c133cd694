//! Wi-Fi Display (WFD) information-element decoding
//!
//! Peers advertise WFD capabilities as a compact binary sub-element inside
//! their discovery data. Only the Device Information sub-element is of
//! interest here; anything malformed is ignored and the peer's previous
//! capability state is retained.

use crate::types::{WfdDeviceType, WfdInfo};

/// Sub-element id for WFD Device Information.
const SUBELEM_DEVICE_INFO: u8 = 0x00;

/// Payload length carried by a Device Information sub-element.
const DEVICE_INFO_LEN: u8 = 0x06;

/// Decode a WFD Device Information sub-element.
///
/// Layout: one id byte, a 16-bit big-endian length (always 6), two
/// device-information bytes, the 16-bit big-endian RTSP port, then
/// throughput. Returns `None` for anything that is not a well-formed
/// Device Information sub-element; callers keep prior state in that case.
pub fn parse_wfd_device_info(data: &[u8]) -> Option<WfdInfo> {
    if data.len() < 9 {
        return None;
    }

    if data[0] != SUBELEM_DEVICE_INFO {
        return None;
    }

    if data[1] != 0x00 || data[2] != DEVICE_INFO_LEN {
        return None;
    }

    Some(WfdInfo {
        enabled: true,
        device_type: WfdDeviceType::from_bits(u16::from(data[4])),
        session_available: (data[4] >> 4) & 0x03,
        content_protection: data[3] & 0x01 != 0,
        rtsp_port: (u16::from(data[5]) << 8) | u16::from(data[6]),
    })
}
