// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Event distribution relay.
//!
//! The relay connects typed protocol events to the pub/sub broker:
//!
//! - [`log_event_for_device`] encodes an event into its transport
//!   envelope and publishes it on the device's topic (fire-and-forget).
//! - [`get_event_log_for_device`] subscribes to the device's topic and
//!   forwards each decoded envelope to a caller-supplied channel until
//!   cancelled or the broker fails.
//!
//! Both sides derive the topic with [`device_event_topic`], so a
//! publisher and a subscriber always meet on the same topic for the
//! same device.

mod publisher;
mod subscription;

pub use publisher::{PUBLISH_TIMEOUT, log_event_for_device};
pub use subscription::get_event_log_for_device;

use crate::event::DeviceEui;

/// Namespace prefix of per-device event topics.
const EVENT_TOPIC_PREFIX: &str = "lora:as:device";

/// Suffix identifying the live event stream.
const EVENT_TOPIC_SUFFIX: &str = "ev";

/// Returns the broker topic carrying live events for a device.
///
/// The format is stable and collision-free across devices:
/// `lora:as:device:<hex dev_eui>:ev`.
///
/// # Examples
///
/// ```
/// use eventlog_relay::{DeviceEui, relay::device_event_topic};
///
/// let eui = DeviceEui::new([1, 2, 3, 4, 5, 6, 7, 8]);
/// assert_eq!(device_event_topic(eui), "lora:as:device:0102030405060708:ev");
/// ```
#[must_use]
pub fn device_event_topic(dev_eui: DeviceEui) -> String {
    format!("{EVENT_TOPIC_PREFIX}:{dev_eui}:{EVENT_TOPIC_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_format() {
        let eui = DeviceEui::new([0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 1]);
        assert_eq!(
            device_event_topic(eui),
            "lora:as:device:deadbeef00000001:ev"
        );
    }

    #[test]
    fn distinct_devices_get_distinct_topics() {
        let a = DeviceEui::new([1, 0, 0, 0, 0, 0, 0, 0]);
        let b = DeviceEui::new([2, 0, 0, 0, 0, 0, 0, 0]);
        assert_ne!(device_event_topic(a), device_event_topic(b));
    }

    #[test]
    fn topic_is_deterministic() {
        let eui: DeviceEui = "01:02:03:04:05:06:07:08".parse().unwrap();
        assert_eq!(device_event_topic(eui), device_event_topic(eui));
    }
}
