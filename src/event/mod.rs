// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core event types shared by the publisher and the subscription relay.
//!
//! - [`DeviceEui`] identifies the device an event belongs to and is the
//!   only input to topic derivation.
//! - [`EventType`] is the closed set of protocol event kinds.
//! - [`EventLog`] is the decoded transport envelope handed to consumers.

mod device_eui;
mod event_log;
mod event_type;

pub use device_eui::{DeviceEui, EuiParseError};
pub use event_log::EventLog;
pub use event_type::EventType;
