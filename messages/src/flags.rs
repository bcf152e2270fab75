// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Bit flags reported by the Watchdog.

use bitflags::bitflags;
use serde::Deserialize;
use serde::Serialize;

bitflags! {
    /// The actions a reset-specific command is allowed to take, as echoed
    /// back in the Watchdog's acknowledgement.
    #[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
    pub struct ResetConditions: u8 {
        const ALLOW_UNDEPLOY = 0b0001;
        const ALLOW_DEPLOY = 0b0010;
        const ALLOW_DISABLE_RS422 = 0b0100;
        const ALLOW_POWER_ON = 0b1000;
    }
}

impl ResetConditions {
    /// Render one flag as `1` or `0`.
    pub fn bit(&self, flag: ResetConditions) -> char {
        if self.contains(flag) {
            '1'
        } else {
            '0'
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResetConditions;

    #[test]
    fn test_reset_conditions() {
        let c = ResetConditions::from_bits_truncate(0x1A);
        assert!(c.contains(ResetConditions::ALLOW_POWER_ON));
        assert!(c.contains(ResetConditions::ALLOW_DEPLOY));
        assert!(!c.contains(ResetConditions::ALLOW_UNDEPLOY));
        assert_eq!(c.bit(ResetConditions::ALLOW_DISABLE_RS422), '0');
        assert_eq!(c.bit(ResetConditions::ALLOW_DEPLOY), '1');
    }
}
